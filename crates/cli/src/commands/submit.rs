use crate::cli::{RetryArgs, SubmitArgs};
use crate::context::ClientContext;
use anyhow::{bail, Context};
use gsr_common::{
    domain::{PaperForm, SelectedFile},
    storage::PDF_CONTENT_TYPE,
    submission::SubmissionOutcome,
};
use std::path::Path;
use tracing::{info, warn};

const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type a browser would report for the picked file
fn mime_for(name: &str) -> &'static str {
    if name.to_lowercase().ends_with(".pdf") {
        PDF_CONTENT_TYPE
    } else {
        OCTET_STREAM
    }
}

/// Load a file from disk the way a file picker hands it over
pub async fn read_selected_file(path: &Path) -> anyhow::Result<SelectedFile> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.pdf");
    Ok(SelectedFile::new(name, mime_for(name), contents))
}

async fn abstract_text(args: &SubmitArgs) -> anyhow::Result<String> {
    match (&args.abstract_text, &args.abstract_file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

async fn run_pipeline(
    ctx: &ClientContext,
    form: &PaperForm,
    file: SelectedFile,
) -> SubmissionOutcome {
    let mut pipeline = ctx.pipeline();
    pipeline.submit(form, Some(file)).await
}

fn report(outcome: &SubmissionOutcome) -> anyhow::Result<()> {
    match outcome {
        SubmissionOutcome::Succeeded(paper) => {
            println!("Submitted \"{}\" ({})", paper.title, paper.id);
            Ok(())
        }
        SubmissionOutcome::Invalid(errors) => {
            for (field, message) in errors {
                eprintln!("  {field}: {message}");
            }
            bail!("Submission has {} invalid field(s)", errors.len())
        }
        SubmissionOutcome::LoginRequired { login_url } => {
            bail!("Please sign in before submitting: {login_url}")
        }
        SubmissionOutcome::SavedForRetry { message } => bail!("{message}"),
    }
}

pub async fn handle_submit(args: &SubmitArgs, ctx: &ClientContext) -> anyhow::Result<()> {
    let form = args.to_form(abstract_text(args).await?);
    let file = read_selected_file(&args.file).await?;

    let outcome = run_pipeline(ctx, &form, file).await;
    report(&outcome)
}

/// Run the saved submission again with `file` attached. The slot is
/// cleared only once the submission goes through. `None` when nothing
/// was saved.
pub async fn retry_pending(
    ctx: &ClientContext,
    file: &Path,
) -> anyhow::Result<Option<SubmissionOutcome>> {
    let Some(pending) = ctx.pending.load().await? else {
        return Ok(None);
    };

    let file = read_selected_file(file).await?;
    if let Some(expected) = pending.file_name.as_deref() {
        if expected != file.meta.name {
            warn!(expected, selected = %file.meta.name, "Retrying with a different file");
        }
    }

    info!(saved_at = %pending.saved_at, title = %pending.form.title, "Retrying saved submission");
    let outcome = run_pipeline(ctx, &pending.form, file).await;
    if matches!(outcome, SubmissionOutcome::Succeeded(_)) {
        ctx.pending.clear().await?;
    }

    Ok(Some(outcome))
}

pub async fn handle_retry(args: &RetryArgs, ctx: &ClientContext) -> anyhow::Result<()> {
    match retry_pending(ctx, &args.file).await? {
        Some(outcome) => report(&outcome),
        None => {
            println!("No saved submission to retry");
            Ok(())
        }
    }
}

pub async fn handle_pending(ctx: &ClientContext) -> anyhow::Result<()> {
    let Some(pending) = ctx.pending.load().await? else {
        println!("No saved submission");
        return Ok(());
    };

    println!("Saved {}", pending.saved_at.format("%Y-%m-%d %H:%M UTC"));
    println!("  title:   {}", pending.form.title);
    println!("  authors: {}", pending.form.authors);
    if let Some(file_name) = &pending.file_name {
        println!("  file:    {file_name}");
    }
    println!("Run `gsr retry --file <pdf>` to submit it again");
    Ok(())
}
