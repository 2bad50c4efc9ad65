use crate::cli::DownloadArgs;
use crate::context::ClientContext;
use anyhow::Context;
use std::path::PathBuf;
use uuid::Uuid;

/// Final path component of the suggested name, or `{id}.pdf`
fn local_file_name(suggested: Option<&str>, id: Uuid) -> String {
    suggested
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{id}.pdf"))
}

pub async fn handle(args: &DownloadArgs, ctx: &ClientContext) -> anyhow::Result<()> {
    let file = ctx.gateway.download(args.id).await?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(local_file_name(file.file_name.as_deref(), args.id)));

    tokio::fs::write(&output, &file.bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    tracing::info!(path = %output.display(), bytes = file.bytes.len(), "Paper downloaded");
    println!("Saved {} ({} bytes)", output.display(), file.bytes.len());
    Ok(())
}
