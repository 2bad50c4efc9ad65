//! Client-side submission flow
//!
//! validate -> resolve submitter -> upload file -> insert record.
//! Failures after validation park the form in the pending slot so the
//! user can retry by hand.

use super::identity::IdentityProvider;
use super::pending::PendingStore;
use crate::db::models::Paper;
use crate::db::PaperWriter;
use crate::domain::{NewPaper, PaperForm, PendingSubmission, SelectedFile};
use crate::errors::AppError;
use crate::metrics::record_submission;
use crate::storage::{generate_object_path, ObjectStorage, PDF_CONTENT_TYPE};
use crate::validation::{validate_file, validate_form_data, FieldErrors};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shown when a submission was parked for retry
pub const SAVED_FOR_RETRY_MESSAGE: &str =
    "Submission failed. Your form has been saved locally; retry when you are back online.";

const MISSING_FILE_MESSAGE: &str = "Please select a PDF file to upload";

/// Where a submission currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Authenticating,
    Uploading,
    PersistingMetadata,
    Succeeded,
    ErrorRecovery,
}

/// The form may only be dismissed while no transfer is in flight
pub fn can_close(state: SubmissionState) -> bool {
    matches!(
        state,
        SubmissionState::Idle | SubmissionState::Validating | SubmissionState::Succeeded
    )
}

/// How a call to [`SubmissionPipeline::submit`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Succeeded(Paper),
    /// Field-keyed validation errors; nothing was sent
    Invalid(FieldErrors),
    /// No usable session; nothing was sent or saved
    LoginRequired { login_url: String },
    /// Transfer failed and the form went to the pending slot
    SavedForRetry { message: String },
}

pub struct SubmissionPipeline {
    identity: Arc<dyn IdentityProvider>,
    storage: Arc<dyn ObjectStorage>,
    writer: Arc<dyn PaperWriter>,
    pending: Arc<dyn PendingStore>,
    login_url: String,
    state: watch::Sender<SubmissionState>,
    data_changed: watch::Sender<u64>,
    last_error: Option<String>,
    closed: bool,
}

impl SubmissionPipeline {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn ObjectStorage>,
        writer: Arc<dyn PaperWriter>,
        pending: Arc<dyn PendingStore>,
        login_url: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        let (data_changed, _) = watch::channel(0);
        Self {
            identity,
            storage,
            writer,
            pending,
            login_url: login_url.into(),
            state,
            data_changed,
            last_error: None,
            closed: false,
        }
    }

    /// Share a "data changed" counter with listing views
    pub fn with_data_changed(mut self, signal: watch::Sender<u64>) -> Self {
        self.data_changed = signal;
        self
    }

    /// Follow state transitions
    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    /// Bumped after every successful submission
    pub fn data_changed(&self) -> watch::Receiver<u64> {
        self.data_changed.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.borrow()
    }

    pub fn can_close(&self) -> bool {
        can_close(self.state())
    }

    /// Error from the last failed transfer, cleared on success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True once a submission has gone through
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn transition(&self, next: SubmissionState) {
        self.state.send_replace(next);
    }

    /// Run one submission end to end. Taking `&mut self` keeps a second
    /// submission from starting while this one is in flight.
    pub async fn submit(
        &mut self,
        form: &PaperForm,
        file: Option<SelectedFile>,
    ) -> SubmissionOutcome {
        self.transition(SubmissionState::Validating);
        let (draft, file) = match validate(form, file) {
            Ok(valid) => valid,
            Err(errors) => {
                self.transition(SubmissionState::Idle);
                record_submission("invalid");
                return SubmissionOutcome::Invalid(errors);
            }
        };

        self.transition(SubmissionState::Authenticating);
        let user_id = match self.identity.current_user().await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => return self.login_required(),
            Err(e) => {
                warn!(error = %e, "Identity lookup failed");
                return self.login_required();
            }
        };

        self.transition(SubmissionState::Uploading);
        let file_name = file.meta.name.clone();
        let path = generate_object_path(&file_name, Utc::now());
        if let Err(e) = self
            .storage
            .upload(&path, file.contents, PDF_CONTENT_TYPE)
            .await
        {
            return self.recover(form, &file_name, e).await;
        }

        self.transition(SubmissionState::PersistingMetadata);
        let record = NewPaper {
            file_path: path.clone(),
            user_id,
            ..draft
        };
        let paper = match self.writer.insert_paper(record).await {
            Ok(paper) => paper,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&path).await {
                    warn!(path = %path, error = %cleanup, "Failed to remove orphaned upload");
                }
                return self.recover(form, &file_name, e).await;
            }
        };

        self.transition(SubmissionState::Succeeded);
        self.data_changed.send_modify(|generation| *generation += 1);
        self.last_error = None;
        self.closed = true;
        record_submission("created");
        info!(paper_id = %paper.id, path = %paper.file_path, "Paper submitted");

        SubmissionOutcome::Succeeded(paper)
    }

    fn login_required(&self) -> SubmissionOutcome {
        self.transition(SubmissionState::Idle);
        record_submission("login_required");
        SubmissionOutcome::LoginRequired {
            login_url: self.login_url.clone(),
        }
    }

    async fn recover(&mut self, form: &PaperForm, file_name: &str, cause: AppError) -> SubmissionOutcome {
        self.transition(SubmissionState::ErrorRecovery);
        warn!(error = %cause, "Submission failed, saving for retry");

        let pending = PendingSubmission::new(form.clone(), Some(file_name.to_string()));
        if let Err(e) = self.pending.save(&pending).await {
            error!(error = %e, "Failed to save pending submission");
        }

        self.last_error = Some(cause.to_string());
        self.transition(SubmissionState::Idle);
        record_submission("saved_for_retry");

        SubmissionOutcome::SavedForRetry {
            message: SAVED_FOR_RETRY_MESSAGE.to_string(),
        }
    }
}

/// Both validators at once; a missing file is a `file` field error.
/// Rules apply to the sanitized text, which is also what gets stored.
fn validate(
    form: &PaperForm,
    file: Option<SelectedFile>,
) -> Result<(NewPaper, SelectedFile), FieldErrors> {
    let clean = form.sanitized();
    let mut errors = validate_form_data(&clean);
    match &file {
        None => {
            errors.insert("file", MISSING_FILE_MESSAGE.to_string());
        }
        Some(file) => {
            if let Err(e) = validate_file(&file.meta) {
                errors.insert("file", e.to_string());
            }
        }
    }

    let draft = NewPaper::from_form(&clean, String::new(), Uuid::nil());
    match (errors.is_empty(), draft, file) {
        (true, Some(draft), Some(file)) => Ok((draft, file)),
        _ => Err(errors),
    }
}
