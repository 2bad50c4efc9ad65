//! Paper submission: the client pipeline and the ports it drives

mod identity;
mod pending;
mod pipeline;

pub use identity::{IdentityProvider, StaticIdentity};
pub use pending::{FilePendingStore, MemoryPendingStore, PendingStore, PENDING_FILE_NAME};
pub use pipeline::{
    can_close, SubmissionOutcome, SubmissionPipeline, SubmissionState, SAVED_FOR_RETRY_MESSAGE,
};
