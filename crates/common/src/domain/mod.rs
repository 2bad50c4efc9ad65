//! Domain vocabulary shared by the gateway and the submission client

mod form;
mod taxonomy;

pub use form::{split_authors, FileCandidate, NewPaper, PaperForm, PendingSubmission, SelectedFile};
pub use taxonomy::{Country, Level, PaperType, Subject, UnknownVariant};

impl From<UnknownVariant> for crate::errors::AppError {
    fn from(err: UnknownVariant) -> Self {
        crate::errors::AppError::InvalidFormat {
            message: err.to_string(),
        }
    }
}
