//! Pure checks on submitted files, form data and search terms
//!
//! Nothing here performs I/O. Callers decide what to do with the errors.

use crate::domain::{FileCandidate, PaperForm};
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Largest accepted upload (5 MiB)
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// The only accepted MIME type
pub const ALLOWED_FILE_TYPE: &str = "application/pdf";

pub const ALLOWED_EXTENSION: &str = ".pdf";

pub const TITLE_MIN_LEN: usize = 5;
pub const ABSTRACT_MIN_LEN: usize = 50;
pub const ABSTRACT_MAX_LEN: usize = 2000;
pub const SEARCH_TERM_MIN_LEN: usize = 2;
pub const SEARCH_TERM_MAX_LEN: usize = 100;

/// Field name to message, ordered by field name
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Why a file was rejected
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FileError {
    #[error("File size must be less than 5MB")]
    SizeExceeded,

    #[error("Only PDF files are allowed")]
    TypeNotAllowed,

    #[error("File must have a .pdf extension")]
    ExtensionNotAllowed,
}

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("script pattern compiles")
});

/// Check size, then MIME type, then extension. First failure wins.
pub fn validate_file(file: &FileCandidate) -> Result<(), FileError> {
    if file.size > MAX_FILE_SIZE {
        return Err(FileError::SizeExceeded);
    }
    if file.mime_type != ALLOWED_FILE_TYPE {
        return Err(FileError::TypeNotAllowed);
    }
    if !file.name.to_lowercase().ends_with(ALLOWED_EXTENSION) {
        return Err(FileError::ExtensionNotAllowed);
    }
    Ok(())
}

/// Collect every rule violation on the form, keyed by field
pub fn validate_form_data(form: &PaperForm) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let title = form.title.trim();
    if title.is_empty() {
        errors.insert("title", "Title is required".into());
    } else if title.chars().count() < TITLE_MIN_LEN {
        errors.insert("title", "Title must be at least 5 characters".into());
    }

    if form.authors.trim().is_empty() {
        errors.insert("authors", "At least one author is required".into());
    } else if form.author_list().iter().any(|name| name.is_empty()) {
        errors.insert(
            "authors",
            "Please provide valid author names, separated by commas".into(),
        );
    }

    let abstract_text = form.abstract_text.trim();
    let abstract_len = abstract_text.chars().count();
    if abstract_text.is_empty() {
        errors.insert("abstract", "Abstract is required".into());
    } else if abstract_len < ABSTRACT_MIN_LEN {
        errors.insert("abstract", "Abstract must be at least 50 characters".into());
    } else if abstract_len > ABSTRACT_MAX_LEN {
        errors.insert("abstract", "Abstract must be less than 2000 characters".into());
    }

    if form.subject.is_none() {
        errors.insert("subject", "Subject area is required".into());
    }
    if form.level.is_none() {
        errors.insert("level", "Education level is required".into());
    }
    if form.country.is_none() {
        errors.insert("country", "Country is required".into());
    }
    if form.paper_type.is_none() {
        errors.insert("type", "Type of work is required".into());
    }

    errors
}

/// Remove `<script>` blocks. Nothing else is touched.
pub fn sanitize_input(input: &str) -> String {
    SCRIPT_BLOCK.replace_all(input, "").into_owned()
}

/// Free-text search terms must be 2 to 100 characters after trimming
pub fn validate_search_term(term: &str) -> bool {
    let len = term.trim().chars().count();
    (SEARCH_TERM_MIN_LEN..=SEARCH_TERM_MAX_LEN).contains(&len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Country, Level, PaperType, Subject};

    fn pdf(name: &str, size: u64) -> FileCandidate {
        FileCandidate {
            name: name.into(),
            size,
            mime_type: ALLOWED_FILE_TYPE.into(),
        }
    }

    fn valid_form() -> PaperForm {
        PaperForm {
            title: "Mobile money adoption".into(),
            authors: "Wanjiru Kamau, Otieno Odhiambo".into(),
            subject: Some(Subject::Economics),
            level: Some(Level::Undergraduate),
            country: Some(Country::Kenya),
            paper_type: Some(PaperType::Article),
            institution: String::new(),
            abstract_text: "a".repeat(ABSTRACT_MIN_LEN),
        }
    }

    #[test]
    fn test_valid_pdf_passes() {
        assert_eq!(validate_file(&pdf("thesis.PDF", 2 * 1024 * 1024)), Ok(()));
        assert_eq!(validate_file(&pdf("exact.pdf", MAX_FILE_SIZE)), Ok(()));
    }

    #[test]
    fn test_oversized_file_rejected_first() {
        let mut file = pdf("big.docx", MAX_FILE_SIZE + 1);
        file.mime_type = "application/msword".into();
        assert_eq!(validate_file(&file), Err(FileError::SizeExceeded));
    }

    #[test]
    fn test_wrong_type_rejected_regardless_of_extension() {
        let mut file = pdf("paper.pdf", 1024);
        file.mime_type = "text/plain".into();
        assert_eq!(validate_file(&file), Err(FileError::TypeNotAllowed));
    }

    #[test]
    fn test_wrong_extension_rejected() {
        assert_eq!(
            validate_file(&pdf("paper.txt", 1024)),
            Err(FileError::ExtensionNotAllowed)
        );
    }

    #[test]
    fn test_valid_form_has_no_errors() {
        assert!(validate_form_data(&valid_form()).is_empty());

        let mut form = valid_form();
        form.abstract_text = "b".repeat(ABSTRACT_MAX_LEN);
        assert!(validate_form_data(&form).is_empty());
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let errors = validate_form_data(&PaperForm::default());
        assert_eq!(errors.len(), 7);
        assert_eq!(errors["title"], "Title is required");
        assert_eq!(errors["authors"], "At least one author is required");
        assert_eq!(errors["abstract"], "Abstract is required");
        assert_eq!(errors["type"], "Type of work is required");
    }

    #[test]
    fn test_length_rules() {
        let mut form = valid_form();
        form.title = " abc ".into();
        form.abstract_text = "c".repeat(ABSTRACT_MAX_LEN + 1);
        let errors = validate_form_data(&form);
        assert_eq!(errors["title"], "Title must be at least 5 characters");
        assert_eq!(errors["abstract"], "Abstract must be less than 2000 characters");

        form.abstract_text = "too short".into();
        let errors = validate_form_data(&form);
        assert_eq!(errors["abstract"], "Abstract must be at least 50 characters");
    }

    #[test]
    fn test_blank_author_entry() {
        let mut form = valid_form();
        form.authors = "Ada Obi,, Chidi Eze".into();
        let errors = validate_form_data(&form);
        assert_eq!(
            errors["authors"],
            "Please provide valid author names, separated by commas"
        );
    }

    #[test]
    fn test_sanitize_strips_script_blocks_only() {
        let input = "Intro <SCRIPT type=\"text/javascript\">\nsteal()\n</script> and <b>bold</b>";
        assert_eq!(sanitize_input(input), "Intro  and <b>bold</b>");
        assert_eq!(sanitize_input("plain text"), "plain text");
    }

    #[test]
    fn test_search_term_bounds() {
        assert!(!validate_search_term("a"));
        assert!(validate_search_term("ab"));
        assert!(validate_search_term(&"z".repeat(100)));
        assert!(!validate_search_term(&"z".repeat(101)));
    }
}
