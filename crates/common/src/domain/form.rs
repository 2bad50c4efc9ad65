//! Submission form state and the records built from it

use super::taxonomy::{Country, Level, PaperType, Subject};
use crate::validation::sanitize_input;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the submitter has typed or picked so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperForm {
    pub title: String,

    /// Raw comma-separated author names
    pub authors: String,

    pub subject: Option<Subject>,

    pub level: Option<Level>,

    pub country: Option<Country>,

    #[serde(rename = "type")]
    pub paper_type: Option<PaperType>,

    #[serde(default)]
    pub institution: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl PaperForm {
    /// Split the raw author string on commas, trimming each name.
    /// Blank entries are kept so validation can report them.
    pub fn author_list(&self) -> Vec<String> {
        split_authors(&self.authors)
    }

    /// Copy with script blocks stripped from every free-text field.
    /// Validation runs on this copy so that rules see what gets stored.
    pub fn sanitized(&self) -> Self {
        Self {
            title: sanitize_input(&self.title),
            authors: sanitize_input(&self.authors),
            institution: sanitize_input(&self.institution),
            abstract_text: sanitize_input(&self.abstract_text),
            ..self.clone()
        }
    }
}

/// Split a comma-separated author string into trimmed names
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.split(',').map(|name| name.trim().to_string()).collect()
}

/// Descriptor of a file picked for upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCandidate {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// A picked file together with its contents
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub meta: FileCandidate,
    pub contents: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            meta: FileCandidate {
                name: name.into(),
                size: contents.len() as u64,
                mime_type: mime_type.into(),
            },
            contents,
        }
    }
}

/// A fully validated paper ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaper {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    pub country: Country,
    pub subject: Subject,
    pub level: Level,
    #[serde(rename = "type")]
    pub paper_type: PaperType,
    pub file_path: String,
    /// Taken from the bearer token by the gateway, never from the body
    #[serde(skip)]
    pub user_id: Uuid,
}

impl NewPaper {
    /// Build from a validated form. Returns `None` if any classification
    /// is still unset.
    pub fn from_form(form: &PaperForm, file_path: String, user_id: Uuid) -> Option<Self> {
        let institution = form.institution.trim();
        Some(Self {
            title: form.title.trim().to_string(),
            authors: form
                .author_list()
                .into_iter()
                .filter(|name| !name.is_empty())
                .collect(),
            abstract_text: form.abstract_text.trim().to_string(),
            institution: (!institution.is_empty()).then(|| institution.to_string()),
            country: form.country?,
            subject: form.subject?,
            level: form.level?,
            paper_type: form.paper_type?,
            file_path,
            user_id,
        })
    }
}

/// Copy of a failed submission kept for a manual retry.
/// File contents are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSubmission {
    #[serde(flatten)]
    pub form: PaperForm,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    pub saved_at: DateTime<Utc>,
}

impl PendingSubmission {
    pub fn new(form: PaperForm, file_name: Option<String>) -> Self {
        Self {
            form,
            file_name,
            saved_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> PaperForm {
        PaperForm {
            title: "  Soil health in the Sahel  ".into(),
            authors: "Amina Bello, Kwame Mensah ,".into(),
            subject: Some(Subject::Agriculture),
            level: Some(Level::Undergraduate),
            country: Some(Country::Nigeria),
            paper_type: Some(PaperType::Thesis),
            institution: " ".into(),
            abstract_text: "x".repeat(60),
        }
    }

    #[test]
    fn test_author_list_keeps_blank_entries() {
        let form = complete_form();
        assert_eq!(form.author_list(), vec!["Amina Bello", "Kwame Mensah", ""]);
    }

    #[test]
    fn test_new_paper_from_form() {
        let user = Uuid::new_v4();
        let paper = NewPaper::from_form(&complete_form(), "papers/1_a.pdf".into(), user).unwrap();
        assert_eq!(paper.title, "Soil health in the Sahel");
        assert_eq!(paper.authors, vec!["Amina Bello", "Kwame Mensah"]);
        assert_eq!(paper.institution, None);
        assert_eq!(paper.user_id, user);
    }

    #[test]
    fn test_new_paper_requires_classifications() {
        let mut form = complete_form();
        form.level = None;
        assert!(NewPaper::from_form(&form, "p".into(), Uuid::nil()).is_none());
    }

    #[test]
    fn test_sanitized_strips_scripts() {
        let mut form = complete_form();
        form.title = "Water <script>alert(1)</script>access".into();
        form.authors = "Amina Bello, <script>x</script>".into();
        form.institution = "<SCRIPT src=a.js></SCRIPT>".into();

        let clean = form.sanitized();
        assert_eq!(clean.title, "Water access");
        assert_eq!(clean.author_list(), vec!["Amina Bello", ""]);
        assert_eq!(clean.institution, "");
        assert_eq!(clean.country, form.country);
        assert_eq!(clean.abstract_text, form.abstract_text);
    }

    #[test]
    fn test_new_paper_body_uses_wire_names() {
        let paper = NewPaper::from_form(&complete_form(), "p".into(), Uuid::new_v4()).unwrap();
        let body = serde_json::to_value(&paper).unwrap();
        assert_eq!(body["type"], "thesis");
        assert_eq!(body["country"], "Nigeria");
        assert!(body.get("abstract").is_some());
        assert!(body.get("user_id").is_none());
    }

    #[test]
    fn test_pending_submission_is_flat() {
        let pending = PendingSubmission::new(complete_form(), Some("a.pdf".into()));
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["subject"], "agri");
        assert_eq!(json["file_name"], "a.pdf");
        let back: PendingSubmission = serde_json::from_value(json).unwrap();
        assert_eq!(back, pending);
    }
}
