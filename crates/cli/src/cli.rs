use clap::{Args, Parser, Subcommand};
use gsr_common::domain::{Country, Level, PaperForm, PaperType, Subject};
use std::path::PathBuf;
use uuid::Uuid;

/// Top-level CLI parser for the `gsr` binary.
#[derive(Debug, Parser)]
#[command(
    name = "gsr",
    version,
    about = "Global South Research Repository - submit and find research papers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Gateway base URL (overrides GSR__GATEWAY_URL)
    #[arg(long, global = true)]
    pub gateway: Option<String>,

    /// Bearer token for submissions (overrides GSR__TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a PDF and create its catalog record
    Submit(SubmitArgs),

    /// Re-run the submission saved after a failed attempt
    Retry(RetryArgs),

    /// Show the saved submission, if any
    Pending,

    /// Search and filter the catalog
    Search(SearchArgs),

    /// Download a paper's PDF
    Download(DownloadArgs),
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Paper title
    #[arg(long)]
    pub title: Option<String>,

    /// Comma-separated author names
    #[arg(long)]
    pub authors: Option<String>,

    /// Abstract text
    #[arg(long = "abstract", conflicts_with = "abstract_file")]
    pub abstract_text: Option<String>,

    /// Read the abstract from a file
    #[arg(long)]
    pub abstract_file: Option<PathBuf>,

    /// Institution (optional)
    #[arg(long)]
    pub institution: Option<String>,

    /// Subject area, e.g. agri, cs, econ
    #[arg(long)]
    pub subject: Option<Subject>,

    /// Education level: high-school, undergraduate, community
    #[arg(long)]
    pub level: Option<Level>,

    /// Country, e.g. "Kenya" or "South Africa"
    #[arg(long)]
    pub country: Option<Country>,

    /// Type of work, e.g. thesis, case_study
    #[arg(long = "type")]
    pub paper_type: Option<PaperType>,

    /// PDF to upload
    #[arg(long)]
    pub file: PathBuf,
}

impl SubmitArgs {
    /// Form as the submitter filled it in; `abstract_text` comes from
    /// `--abstract` or the contents of `--abstract-file`
    pub fn to_form(&self, abstract_text: String) -> PaperForm {
        PaperForm {
            title: self.title.clone().unwrap_or_default(),
            authors: self.authors.clone().unwrap_or_default(),
            subject: self.subject,
            level: self.level,
            country: self.country,
            paper_type: self.paper_type,
            institution: self.institution.clone().unwrap_or_default(),
            abstract_text,
        }
    }
}

#[derive(Debug, Args)]
pub struct RetryArgs {
    /// PDF to attach; file contents are never saved with a pending submission
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free text matched against title, authors and abstract
    pub search: Option<String>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long)]
    pub level: Option<String>,

    #[arg(long = "type")]
    pub paper_type: Option<String>,

    /// A year such as 2021, or "older"
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub institution: Option<String>,

    /// newest, oldest, title or relevance
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: u64,

    #[arg(long, default_value_t = 10)]
    pub limit: u64,

    /// Print the raw JSON response
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    /// Query string pairs for `GET /v2/papers`; unset values are left out
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("search", &self.search),
            ("country", &self.country),
            ("subject", &self.subject),
            ("level", &self.level),
            ("type", &self.paper_type),
            ("date", &self.date),
            ("institution", &self.institution),
            ("sort", &self.sort),
        ];

        let mut pairs: Vec<(&'static str, String)> = optional
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
            .collect();
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Paper id
    pub id: Uuid,

    /// Output path (defaults to the file name offered by the gateway)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn submit_parses_classifications() {
        let cli = Cli::try_parse_from([
            "gsr",
            "submit",
            "--title",
            "Rainwater harvesting in Kitui",
            "--authors",
            "Mutua Kilonzo, Faith Mwende",
            "--abstract",
            "Household rainwater harvesting adoption and dry-season water security.",
            "--subject",
            "env",
            "--level",
            "community",
            "--country",
            "South Africa",
            "--type",
            "community_report",
            "--file",
            "paper.pdf",
        ])
        .expect("cli should parse");

        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.subject, Some(Subject::EnvironmentalScience));
        assert_eq!(args.level, Some(Level::Community));
        assert_eq!(args.country, Some(Country::SouthAfrica));
        assert_eq!(args.paper_type, Some(PaperType::CommunityReport));

        let form = args.to_form(args.abstract_text.clone().unwrap_or_default());
        assert_eq!(form.author_list(), vec!["Mutua Kilonzo", "Faith Mwende"]);
        assert_eq!(form.institution, "");
    }

    #[test]
    fn submit_rejects_unknown_subject() {
        let parsed = Cli::try_parse_from([
            "gsr", "submit", "--subject", "alchemy", "--file", "paper.pdf",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn abstract_sources_conflict() {
        let parsed = Cli::try_parse_from([
            "gsr",
            "submit",
            "--abstract",
            "text",
            "--abstract-file",
            "abstract.txt",
            "--file",
            "paper.pdf",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gsr",
            "retry",
            "--file",
            "paper.pdf",
            "--gateway",
            "http://localhost:9000",
            "-v",
        ])
        .expect("cli should parse");
        assert_eq!(cli.gateway.as_deref(), Some("http://localhost:9000"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Retry(_)));
    }

    #[test]
    fn search_query_pairs() {
        let cli = Cli::try_parse_from([
            "gsr", "search", "malaria", "--country", "Kenya", "--date", "2021", "--page", "2",
        ])
        .expect("cli should parse");
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(
            args.query_pairs(),
            vec![
                ("search", "malaria".to_string()),
                ("country", "Kenya".to_string()),
                ("date", "2021".to_string()),
                ("page", "2".to_string()),
                ("limit", "10".to_string()),
            ]
        );
    }

    #[test]
    fn download_requires_uuid() {
        assert!(Cli::try_parse_from(["gsr", "download", "not-a-uuid"]).is_err());
        let id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from(["gsr", "download", id.as_str(), "-o", "out.pdf"])
            .expect("cli should parse");
        assert!(matches!(cli.command, Commands::Download(_)));
    }
}
