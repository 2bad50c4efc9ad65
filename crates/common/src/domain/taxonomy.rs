//! Closed classification enums for papers
//!
//! Every categorical field on a paper (country, subject, level, type) is one
//! of these enums. Wire values are what clients send and what the database
//! stores; labels are for display.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A value that is not a member of the expected classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! taxonomy {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $variant:ident => ($value:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            EnumIter, DeriveActiveEnum, Serialize, Deserialize,
        )]
        #[sea_orm(rs_type = "String", db_type = "Text")]
        pub enum $name {
            $(
                #[sea_orm(string_value = $value)]
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every member, in display order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Value used on the wire and in the database
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Human-readable label
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == s)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

taxonomy! {
    /// Subject area of a paper
    Subject ("subject") {
        Agriculture => ("agri", "Agriculture"),
        ComputerScience => ("cs", "Computer Science"),
        Economics => ("econ", "Economics"),
        Education => ("edu", "Education"),
        EnvironmentalScience => ("env", "Environmental Science"),
        Medicine => ("med", "Medicine & Health"),
        Mathematics => ("math", "Mathematics"),
        Physics => ("physics", "Physics"),
        SocialSciences => ("soc", "Social Sciences"),
    }
}

taxonomy! {
    /// Education level the work was produced at
    Level ("level") {
        HighSchool => ("high-school", "High School"),
        Undergraduate => ("undergraduate", "Undergraduate"),
        Community => ("community", "Community-Based (Non-Formal)"),
    }
}

taxonomy! {
    /// Kind of work submitted
    PaperType ("type") {
        Article => ("article", "Journal Article"),
        ConferencePaper => ("conference_paper", "Conference Paper"),
        Book => ("book", "Book"),
        BookChapter => ("book_chapter", "Book Chapter"),
        Thesis => ("thesis", "Thesis"),
        Dissertation => ("dissertation", "Dissertation"),
        TechnicalReport => ("technical_report", "Technical Report"),
        WorkingPaper => ("working_paper", "Working Paper"),
        Preprint => ("preprint", "Preprint"),
        ReviewArticle => ("review_article", "Review Article"),
        CaseStudy => ("case_study", "Case Study"),
        Letter => ("letter", "Letter"),
        Patent => ("patent", "Patent"),
        Presentation => ("presentation", "Presentation"),
        Poster => ("poster", "Poster"),
        Dataset => ("dataset", "Dataset"),
        Software => ("software", "Software"),
        CommunityReport => ("community_report", "Community Report"),
        Other => ("other", "Other"),
    }
}

taxonomy! {
    /// Country the research comes from
    Country ("country") {
        Nigeria => ("Nigeria", "Nigeria"),
        Kenya => ("Kenya", "Kenya"),
        Ghana => ("Ghana", "Ghana"),
        SouthAfrica => ("South Africa", "South Africa"),
        Egypt => ("Egypt", "Egypt"),
        India => ("India", "India"),
        Bangladesh => ("Bangladesh", "Bangladesh"),
        Pakistan => ("Pakistan", "Pakistan"),
        Indonesia => ("Indonesia", "Indonesia"),
        Philippines => ("Philippines", "Philippines"),
        Brazil => ("Brazil", "Brazil"),
        Mexico => ("Mexico", "Mexico"),
        Colombia => ("Colombia", "Colombia"),
        Peru => ("Peru", "Peru"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_parse() {
        assert_eq!("cs".parse::<Subject>().unwrap(), Subject::ComputerScience);
        assert_eq!("high-school".parse::<Level>().unwrap(), Level::HighSchool);
        assert_eq!("South Africa".parse::<Country>().unwrap(), Country::SouthAfrica);
        assert_eq!("book_chapter".parse::<PaperType>().unwrap(), PaperType::BookChapter);
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let err = "eess".parse::<Subject>().unwrap_err();
        assert_eq!(err.kind, "subject");
        assert_eq!(err.to_string(), "Unknown subject: eess");
        // wire values are case-sensitive
        assert!("kenya".parse::<Country>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_values() {
        let json = serde_json::to_string(&Level::HighSchool).unwrap();
        assert_eq!(json, "\"high-school\"");
        let country: Country = serde_json::from_str("\"South Africa\"").unwrap();
        assert_eq!(country, Country::SouthAfrica);
    }

    #[test]
    fn test_every_member_round_trips_through_from_str() {
        for subject in Subject::ALL {
            assert_eq!(subject.as_str().parse::<Subject>().unwrap(), *subject);
        }
        assert_eq!(PaperType::ALL.len(), 19);
        assert_eq!(Country::ALL.len(), 14);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Subject::Medicine.label(), "Medicine & Health");
        assert_eq!(PaperType::ConferencePaper.to_string(), "conference_paper");
    }
}
