//! Style selections offered to the user.
//!
//! Every option serializes as its display label, which is also the exact text
//! interpolated into prompts and the value stored with saved studies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $name:ident default $default:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| {
                        let expected: Vec<&str> = Self::ALL.iter().map(|v| v.label()).collect();
                        format!(
                            "unknown {} '{}' (expected one of: {})",
                            stringify!($name),
                            needle,
                            expected.join(", ")
                        )
                    })
            }
        }
    };
}

label_enum! {
    Tone default Professional {
        Professional => "Professional",
        Casual => "Casual",
        Academic => "Academic",
        Journalistic => "Journalistic",
        Empathetic => "Empathetic",
        Objective => "Objective",
        Persuasive => "Persuasive",
        Inspirational => "Inspirational",
        Technical => "Technical",
        Creative => "Creative",
    }
}

label_enum! {
    OutputFormat default Article {
        Article => "Article",
        BlogPost => "Blog Post",
        ExecutiveSummary => "Executive Summary",
        PresentationSlides => "Presentation Slides",
        TweetThread => "Tweet Thread",
        LinkedInPost => "LinkedIn Post",
        InfographicScript => "Infographic Script",
        PodcastScript => "Podcast Script",
        FaqDocument => "FAQ Document",
        EmailNewsletter => "Email Newsletter",
    }
}

label_enum! {
    Category default HealthMedicine {
        HealthMedicine => "Health & Medicine",
        TechnologyCs => "Technology & CS",
        EnvironmentalScience => "Environmental Science",
        SocialSciences => "Social Sciences",
        Economics => "Economics",
        PhysicsAstronomy => "Physics & Astronomy",
        Psychology => "Psychology",
        HistoryArts => "History & Arts",
        BusinessFinance => "Business & Finance",
        Engineering => "Engineering",
    }
}

label_enum! {
    Audience default GeneralPublic {
        GeneralPublic => "General Public",
        UndergraduateStudents => "Undergraduate Students",
        GraduateResearchers => "Graduate Researchers",
        IndustryExperts => "Industry Experts",
        PolicyMakers => "Policy Makers",
        HighSchoolStudents => "High School Students",
        Investors => "Investors",
        Journalists => "Journalists",
        PatientsCaregivers => "Patients & Caregivers",
        Hobbyists => "Hobbyists",
    }
}

label_enum! {
    Length default Medium {
        VeryShort => "Very Short (Tweet)",
        Short => "Short (~250 words)",
        Medium => "Medium (~500 words)",
        Long => "Long (~1000 words)",
        Detailed => "Detailed (~1500 words)",
    }
}

label_enum! {
    StyleRewrite default SimplifyLanguage {
        SimplifyLanguage => "Simplify Language",
        AddAnalogies => "Add Analogies",
        UseBulletPoints => "Use Bullet Points",
        ProvideActionableSteps => "Provide Actionable Steps",
        IncludeQa => "Include a Q&A",
        FormatAsMarkdown => "Format as Markdown",
        FocusOnPracticalImplications => "Focus on Practical Implications",
        StructureAsStory => "Structure as a Story",
    }
}

label_enum! {
    Language default English {
        English => "English",
        Spanish => "Spanish",
        French => "French",
        German => "German",
        ChineseSimplified => "Chinese (Simplified)",
        Japanese => "Japanese",
        Arabic => "Arabic",
        Portuguese => "Portuguese",
        Russian => "Russian",
        Hindi => "Hindi",
    }
}

label_enum! {
    /// Output structure requested from the model. `SelfHelpOutline` switches
    /// the whole request to the self-help generation strategy.
    TaskTemplate default StandardSummary {
        StandardSummary => "Standard Summary",
        PatientLeaflet => "Write a layperson summary for a patient leaflet",
        ExamKeyPoints => "Create exam-style key points",
        JournalClub => "Draft discussion points for journal club",
        LiteratureReviewTable => "Extract data for a literature review table",
        PressRelease => "Generate a press release draft",
        SelfHelpOutline => "Generate Self-Help Article Outline",
    }
}
