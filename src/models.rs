//! Data models for coaching requests, style context and logged interactions
//!
//! Enumerations round-trip through their upper-snake literals (`THIRD_LIMITED`,
//! `DEEP_DIVE`, ...). Parsing is strict: anything outside the fixed set is a
//! validation error, never coerced to a default.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoachError;

/// Declares a string-literal enum with `as_str`, `label`, `ALL`, `Display` and strict `FromStr`.
macro_rules! literal_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => ($lit:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $lit)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical upper-snake literal
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $lit),+
                }
            }

            /// Human-readable label
            #[must_use]
            pub const fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoachError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok(Self::$variant),)+
                    other => Err(CoachError::Validation(format!(
                        "unrecognized {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

literal_enum! {
    /// Narrative point of view
    PointOfView {
        /// First person
        First => ("FIRST", "First Person"),
        /// Second person
        Second => ("SECOND", "Second Person"),
        /// Third person limited
        ThirdLimited => ("THIRD_LIMITED", "Third Person Limited"),
        /// Third person omniscient
        ThirdOmniscient => ("THIRD_OMNISCIENT", "Third Person Omniscient"),
        /// Multiple viewpoints
        Multiple => ("MULTIPLE", "Multiple"),
    }
}

literal_enum! {
    /// Narrative tense
    Tense {
        /// Past tense
        Past => ("PAST", "Past Tense"),
        /// Present tense
        Present => ("PRESENT", "Present Tense"),
        /// Mixed tenses
        Mixed => ("MIXED", "Mixed"),
    }
}

literal_enum! {
    /// Style register
    Formality {
        /// Literary fiction register
        Literary => ("LITERARY", "Literary"),
        /// Commercial fiction register
        Commercial => ("COMMERCIAL", "Commercial"),
        /// Genre fiction register
        Genre => ("GENRE", "Genre"),
        /// Experimental register
        Experimental => ("EXPERIMENTAL", "Experimental"),
    }
}

literal_enum! {
    /// Requested depth of coaching feedback
    Intensity {
        /// One or two brief, affirming observations
        LightTouch => ("LIGHT_TOUCH", "Light Touch"),
        /// Balanced observations across focus areas
        Standard => ("STANDARD", "Standard"),
        /// Thorough pattern-level analysis
        DeepDive => ("DEEP_DIVE", "Deep Dive"),
    }
}

literal_enum! {
    /// Craft dimension the coach should address
    FocusArea {
        /// Cadence and variation of sentences
        SentenceRhythm => ("SENTENCE_RHYTHM", "Sentence rhythm"),
        /// Dramatized versus summarized material
        ShowVsTell => ("SHOW_VS_TELL", "Show vs. tell"),
        /// Speed of narrative movement
        Pacing => ("PACING", "Pacing"),
        /// Concision
        WordEconomy => ("WORD_ECONOMY", "Word economy"),
        /// Spoken exchanges
        Dialogue => ("DIALOGUE", "Dialogue"),
        /// Sensory and setting detail
        Description => ("DESCRIPTION", "Description"),
        /// Narrative voice
        Voice => ("VOICE", "Voice"),
        /// Revision strategy
        Revision => ("REVISION", "Revision"),
    }
}

literal_enum! {
    /// Kind of logged coaching exchange
    RequestType {
        /// Passage analysis against the style context
        PassageAnalysis => ("PASSAGE_ANALYSIS", "Passage analysis"),
        /// Free-form craft question
        CraftQa => ("CRAFT_QA", "Craft Q&A"),
    }
}

literal_enum! {
    /// Subscription tier that drives the quota policy. Users without a record are FREE.
    #[derive(Default)]
    SubscriptionTier {
        /// Free tier, daily ceiling applies
        #[default]
        Free => ("FREE", "Free"),
        /// Pro tier, no ceiling
        Pro => ("PRO", "Pro"),
        /// Studio tier, no ceiling
        Studio => ("STUDIO", "Studio"),
    }
}

/// A project-specific style rule with an illustrative example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRule {
    /// Rule text
    pub rule: String,
    /// Example demonstrating the rule
    pub example: String,
}

/// Immutable style snapshot used to ground prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleContext {
    /// Point of view
    pub pov: PointOfView,
    /// Tense
    pub tense: Tense,
    /// Register
    pub formality: Formality,
    /// Ordered custom rules
    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,
}

impl Default for StyleContext {
    fn default() -> Self {
        Self {
            pov: PointOfView::ThirdLimited,
            tense: Tense::Past,
            formality: Formality::Literary,
            custom_rules: Vec::new(),
        }
    }
}

/// Persisted style profile; at most one per project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Profile id
    pub id: String,
    /// Owning project
    pub project_id: String,
    /// Style settings
    pub context: StyleContext,
}

/// Manuscript project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project id
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Title
    pub title: String,
    /// Genre, if the author set one
    pub genre: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Chapter within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter id
    pub id: String,
    /// Parent project
    pub project_id: String,
    /// Title
    pub title: String,
    /// Position within the project
    pub order_index: i64,
}

/// Scene within a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene id
    pub id: String,
    /// Parent chapter
    pub chapter_id: String,
    /// Title
    pub title: String,
    /// Position within the chapter
    pub order_index: i64,
}

/// Text content of a scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: String,
    /// Scene the document belongs to
    pub scene_id: String,
    /// Plain-text content
    pub content: String,
    /// Stored word count
    pub word_count: i64,
    /// Last update
    pub updated_at: DateTime<Utc>,
}

/// A document resolved up its ownership chain
#[derive(Debug, Clone)]
pub struct DocumentContext {
    /// The document itself
    pub document: Document,
    /// Scene the document belongs to
    pub scene: Scene,
    /// Chapter the scene belongs to
    pub chapter: Chapter,
    /// Project at the top of the chain
    pub project: Project,
    /// Project style profile, if one was ever created
    pub style_profile: Option<StyleProfile>,
}

/// A scene together with its document, if written
#[derive(Debug, Clone)]
pub struct SceneDocument {
    /// Scene
    pub scene: Scene,
    /// Document, absent for empty scenes
    pub document: Option<Document>,
}

/// A chapter with its project and ordered scenes
#[derive(Debug, Clone)]
pub struct ChapterOverview {
    /// Chapter
    pub chapter: Chapter,
    /// Owning project
    pub project: Project,
    /// Scenes ordered by `order_index`
    pub scenes: Vec<SceneDocument>,
}

/// Follow-up flags on an interaction.
///
/// The three flags are independent: none implies or excludes another, and
/// none can be cleared once set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionFlags {
    /// Author found the feedback useful
    pub acknowledged: bool,
    /// Author hid the feedback
    pub dismissed: bool,
    /// Author reported the feedback
    pub flagged: bool,
}

/// Selects one of the [`InteractionFlags`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionFlag {
    /// `acknowledged`
    Acknowledged,
    /// `dismissed`
    Dismissed,
    /// `flagged`
    Flagged,
}

impl InteractionFlag {
    /// Name used in logs and metrics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Acknowledged => "acknowledged",
            Self::Dismissed => "dismissed",
            Self::Flagged => "flagged",
        }
    }
}

/// Logged request/response exchange with the external model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction id
    pub id: String,
    /// Requesting user
    pub user_id: String,
    /// Project the request was made in
    pub project_id: Option<String>,
    /// Document the passage came from (passage analysis only)
    pub document_id: Option<String>,
    /// Kind of request
    pub request_type: RequestType,
    /// Passage or question as submitted
    pub request_text: String,
    /// Model output
    pub response_text: String,
    /// Intensity used
    pub intensity: Intensity,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Follow-up flags
    #[serde(flatten)]
    pub flags: InteractionFlags,
}

/// Data for logging a new interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInteraction {
    /// Requesting user
    pub user_id: String,
    /// Project the request was made in
    pub project_id: Option<String>,
    /// Document the passage came from
    pub document_id: Option<String>,
    /// Kind of request
    pub request_type: RequestType,
    /// Passage or question
    pub request_text: String,
    /// Model output
    pub response_text: String,
    /// Intensity used
    pub intensity: Intensity,
}

/// Usage counters for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Effective tier
    pub tier: SubscriptionTier,
    /// Interactions since local midnight
    pub daily_requests: u32,
    /// Interactions since the first of the month
    pub monthly_requests: u32,
    /// Daily ceiling, `None` when unlimited
    pub daily_limit: Option<u32>,
}

/// Coarse chapter aggregate over stored word counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureCheckReport {
    /// Chapter checked
    pub chapter_id: String,
    /// Number of scenes in the chapter
    pub scene_count: usize,
    /// Sum of stored scene word counts
    pub total_words: i64,
    /// Not computed by this aggregate; always 0
    pub sentence_count: usize,
    /// Not computed by this aggregate; always 0
    pub paragraph_count: usize,
    /// Guidance on obtaining full metrics
    pub analysis: String,
}

/// Data for creating a project
#[derive(Debug, Clone)]
pub struct NewProject {
    /// Owning user
    pub user_id: String,
    /// Title
    pub title: String,
    /// Genre
    pub genre: Option<String>,
}
