use crate::error::{CoachError, Result};
use crate::models::{FocusArea, Intensity};
use crate::temperature::word_count_of;

/// Minimum passage length in words (inclusive)
pub const MIN_PASSAGE_WORDS: usize = 50;
/// Maximum passage length in words (inclusive)
pub const MAX_PASSAGE_WORDS: usize = 2000;
/// Minimum craft question length in characters
pub const MIN_QUESTION_CHARS: usize = 10;

/// Validation utilities for coaching input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate passage length, returning its word count
    pub fn validate_passage(passage: &str) -> Result<usize> {
        let words = word_count_of(passage);

        if words < MIN_PASSAGE_WORDS {
            return Err(CoachError::Validation(format!(
                "Selection must be at least {MIN_PASSAGE_WORDS} words (got {words})"
            )));
        }

        if words > MAX_PASSAGE_WORDS {
            return Err(CoachError::Validation(format!(
                "Selection cannot exceed {MAX_PASSAGE_WORDS} words (got {words})"
            )));
        }

        Ok(words)
    }

    /// Validate a craft question
    pub fn validate_question(question: &str) -> Result<()> {
        if question.trim().chars().count() < MIN_QUESTION_CHARS {
            return Err(CoachError::Validation(format!(
                "Question must be at least {MIN_QUESTION_CHARS} characters"
            )));
        }

        Ok(())
    }

    /// Parse an intensity literal
    pub fn parse_intensity(raw: &str) -> Result<Intensity> {
        raw.parse()
    }

    /// Parse focus-area literals, rejecting unknown values and dropping repeats
    pub fn parse_focus_areas<S: AsRef<str>>(raw: &[S]) -> Result<Vec<FocusArea>> {
        let parsed = raw
            .iter()
            .map(|s| s.as_ref().parse::<FocusArea>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::dedupe_focus_areas(&parsed))
    }

    /// Remove repeated focus areas, keeping first-seen order
    #[must_use]
    pub fn dedupe_focus_areas(areas: &[FocusArea]) -> Vec<FocusArea> {
        let mut unique = Vec::with_capacity(areas.len());
        for area in areas {
            if !unique.contains(area) {
                unique.push(*area);
            }
        }
        unique
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(CoachError::Config("Database URL cannot be empty".to_string()));
        }

        if !url.starts_with("sqlite:") {
            return Err(CoachError::Config("Only SQLite databases are supported".to_string()));
        }

        Ok(())
    }

    /// Strip control characters (other than line breaks and tabs) and trim
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
