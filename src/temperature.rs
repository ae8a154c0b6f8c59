//! Prose temperature metrics.
//!
//! Quantitative style measurements derived from raw text. Analysis is total:
//! empty or malformed input yields an all-zero [`TemperatureMetrics`], never an
//! error. Passive voice and dialogue detection are pattern heuristics and are
//! reported as estimates.

use std::collections::HashSet;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Sentences shorter than this many words count as short
pub const SHORT_SENTENCE_WORDS: usize = 8;
/// Sentences longer than this many words count as long
pub const LONG_SENTENCE_WORDS: usize = 30;

/// Quantitative prose-style metrics for a block of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureMetrics {
    /// Whitespace-delimited tokens
    pub word_count: usize,
    /// Non-blank fragments between runs of `.`, `!`, `?`
    pub sentence_count: usize,
    /// Non-blank fragments between blank lines
    pub paragraph_count: usize,
    /// `word_count / sentence_count`
    pub avg_words_per_sentence: f64,
    /// Population standard deviation of per-sentence word counts
    pub sentence_length_variance: f64,
    /// Share of sentences under [`SHORT_SENTENCE_WORDS`] words
    pub short_sentence_ratio: f64,
    /// Share of sentences over [`LONG_SENTENCE_WORDS`] words
    pub long_sentence_ratio: f64,
    /// Approximate passive constructions per sentence (heuristic)
    pub passive_voice_estimate: f64,
    /// Approximate share of characters inside quoted spans (heuristic)
    pub dialogue_ratio: f64,
    /// `word_count / paragraph_count`
    pub avg_words_per_paragraph: f64,
    /// Distinct folded tokens over `word_count`
    pub unique_word_ratio: f64,
}

/// Analyzer holding the compiled patterns
pub struct TemperatureAnalyzer {
    sentence_regex: Regex,
    paragraph_regex: Regex,
    passive_regex: Regex,
    dialogue_regex: Regex,
}

impl TemperatureAnalyzer {
    /// Create a new analyzer
    pub fn new() -> Result<Self> {
        let sentence_regex = Regex::new(r"[.!?]+")
            .map_err(|e| anyhow::anyhow!("Failed to compile sentence regex: {e}"))?;
        let paragraph_regex = Regex::new(r"(?:\r?\n){2,}")
            .map_err(|e| anyhow::anyhow!("Failed to compile paragraph regex: {e}"))?;
        let passive_regex = Regex::new(r"(?i)\b(?:is|are|was|were|be|been|being)\s+\w+ed\b")
            .map_err(|e| anyhow::anyhow!("Failed to compile passive voice regex: {e}"))?;
        let dialogue_regex = Regex::new(r#""[^"\n]*"|'[^'\n]*'|“[^”\n]*”"#)
            .map_err(|e| anyhow::anyhow!("Failed to compile dialogue regex: {e}"))?;

        Ok(Self {
            sentence_regex,
            paragraph_regex,
            passive_regex,
            dialogue_regex,
        })
    }

    /// Compute metrics for `text`. Deterministic and infallible.
    #[must_use]
    pub fn analyze(&self, text: &str) -> TemperatureMetrics {
        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len();

        let sentence_lengths: Vec<usize> = self
            .sentence_regex
            .split(text)
            .filter(|s| !s.trim().is_empty())
            .map(word_count_of)
            .collect();
        let sentence_count = sentence_lengths.len();

        let paragraph_count = self
            .paragraph_regex
            .split(text)
            .filter(|p| !p.trim().is_empty())
            .count();

        let avg_words_per_sentence = ratio(word_count, sentence_count);
        let avg_words_per_paragraph = ratio(word_count, paragraph_count);

        let sentence_length_variance = if sentence_count == 0 {
            0.0
        } else {
            let squared: f64 = sentence_lengths
                .iter()
                .map(|&len| (len as f64 - avg_words_per_sentence).powi(2))
                .sum();
            (squared / sentence_count as f64).sqrt()
        };

        let short = sentence_lengths.iter().filter(|&&len| len < SHORT_SENTENCE_WORDS).count();
        let long = sentence_lengths.iter().filter(|&&len| len > LONG_SENTENCE_WORDS).count();

        let passive_matches = self.passive_regex.find_iter(text).count();

        let total_chars = text.chars().count();
        let dialogue_chars: usize = self
            .dialogue_regex
            .find_iter(text)
            .map(|m| m.as_str().chars().count())
            .sum();

        TemperatureMetrics {
            word_count,
            sentence_count,
            paragraph_count,
            avg_words_per_sentence,
            sentence_length_variance,
            short_sentence_ratio: ratio(short, sentence_count),
            long_sentence_ratio: ratio(long, sentence_count),
            passive_voice_estimate: ratio(passive_matches, sentence_count),
            dialogue_ratio: ratio(dialogue_chars, total_chars),
            avg_words_per_paragraph,
            unique_word_ratio: ratio(unique_words(&words), word_count),
        }
    }
}

/// Whitespace-delimited word count, the same tokenization used by `analyze`
#[must_use]
pub fn word_count_of(text: &str) -> usize {
    text.split_whitespace().count()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Distinct tokens after NFC folding, lowercasing and stripping non-alphanumerics
fn unique_words(words: &[&str]) -> usize {
    words
        .iter()
        .map(|w| {
            w.nfc()
                .flat_map(char::to_lowercase)
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> TemperatureAnalyzer {
        TemperatureAnalyzer::new().unwrap()
    }

    #[test]
    fn test_empty_text_is_all_zero() {
        assert_eq!(analyzer().analyze(""), TemperatureMetrics::default());
        assert_eq!(analyzer().analyze("   \n\n  "), TemperatureMetrics::default());
    }

    #[test]
    fn test_punctuation_only_has_no_sentences() {
        let m = analyzer().analyze("... !?");
        assert_eq!(m.sentence_count, 0);
        assert_eq!(m.word_count, 2);
        assert!(m.avg_words_per_sentence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_population_standard_deviation() {
        // Sentence lengths 2 and 6: mean 4, population sd 2.
        let m = analyzer().analyze("One two. One two three four five six.");
        assert_eq!(m.sentence_count, 2);
        assert!((m.avg_words_per_sentence - 4.0).abs() < 1e-9);
        assert!((m.sentence_length_variance - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_passive_heuristic_is_case_insensitive() {
        let m = analyzer().analyze("The door WAS opened. It is finished.");
        assert!((m.passive_voice_estimate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dialogue_spans_include_quotes() {
        let text = r#"He said "hi" there"#;
        let m = analyzer().analyze(text);
        let expected = 4.0 / text.chars().count() as f64;
        assert!((m.dialogue_ratio - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unique_words_fold_case_and_punctuation() {
        let m = analyzer().analyze("Rain, rain RAIN! -- go");
        assert_eq!(m.word_count, 5);
        // "rain" and "go" survive; "--" folds to nothing.
        assert!((m.unique_word_ratio - 2.0 / 5.0).abs() < 1e-9);
    }
}
