//! Prompt synthesis for the external model.
//!
//! Every prompt opens with [`COACH_CONSTRAINT`] and closes with
//! [`NEVER_REWRITE_REMINDER`]. Both are compile-time constants; caller-supplied
//! text is only ever placed between them, inside delimited sections.

use std::fmt::Write as _;

use crate::models::{FocusArea, Intensity, StyleContext};
use crate::validation::InputValidator;

/// Genre used when a project has none
pub const DEFAULT_GENRE: &str = "General Fiction";

/// Focus line used when no focus areas were requested
pub const GENERAL_FOCUS: &str = "General prose craft";

/// Closing reminder present in every prompt
pub const NEVER_REWRITE_REMINDER: &str = "Remember: observe only, never rewrite.";

/// Delimiter fencing caller-supplied text
const FENCE: &str = "\"\"\"";

/// Persona and behavioral constraints, verbatim in every prompt
pub const COACH_CONSTRAINT: &str = "\
You are a prose coach for The Forge writing platform. Your role is to observe and comment on writing craft. You do NOT write prose, rewrite sentences, or generate story content under any circumstances.

Your responses must:
- Describe what you observe in the text (patterns, tendencies, effects)
- Ask questions that help the author think about their choices
- Reference specific craft principles (sentence rhythm, show vs. tell, pacing, word economy)
- Never provide a rewritten version of any sentence or passage
- Never complete an unfinished passage or fill in missing content
- Treat the author as the sole author of all prose

If the author explicitly asks you to rewrite something, respond: \"The Forge is designed to help you write better, not to write for you. Here's what I observe about this passage: [observation]\"";

/// Project grounding for a passage prompt
#[derive(Debug, Clone, Copy)]
pub struct ProjectContext<'a> {
    /// Project genre; [`DEFAULT_GENRE`] when absent
    pub genre: Option<&'a str>,
    /// Style settings
    pub style: &'a StyleContext,
}

/// Fixed instruction for each intensity
#[must_use]
pub const fn intensity_instruction(intensity: Intensity) -> &'static str {
    match intensity {
        Intensity::LightTouch => {
            "Identify the 1-2 most notable observations. Keep feedback brief and affirming."
        },
        Intensity::Standard => {
            "Identify 2-4 observations across the requested focus areas. Balance affirmation with constructive craft notes."
        },
        Intensity::DeepDive => {
            "Provide thorough analysis across all requested focus areas. Be specific about patterns and their effects on the reader experience."
        },
    }
}

/// Human-readable focus list, deduplicated in first-seen order
#[must_use]
pub fn focus_line(focus_areas: &[FocusArea]) -> String {
    let seen = InputValidator::dedupe_focus_areas(focus_areas);
    if seen.is_empty() {
        GENERAL_FOCUS.to_string()
    } else {
        seen.iter().map(FocusArea::label).collect::<Vec<_>>().join(", ")
    }
}

/// Build the passage-analysis prompt
#[must_use]
pub fn build_passage_prompt(
    passage: &str,
    project: ProjectContext<'_>,
    intensity: Intensity,
    focus_areas: &[FocusArea],
) -> String {
    let style = project.style;
    let mut prompt = String::with_capacity(COACH_CONSTRAINT.len() + passage.len() + 1024);

    prompt.push_str(COACH_CONSTRAINT);
    prompt.push_str("\n\nPASSAGE FOR ANALYSIS:\n");
    push_fenced(&mut prompt, passage);

    prompt.push_str("\n\nPROJECT CONTEXT:\n");
    let _ = writeln!(prompt, "- Genre: {}", genre_or_default(project.genre));
    let _ = writeln!(prompt, "- POV: {}", style.pov.label());
    let _ = writeln!(prompt, "- Tense: {}", style.tense.label());
    let _ = write!(prompt, "- Style register: {}", style.formality.label());
    for rule in &style.custom_rules {
        let _ = write!(prompt, "\n- House rule: {} (example: {})", rule.rule, rule.example);
    }

    let _ = write!(prompt, "\n\nFOCUS AREAS: {}", focus_line(focus_areas));
    let _ = write!(prompt, "\nINTENSITY: {}", intensity_instruction(intensity));

    prompt.push_str(
        "\n\nProvide your coaching observations. Structure your response as:\n\
         1. What you observe (2-3 sentences per focus area)\n\
         2. A craft question for the author to consider\n\
         3. One specific element this passage does well\n\n",
    );
    prompt.push_str(NEVER_REWRITE_REMINDER);
    prompt
}

/// Build the craft Q&A prompt
#[must_use]
pub fn build_craft_qa_prompt(
    title: &str,
    genre: Option<&str>,
    question: &str,
    context: Option<&str>,
) -> String {
    let mut prompt = String::with_capacity(COACH_CONSTRAINT.len() + question.len() + 512);

    prompt.push_str(COACH_CONSTRAINT);
    prompt.push_str("\n\nPROJECT CONTEXT:\n");
    let _ = writeln!(prompt, "- Genre: {}", genre_or_default(genre));
    let _ = write!(prompt, "- Title: {title}");

    prompt.push_str("\n\nAUTHOR'S QUESTION:\n");
    push_fenced(&mut prompt, question);

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nCONTEXT PASSAGE:\n");
        push_fenced(&mut prompt, context);
    }

    prompt.push_str(
        "\n\nProvide a thoughtful response that helps the author think about their craft. \
         Observe patterns, ask questions that promote thinking, and reference specific craft principles.\n\n",
    );
    prompt.push_str(NEVER_REWRITE_REMINDER);
    prompt
}

fn genre_or_default(genre: Option<&str>) -> &str {
    genre.map(str::trim).filter(|g| !g.is_empty()).unwrap_or(DEFAULT_GENRE)
}

/// Fence caller text so it cannot close the delimiter early
fn push_fenced(prompt: &mut String, text: &str) {
    let mut escaped = text.to_string();
    while escaped.contains(FENCE) {
        escaped = escaped.replace(FENCE, "\"\u{200B}\"\"");
    }

    prompt.push_str(FENCE);
    prompt.push('\n');
    prompt.push_str(&escaped);
    prompt.push('\n');
    prompt.push_str(FENCE);
}
