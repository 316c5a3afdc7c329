//! Verbosity signals inferred from feedback comments
//!
//! A comment may carry one of three directional signals about how detailed
//! grading feedback should be. When a comment mixes signals the phrase that
//! appears last wins and the reading is marked as conflicting.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::FeedbackLevel;

/// Directional verbosity need expressed in a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerbositySignal {
    /// Wants less output
    TooDetailed,
    /// Wants more output
    MoreDetail,
    /// Finds the tone too severe
    TooHarsh,
}

impl std::fmt::Display for VerbositySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerbositySignal::TooDetailed => write!(f, "too_detailed"),
            VerbositySignal::MoreDetail => write!(f, "more_detail"),
            VerbositySignal::TooHarsh => write!(f, "too_harsh"),
        }
    }
}

impl VerbositySignal {
    /// Level after one step in this signal's direction
    pub fn apply(self, level: FeedbackLevel) -> FeedbackLevel {
        match self {
            VerbositySignal::TooDetailed => level.less_detailed(),
            VerbositySignal::MoreDetail => level.more_detailed(),
            VerbositySignal::TooHarsh => match level {
                FeedbackLevel::Minimal => FeedbackLevel::Standard,
                FeedbackLevel::Standard => FeedbackLevel::Standard,
                other => other.less_detailed(),
            },
        }
    }
}

// Longer phrases first so "more detailed" is not read as "more detail" + "ed"
static VERBOSITY_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(not enough detail|more detailed|more detail|explain more|too detailed|too long|too verbose|less detail|too harsh|too strict|too critical)",
    )
    .expect("Valid verbosity phrase regex")
});

fn classify(phrase: &str) -> Option<VerbositySignal> {
    match phrase.to_ascii_lowercase().as_str() {
        "too detailed" | "too long" | "too verbose" | "less detail" => {
            Some(VerbositySignal::TooDetailed)
        }
        "more detail" | "more detailed" | "explain more" | "not enough detail" => {
            Some(VerbositySignal::MoreDetail)
        }
        "too harsh" | "too strict" | "too critical" => Some(VerbositySignal::TooHarsh),
        _ => None,
    }
}

/// What a single comment says about verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerbosityReading {
    /// Signal of the last matching phrase
    pub signal: Option<VerbositySignal>,
    /// More than one distinct signal appeared
    pub conflicting: bool,
}

/// Read the verbosity signal of a comment
///
/// Mixed signals resolve to the one whose phrase appears last.
pub fn read_verbosity(comment: &str) -> VerbosityReading {
    let signals: Vec<VerbositySignal> = VERBOSITY_PHRASES
        .find_iter(comment)
        .filter_map(|m| classify(m.as_str()))
        .collect();

    let conflicting = signals.iter().any(|s| Some(s) != signals.last());
    VerbosityReading {
        signal: signals.last().copied(),
        conflicting,
    }
}

/// Most frequent signal among `votes`; ties go to the most recent
pub fn majority(votes: &VecDeque<VerbositySignal>) -> Option<VerbositySignal> {
    let count = |signal: VerbositySignal| votes.iter().filter(|v| **v == signal).count();
    let best = votes.iter().map(|v| count(*v)).max()?;
    votes.iter().rev().copied().find(|v| count(*v) == best)
}
