//! Cache key derivation.
//!
//! Paraphrased questions that differ only in a leading interrogative stem,
//! trailing question marks or spacing collapse onto one key. The key also
//! carries a coarse risk bucket so advice for different kidney function
//! levels is never shared.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static LEADING_STEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:what|how|can|should|my|i|do|am)\s+").expect("valid stem regex"));

static TRAILING_QUESTION_MARKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\?+$").expect("valid question mark regex"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Coarse classification of the eGFR metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBucket {
    /// eGFR >= 90
    Healthy,
    /// 60 <= eGFR < 90
    Stage2,
    /// eGFR < 60
    Advanced,
    /// No usable metric
    Unknown,
}

impl RiskBucket {
    pub fn from_metric(metric: Option<f64>) -> Self {
        match metric {
            Some(v) if !v.is_finite() => Self::Unknown,
            Some(v) if v >= 90.0 => Self::Healthy,
            Some(v) if v >= 60.0 => Self::Stage2,
            Some(_) => Self::Advanced,
            None => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Stage2 => "stage2",
            Self::Advanced => "advanced",
            Self::Unknown => "unknown",
        }
    }

    /// Kidney function still good enough for the less restrictive advice
    pub fn has_preserved_function(&self) -> bool {
        matches!(self, Self::Healthy | Self::Stage2)
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical question text, without the bucket suffix
pub fn canonical_text(message: &str) -> String {
    let lowered = message.to_lowercase();
    let mut text = lowered.trim();

    while let Some(found) = LEADING_STEM.find(text) {
        text = &text[found.end()..];
    }

    let text = TRAILING_QUESTION_MARKS.replace(text, "");
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

/// Derive the cache key for `message` under the given risk metric.
///
/// `"What should I eat?"` with an eGFR of 78 becomes `"eat::stage2"`.
pub fn normalize(message: &str, metric: Option<f64>) -> String {
    format!(
        "{}::{}",
        canonical_text(message),
        RiskBucket::from_metric(metric)
    )
}
