use serde::{Deserialize, Serialize};

const MIN_LEN: usize = 100;
const SUBSTANTIAL_LEN: usize = 500;
const STRUCTURAL_MARKERS: [&str; 5] = ["<html", "<body", "<div", "<p", "<span"];

/// Thresholds and markers used by [`ContentValidator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Unstructured content shorter than this is a stub.
    pub min_len: usize,
    /// Content longer than this is accepted without further checks.
    pub substantial_len: usize,
    /// Case-insensitive substrings that mark well-formed content.
    pub markers: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_len: MIN_LEN,
            substantial_len: SUBSTANTIAL_LEN,
            markers: STRUCTURAL_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Why a candidate was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Substantial,
    Structured,
    Empty,
    TooShort,
    Unstructured,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Substantial | Self::Structured)
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::Substantial => "substantial",
            Self::Structured => "structured",
            Self::Empty => "empty",
            Self::TooShort => "too short",
            Self::Unstructured => "no structure",
        }
    }
}

/// Decides whether fetched content is usable.
///
/// Length is counted in characters on the trimmed candidate:
/// - empty is rejected
/// - longer than `substantial_len` is accepted
/// - anything containing a structural marker is accepted, whatever its length
/// - shorter than `min_len` is rejected as a stub
/// - the unstructured band in between is rejected too
#[derive(Debug, Clone)]
pub struct ContentValidator {
    config: ValidatorConfig,
    markers_lower: Vec<String>,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl ContentValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let markers_lower = config
            .markers
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| m.to_lowercase())
            .collect();
        Self {
            config,
            markers_lower,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        self.check(candidate).is_accepted()
    }

    pub fn check(&self, candidate: &str) -> Verdict {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Verdict::Empty;
        }

        let chars = trimmed.chars().count();
        if chars > self.config.substantial_len {
            return Verdict::Substantial;
        }

        if self.has_marker(trimmed) {
            return Verdict::Structured;
        }

        if chars < self.config.min_len {
            Verdict::TooShort
        } else {
            Verdict::Unstructured
        }
    }

    fn has_marker(&self, trimmed: &str) -> bool {
        if self.markers_lower.is_empty() {
            return false;
        }
        let lower = trimmed.to_lowercase();
        self.markers_lower.iter().any(|m| lower.contains(m.as_str()))
    }
}
