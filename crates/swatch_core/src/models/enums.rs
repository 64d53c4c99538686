//! Core enums used throughout the application.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a swatch is split across renderer invocations.
///
/// `Mono` produces a single combined model. `Manual` and `Mmu` both produce
/// separate body and label models; they differ only in the parameters the
/// renderer receives, not in orchestration shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrintMode {
    /// Single combined render with an engraved label.
    Mono,
    /// Body and label rendered separately for manual filament swaps.
    Manual,
    /// Body and label rendered separately for a multi-material unit.
    #[default]
    #[serde(rename = "MMU")]
    Mmu,
}

impl PrintMode {
    /// Renderer-facing label for this mode.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mono => "Mono",
            Self::Manual => "Manual",
            Self::Mmu => "MMU",
        }
    }

    /// Number of renderer invocations a job in this mode issues.
    pub fn invocations(&self) -> usize {
        if self.is_split() {
            2
        } else {
            1
        }
    }

    /// Whether body and label are rendered as separate models.
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Manual | Self::Mmu)
    }
}

impl fmt::Display for PrintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Error returned when a print mode name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown print mode '{0}'; valid modes: Mono, Manual, MMU")]
pub struct ParsePrintModeError(String);

impl FromStr for PrintMode {
    type Err = ParsePrintModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mono" => Ok(Self::Mono),
            "manual" => Ok(Self::Manual),
            "mmu" => Ok(Self::Mmu),
            _ => Err(ParsePrintModeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("mmu".parse::<PrintMode>().unwrap(), PrintMode::Mmu);
        assert_eq!("MONO".parse::<PrintMode>().unwrap(), PrintMode::Mono);
        assert_eq!("Manual".parse::<PrintMode>().unwrap(), PrintMode::Manual);
        assert!("duo".parse::<PrintMode>().is_err());
    }

    #[test]
    fn invocation_counts_match_mode() {
        assert_eq!(PrintMode::Mono.invocations(), 1);
        assert_eq!(PrintMode::Manual.invocations(), 2);
        assert_eq!(PrintMode::Mmu.invocations(), 2);
    }

    #[test]
    fn labels_keep_renderer_spelling() {
        assert_eq!(PrintMode::Mmu.to_string(), "MMU");
        assert_eq!(PrintMode::Mono.to_string(), "Mono");
    }
}
