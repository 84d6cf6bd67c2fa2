//! Caption cue timing.

use serde::{Deserialize, Serialize};

/// One caption cue with a non-overlapping time range in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    /// Start time in milliseconds from the beginning of the clip
    pub start_ms: u64,

    /// End time in milliseconds
    pub end_ms: u64,

    /// Caption text
    pub text: String,
}

impl CaptionCue {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }

    /// Cue duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let cue = CaptionCue::new(1000, 3500, "hello");
        assert_eq!(cue.duration_ms(), 2500);
    }
}
