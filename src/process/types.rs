//! Process type definitions.
//!
//! This file contains the analysis levels the wrapped BIDS App is run at.

/// BIDS App analysis level, passed as the third positional argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisLevel {
    /// Per-subject processing
    Participant,
    /// Summaries across all participants in the output directory
    Group,
}

impl AnalysisLevel {
    /// Get the string representation of the analysis level
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisLevel::Participant => "participant",
            AnalysisLevel::Group => "group",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        assert_eq!(AnalysisLevel::Participant.as_str(), "participant");
        assert_eq!(AnalysisLevel::Group.as_str(), "group");
    }
}
