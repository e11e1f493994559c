//! Review attempt domain type

use serde::{Deserialize, Serialize};

/// A single submitted-and-graded lesson reported by the review server
///
/// Read once to build a notification and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAttempt {
    pub lesson_title: String,

    /// Lesson page path, relative to the site origin (e.g. "/lessons/99/")
    pub lesson_url: String,

    /// Whether the reviewer sent the work back for fixes
    pub is_negative: bool,
}

impl ReviewAttempt {
    pub fn verdict(&self) -> Verdict {
        if self.is_negative {
            Verdict::Rejected
        } else {
            Verdict::Accepted
        }
    }
}

/// Outcome of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Accepted => write!(f, "accepted"),
            Verdict::Rejected => write!(f, "rejected"),
        }
    }
}
