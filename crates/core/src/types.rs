//! Core domain types: survey families and the variant catalog.

use crate::error::SurveyError;
use serde::{Deserialize, Serialize};

/// A named group of interchangeable survey variants being counterbalanced
/// against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyFamily {
    Feedback,
    Poll,
    Employee,
}

impl SurveyFamily {
    /// All survey families, in rotation-slot order.
    pub const ALL: &'static [SurveyFamily] = &[Self::Feedback, Self::Poll, Self::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Poll => "poll",
            Self::Employee => "employee",
        }
    }

    /// Cookie name prefix for this family's assignment slot. The full
    /// cookie name is `{prefix}-{lang}`, one slot per (family, language).
    pub fn cookie_prefix(&self) -> &'static str {
        match self {
            Self::Feedback => "feedbackAssignment",
            Self::Poll => "pollAssignment",
            Self::Employee => "employeeSurveyAssignment",
        }
    }

    /// Zero-based slot index into per-family arrays (rotation cursors).
    pub(crate) fn slot(&self) -> usize {
        match self {
            Self::Feedback => 0,
            Self::Poll => 1,
            Self::Employee => 2,
        }
    }
}

impl std::fmt::Display for SurveyFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered variant lists per family. Immutable after construction; every
/// list must be non-empty.
#[derive(Debug, Clone)]
pub struct SurveyCatalog {
    variants: [Vec<String>; 3],
}

impl SurveyCatalog {
    pub fn new(
        feedback: Vec<String>,
        poll: Vec<String>,
        employee: Vec<String>,
    ) -> Result<Self, SurveyError> {
        let variants = [feedback, poll, employee];
        for (family, list) in SurveyFamily::ALL.iter().zip(&variants) {
            if list.is_empty() {
                return Err(SurveyError::Catalog(format!(
                    "variant list for family `{family}` must not be empty"
                )));
            }
        }
        Ok(Self { variants })
    }

    /// The ordered variant list for a family.
    pub fn variants(&self, family: SurveyFamily) -> &[String] {
        &self.variants[family.slot()]
    }

    /// Whether `variant` is one of the configured variants for `family`.
    pub fn contains(&self, family: SurveyFamily, variant: &str) -> bool {
        self.variants(family).iter().any(|v| v == variant)
    }
}

impl Default for SurveyCatalog {
    fn default() -> Self {
        Self {
            variants: [
                vec![
                    "customer-feedback-a".to_string(),
                    "customer-feedback-b".to_string(),
                ],
                vec![
                    "new-feature-poll-a".to_string(),
                    "new-feature-poll-b".to_string(),
                ],
                vec![
                    "employee-satisfaction-a".to_string(),
                    "employee-satisfaction-b".to_string(),
                ],
            ],
        }
    }
}
