//! Business profile submitted with a generation request
//!
//! The profile is the only caller input that flows into a rendered report,
//! so validation reports every problem at once instead of stopping at the
//! first.

use crate::lenient;
use serde::{Deserialize, Serialize};

/// Lowest accepted personal credit score
pub const MIN_PERSONAL_SCORE: f64 = 300.0;
/// Highest accepted personal credit score
pub const MAX_PERSONAL_SCORE: f64 = 850.0;
/// Highest accepted business credit score (Paydex-style 0..=100)
pub const MAX_BUSINESS_SCORE: f64 = 100.0;

/// Structured business profile
///
/// Unknown fields are ignored. Numeric fields accept JSON numbers or numeric
/// strings as submitted by web forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    /// Legal or trading name (required)
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub business_name: Option<String>,
    /// Industry / sector
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub industry: Option<String>,
    /// Entity type (LLC, S-Corp, sole proprietor, ...)
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub entity_type: Option<String>,
    /// State of registration
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub state: Option<String>,
    /// Years in business
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub years_in_business: Option<f64>,
    /// Owner's personal credit score (required, 300..=850)
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub personal_credit_score: Option<f64>,
    /// Business credit score (0..=100)
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub business_credit_score: Option<f64>,
    /// Annual revenue in dollars
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub annual_revenue: Option<f64>,
    /// Monthly revenue in dollars
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub monthly_revenue: Option<f64>,
    /// Outstanding debt in dollars
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub existing_debt: Option<f64>,
    /// Amount of funding sought in dollars
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub funding_goal: Option<f64>,
    /// What the funding is for
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub funding_purpose: Option<String>,
}

impl BusinessProfile {
    /// Create a profile with the two required fields
    #[must_use]
    pub fn new(business_name: impl Into<String>, personal_credit_score: f64) -> Self {
        Self {
            business_name: Some(business_name.into()),
            personal_credit_score: Some(personal_credit_score),
            ..Self::default()
        }
    }

    /// Check required fields and numeric ranges
    ///
    /// # Errors
    /// Returns every offending field in one [`ProfileError`]
    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut issues = Vec::new();

        if self.business_name.is_none() {
            issues.push(FieldIssue::new("businessName", "is required"));
        }
        match self.personal_credit_score {
            None => issues.push(FieldIssue::new("personalCreditScore", "is required")),
            Some(score) if !(MIN_PERSONAL_SCORE..=MAX_PERSONAL_SCORE).contains(&score) => {
                issues.push(FieldIssue::new(
                    "personalCreditScore",
                    "must be between 300 and 850",
                ));
            }
            Some(_) => {}
        }
        if let Some(score) = self.business_credit_score {
            if !(0.0..=MAX_BUSINESS_SCORE).contains(&score) {
                issues.push(FieldIssue::new(
                    "businessCreditScore",
                    "must be between 0 and 100",
                ));
            }
        }

        let non_negative = [
            ("yearsInBusiness", self.years_in_business),
            ("annualRevenue", self.annual_revenue),
            ("monthlyRevenue", self.monthly_revenue),
            ("existingDebt", self.existing_debt),
            ("fundingGoal", self.funding_goal),
        ];
        for (field, value) in non_negative {
            if value.is_some_and(|v| v < 0.0) {
                issues.push(FieldIssue::new(field, "must not be negative"));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ProfileError::Invalid { issues })
        }
    }

    /// Display name used in report titles
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.business_name.as_deref().unwrap_or("Unnamed business")
    }
}

/// One invalid or missing profile field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Wire name of the field
    pub field: &'static str,
    /// What is wrong with it
    pub reason: &'static str,
}

impl FieldIssue {
    /// Create a new field issue
    #[inline]
    #[must_use]
    pub const fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

/// Profile validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfileError {
    /// One or more fields are missing or out of range
    #[error("invalid profile: {}", describe(.issues))]
    Invalid { issues: Vec<FieldIssue> },
}

impl ProfileError {
    /// Offending fields
    #[must_use]
    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            Self::Invalid { issues } => issues,
        }
    }
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{} {}", i.field, i.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
