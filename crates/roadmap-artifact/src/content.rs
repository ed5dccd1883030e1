//! Generated roadmap content
//!
//! [`GeneratedContent`] is the normalized form of the language model's JSON
//! document: a fixed set of narrative fields and two recommendation lists.
//! Normalization is total. Whatever shape the inbound document has, every
//! narrative field ends up with either real text or its placeholder, and
//! every list ends up as a (possibly empty) vector.

use crate::lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Narrative (free-text) sections of a roadmap, in render order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NarrativeField {
    ExecutiveSummary,
    CreditAssessment,
    Strengths,
    RiskFactors,
    ActionPlan90Days,
    LongTermStrategy,
    ClosingNotes,
}

impl NarrativeField {
    /// All narrative fields in render order
    pub const ALL: [NarrativeField; 7] = [
        NarrativeField::ExecutiveSummary,
        NarrativeField::CreditAssessment,
        NarrativeField::Strengths,
        NarrativeField::RiskFactors,
        NarrativeField::ActionPlan90Days,
        NarrativeField::LongTermStrategy,
        NarrativeField::ClosingNotes,
    ];

    /// Wire (JSON) key
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "executiveSummary",
            Self::CreditAssessment => "creditAssessment",
            Self::Strengths => "strengths",
            Self::RiskFactors => "riskFactors",
            Self::ActionPlan90Days => "actionPlan90Days",
            Self::LongTermStrategy => "longTermStrategy",
            Self::ClosingNotes => "closingNotes",
        }
    }

    /// Section heading
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "Executive Summary",
            Self::CreditAssessment => "Credit Assessment",
            Self::Strengths => "Strengths",
            Self::RiskFactors => "Risk Factors",
            Self::ActionPlan90Days => "90-Day Action Plan",
            Self::LongTermStrategy => "Long-Term Strategy",
            Self::ClosingNotes => "Closing Notes",
        }
    }

    /// Text substituted when the generator omits or empties the field
    #[must_use]
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "Executive summary not available.",
            Self::CreditAssessment => "Credit assessment not available.",
            Self::Strengths => "Strengths not available.",
            Self::RiskFactors => "Risk factors not available.",
            Self::ActionPlan90Days => "90-day action plan not available.",
            Self::LongTermStrategy => "Long-term strategy not available.",
            Self::ClosingNotes => "Closing notes not available.",
        }
    }
}

/// The two recommendation lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecommendationList {
    Funding,
    CreditCards,
}

impl RecommendationList {
    /// Both lists in render order
    pub const ALL: [RecommendationList; 2] =
        [RecommendationList::Funding, RecommendationList::CreditCards];

    /// Wire (JSON) key
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Funding => "fundingRecommendations",
            Self::CreditCards => "creditCardRecommendations",
        }
    }

    /// Section heading
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Funding => "Funding Recommendations",
            Self::CreditCards => "Business Credit Card Recommendations",
        }
    }
}

/// Qualitative approval odds of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalOdds {
    High,
    Medium,
    Low,
    Unknown,
}

impl ApprovalOdds {
    /// Lenient parse of the generator's wording
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "strong" | "excellent" | "likely" => Self::High,
            "medium" | "moderate" | "fair" | "possible" => Self::Medium,
            "low" | "poor" | "weak" | "unlikely" => Self::Low,
            _ => Self::Unknown,
        }
    }

    /// Lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ApprovalOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder for a recommendation without a name
pub const UNNAMED_RECOMMENDATION: &str = "Unnamed option";
/// Placeholder for a recommendation without a rationale
pub const MISSING_RATIONALE: &str = "No rationale provided.";

/// One itemized recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Product or lender name
    pub name: String,
    /// Approval odds tier
    pub odds: ApprovalOdds,
    /// Why it fits this profile
    pub rationale: String,
    /// Declared display order (ascending)
    pub rank: u32,
}

impl Recommendation {
    /// Create a recommendation
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        odds: ApprovalOdds,
        rationale: impl Into<String>,
        rank: u32,
    ) -> Self {
        Self {
            name: name.into(),
            odds,
            rationale: rationale.into(),
            rank,
        }
    }

    fn from_value(value: &Value, position: usize) -> Self {
        let field = |key: &str| value.get(key).and_then(lenient::text_of);
        let rank = value
            .get("rank")
            .and_then(lenient::number_of)
            .filter(|r| *r >= 0.0 && *r <= f64::from(u32::MAX))
            // Truncation intended: ranks are small whole numbers.
            .map_or_else(|| u32::try_from(position).unwrap_or(u32::MAX), |r| r as u32);

        Self {
            name: field("name").unwrap_or_else(|| UNNAMED_RECOMMENDATION.to_string()),
            odds: field("odds")
                .or_else(|| field("approvalOdds"))
                .map_or(ApprovalOdds::Unknown, |o| ApprovalOdds::parse_lenient(&o)),
            rationale: field("rationale").unwrap_or_else(|| MISSING_RATIONALE.to_string()),
            rank,
        }
    }
}

/// Loosely-typed generator document, one optional slot per field
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContent {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    executive_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    credit_assessment: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    strengths: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    risk_factors: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    action_plan90_days: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    long_term_strategy: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    closing_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    funding_recommendations: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    credit_card_recommendations: Option<Vec<Value>>,
}

/// Normalized roadmap content
///
/// Deserialization goes through the lenient raw form, so any JSON object
/// (including one previously produced by `Serialize`) yields a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawContent")]
pub struct GeneratedContent {
    pub executive_summary: String,
    pub credit_assessment: String,
    pub strengths: String,
    pub risk_factors: String,
    #[serde(rename = "actionPlan90Days")]
    pub action_plan_90_days: String,
    pub long_term_strategy: String,
    pub closing_notes: String,
    pub funding_recommendations: Vec<Recommendation>,
    pub credit_card_recommendations: Vec<Recommendation>,
}

impl GeneratedContent {
    /// Content with every field at its default (placeholders, empty lists)
    #[must_use]
    pub fn placeholders() -> Self {
        Self::from(RawContent::default())
    }

    /// Normalize an arbitrary generator document
    ///
    /// Total: a non-object document yields [`GeneratedContent::placeholders`].
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value::<RawContent>(value)
            .map(Self::from)
            .unwrap_or_else(|_| Self::placeholders())
    }

    /// Text of a narrative field
    #[must_use]
    pub fn narrative(&self, field: NarrativeField) -> &str {
        match field {
            NarrativeField::ExecutiveSummary => &self.executive_summary,
            NarrativeField::CreditAssessment => &self.credit_assessment,
            NarrativeField::Strengths => &self.strengths,
            NarrativeField::RiskFactors => &self.risk_factors,
            NarrativeField::ActionPlan90Days => &self.action_plan_90_days,
            NarrativeField::LongTermStrategy => &self.long_term_strategy,
            NarrativeField::ClosingNotes => &self.closing_notes,
        }
    }

    /// Whether a narrative field holds no real text
    #[must_use]
    pub fn is_placeholder(&self, field: NarrativeField) -> bool {
        let text = self.narrative(field).trim();
        text.is_empty() || text == field.placeholder()
    }

    /// Items of a recommendation list, as stored (unsorted)
    #[must_use]
    pub fn recommendations(&self, list: RecommendationList) -> &[Recommendation] {
        match list {
            RecommendationList::Funding => &self.funding_recommendations,
            RecommendationList::CreditCards => &self.credit_card_recommendations,
        }
    }
}

impl Default for GeneratedContent {
    fn default() -> Self {
        Self::placeholders()
    }
}

impl From<RawContent> for GeneratedContent {
    fn from(raw: RawContent) -> Self {
        let text = |value: Option<String>, field: NarrativeField| {
            value.unwrap_or_else(|| field.placeholder().to_string())
        };
        let list = |items: Option<Vec<Value>>| {
            items
                .unwrap_or_default()
                .iter()
                .enumerate()
                .filter(|(_, item)| item.is_object())
                .map(|(position, item)| Recommendation::from_value(item, position))
                .collect()
        };

        Self {
            executive_summary: text(raw.executive_summary, NarrativeField::ExecutiveSummary),
            credit_assessment: text(raw.credit_assessment, NarrativeField::CreditAssessment),
            strengths: text(raw.strengths, NarrativeField::Strengths),
            risk_factors: text(raw.risk_factors, NarrativeField::RiskFactors),
            action_plan_90_days: text(raw.action_plan90_days, NarrativeField::ActionPlan90Days),
            long_term_strategy: text(raw.long_term_strategy, NarrativeField::LongTermStrategy),
            closing_notes: text(raw.closing_notes, NarrativeField::ClosingNotes),
            funding_recommendations: list(raw.funding_recommendations),
            credit_card_recommendations: list(raw.credit_card_recommendations),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_get_placeholders() {
        let content = GeneratedContent::from_value(json!({
            "executiveSummary": "Solid footing.",
            "strengths": "",
            "riskFactors": 42,
        }));

        assert_eq!(content.executive_summary, "Solid footing.");
        assert!(!content.is_placeholder(NarrativeField::ExecutiveSummary));
        assert_eq!(content.strengths, NarrativeField::Strengths.placeholder());
        assert!(content.is_placeholder(NarrativeField::Strengths));
        // Numbers are kept as text rather than dropped.
        assert_eq!(content.risk_factors, "42");
        assert!(content.is_placeholder(NarrativeField::ClosingNotes));
        assert!(content.funding_recommendations.is_empty());
    }

    #[test]
    fn non_object_document_is_all_placeholders() {
        assert_eq!(
            GeneratedContent::from_value(json!("not an object")),
            GeneratedContent::placeholders()
        );
        assert_eq!(
            GeneratedContent::from_value(json!(null)),
            GeneratedContent::placeholders()
        );
    }

    #[test]
    fn recommendations_are_normalized() {
        let content = GeneratedContent::from_value(json!({
            "fundingRecommendations": [
                {"name": "SBA 7(a)", "odds": "Moderate", "rationale": "Two years in business", "rank": 2},
                {"name": "Equipment line", "odds": "HIGH"},
                "garbage entry",
                {"odds": "sideways", "rank": "1"},
            ],
            "creditCardRecommendations": {"not": "a list"},
        }));

        let funding = &content.funding_recommendations;
        assert_eq!(funding.len(), 3);
        assert_eq!(funding[0].odds, ApprovalOdds::Medium);
        assert_eq!(funding[0].rank, 2);
        assert_eq!(funding[1].odds, ApprovalOdds::High);
        assert_eq!(funding[1].rank, 1, "missing rank falls back to list position");
        assert_eq!(funding[1].rationale, MISSING_RATIONALE);
        assert_eq!(funding[2].name, UNNAMED_RECOMMENDATION);
        assert_eq!(funding[2].odds, ApprovalOdds::Unknown);
        assert_eq!(funding[2].rank, 1);
        assert!(content.credit_card_recommendations.is_empty());
    }

    #[test]
    fn serialized_content_deserializes_to_itself() {
        let content = GeneratedContent::from_value(json!({
            "executiveSummary": "Summary",
            "actionPlan90Days": "Open a net-30 account",
            "creditCardRecommendations": [
                {"name": "Ink Business", "odds": "low", "rationale": "Thin file", "rank": 0}
            ],
        }));

        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["actionPlan90Days"], "Open a net-30 account");
        let back: GeneratedContent = serde_json::from_value(json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn odds_parse_lenient() {
        assert_eq!(ApprovalOdds::parse_lenient(" Strong "), ApprovalOdds::High);
        assert_eq!(ApprovalOdds::parse_lenient("fair"), ApprovalOdds::Medium);
        assert_eq!(ApprovalOdds::parse_lenient("unlikely"), ApprovalOdds::Low);
        assert_eq!(ApprovalOdds::parse_lenient("?"), ApprovalOdds::Unknown);
    }
}
