//! Core types for the roadmap service
//!
//! Defines:
//! - the quota limit and the [`Tool`] enum the limit is keyed on
//! - [`ToolkitGroup`] labels (with the legacy alias table)
//! - [`ReportId`]
//! - [`CoreConfig`]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use ulid::Ulid;

/// Successful generations allowed per (identity, tool)
pub const USAGE_LIMIT: u32 = 30;

/// Legacy toolkit labels, as `(current, legacy)` pairs
///
/// Listing the current label also returns rows saved under the legacy one.
pub const LEGACY_TOOLKIT_ALIASES: &[(&str, &str)] = &[("business-credit", "credit-roadmap")];

/// Generation tools; each has its own usage counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tool {
    /// Business credit roadmap
    #[serde(rename = "business-credit")]
    BusinessCredit,
    /// Funding readiness roadmap
    #[serde(rename = "funding-readiness")]
    FundingReadiness,
}

impl Tool {
    /// All tools
    pub const ALL: [Tool; 2] = [Tool::BusinessCredit, Tool::FundingReadiness];

    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Tool::BusinessCredit => "business-credit",
            Tool::FundingReadiness => "funding-readiness",
        }
    }

    /// Toolkit group reports from this tool are saved under by default
    #[must_use]
    pub fn default_toolkit(self) -> ToolkitGroup {
        ToolkitGroup(self.as_str().to_string())
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// Tool name that is not one of [`Tool::ALL`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: '{0}'")]
pub struct UnknownTool(pub String);

/// Logical partition label for saved reports
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ToolkitGroup(String);

impl ToolkitGroup {
    /// Maximum label length
    pub const MAX_LEN: usize = 64;

    /// Parse a label: trimmed, lowercased, 1..=64 of `[a-z0-9_-]`
    ///
    /// # Errors
    /// Returns error if the label is empty, too long, or has other characters
    pub fn parse(raw: &str) -> Result<Self, InvalidToolkit> {
        let label = raw.trim().to_ascii_lowercase();
        let valid = !label.is_empty()
            && label.len() <= Self::MAX_LEN
            && label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(label))
        } else {
            Err(InvalidToolkit(raw.to_string()))
        }
    }

    /// Label text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Groups to match when listing this one: itself plus any legacy aliases
    #[must_use]
    pub fn with_legacy_aliases(&self) -> Vec<ToolkitGroup> {
        let mut groups = vec![self.clone()];
        groups.extend(
            LEGACY_TOOLKIT_ALIASES
                .iter()
                .filter(|(current, _)| *current == self.0)
                .map(|(_, legacy)| ToolkitGroup((*legacy).to_string())),
        );
        groups
    }
}

impl fmt::Display for ToolkitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Toolkit label that failed [`ToolkitGroup::parse`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid toolkit: '{0}'")]
pub struct InvalidToolkit(pub String);

/// Unique report identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Ulid);

impl ReportId {
    /// Generate new report ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReportId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim()).map(Self)
    }
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Upper bound on one external generation call, in seconds
    pub generation_timeout_secs: u64,
}

impl CoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With generation timeout
    #[inline]
    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Generation timeout as a duration
    #[inline]
    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: 90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_round_trips_wire_names() {
        for tool in Tool::ALL {
            assert_eq!(tool.as_str().parse::<Tool>().unwrap(), tool);
            let json = serde_json::to_string(&tool).unwrap();
            assert_eq!(json, format!("\"{}\"", tool.as_str()));
        }
        assert_eq!("bogus".parse::<Tool>(), Err(UnknownTool("bogus".to_string())));
    }

    #[test]
    fn toolkit_parse_normalizes() {
        let group = ToolkitGroup::parse("  Business-Credit ").unwrap();
        assert_eq!(group.as_str(), "business-credit");
        assert!(ToolkitGroup::parse("").is_err());
        assert!(ToolkitGroup::parse("has space").is_err());
        assert!(ToolkitGroup::parse(&"x".repeat(65)).is_err());
    }

    #[test]
    fn legacy_alias_expands_current_tag_only() {
        let current = ToolkitGroup::parse("business-credit").unwrap();
        let names: Vec<_> = current
            .with_legacy_aliases()
            .iter()
            .map(|g| g.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["business-credit", "credit-roadmap"]);

        // The alias is one-way: asking for the legacy tag does not pull in the current one.
        let legacy = ToolkitGroup::parse("credit-roadmap").unwrap();
        assert_eq!(legacy.with_legacy_aliases(), vec![legacy.clone()]);

        let other = ToolkitGroup::parse("funding-readiness").unwrap();
        assert_eq!(other.with_legacy_aliases().len(), 1);
    }

    #[test]
    fn report_id_parse() {
        let id = ReportId::new();
        assert_eq!(id.to_string().parse::<ReportId>().unwrap(), id);
        assert!("not-a-ulid".parse::<ReportId>().is_err());
    }

    #[test]
    fn core_config_builder() {
        let config = CoreConfig::new().with_generation_timeout(Duration::from_millis(10));
        assert_eq!(config.generation_timeout(), Duration::from_secs(1));
        assert_eq!(CoreConfig::default().generation_timeout_secs, 90);
    }
}
