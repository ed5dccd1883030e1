//! Deterministic HTML rendering
//!
//! [`render`] is a pure function of `(profile, content)`. The same inputs
//! produce byte-identical output in every process and at every call site
//! (live generation, cache restore, export regeneration), which is what keeps
//! stored checksums valid.
//!
//! Output never contains wall-clock time, random identifiers, or anything
//! that depends on hash-map iteration. Recommendation lists are sorted by
//! their declared rank before rendering.

use crate::checksum::Checksum;
use crate::content::{GeneratedContent, NarrativeField, Recommendation, RecommendationList};
use crate::profile::BusinessProfile;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Bumped whenever the markup changes; stored HTML keeps the version it was
/// rendered with.
pub const RENDER_VERSION: u32 = 1;

/// Rendered HTML with its checksum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedHtml {
    /// Canonical HTML fragment
    pub html: String,
    /// Checksum of `html`
    pub checksum: Checksum,
}

impl RenderedHtml {
    /// Render and checksum in one step
    #[must_use]
    pub fn new(profile: &BusinessProfile, content: &GeneratedContent) -> Self {
        let html = render(profile, content);
        let checksum = Checksum::of(&html);
        Self { html, checksum }
    }
}

/// Render a roadmap to canonical HTML
#[must_use]
pub fn render(profile: &BusinessProfile, content: &GeneratedContent) -> String {
    let mut out = String::with_capacity(8 * 1024);

    let _ = writeln!(
        out,
        "<article class=\"credit-roadmap\" data-render-version=\"{RENDER_VERSION}\">"
    );
    render_header(&mut out, profile);

    for field in NarrativeField::ALL {
        render_narrative(&mut out, content, field);
    }
    for list in RecommendationList::ALL {
        render_recommendations(&mut out, list, content.recommendations(list));
    }

    out.push_str("</article>\n");
    out
}

fn render_header(out: &mut String, profile: &BusinessProfile) {
    out.push_str("<header class=\"roadmap-header\">\n");
    let _ = writeln!(
        out,
        "<h1>Credit Roadmap: {}</h1>",
        escape(profile.display_name())
    );

    let facts = profile_facts(profile);
    if !facts.is_empty() {
        out.push_str("<dl class=\"profile-facts\">\n");
        for (label, value) in facts {
            let _ = writeln!(out, "<dt>{label}</dt><dd>{}</dd>", escape(&value));
        }
        out.push_str("</dl>\n");
    }
    out.push_str("</header>\n");
}

fn profile_facts(profile: &BusinessProfile) -> Vec<(&'static str, String)> {
    let mut facts = Vec::new();
    let mut text = |label, value: &Option<String>| {
        if let Some(v) = value {
            facts.push((label, v.clone()));
        }
    };
    text("Industry", &profile.industry);
    text("Entity Type", &profile.entity_type);
    text("State", &profile.state);

    let numbers: [(&'static str, Option<f64>, fn(f64) -> String); 7] = [
        ("Years in Business", profile.years_in_business, format_years),
        ("Personal Credit Score", profile.personal_credit_score, format_score),
        ("Business Credit Score", profile.business_credit_score, format_score),
        ("Annual Revenue", profile.annual_revenue, format_currency),
        ("Monthly Revenue", profile.monthly_revenue, format_currency),
        ("Existing Debt", profile.existing_debt, format_currency),
        ("Funding Goal", profile.funding_goal, format_currency),
    ];
    for (label, value, format) in numbers {
        if let Some(v) = value {
            facts.push((label, format(v)));
        }
    }
    if let Some(purpose) = &profile.funding_purpose {
        facts.push(("Funding Purpose", purpose.clone()));
    }
    facts
}

fn render_narrative(out: &mut String, content: &GeneratedContent, field: NarrativeField) {
    let _ = writeln!(
        out,
        "<section class=\"narrative\" data-field=\"{}\">",
        field.key()
    );
    let _ = writeln!(out, "<h2>{}</h2>", field.title());

    if content.is_placeholder(field) {
        let _ = writeln!(
            out,
            "<p class=\"placeholder\" data-field=\"{}\">{}</p>",
            field.key(),
            escape(field.placeholder())
        );
    } else {
        for paragraph in paragraphs(content.narrative(field)) {
            let _ = writeln!(out, "<p>{paragraph}</p>");
        }
    }
    out.push_str("</section>\n");
}

fn render_recommendations(out: &mut String, list: RecommendationList, items: &[Recommendation]) {
    if items.is_empty() {
        return;
    }

    let _ = writeln!(
        out,
        "<section class=\"recommendations\" data-list=\"{}\">",
        list.key()
    );
    let _ = writeln!(out, "<h2>{}</h2>", list.title());
    out.push_str("<ol>\n");
    for item in sorted(items) {
        let _ = writeln!(
            out,
            "<li class=\"recommendation odds-{odds}\"><h3>{name}</h3><span class=\"odds\">{odds} approval odds</span><p>{rationale}</p></li>",
            odds = item.odds,
            name = escape(&item.name),
            rationale = escape(&item.rationale),
        );
    }
    out.push_str("</ol>\n</section>\n");
}

/// Recommendations in declared order; ties broken on every remaining field
/// so the result never depends on insertion order.
#[must_use]
pub fn sorted(items: &[Recommendation]) -> Vec<&Recommendation> {
    let mut sorted: Vec<&Recommendation> = items.iter().collect();
    sorted.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.odds.cmp(&b.odds))
            .then_with(|| a.rationale.cmp(&b.rationale))
    });
    sorted
}

/// Split narrative text on blank lines; single newlines become `<br>`.
/// Returned paragraphs are already escaped.
fn paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.lines()
                .map(|line| escape(line.trim()))
                .collect::<Vec<_>>()
                .join("<br>")
        })
        .collect()
}

/// Escape text for HTML element and attribute context
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whole dollars with thousands separators, e.g. `$1,234,567`
#[must_use]
pub fn format_currency(value: f64) -> String {
    // Rounded to whole dollars; precision beyond i64 is not meaningful here.
    #[allow(clippy::cast_possible_truncation)]
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

fn format_score(value: f64) -> String {
    format!("{value:.0}")
}

fn format_years(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ApprovalOdds;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile() -> BusinessProfile {
        let mut profile = BusinessProfile::new("Acme & Sons", 712.0);
        profile.industry = Some("Construction".to_string());
        profile.annual_revenue = Some(480_000.0);
        profile.years_in_business = Some(2.5);
        profile
    }

    fn content() -> GeneratedContent {
        GeneratedContent::from_value(json!({
            "executiveSummary": "First paragraph.\n\nSecond <b>paragraph</b>.",
            "fundingRecommendations": [
                {"name": "B", "odds": "low", "rationale": "r", "rank": 2},
                {"name": "A", "odds": "high", "rationale": "r", "rank": 1},
            ],
        }))
    }

    #[test]
    fn render_is_deterministic() {
        assert_eq!(render(&profile(), &content()), render(&profile(), &content()));
        assert_eq!(
            RenderedHtml::new(&profile(), &content()),
            RenderedHtml::new(&profile(), &content())
        );
    }

    #[test]
    fn render_escapes_text() {
        let html = render(&profile(), &content());
        assert!(html.contains("<h1>Credit Roadmap: Acme &amp; Sons</h1>"));
        assert!(html.contains("<p>Second &lt;b&gt;paragraph&lt;/b&gt;.</p>"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn render_sorts_by_rank_not_insertion_order() {
        let html = render(&profile(), &content());
        let a = html.find("<h3>A</h3>").unwrap();
        let b = html.find("<h3>B</h3>").unwrap();
        assert!(a < b);

        let mut reversed = content();
        reversed.funding_recommendations.reverse();
        assert_eq!(render(&profile(), &reversed), html);
    }

    #[test]
    fn empty_lists_are_omitted() {
        let html = render(&profile(), &content());
        assert!(html.contains("data-list=\"fundingRecommendations\""));
        assert!(!html.contains("data-list=\"creditCardRecommendations\""));
    }

    #[test]
    fn placeholders_render_as_markers() {
        let html = render(&BusinessProfile::default(), &GeneratedContent::placeholders());
        for field in NarrativeField::ALL {
            let marker = format!(
                "<p class=\"placeholder\" data-field=\"{}\">{}</p>",
                field.key(),
                field.placeholder()
            );
            assert!(html.contains(&marker), "missing marker for {field:?}");
        }
        assert!(!html.contains("<ol>"));
        assert!(html.starts_with("<article"));
        assert!(html.ends_with("</article>\n"));
    }

    #[test]
    fn whitespace_only_narrative_is_placeholder() {
        let mut content = GeneratedContent::placeholders();
        content.strengths = "   ".to_string();
        let html = render(&profile(), &content);
        assert!(html.contains("<p class=\"placeholder\" data-field=\"strengths\">"));
    }

    #[test]
    fn profile_facts_are_formatted() {
        let html = render(&profile(), &content());
        assert!(html.contains("<dt>Annual Revenue</dt><dd>$480,000</dd>"));
        assert!(html.contains("<dt>Years in Business</dt><dd>2.5</dd>"));
        assert!(html.contains("<dt>Personal Credit Score</dt><dd>712</dd>"));
    }

    #[test]
    fn currency_grouping() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(1_000.0), "$1,000");
        assert_eq!(format_currency(1_234_567.8), "$1,234,568");
        assert_eq!(format_currency(-2_500.0), "-$2,500");
    }

    #[test]
    fn sorted_breaks_rank_ties_by_name() {
        let items = vec![
            Recommendation::new("Zeta", ApprovalOdds::High, "x", 0),
            Recommendation::new("Alpha", ApprovalOdds::Low, "y", 0),
        ];
        let names: Vec<_> = sorted(&items).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn checksum_tracks_rendered_html() {
        let rendered = RenderedHtml::new(&profile(), &content());
        assert!(rendered.checksum.matches(&rendered.html));
    }

    mod arbitrary {
        use super::*;
        use proptest::prelude::*;
        use serde_json::{Map, Value};

        const TEXT: &str = "[a-zA-Z0-9 .,éüñ漢字€<>&\"'\n]{0,40}";

        fn narrative() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                Just(json!("")),
                Just(json!("  \n ")),
                TEXT.prop_map(Value::String),
            ]
        }

        fn recommendation() -> impl Strategy<Value = Value> {
            (
                TEXT,
                prop::sample::select(vec!["high", "Moderate", "low", "sideways"]),
                TEXT,
                0u32..4,
            )
                .prop_map(|(name, odds, rationale, rank)| {
                    json!({"name": name, "odds": odds, "rationale": rationale, "rank": rank})
                })
        }

        fn content() -> impl Strategy<Value = GeneratedContent> {
            (
                prop::collection::vec(narrative(), NarrativeField::ALL.len()),
                prop::collection::vec(recommendation(), 0..6),
                prop::collection::vec(recommendation(), 0..6),
            )
                .prop_map(|(narratives, funding, cards)| {
                    let mut doc: Map<String, Value> = NarrativeField::ALL
                        .iter()
                        .map(|f| f.key().to_string())
                        .zip(narratives)
                        .collect();
                    doc.insert(RecommendationList::Funding.key().into(), Value::Array(funding));
                    doc.insert(RecommendationList::CreditCards.key().into(), Value::Array(cards));
                    GeneratedContent::from_value(Value::Object(doc))
                })
        }

        fn profile() -> impl Strategy<Value = BusinessProfile> {
            (
                TEXT,
                300u32..=850,
                proptest::option::of(TEXT),
                proptest::option::of(0u32..5_000_000),
                proptest::option::of(0u32..40),
            )
                .prop_map(|(name, score, industry, revenue, years)| {
                    serde_json::from_value::<BusinessProfile>(json!({
                        "businessName": format!("<script>{name}"),
                        "personalCreditScore": score,
                        "industry": industry,
                        "annualRevenue": revenue,
                        "yearsInBusiness": years.map(|y| f64::from(y) / 2.0),
                    }))
                    .unwrap()
                })
        }

        /// Content plus independently shuffled copies of both lists
        fn shuffled_content(
        ) -> impl Strategy<Value = (GeneratedContent, Vec<Recommendation>, Vec<Recommendation>)> {
            content().prop_flat_map(|content| {
                let funding = Just(content.funding_recommendations.clone()).prop_shuffle();
                let cards = Just(content.credit_card_recommendations.clone()).prop_shuffle();
                (Just(content), funding, cards)
            })
        }

        proptest! {
            #[test]
            fn render_ignores_list_order_and_survives_serde(
                profile in profile(),
                (content, funding, cards) in shuffled_content(),
            ) {
                let rendered = RenderedHtml::new(&profile, &content);
                prop_assert!(!rendered.html.contains("<script"));

                let mut permuted = content.clone();
                permuted.funding_recommendations = funding;
                permuted.credit_card_recommendations = cards;
                prop_assert_eq!(&RenderedHtml::new(&profile, &permuted), &rendered);

                let profile_back: BusinessProfile =
                    serde_json::from_str(&serde_json::to_string(&profile).unwrap()).unwrap();
                let content_back: GeneratedContent =
                    serde_json::from_str(&serde_json::to_string(&content).unwrap()).unwrap();
                prop_assert_eq!(&RenderedHtml::new(&profile_back, &content_back), &rendered);
            }
        }
    }
}
