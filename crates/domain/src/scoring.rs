//! Deterministic impact scoring for detected changes
//!
//! Additive rule set evaluated in fixed order, each rule contributing a
//! fixed value and a human-readable signal. The signal log is the audit
//! trail: a reviewer can reconstruct why a change was flagged without
//! re-running the scorer.
//!
//! Scoring heuristic:
//!   +10  base (any detected change)
//!   +40  content diff > 5% of document size
//!   +20  initial snapshot (no previous content to diff against)
//!   +30  keyword match on trigger terms (at most once)
//!   +20  source type is FRL_ACT or FRL_REGS (highest legal tier)

use crate::model::SourceType;

/// Keywords that signal high-impact legislative/policy changes.
pub const TRIGGER_KEYWORDS: [&str; 13] = [
    "visa",
    "requirement",
    "criterion",
    "criteria",
    "repeal",
    "repealed",
    "schedule",
    "regulation",
    "english",
    "financial",
    "occupation",
    "specified work",
    "exemption",
];

/// Scores at or above this threshold require human review.
pub const REVIEW_THRESHOLD: u8 = 70;

/// Fraction of differing bytes above which the magnitude rule fires.
const LARGE_DIFF_RATIO: f64 = 0.05;

/// Output of a scoring run.
///
/// A transient value object: consumed to populate the change event,
/// never persisted with an identity of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactScore {
    /// 0-100
    pub score: u8,
    /// True iff `score >= REVIEW_THRESHOLD`
    pub requires_review: bool,
    /// One entry per rule that fired, in evaluation order
    pub signals: Vec<String>,
}

/// Score a detected change.
///
/// `prev_content` is `None` for an initial snapshot (no diff possible).
/// There is no special case for equal inputs: callers short-circuit on
/// hash equality before scoring, but the function itself always applies
/// the base rule.
pub fn score(
    prev_content: Option<&[u8]>,
    curr_content: &[u8],
    source_type: SourceType,
) -> ImpactScore {
    let mut signals: Vec<String> = Vec::new();
    let mut total: u32 = 0;

    // Base: any change at all
    total += 10;
    signals.push("base: change detected (+10)".to_string());

    match prev_content {
        Some(prev) => {
            // Differing bytes are counted over the overlapping prefix only,
            // then divided by the previous length. Content that merely grows
            // past an identical prefix scores 0% here; preserved heuristic
            // limitation.
            let prev_size = prev.len().max(1);
            let overlap = prev.len().min(curr_content.len());
            let differing = prev[..overlap]
                .iter()
                .zip(&curr_content[..overlap])
                .filter(|(a, b)| a != b)
                .count();
            let diff_ratio = differing as f64 / prev_size as f64;
            if diff_ratio > LARGE_DIFF_RATIO {
                total += 40;
                signals.push(format!(
                    "large diff: {:.1}% of document changed (+40)",
                    diff_ratio * 100.0
                ));
            }
        }
        None => {
            // Initial snapshot: nothing to diff against, treated as significant
            total += 20;
            signals.push("initial snapshot: no prev hash, assumed significant (+20)".to_string());
        }
    }

    // Keyword match in current content, lossy-decoded; fires at most once
    let text = String::from_utf8_lossy(curr_content).to_lowercase();
    let mut matched: Vec<&str> = TRIGGER_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| text.contains(kw))
        .collect();
    if !matched.is_empty() {
        matched.sort_unstable();
        total += 30;
        signals.push(format!("keyword match: {matched:?} (+30)"));
    }

    // High-tier source type
    if source_type.is_high_tier() {
        total += 20;
        signals.push(format!("high-tier source type: {source_type} (+20)"));
    }

    let score = total.min(100) as u8;
    ImpactScore {
        score,
        requires_review: score >= REVIEW_THRESHOLD,
        signals,
    }
}
