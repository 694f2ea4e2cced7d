//! # Capability Matcher
//!
//! Scores free-text input against the capability catalog. Advisory signal
//! only - it feeds UI suggestions and telemetry. Action selection is
//! delegated to the model through tool calling, so nothing here gates a
//! mutation.

use super::registry::Capability;

/// One scored match.
#[derive(Debug, Clone)]
pub struct CapabilityMatch<'a> {
    pub capability: &'a Capability,
    /// Normalized into [0, 1]
    pub confidence: f64,
    /// Triggers found as substrings of the input
    pub matched_triggers: Vec<String>,
}

/// Score `input` against each available capability.
///
/// For each capability, every trigger found as a substring of the
/// lower-cased input contributes `trigger.len() / 10`; the capability's
/// `priority / 10` is added on top, the sum is divided by 3 and clamped to
/// [0, 1]. Capabilities with no matched trigger are excluded. Results are
/// sorted by descending confidence.
pub fn match_capabilities<'a>(
    input: &str,
    available: &[&'a Capability],
) -> Vec<CapabilityMatch<'a>> {
    let input = input.to_lowercase();

    let mut matches: Vec<CapabilityMatch<'a>> = available
        .iter()
        .filter_map(|&capability| {
            let matched_triggers: Vec<String> = capability
                .triggers
                .iter()
                .filter(|trigger| input.contains(trigger.as_str()))
                .cloned()
                .collect();
            if matched_triggers.is_empty() {
                return None;
            }

            let trigger_score: f64 = matched_triggers
                .iter()
                .map(|t| t.len() as f64 / 10.0)
                .sum();
            let raw = (trigger_score + capability.priority as f64 / 10.0) / 3.0;
            Some(CapabilityMatch {
                capability,
                confidence: raw.clamp(0.0, 1.0),
                matched_triggers,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches
}
