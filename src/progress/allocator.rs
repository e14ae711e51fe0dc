//! Importance allocator: longest-prefix weight lookup plus the weighted,
//! renormalised aggregate progress described in `spec.md` §4.2.
//!
//! Grounded on the teacher's `engine::state` queue-snapshot aggregation
//! (it folds per-job progress into a single taskbar percentage the same
//! way — weighted sum, clamped, renormalised) generalised here to the
//! canonical bar-prefix registry instead of per-job weights.

use std::collections::HashMap;

use crate::domain::CANONICAL_BAR_PREFIXES;

/// Relative importance of each canonical bar kind. Not specified
/// numerically by `spec.md` (an Open Question, resolved in `DESIGN.md`):
/// per-item/per-media containers and the two "process" bars (the actual
/// decode/transcribe work) dominate; one-off downloads and probes are
/// weighted lightly since they usually complete once per run, early.
fn default_weight(prefix: &str) -> f64 {
    match prefix {
        "media-bar" => 3.0,
        "item-bar" => 2.0,
        "demucs-process" | "audiosep-process" | "translit-process" => 2.5,
        "demucs-docker-dl" | "audiosep-docker-dl" | "translit-docker-dl" => 0.5,
        "demucs-model-dl" | "audiosep-model-dl" => 0.5,
        "translit-init" => 0.25,
        "check-probe" | "check-decode" => 0.25,
        _ => 1.0,
    }
}

/// Longest-prefix match against the canonical registry (`spec.md` §4.2).
/// Falls back to the full id (weight 1.0) for a bar id matching no known
/// prefix rather than panicking — unknown bar kinds still aggregate, just
/// without a curated weight.
pub fn importance_for(bar_id: &str) -> f64 {
    CANONICAL_BAR_PREFIXES
        .iter()
        .filter(|p| bar_id.starts_with(**p))
        .max_by_key(|p| p.len())
        .map(|p| default_weight(p))
        .unwrap_or(1.0)
}

/// Weighted sum of per-bar `current/total`, clipped per-bar to [0, 1],
/// renormalised to 100. Returns `0.0` if there are no bars or all weights
/// are zero, rather than dividing by zero.
pub fn aggregate_percent(fractions: &HashMap<String, (f64, f64)>) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (bar_id, (fraction, weight)) in fractions {
        let clipped = fraction.clamp(0.0, 1.0);
        weighted_sum += clipped * weight;
        weight_total += weight;
        let _ = bar_id;
    }
    if weight_total <= 0.0 {
        return 0.0;
    }
    (weighted_sum / weight_total * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins_over_shorter_overlap() {
        assert_eq!(
            importance_for("demucs-docker-dl-job1"),
            default_weight("demucs-docker-dl")
        );
        assert_eq!(
            importance_for("demucs-process-job1"),
            default_weight("demucs-process")
        );
    }

    #[test]
    fn unknown_prefix_falls_back_to_weight_one() {
        assert_eq!(importance_for("totally-unregistered-bar"), 1.0);
    }

    #[test]
    fn aggregate_is_weighted_and_renormalised() {
        let mut fractions = HashMap::new();
        fractions.insert("media-bar-job1".to_string(), (1.0, 3.0));
        fractions.insert("check-probe-job1".to_string(), (0.0, 0.25));
        let percent = aggregate_percent(&fractions);
        assert!((percent - (3.0 / 3.25 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_input_yields_zero_not_nan() {
        assert_eq!(aggregate_percent(&HashMap::new()), 0.0);
    }

    #[test]
    fn fractions_outside_unit_range_are_clipped() {
        let mut fractions = HashMap::new();
        fractions.insert("media-bar-job1".to_string(), (1.5, 1.0));
        assert_eq!(aggregate_percent(&fractions), 100.0);
    }
}
