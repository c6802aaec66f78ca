use super::config::{QuotaError, SourceQuota, TargetSpec};
use std::collections::{HashMap, HashSet};

/// Normalized contribution plan for one mix call
#[derive(Debug, Clone)]
pub struct MixPlan {
    /// Per-source weight, normalized so active weights sum to 1
    pub weights: HashMap<String, f64>,
    /// Per-source (min_group, max_group), passed through from configuration.
    /// Bounds apply to each draw, not to the source's total contribution.
    pub bounds: HashMap<String, (usize, usize)>,
    /// Sources in declaration order, used for deterministic tie-breaking
    pub order: Vec<String>,
}

/// Validate quotas and target and compute the initial normalized weights.
/// Malformed configuration is rejected here, never silently clamped.
pub fn plan(quotas: &[SourceQuota], target: &TargetSpec) -> Result<MixPlan, QuotaError> {
    match target {
        TargetSpec::Count(0) => return Err(QuotaError::ZeroTarget),
        TargetSpec::Duration(0) => return Err(QuotaError::ZeroTarget),
        _ => {}
    }

    let mut seen = HashSet::new();
    for quota in quotas {
        quota.validate()?;
        if !seen.insert(quota.source.as_str()) {
            return Err(QuotaError::DuplicateSource {
                source: quota.source.clone(),
            });
        }
    }

    let order: Vec<String> = quotas.iter().map(|q| q.source.clone()).collect();
    let weights = renormalize(quotas, &order);
    let bounds = quotas
        .iter()
        .map(|q| (q.source.clone(), (q.min_group, q.max_group)))
        .collect();

    Ok(MixPlan {
        weights,
        bounds,
        order,
    })
}

/// Re-normalize weights over the remaining active sources so they sum to 1.
/// Called once per exhaustion event; a pure function so the selection loop
/// stays easy to test in isolation.
pub fn renormalize(quotas: &[SourceQuota], active: &[String]) -> HashMap<String, f64> {
    let total: f64 = quotas
        .iter()
        .filter(|q| active.contains(&q.source))
        .map(|q| q.weight)
        .sum();

    quotas
        .iter()
        .filter(|q| active.contains(&q.source))
        .map(|q| (q.source.clone(), q.weight / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mix::config::WeightType;
    use approx::assert_relative_eq;

    fn quota(source: &str, weight: f64) -> SourceQuota {
        SourceQuota {
            source: source.to_string(),
            min_group: 1,
            max_group: 3,
            weight,
            weight_type: WeightType::Frequency,
        }
    }

    #[test]
    fn weights_normalize_to_one() {
        let quotas = vec![quota("a", 1.0), quota("b", 3.0)];
        let plan = plan(&quotas, &TargetSpec::Count(10)).unwrap();

        assert_relative_eq!(plan.weights["a"], 0.25);
        assert_relative_eq!(plan.weights["b"], 0.75);
        assert_eq!(plan.order, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(plan.bounds["a"], (1, 3));
    }

    #[test]
    fn renormalize_after_exhaustion_sums_to_one() {
        let quotas = vec![quota("a", 1.0), quota("b", 2.0), quota("c", 1.0)];
        let active = vec!["b".to_string(), "c".to_string()];

        let weights = renormalize(&quotas, &active);

        assert_eq!(weights.len(), 2);
        assert_relative_eq!(weights["b"], 2.0 / 3.0);
        assert_relative_eq!(weights["c"], 1.0 / 3.0);
        assert_relative_eq!(weights.values().sum::<f64>(), 1.0);
    }

    #[test]
    fn rejects_inverted_group_bounds() {
        let mut bad = quota("a", 1.0);
        bad.min_group = 4;
        bad.max_group = 2;

        let err = plan(&[bad], &TargetSpec::Count(10)).unwrap_err();
        assert_eq!(
            err,
            QuotaError::GroupBoundsInverted {
                source: "a".to_string(),
                min: 4,
                max: 2
            }
        );
    }

    #[test]
    fn rejects_zero_min_group() {
        let mut bad = quota("a", 1.0);
        bad.min_group = 0;

        let err = plan(&[bad], &TargetSpec::Count(10)).unwrap_err();
        assert_eq!(
            err,
            QuotaError::ZeroGroup {
                source: "a".to_string()
            }
        );
    }

    #[test]
    fn rejects_non_positive_weight() {
        let err = plan(&[quota("a", 0.0)], &TargetSpec::Count(10)).unwrap_err();
        assert!(matches!(err, QuotaError::InvalidWeight { .. }));

        let err = plan(&[quota("a", -2.0)], &TargetSpec::Count(10)).unwrap_err();
        assert!(matches!(err, QuotaError::InvalidWeight { .. }));
    }

    #[test]
    fn rejects_duplicate_sources() {
        let quotas = vec![quota("a", 1.0), quota("a", 2.0)];
        let err = plan(&quotas, &TargetSpec::Count(10)).unwrap_err();
        assert_eq!(
            err,
            QuotaError::DuplicateSource {
                source: "a".to_string()
            }
        );
    }

    #[test]
    fn rejects_zero_target() {
        let err = plan(&[quota("a", 1.0)], &TargetSpec::Count(0)).unwrap_err();
        assert_eq!(err, QuotaError::ZeroTarget);

        let err = plan(&[quota("a", 1.0)], &TargetSpec::Duration(0)).unwrap_err();
        assert_eq!(err, QuotaError::ZeroTarget);
    }
}
