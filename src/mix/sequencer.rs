use super::classifier::{self, Classification, Quartile};
use super::config::{PopularityStrategy, QuotaError, SourceQuota, StrategySpec, TargetSpec, WeightType};
use super::planner::{self, MixPlan};
use super::stats::MixStats;
use crate::models::Track;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// Result of one mix call: the flat ordered sequence plus per-source
/// contribution statistics
#[derive(Debug)]
pub struct MixOutput {
    pub tracks: Vec<Track>,
    pub stats: MixStats,
}

/// Mix several source pools into one ordered sequence.
///
/// The loop runs SELECT_SOURCE -> DRAW_BATCH -> ORDER_BATCH -> APPEND ->
/// CHECK_TARGET until the target is met or every pool is exhausted. Sources
/// whose pool runs dry drop out of the rotation and their weight is
/// redistributed over the remaining ones. Requesting more than the combined
/// pools hold is not an error; the caller gets everything available.
///
/// All randomness (batch-size jitter, intra-quartile shuffling) goes through
/// the supplied rng, so a seeded rng reproduces the exact same output.
pub fn mix<R: Rng>(
    pools_by_source: HashMap<String, Vec<Track>>,
    quotas: &[SourceQuota],
    target: &TargetSpec,
    strategy: &StrategySpec,
    rng: &mut R,
) -> Result<MixOutput, QuotaError> {
    let plan = planner::plan(quotas, target)?;

    // Quartiles are relative to the whole candidate set of this mix call
    let candidates: Vec<Track> = pools_by_source.values().flatten().cloned().collect();
    let classification = classifier::classify(&candidates, strategy.recency_boost);

    let mut session = MixSession::new(pools_by_source, &plan, quotas, classification);

    loop {
        let Some(source) = session.select_source() else {
            break;
        };

        let fraction = position_fraction(
            target,
            session.stats.total_count,
            session.stats.total_duration_ms,
        );
        let desired = desired_rank(strategy.popularity_strategy, fraction);

        let batch = session.draw_batch(&source, desired, rng);
        let batch = order_batch(batch, &session.classification, strategy, desired, rng);
        session.append(batch);

        if session.pool_is_empty(&source) {
            session.retire(&source);
        }

        if target_reached(
            target,
            session.stats.total_count,
            session.stats.total_duration_ms,
        ) {
            break;
        }
    }

    Ok(MixOutput {
        tracks: session.output,
        stats: session.stats,
    })
}

/// Length governor: has the running output met the requested target?
pub fn target_reached(target: &TargetSpec, count: usize, duration_ms: u64) -> bool {
    match *target {
        TargetSpec::Count(n) => count >= n,
        TargetSpec::Duration(ms) => duration_ms >= ms,
    }
}

/// How far along the output is, in [0, 1], measured in the target's own unit
fn position_fraction(target: &TargetSpec, count: usize, duration_ms: u64) -> f64 {
    let fraction = match *target {
        TargetSpec::Count(n) => count as f64 / n as f64,
        TargetSpec::Duration(ms) => duration_ms as f64 / ms as f64,
    };
    fraction.clamp(0.0, 1.0)
}

/// The quartile rank (0 = top hits .. 3 = deep cuts) a batch appended at
/// position fraction `f` should gravitate towards. Each curve is monotonic
/// in its stated direction:
///   front-loaded  3f          (hits early, deep cuts late)
///   crescendo     3(1-f)      (deep cuts early, hits late)
///   mid-peak      3|1-2f|     (deep cuts at the ends, hits at the middle)
/// Mixed applies no bias at all.
fn desired_rank(strategy: PopularityStrategy, fraction: f64) -> Option<f64> {
    match strategy {
        PopularityStrategy::Mixed => None,
        PopularityStrategy::FrontLoaded => Some(3.0 * fraction),
        PopularityStrategy::Crescendo => Some(3.0 * (1.0 - fraction)),
        PopularityStrategy::MidPeak => Some(3.0 * (1.0 - 2.0 * fraction).abs()),
    }
}

/// Ephemeral state of one mix call. Created fresh per request, discarded
/// with the output; nothing survives across calls.
struct MixSession<'a> {
    pools: HashMap<String, Vec<Track>>,
    /// Non-exhausted sources, in quota declaration order
    active: Vec<String>,
    weights: HashMap<String, f64>,
    bounds: &'a HashMap<String, (usize, usize)>,
    quotas: &'a [SourceQuota],
    weight_types: HashMap<String, WeightType>,
    classification: Classification,
    output: Vec<Track>,
    stats: MixStats,
}

impl<'a> MixSession<'a> {
    fn new(
        pools: HashMap<String, Vec<Track>>,
        plan: &'a MixPlan,
        quotas: &'a [SourceQuota],
        classification: Classification,
    ) -> Self {
        // Sources with an empty or missing pool never enter the rotation
        let active: Vec<String> = plan
            .order
            .iter()
            .filter(|source| pools.get(*source).is_some_and(|p| !p.is_empty()))
            .cloned()
            .collect();

        let weights = planner::renormalize(quotas, &active);
        let weight_types = quotas
            .iter()
            .map(|q| (q.source.clone(), q.weight_type))
            .collect();

        MixSession {
            pools,
            active,
            weights,
            bounds: &plan.bounds,
            quotas,
            weight_types,
            classification,
            output: Vec::new(),
            stats: MixStats::default(),
        }
    }

    /// SELECT_SOURCE: the active source whose contributed share lags its
    /// normalized weight the most. Ties keep declaration order.
    fn select_source(&self) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for source in &self.active {
            let share = match self.weight_types[source] {
                WeightType::Frequency => self.stats.count_share(source),
                WeightType::Time => self.stats.duration_share(source),
            };
            let deficit = share - self.weights[source];
            if best.is_none_or(|(_, d)| deficit < d) {
                best = Some((source, deficit));
            }
        }
        best.map(|(source, _)| source.clone())
    }

    /// DRAW_BATCH: take a bounded run of tracks out of the source's pool.
    /// The batch size is drawn from [min_group, max_group] through the rng
    /// and capped at what the pool still holds; a pool left with fewer than
    /// min_group tracks gets drained entirely.
    ///
    /// With a shape strategy active, the members picked are those whose
    /// quartile rank sits closest to the desired rank for the current output
    /// position (ties keep pool order); plain pool order otherwise. The
    /// non-picked tracks keep their relative order for later draws.
    fn draw_batch<R: Rng>(
        &mut self,
        source: &str,
        desired: Option<f64>,
        rng: &mut R,
    ) -> Vec<Track> {
        let (min_group, max_group) = self.bounds[source];
        let size = if min_group == max_group {
            min_group
        } else {
            rng.gen_range(min_group..=max_group)
        };

        let classification = &self.classification;
        let pool = self
            .pools
            .get_mut(source)
            .expect("active source always has a pool");
        let size = size.min(pool.len());

        let Some(desired) = desired else {
            return pool.drain(..size).collect();
        };

        let mut keyed: Vec<(usize, f64)> = pool
            .iter()
            .enumerate()
            .map(|(index, track)| {
                (
                    index,
                    (f64::from(classification.rank_of(track)) - desired).abs(),
                )
            })
            .collect();
        keyed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut take = vec![false; pool.len()];
        for &(index, _) in keyed.iter().take(size) {
            take[index] = true;
        }

        // Single pass split instead of repeated mid-vector removals
        let drained = std::mem::take(pool);
        let mut batch = Vec::with_capacity(size);
        let mut rest = Vec::with_capacity(drained.len() - size);
        for (index, track) in drained.into_iter().enumerate() {
            if take[index] {
                batch.push(track);
            } else {
                rest.push(track);
            }
        }
        *pool = rest;
        batch
    }

    /// APPEND: extend the output and the running contribution totals
    fn append(&mut self, batch: Vec<Track>) {
        for track in batch {
            self.stats.record(&track);
            self.output.push(track);
        }
    }

    fn pool_is_empty(&self, source: &str) -> bool {
        self.pools.get(source).is_none_or(|p| p.is_empty())
    }

    /// Exhaustion handler: drop the source from the rotation and
    /// redistribute its weight over the remaining active sources
    fn retire(&mut self, source: &str) {
        self.active.retain(|s| s != source);
        self.weights = planner::renormalize(self.quotas, &self.active);
    }
}

/// ORDER_BATCH: arrange a drawn batch per the active shape strategy, then
/// optionally shuffle tracks within each quartile bucket. Tracks never move
/// across quartile boundaries during the shuffle.
fn order_batch<R: Rng>(
    mut batch: Vec<Track>,
    classification: &Classification,
    strategy: &StrategySpec,
    desired: Option<f64>,
    rng: &mut R,
) -> Vec<Track> {
    if let Some(desired) = desired {
        batch.sort_by(|a, b| {
            let key_a = (f64::from(classification.rank_of(a)) - desired).abs();
            let key_b = (f64::from(classification.rank_of(b)) - desired).abs();
            key_a.partial_cmp(&key_b).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    if strategy.shuffle_within_groups {
        shuffle_within_quartiles(&mut batch, classification, rng);
    }

    batch
}

/// Permute the tracks occupying each quartile's positions among themselves.
/// Buckets are visited in a fixed order so a seeded rng stays reproducible.
fn shuffle_within_quartiles<R: Rng>(
    batch: &mut [Track],
    classification: &Classification,
    rng: &mut R,
) {
    const BUCKETS: [Quartile; 5] = [
        Quartile::TopHits,
        Quartile::Popular,
        Quartile::Moderate,
        Quartile::DeepCuts,
        Quartile::Unscored,
    ];

    for bucket in BUCKETS {
        let positions: Vec<usize> = batch
            .iter()
            .enumerate()
            .filter(|(_, track)| classification.quartile_of(track) == bucket)
            .map(|(index, _)| index)
            .collect();

        if positions.len() < 2 {
            continue;
        }

        let mut members: Vec<Track> = positions.iter().map(|&i| batch[i].clone()).collect();
        members.shuffle(rng);
        for (&position, track) in positions.iter().zip(members) {
            batch[position] = track;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mix::config::StrategySpec;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn track(id: &str, source: &str, popularity: Option<u32>) -> Track {
        Track {
            id: id.to_string(),
            source: source.to_string(),
            duration_ms: 180_000,
            popularity,
            ..Track::default()
        }
    }

    #[test]
    fn governor_count_mode() {
        let target = TargetSpec::Count(5);
        assert!(!target_reached(&target, 4, 0));
        assert!(target_reached(&target, 5, 0));
        assert!(target_reached(&target, 6, 0));
    }

    #[test]
    fn governor_duration_mode() {
        let target = TargetSpec::Duration(600_000);
        assert!(!target_reached(&target, 100, 599_999));
        assert!(target_reached(&target, 1, 600_000));
    }

    #[test]
    fn desired_rank_curves_are_monotonic_in_their_direction() {
        // front-loaded rises, crescendo falls
        for pair in [(0.0, 0.5), (0.5, 1.0)] {
            let front_early = desired_rank(PopularityStrategy::FrontLoaded, pair.0).unwrap();
            let front_late = desired_rank(PopularityStrategy::FrontLoaded, pair.1).unwrap();
            assert!(front_early < front_late);

            let cres_early = desired_rank(PopularityStrategy::Crescendo, pair.0).unwrap();
            let cres_late = desired_rank(PopularityStrategy::Crescendo, pair.1).unwrap();
            assert!(cres_early > cres_late);
        }

        // mid-peak bottoms out at the middle
        let ends = desired_rank(PopularityStrategy::MidPeak, 0.0).unwrap();
        let middle = desired_rank(PopularityStrategy::MidPeak, 0.5).unwrap();
        let late_end = desired_rank(PopularityStrategy::MidPeak, 1.0).unwrap();
        assert!(middle < ends);
        assert!(middle < late_end);

        assert_eq!(desired_rank(PopularityStrategy::Mixed, 0.5), None);
    }

    #[test]
    fn shuffle_never_crosses_quartile_boundaries() {
        let tracks: Vec<Track> = (0..16)
            .map(|i| track(&format!("t{i:02}"), "a", Some(160 - i * 10)))
            .collect();
        let classification = classifier::classify(&tracks, false);
        let before: Vec<Quartile> = tracks
            .iter()
            .map(|t| classification.quartile_of(t))
            .collect();

        let mut shuffled = tracks.clone();
        let mut rng = StdRng::seed_from_u64(7);
        shuffle_within_quartiles(&mut shuffled, &classification, &mut rng);

        let after: Vec<Quartile> = shuffled
            .iter()
            .map(|t| classification.quartile_of(t))
            .collect();
        assert_eq!(before, after);

        // Same multiset of tracks
        let mut before_ids: Vec<&String> = tracks.iter().map(|t| &t.id).collect();
        let mut after_ids: Vec<&String> = shuffled.iter().map(|t| &t.id).collect();
        before_ids.sort();
        after_ids.sort();
        assert_eq!(before_ids, after_ids);
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let pools = || {
            let mut map = HashMap::new();
            map.insert(
                "a".to_string(),
                (0..20)
                    .map(|i| track(&format!("t{i:02}"), "a", Some(i * 5)))
                    .collect::<Vec<_>>(),
            );
            map
        };
        let quotas = vec![SourceQuota {
            source: "a".to_string(),
            min_group: 2,
            max_group: 4,
            weight: 1.0,
            weight_type: WeightType::Frequency,
        }];
        let strategy = StrategySpec {
            popularity_strategy: PopularityStrategy::Mixed,
            recency_boost: false,
            shuffle_within_groups: true,
        };

        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            mix(
                pools(),
                &quotas,
                &TargetSpec::Count(20),
                &strategy,
                &mut rng,
            )
            .unwrap()
            .tracks
            .iter()
            .map(|t| t.id.clone())
            .collect::<Vec<_>>()
        };

        assert_eq!(run(42), run(42));
    }
}
