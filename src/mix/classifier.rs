use crate::models::Track;
use std::collections::HashMap;

/// Relative popularity band within one candidate set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quartile {
    TopHits,
    Popular,
    Moderate,
    DeepCuts,
    /// Track has no popularity score; excluded from quartile math but still
    /// eligible for selection
    Unscored,
}

impl Quartile {
    /// Ordering rank used by the shape strategies (0 = biggest hits).
    /// Unscored tracks sit with Moderate so a missing popularity score never
    /// breaks a comparison.
    pub fn rank(self) -> u8 {
        match self {
            Quartile::TopHits => 0,
            Quartile::Popular => 1,
            Quartile::Moderate | Quartile::Unscored => 2,
            Quartile::DeepCuts => 3,
        }
    }
}

/// Quartile assignment for one candidate set, keyed by track id
#[derive(Debug, Clone)]
pub struct Classification {
    by_id: HashMap<String, Quartile>,
}

impl Classification {
    pub fn quartile_of(&self, track: &Track) -> Quartile {
        self.by_id
            .get(&track.id)
            .copied()
            .unwrap_or(Quartile::Unscored)
    }

    pub fn rank_of(&self, track: &Track) -> u8 {
        self.quartile_of(track).rank()
    }
}

/// Bucket tracks into four relative quartiles by sorting on popularity.
///
/// Quartiles are relative to this candidate set, not absolute thresholds:
/// classifying a different pool yields different bucket boundaries. Sorting
/// ties are broken by track id so the result depends only on the multiset of
/// (score, id) pairs and is stable under reordering of the input.
///
/// With `recency_boost` the effective score is the raw popularity plus
/// `max(0, 10 - 2 * age)` where age is measured in years from the newest
/// track in the set. The boost tops out at +10, so a popularity gap larger
/// than 10 can never be inverted, and it uses no wall clock, so the same
/// input always classifies the same way.
pub fn classify(tracks: &[Track], recency_boost: bool) -> Classification {
    let max_year = if recency_boost {
        tracks.iter().filter_map(|t| t.year).max()
    } else {
        None
    };

    let mut scored: Vec<(&Track, f64)> = tracks
        .iter()
        .filter(|t| t.popularity.is_some())
        .map(|t| (t, effective_score(t, max_year)))
        .collect();

    scored.sort_by(|(a, score_a), (b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let n = scored.len();
    let q = n / 4;

    let mut by_id = HashMap::with_capacity(tracks.len());
    for (index, (track, _)) in scored.iter().enumerate() {
        // The remainder of the integer division folds into DeepCuts
        let quartile = if index < q {
            Quartile::TopHits
        } else if index < 2 * q {
            Quartile::Popular
        } else if index < 3 * q {
            Quartile::Moderate
        } else {
            Quartile::DeepCuts
        };
        by_id.insert(track.id.clone(), quartile);
    }

    for track in tracks.iter().filter(|t| t.popularity.is_none()) {
        by_id.insert(track.id.clone(), Quartile::Unscored);
    }

    Classification { by_id }
}

fn effective_score(track: &Track, max_year: Option<i32>) -> f64 {
    let base = f64::from(track.popularity.unwrap_or(0));
    let boost = match (track.year, max_year) {
        (Some(year), Some(max)) => {
            let age = i64::from(max) - i64::from(year);
            (10 - 2 * age).clamp(0, 10) as f64
        }
        _ => 0.0,
    };
    base + boost
}
