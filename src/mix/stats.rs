use crate::models::Track;
use std::collections::HashMap;

/// Cumulative contribution of one source to the mixed output
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceStats {
    pub count: usize,
    pub duration_ms: u64,
}

/// Per-source and total contribution statistics for one mix
#[derive(Debug, Clone, Default)]
pub struct MixStats {
    pub per_source: HashMap<String, SourceStats>,
    pub total_count: usize,
    pub total_duration_ms: u64,
}

impl MixStats {
    pub fn record(&mut self, track: &Track) {
        let entry = self.per_source.entry(track.source.clone()).or_default();
        entry.count += 1;
        entry.duration_ms += track.duration_ms;
        self.total_count += 1;
        self.total_duration_ms += track.duration_ms;
    }

    /// Fraction of the output's track count contributed by a source
    pub fn count_share(&self, source: &str) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        let count = self.per_source.get(source).map_or(0, |s| s.count);
        count as f64 / self.total_count as f64
    }

    /// Fraction of the output's cumulative duration contributed by a source
    pub fn duration_share(&self, source: &str) -> f64 {
        if self.total_duration_ms == 0 {
            return 0.0;
        }
        let ms = self.per_source.get(source).map_or(0, |s| s.duration_ms);
        ms as f64 / self.total_duration_ms as f64
    }
}

/// Format milliseconds as m:ss for display
pub fn format_duration_ms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn track(source: &str, duration_ms: u64) -> Track {
        Track {
            id: format!("{source}-{duration_ms}"),
            duration_ms,
            source: source.to_string(),
            ..Track::default()
        }
    }

    #[test]
    fn records_per_source_and_totals() {
        let mut stats = MixStats::default();
        stats.record(&track("a", 180_000));
        stats.record(&track("a", 120_000));
        stats.record(&track("b", 300_000));

        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.total_duration_ms, 600_000);
        assert_eq!(stats.per_source["a"].count, 2);
        assert_relative_eq!(stats.count_share("b"), 1.0 / 3.0);
        assert_relative_eq!(stats.duration_share("b"), 0.5);
    }

    #[test]
    fn shares_are_zero_for_empty_output() {
        let stats = MixStats::default();
        assert_relative_eq!(stats.count_share("a"), 0.0);
        assert_relative_eq!(stats.duration_share("a"), 0.0);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration_ms(0), "0:00");
        assert_eq!(format_duration_ms(61_000), "1:01");
        assert_eq!(format_duration_ms(3_725_000), "62:05");
    }
}
