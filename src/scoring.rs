use std::collections::HashMap;

use crate::config::Distribution;
use crate::error::{GraderError, Result};
use crate::models::{ParticipantKey, RawScoreRow, ScoreRecord};

/// Weights a raw written/computational pair into percentages and a
/// composite. Weights are fractions, so the composite stays on 0–100.
pub fn aggregate(
    raw_written: f64,
    raw_computational: f64,
    written_max: f64,
    computational_max: f64,
    written_weight: f64,
    computational_weight: f64,
) -> Result<ScoreRecord> {
    if [written_max, computational_max].iter().any(|max| max.is_nan() || *max <= 0.0) {
        return Err(GraderError::config(format!(
            "maximum scores must be positive \
             (written {written_max}, computational {computational_max})"
        )));
    }
    for (name, value) in [("written", raw_written), ("computational", raw_computational)] {
        if !value.is_finite() || value < 0.0 {
            return Err(GraderError::InvalidScore(format!(
                "{name} score {value} is not a finite non-negative number"
            )));
        }
    }

    let written_pct = raw_written / written_max * 100.0;
    let computational_pct = raw_computational / computational_max * 100.0;

    Ok(ScoreRecord {
        composite: written_pct * written_weight + computational_pct * computational_weight,
        written_pct,
        computational_pct,
    })
}

/// Shared, destructively consumed mapping of eligible participants to their
/// scores for one grading run. A removed key never comes back.
#[derive(Debug, Default)]
pub struct ScorePool {
    entries: HashMap<ParticipantKey, Option<ScoreRecord>>,
}

impl ScorePool {
    /// Every roster participant starts with no score.
    pub fn from_roster<I>(roster: I) -> Self
    where
        I: IntoIterator<Item = ParticipantKey>,
    {
        let entries = roster.into_iter().map(|key| (key, None)).collect();
        Self { entries }
    }

    /// Overwrites the record of a roster participant. Returns false and leaves
    /// the pool untouched when the key never signed in.
    pub fn record(&mut self, key: &ParticipantKey, score: ScoreRecord) -> bool {
        match self.entries.get_mut(key) {
            Some(slot) => {
                *slot = Some(score);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn contains(&self, key: &ParticipantKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Score of a still-eligible participant that has a score row.
    pub fn score(&self, key: &ParticipantKey) -> Option<&ScoreRecord> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn claim(&mut self, key: &ParticipantKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SectionWeights {
    pub written_max: f64,
    pub computational_max: f64,
    pub distribution: Distribution,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScoringSummary {
    pub scored: usize,
    pub unmatched: usize,
}

/// Scores every row of one section into the pool. Rows whose key is not on
/// the roster are counted but do not enter the pool.
pub fn score_section(
    pool: &mut ScorePool,
    rows: &[RawScoreRow],
    weights: &SectionWeights,
) -> Result<ScoringSummary> {
    let (written_weight, computational_weight) = weights.distribution.fractions();
    let mut summary = ScoringSummary::default();

    for row in rows {
        let record = aggregate(
            row.written,
            row.computational,
            weights.written_max,
            weights.computational_max,
            written_weight,
            computational_weight,
        )?;

        if pool.record(&row.key, record) {
            summary.scored += 1;
        } else {
            tracing::warn!(participant = %row.key, "score row has no matching sign-in; skipped");
            summary.unmatched += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(email: &str) -> ParticipantKey {
        ParticipantKey::new(email, "First", "Last", "10")
    }

    #[test]
    fn aggregate_weights_percentages() {
        let record = aggregate(45.0, 30.0, 50.0, 60.0, 0.4, 0.6).unwrap();
        assert!((record.written_pct - 90.0).abs() < 1e-9);
        assert!((record.computational_pct - 50.0).abs() < 1e-9);
        assert!((record.composite - 66.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_is_pure() {
        let first = aggregate(71.0, 13.0, 80.0, 20.0, 0.5, 0.5).unwrap();
        let second = aggregate(71.0, 13.0, 80.0, 20.0, 0.5, 0.5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn aggregate_rejects_nan_and_negative_scores() {
        assert!(aggregate(f64::NAN, 1.0, 100.0, 100.0, 0.5, 0.5).is_err());
        assert!(aggregate(1.0, -3.0, 100.0, 100.0, 0.5, 0.5).is_err());
        assert!(aggregate(1.0, 1.0, 0.0, 100.0, 0.5, 0.5).is_err());
    }

    #[test]
    fn pool_only_records_roster_keys() {
        let mut pool = ScorePool::from_roster(vec![key("a@x.org")]);
        let record = aggregate(10.0, 10.0, 100.0, 100.0, 0.5, 0.5).unwrap();

        assert!(pool.record(&key("a@x.org"), record));
        assert!(!pool.record(&key("b@x.org"), record));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.score(&key("a@x.org")), Some(&record));
    }

    #[test]
    fn claimed_keys_leave_the_pool() {
        let mut pool = ScorePool::from_roster(vec![key("a@x.org")]);
        assert!(pool.contains(&key("a@x.org")));
        assert!(pool.claim(&key("a@x.org")));
        assert!(!pool.claim(&key("a@x.org")));
        assert!(pool.is_empty());
    }

    #[test]
    fn score_section_counts_unmatched_rows() {
        let mut pool = ScorePool::from_roster(vec![key("a@x.org")]);
        let rows = vec![
            RawScoreRow {
                line: 2,
                key: key("a@x.org"),
                written: 80.0,
                computational: 60.0,
            },
            RawScoreRow {
                line: 3,
                key: key("ghost@x.org"),
                written: 99.0,
                computational: 99.0,
            },
        ];
        let weights = SectionWeights {
            written_max: 100.0,
            computational_max: 100.0,
            distribution: Distribution::new(50, 50).unwrap(),
        };

        let summary = score_section(&mut pool, &rows, &weights).unwrap();
        assert_eq!(summary, ScoringSummary { scored: 1, unmatched: 1 });
        let record = pool.score(&key("a@x.org")).unwrap();
        assert!((record.composite - 70.0).abs() < 1e-9);
    }
}
