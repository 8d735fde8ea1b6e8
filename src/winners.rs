use crate::config::{AwardRule, AwardTable};
use crate::models::{AwardCategory, Cohort, ParticipantKey, ScoreField, WinnerEntry};
use crate::scoring::ScorePool;

/// Scores are compared after rounding to 5 decimal places so that float
/// noise from the weighting never splits a genuine tie.
pub fn round_score(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

type TieSet = Vec<(ParticipantKey, f64)>;

/// Every cohort key still in the pool that shares the current maximum of
/// `field`, in cohort order.
fn leaders(pool: &ScorePool, keys: &[ParticipantKey], field: ScoreField) -> TieSet {
    let mut top: Option<f64> = None;
    let mut ties = TieSet::new();

    for key in keys {
        let Some(record) = pool.score(key) else {
            continue;
        };
        let score = round_score(record.field(field));
        match top {
            Some(current) if score < current => {}
            Some(current) if score == current => ties.push((key.clone(), score)),
            _ => {
                top = Some(score);
                ties.clear();
                ties.push((key.clone(), score));
            }
        }
    }

    ties
}

fn claim_slot(pool: &mut ScorePool, slot: &TieSet) {
    for (key, _) in slot {
        pool.claim(key);
    }
}

fn entries(award: AwardCategory, slots: Vec<TieSet>) -> impl Iterator<Item = WinnerEntry> {
    slots.into_iter().enumerate().flat_map(move |(index, slot)| {
        slot.into_iter().map(move |(key, score)| WinnerEntry {
            key,
            award,
            rank: index + 1,
            score,
        })
    })
}

/// Top-K extraction for a single-track award. A rank-slot holds every
/// participant tied at the maximum, and all of them leave the pool together.
pub fn top_k(
    pool: &mut ScorePool,
    keys: &[ParticipantKey],
    award: AwardCategory,
    rule: AwardRule,
) -> Vec<WinnerEntry> {
    let mut slots = Vec::with_capacity(rule.winners);

    for _ in 0..rule.winners {
        let slot = leaders(pool, keys, rule.field);
        if slot.is_empty() {
            tracing::debug!(award = award.label(), filled = slots.len(), "pool exhausted");
            break;
        }
        claim_slot(pool, &slot);
        slots.push(slot);
    }

    entries(award, slots).collect()
}

/// Written and computational awards draw from the same pool at once. A
/// participant leading both tracks in one iteration is kept in only one of
/// them, alternating which track gives them up.
#[derive(Debug)]
pub struct JointExtraction {
    counter: u64,
    written_target: usize,
    computational_target: usize,
    written: Vec<TieSet>,
    computational: Vec<TieSet>,
}

impl JointExtraction {
    pub fn new(written_target: usize, computational_target: usize) -> Self {
        Self {
            counter: 1,
            written_target,
            computational_target,
            written: Vec::new(),
            computational: Vec::new(),
        }
    }

    fn written_open(&self) -> bool {
        self.written.len() < self.written_target
    }

    fn computational_open(&self) -> bool {
        self.computational.len() < self.computational_target
    }

    /// Runs iterations until both tracks are full or nobody is left.
    pub fn run(mut self, pool: &mut ScorePool, keys: &[ParticipantKey]) -> Vec<WinnerEntry> {
        while self.written_open() || self.computational_open() {
            if !self.step(pool, keys) {
                break;
            }
        }

        entries(AwardCategory::Written, self.written)
            .chain(entries(AwardCategory::Computational, self.computational))
            .collect()
    }

    /// One iteration. Returns false once neither open track has a candidate.
    fn step(&mut self, pool: &mut ScorePool, keys: &[ParticipantKey]) -> bool {
        let mut written_ties = leaders(pool, keys, ScoreField::Written);
        let mut computational_ties = leaders(pool, keys, ScoreField::Computational);

        let written_open = self.written_open() && !written_ties.is_empty();
        let computational_open = self.computational_open() && !computational_ties.is_empty();
        if !written_open && !computational_open {
            return false;
        }

        // A full track still takes part in the exclusion: its leader can be
        // withheld from the open track for this iteration.
        let double_leaders: Vec<ParticipantKey> = written_ties
            .iter()
            .filter(|(key, _)| computational_ties.iter().any(|(other, _)| other == key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in double_leaders {
            if self.counter % 2 == 1 {
                computational_ties.retain(|(other, _)| *other != key);
                tracing::debug!(
                    participant = %key,
                    counter = self.counter,
                    "leads both tracks; kept for written"
                );
            } else {
                written_ties.retain(|(other, _)| *other != key);
                tracing::debug!(
                    participant = %key,
                    counter = self.counter,
                    "leads both tracks; kept for computational"
                );
            }
            self.counter += 1;
        }

        if self.written_open() && !written_ties.is_empty() {
            claim_slot(pool, &written_ties);
            self.written.push(written_ties);
        }
        if self.computational_open() && !computational_ties.is_empty() {
            claim_slot(pool, &computational_ties);
            self.computational.push(computational_ties);
        }

        true
    }
}

/// Runs every award phase for one cohort against the shared pool, in
/// announcement order. Winners are claimed from the pool as they are found.
pub fn select_winners(
    pool: &mut ScorePool,
    cohort: &Cohort,
    awards: &AwardTable,
) -> Vec<WinnerEntry> {
    let keys = cohort.keys.as_slice();
    let overall = awards.rule(AwardCategory::Overall);
    let mut winners = top_k(pool, keys, AwardCategory::Overall, overall);

    let joint = JointExtraction::new(
        awards.rule(AwardCategory::Written).winners,
        awards.rule(AwardCategory::Computational).winners,
    );
    winners.extend(joint.run(pool, keys));

    for award in [AwardCategory::Utr, AwardCategory::Intron] {
        winners.extend(top_k(pool, keys, award, awards.rule(award)));
    }

    tracing::info!(
        cohort = %cohort.label,
        winners = winners.len(),
        remaining = pool.len(),
        "selected winners"
    );
    winners
}
