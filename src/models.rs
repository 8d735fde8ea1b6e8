use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a contestant as it appears on both sheets. Equality is exact,
/// so "Lee" and "lee " are different people.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParticipantKey {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
}

impl ParticipantKey {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        grade: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            grade: grade.into(),
        }
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}, {}", self.first_name, self.last_name, self.email)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub composite: f64,
    pub written_pct: f64,
    pub computational_pct: f64,
}

impl ScoreRecord {
    pub fn field(&self, field: ScoreField) -> f64 {
        match field {
            ScoreField::Composite => self.composite,
            ScoreField::Written => self.written_pct,
            ScoreField::Computational => self.computational_pct,
        }
    }
}

/// A raw row from a score sheet, before weighting.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScoreRow {
    pub line: u64,
    pub key: ParticipantKey,
    pub written: f64,
    pub computational: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreField {
    Composite,
    Written,
    Computational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AwardCategory {
    Overall,
    Written,
    Computational,
    Utr,
    Intron,
}

impl AwardCategory {
    pub const ALL: [AwardCategory; 5] = [
        AwardCategory::Overall,
        AwardCategory::Written,
        AwardCategory::Computational,
        AwardCategory::Utr,
        AwardCategory::Intron,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AwardCategory::Overall => "All Around",
            AwardCategory::Written => "Written",
            AwardCategory::Computational => "Computational",
            AwardCategory::Utr => "UTR",
            AwardCategory::Intron => "Intron",
        }
    }

    pub fn default_winners(self) -> usize {
        match self {
            AwardCategory::Overall | AwardCategory::Written | AwardCategory::Computational => 3,
            AwardCategory::Utr | AwardCategory::Intron => 1,
        }
    }

    /// UTR and Intron have no input column of their own and fall back to
    /// the composite.
    pub fn default_field(self) -> ScoreField {
        match self {
            AwardCategory::Written => ScoreField::Written,
            AwardCategory::Computational => ScoreField::Computational,
            AwardCategory::Overall | AwardCategory::Utr | AwardCategory::Intron => {
                ScoreField::Composite
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinnerEntry {
    pub key: ParticipantKey,
    pub award: AwardCategory,
    pub rank: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Beginner,
    Advanced,
}

impl Section {
    pub fn label(self) -> &'static str {
        match self {
            Section::Beginner => "Beginner",
            Section::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cohort {
    pub label: String,
    pub keys: Vec<ParticipantKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortResult {
    pub label: String,
    pub winners: Vec<WinnerEntry>,
}
