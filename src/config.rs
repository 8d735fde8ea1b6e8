//! Run configuration.
//!
//! Values resolve in priority order: command-line flag, then the optional
//! TOML file passed with `--config`, then the built-in defaults below.
//!
//! ```toml
//! written-max = 50
//! computational-max = 40
//! grade-split-threshold = 11
//!
//! [sections]
//! beginner = "50/50"
//! advanced = "40/60"
//!
//! [awards.utr]
//! winners = 1
//! field = "written"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{GraderError, Result};
use crate::models::{AwardCategory, ScoreField, Section};
use crate::scoring::SectionWeights;

pub const DEFAULT_MAX_SCORE: u32 = 100;
pub const DEFAULT_GRADE_SPLIT: u32 = 11;
pub const DEFAULT_BEGINNER: Distribution = Distribution { written: 50, computational: 50 };
pub const DEFAULT_ADVANCED: Distribution = Distribution { written: 40, computational: 60 };

/// Written/computational split in whole percentages, e.g. "40/60".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    written: u32,
    computational: u32,
}

impl Distribution {
    pub fn new(written: u32, computational: u32) -> Result<Self> {
        if written.checked_add(computational) != Some(100) {
            return Err(GraderError::config(format!(
                "distribution {written}/{computational} does not total to 100"
            )));
        }
        Ok(Self { written, computational })
    }

    pub fn parse(value: &str) -> Result<Self> {
        let (written, computational) = value.split_once('/').ok_or_else(|| {
            GraderError::config(format!("distribution '{value}' is not of the form W/C"))
        })?;

        let parse_part = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| {
                GraderError::config(format!("distribution '{value}' has a non-integer part"))
            })
        };

        Self::new(parse_part(written)?, parse_part(computational)?)
    }

    pub fn fractions(&self) -> (f64, f64) {
        (
            f64::from(self.written) / 100.0,
            f64::from(self.computational) / 100.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardRule {
    pub winners: usize,
    pub field: ScoreField,
}

/// Which score field and how many rank-slots each award uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardTable {
    rules: HashMap<AwardCategory, AwardRule>,
}

impl Default for AwardTable {
    fn default() -> Self {
        let rules = AwardCategory::ALL
            .iter()
            .map(|&award| {
                (
                    award,
                    AwardRule {
                        winners: award.default_winners(),
                        field: award.default_field(),
                    },
                )
            })
            .collect();
        Self { rules }
    }
}

impl AwardTable {
    pub fn rule(&self, award: AwardCategory) -> AwardRule {
        self.rules.get(&award).copied().unwrap_or(AwardRule {
            winners: award.default_winners(),
            field: award.default_field(),
        })
    }

    pub fn set(&mut self, award: AwardCategory, rule: AwardRule) {
        self.rules.insert(award, rule);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortPolicy {
    Single,
    GradeSplit { threshold: u32 },
}

/// Command-line values that override the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub written_max: Option<u32>,
    pub computational_max: Option<u32>,
    pub beginner: Option<String>,
    pub advanced: Option<String>,
    pub advanced_sheet: Option<PathBuf>,
    pub grade_split: bool,
}

#[derive(Debug, Clone)]
pub struct GraderConfig {
    pub source: Option<PathBuf>,
    pub written_max: u32,
    pub computational_max: u32,
    pub beginner: Distribution,
    pub advanced: Distribution,
    pub awards: AwardTable,
    pub cohort_policy: CohortPolicy,
    pub advanced_sheet: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    written_max: Option<u32>,
    computational_max: Option<u32>,
    grade_split_threshold: Option<u32>,
    #[serde(default)]
    sections: RawSections,
    #[serde(default)]
    awards: RawAwards,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawSections {
    beginner: Option<String>,
    advanced: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawAwards {
    overall: Option<RawAward>,
    written: Option<RawAward>,
    computational: Option<RawAward>,
    utr: Option<RawAward>,
    intron: Option<RawAward>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAward {
    winners: Option<usize>,
    field: Option<ScoreField>,
}

impl GraderConfig {
    /// Reads the optional config file and layers the overrides on top.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let raw = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<RawConfig>(&content)?
            }
            None => RawConfig::default(),
        };
        Self::from_raw(raw, path.map(Path::to_path_buf), overrides)
    }

    fn from_raw(raw: RawConfig, source: Option<PathBuf>, overrides: Overrides) -> Result<Self> {
        if overrides.grade_split && overrides.advanced_sheet.is_some() {
            return Err(GraderError::config(
                "cannot have an advanced section and split by grade",
            ));
        }

        let written_max = overrides
            .written_max
            .or(raw.written_max)
            .unwrap_or(DEFAULT_MAX_SCORE);
        let computational_max = overrides
            .computational_max
            .or(raw.computational_max)
            .unwrap_or(DEFAULT_MAX_SCORE);
        if written_max == 0 || computational_max == 0 {
            return Err(GraderError::config("maximum scores must be positive"));
        }

        let beginner = match overrides.beginner.or(raw.sections.beginner) {
            Some(value) => Distribution::parse(&value)?,
            None => DEFAULT_BEGINNER,
        };
        let advanced = match overrides.advanced.or(raw.sections.advanced) {
            Some(value) => Distribution::parse(&value)?,
            None => DEFAULT_ADVANCED,
        };

        let mut awards = AwardTable::default();
        let raw_awards = [
            (AwardCategory::Overall, raw.awards.overall),
            (AwardCategory::Written, raw.awards.written),
            (AwardCategory::Computational, raw.awards.computational),
            (AwardCategory::Utr, raw.awards.utr),
            (AwardCategory::Intron, raw.awards.intron),
        ];
        for (award, entry) in raw_awards {
            let Some(entry) = entry else { continue };
            let field = entry.field.unwrap_or(award.default_field());
            // The joint written/computational phase always ranks by its own field.
            if matches!(award, AwardCategory::Written | AwardCategory::Computational)
                && field != award.default_field()
            {
                return Err(GraderError::config(format!(
                    "the {} award cannot be re-mapped to another score field",
                    award.label()
                )));
            }
            awards.set(
                award,
                AwardRule {
                    winners: entry.winners.unwrap_or(award.default_winners()),
                    field,
                },
            );
        }

        let cohort_policy = if overrides.grade_split {
            CohortPolicy::GradeSplit {
                threshold: raw.grade_split_threshold.unwrap_or(DEFAULT_GRADE_SPLIT),
            }
        } else {
            CohortPolicy::Single
        };

        Ok(Self {
            source,
            written_max,
            computational_max,
            beginner,
            advanced,
            awards,
            cohort_policy,
            advanced_sheet: overrides.advanced_sheet,
        })
    }

    pub fn section_weights(&self, section: Section) -> SectionWeights {
        SectionWeights {
            written_max: f64::from(self.written_max),
            computational_max: f64::from(self.computational_max),
            distribution: match section {
                Section::Beginner => self.beginner,
                Section::Advanced => self.advanced,
            },
        }
    }
}
