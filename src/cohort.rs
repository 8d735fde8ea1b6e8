use std::collections::HashSet;
use std::path::Path;

use crate::config::CohortPolicy;
use crate::error::{GraderError, Result};
use crate::models::{Cohort, ParticipantKey, RawScoreRow, Section};

/// Partitions one section's score rows into the cohorts graded together.
/// Keys keep score-sheet order within each cohort.
pub fn build_cohorts(
    section: Section,
    sheet: &Path,
    rows: &[RawScoreRow],
    policy: CohortPolicy,
) -> Result<Vec<Cohort>> {
    let mut seen: HashSet<&ParticipantKey> = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(&row.key) {
            return Err(GraderError::config(format!(
                "{} appears more than once in {} (line {})",
                row.key,
                sheet.display(),
                row.line
            )));
        }
    }

    match policy {
        CohortPolicy::Single => Ok(vec![Cohort {
            label: format!("{} section winners", section.label()),
            keys: rows.iter().map(|row| row.key.clone()).collect(),
        }]),
        CohortPolicy::GradeSplit { threshold } => {
            let mut under = Vec::new();
            let mut upper = Vec::new();

            for row in rows {
                let grade: i64 = row.key.grade.trim().parse().map_err(|_| {
                    GraderError::malformed(
                        sheet,
                        row.line,
                        format!("grade '{}' is not a whole number", row.key.grade),
                    )
                })?;
                if grade < i64::from(threshold) {
                    under.push(row.key.clone());
                } else {
                    upper.push(row.key.clone());
                }
            }

            Ok(vec![
                Cohort {
                    label: "Underclassmen Winners".to_string(),
                    keys: under,
                },
                Cohort {
                    label: "Upperclassmen Winners".to_string(),
                    keys: upper,
                },
            ])
        }
    }
}

/// Warns about participants that appear in more than one cohort. They can
/// still only win once, in whichever cohort is graded first.
pub fn warn_overlaps(cohorts: &[Cohort]) {
    let mut seen: HashSet<&ParticipantKey> = HashSet::new();
    for cohort in cohorts {
        for key in &cohort.keys {
            if !seen.insert(key) {
                tracing::warn!(
                    participant = %key,
                    cohort = %cohort.label,
                    "participant listed in more than one cohort"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(line: u64, email: &str, grade: &str) -> RawScoreRow {
        RawScoreRow {
            line,
            key: ParticipantKey::new(email, "First", "Last", grade),
            written: 10.0,
            computational: 10.0,
        }
    }

    #[test]
    fn single_policy_keeps_sheet_order() {
        let rows = vec![row(2, "b@x.org", "9"), row(3, "a@x.org", "12")];
        let cohorts =
            build_cohorts(Section::Advanced, Path::new("adv.csv"), &rows, CohortPolicy::Single)
                .unwrap();

        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].label, "Advanced section winners");
        assert_eq!(cohorts[0].keys[0].email, "b@x.org");
        assert_eq!(cohorts[0].keys[1].email, "a@x.org");
    }

    #[test]
    fn grade_split_puts_threshold_in_upper_group() {
        let rows = vec![row(2, "a@x.org", "10"), row(3, "b@x.org", "11"), row(4, "c@x.org", " 9")];
        let cohorts = build_cohorts(
            Section::Beginner,
            Path::new("beg.csv"),
            &rows,
            CohortPolicy::GradeSplit { threshold: 11 },
        )
        .unwrap();

        let emails = |cohort: &Cohort| {
            cohort.keys.iter().map(|k| k.email.clone()).collect::<Vec<_>>()
        };
        assert_eq!(cohorts[0].label, "Underclassmen Winners");
        assert_eq!(cohorts[1].label, "Upperclassmen Winners");
        assert_eq!(emails(&cohorts[0]), vec!["a@x.org", "c@x.org"]);
        assert_eq!(emails(&cohorts[1]), vec!["b@x.org"]);
    }

    #[test]
    fn non_numeric_grade_fails_under_split() {
        let rows = vec![row(2, "a@x.org", "senior")];
        let err = build_cohorts(
            Section::Beginner,
            Path::new("beg.csv"),
            &rows,
            CohortPolicy::GradeSplit { threshold: 11 },
        )
        .unwrap_err();
        assert!(matches!(err, GraderError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn non_numeric_grade_is_fine_without_split() {
        let rows = vec![row(2, "a@x.org", "senior")];
        let cohorts =
            build_cohorts(Section::Beginner, Path::new("beg.csv"), &rows, CohortPolicy::Single);
        assert!(cohorts.is_ok());
    }

    #[test]
    fn duplicate_key_is_a_configuration_error() {
        let rows = vec![row(2, "a@x.org", "9"), row(3, "a@x.org", "9")];
        let err =
            build_cohorts(Section::Beginner, Path::new("beg.csv"), &rows, CohortPolicy::Single)
                .unwrap_err();
        assert!(matches!(err, GraderError::Configuration(_)));
    }
}
