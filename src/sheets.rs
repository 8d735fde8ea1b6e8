use std::path::Path;

use csv::StringRecord;

use crate::error::{GraderError, Result};
use crate::models::{ParticipantKey, RawScoreRow};

// Sign-in sheet columns, 0-indexed. Timestamp (0), school (4) and
// location (6) are not used for grading.
const SIGNIN_EMAIL: usize = 1;
const SIGNIN_FIRST: usize = 2;
const SIGNIN_LAST: usize = 3;
const SIGNIN_GRADE: usize = 5;

// Score sheet columns, 0-indexed.
const SCORE_EMAIL: usize = 0;
const SCORE_FIRST: usize = 1;
const SCORE_LAST: usize = 2;
const SCORE_GRADE: usize = 3;
const SCORE_WRITTEN: usize = 4;
const SCORE_COMPUTATIONAL: usize = 5;

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_path(path)?)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or_default()
}

fn field<'r>(path: &Path, record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str> {
    record
        .get(index)
        .ok_or_else(|| {
            GraderError::malformed(path, line_of(record), format!("missing {name} column"))
        })
}

fn key_at(
    path: &Path,
    record: &StringRecord,
    columns: [usize; 4],
) -> Result<ParticipantKey> {
    let [email, first, last, grade] = columns;
    Ok(ParticipantKey::new(
        field(path, record, email, "email")?,
        field(path, record, first, "first name")?,
        field(path, record, last, "last name")?,
        field(path, record, grade, "grade")?,
    ))
}

fn score_at(path: &Path, record: &StringRecord, index: usize, name: &str) -> Result<f64> {
    let raw = field(path, record, index, name)?;
    let value: f64 = raw.trim().parse().map_err(|_| {
        let reason = format!("{name} score '{raw}' is not a number");
        GraderError::malformed(path, line_of(record), reason)
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(GraderError::malformed(
            path,
            line_of(record),
            format!("{name} score '{raw}' must be a finite non-negative number"),
        ));
    }
    Ok(value)
}

/// Reads the sign-in sheet into roster keys, in sheet order.
pub fn read_roster(path: &Path) -> Result<Vec<ParticipantKey>> {
    let mut reader = reader(path)?;
    let mut roster = Vec::new();

    for result in reader.records() {
        let record = result?;
        roster.push(key_at(
            path,
            &record,
            [SIGNIN_EMAIL, SIGNIN_FIRST, SIGNIN_LAST, SIGNIN_GRADE],
        )?);
    }

    tracing::debug!(path = %path.display(), participants = roster.len(), "read sign-in sheet");
    Ok(roster)
}

/// Reads a section's score sheet, in sheet order.
pub fn read_scores(path: &Path) -> Result<Vec<RawScoreRow>> {
    let mut reader = reader(path)?;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        rows.push(RawScoreRow {
            line: line_of(&record),
            key: key_at(
                path,
                &record,
                [SCORE_EMAIL, SCORE_FIRST, SCORE_LAST, SCORE_GRADE],
            )?,
            written: score_at(path, &record, SCORE_WRITTEN, "written")?,
            computational: score_at(path, &record, SCORE_COMPUTATIONAL, "computational")?,
        });
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "read score sheet");
    Ok(rows)
}
