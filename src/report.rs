use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AwardCategory, CohortResult, WinnerEntry};
use crate::scoring::ScoringSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Announcement lines, one per winner
    #[default]
    Text,
    /// Markdown report
    Markdown,
    /// JSON document
    Json,
}

#[derive(Debug, Serialize)]
pub struct GradingReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub scored: usize,
    pub unmatched: usize,
    pub cohorts: Vec<CohortResult>,
}

impl GradingReport {
    pub fn new(summary: ScoringSummary, cohorts: Vec<CohortResult>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            scored: summary.scored,
            unmatched: summary.unmatched,
            cohorts,
        }
    }

    pub fn render(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Text => Ok(render_text(&self.cohorts)),
            OutputFormat::Markdown => Ok(self.render_markdown()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    fn render_markdown(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "# Contest Winners");
        let _ = writeln!(
            output,
            "Run {} generated {} ({} scored, {} unmatched score rows)",
            self.run_id,
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.scored,
            self.unmatched
        );

        for cohort in &self.cohorts {
            let _ = writeln!(output);
            let _ = writeln!(output, "## {}", cohort.label);

            for award in AwardCategory::ALL {
                let _ = writeln!(output);
                let _ = writeln!(output, "### {}", award.label());
                let mut winners = of_award(&cohort.winners, award).peekable();
                if winners.peek().is_none() {
                    let _ = writeln!(output, "No winner.");
                }
                for winner in winners {
                    let _ = writeln!(
                        output,
                        "- #{} {} {} ({}) score {}",
                        winner.rank,
                        winner.key.first_name,
                        winner.key.last_name,
                        winner.key.email,
                        format_score(winner.score)
                    );
                }
            }
        }

        output
    }
}

fn of_award(winners: &[WinnerEntry], award: AwardCategory) -> impl Iterator<Item = &WinnerEntry> {
    winners.iter().filter(move |winner| winner.award == award)
}

/// Whole scores keep one decimal ("70.0") like the announcement sheets.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.1}")
    } else {
        score.to_string()
    }
}

pub fn render_text(cohorts: &[CohortResult]) -> String {
    let mut output = String::new();

    for cohort in cohorts {
        let _ = writeln!(output, "-------- {} --------", cohort.label);
        let _ = writeln!(output);

        for award in AwardCategory::ALL {
            for winner in of_award(&cohort.winners, award) {
                let _ = writeln!(
                    output,
                    " -- #{} {} Winner: {}, score={}",
                    winner.rank,
                    award.label(),
                    winner.key,
                    format_score(winner.score)
                );
            }
            let _ = writeln!(output);
        }
    }

    output
}
