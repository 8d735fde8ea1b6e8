use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

mod cohort;
mod config;
mod error;
mod models;
mod report;
mod scoring;
mod sheets;
mod winners;

use config::{GraderConfig, Overrides};
use models::{CohortResult, Section};
use report::{GradingReport, OutputFormat};
use scoring::{ScorePool, ScoringSummary};

#[derive(Parser)]
#[command(name = "contest-grader")]
#[command(about = "Finds the winners of the Genes and Health contest", long_about = None)]
#[command(group(
    ArgGroup::new("layout")
        .args(["advpath", "gradesplit"])
        .multiple(false)
))]
struct Cli {
    /// Total possible points on the written portion [default: 100]
    #[arg(short = 'w', long)]
    writemax: Option<u32>,
    /// Total possible points on the computational portion [default: 100]
    #[arg(short = 'c', long)]
    compmax: Option<u32>,
    /// Written/computational split for the beginner section [default: 50/50]
    #[arg(short = 'b', long)]
    begdst: Option<String>,
    /// Written/computational split for the advanced section [default: 40/60]
    #[arg(short = 'a', long)]
    advdst: Option<String>,
    /// Score sheet for the advanced section
    #[arg(short = 'A', long)]
    advpath: Option<PathBuf>,
    /// Grade underclassmen and upperclassmen separately
    #[arg(short = 'G', long)]
    gradesplit: bool,
    /// Sign-in sheet in CSV format
    #[arg(short = 's', long)]
    signin: PathBuf,
    /// Score sheet for the beginner section in CSV format
    grades: PathBuf,
    /// Optional TOML file with maxima, distributions and award rules
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Scores every section into one pool and then selects winners cohort by
/// cohort. The pool is shared, so a participant wins at most once per run.
fn grade(config: &GraderConfig, signin: &Path, beginner: &Path) -> error::Result<GradingReport> {
    let roster = sheets::read_roster(signin)?;
    let mut pool = ScorePool::from_roster(roster);
    if pool.is_empty() {
        tracing::warn!(sheet = %signin.display(), "sign-in sheet has no participants");
    }
    tracing::info!(participants = pool.len(), "loaded sign-in sheet");

    let mut sections = vec![(Section::Beginner, beginner.to_path_buf())];
    if let Some(advanced) = &config.advanced_sheet {
        sections.push((Section::Advanced, advanced.clone()));
    }

    let mut scored_sections = Vec::with_capacity(sections.len());
    let mut cohorts = Vec::new();
    for (section, sheet) in &sections {
        let rows = sheets::read_scores(sheet)?;
        cohorts.extend(cohort::build_cohorts(*section, sheet, &rows, config.cohort_policy)?);
        scored_sections.push((*section, rows));
    }
    cohort::warn_overlaps(&cohorts);

    let mut summary = ScoringSummary::default();
    for (section, rows) in &scored_sections {
        let weights = config.section_weights(*section);
        let section_summary = scoring::score_section(&mut pool, rows, &weights)?;
        tracing::info!(
            section = section.label(),
            scored = section_summary.scored,
            unmatched = section_summary.unmatched,
            "scored section"
        );
        summary.scored += section_summary.scored;
        summary.unmatched += section_summary.unmatched;
    }

    let results = cohorts
        .into_iter()
        .map(|cohort| CohortResult {
            winners: winners::select_winners(&mut pool, &cohort, &config.awards),
            label: cohort.label,
        })
        .collect();

    Ok(GradingReport::new(summary, results))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let overrides = Overrides {
        written_max: cli.writemax,
        computational_max: cli.compmax,
        beginner: cli.begdst,
        advanced: cli.advdst,
        advanced_sheet: cli.advpath,
        grade_split: cli.gradesplit,
    };
    let config = GraderConfig::resolve(cli.config.as_deref(), overrides)
        .context("invalid grading configuration")?;
    if let Some(source) = &config.source {
        tracing::info!(config = %source.display(), "loaded config file");
    }

    let report = grade(&config, &cli.signin, &cli.grades).context("grading failed")?;
    let rendered = report.render(cli.format)?;

    match cli.out {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}.", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::Write;

    use super::*;
    use crate::error::GraderError;
    use crate::models::AwardCategory;

    const SIGNIN_HEADER: &str = "Timestamp,Email,First,Last,School,Grade,Location\n";
    const SCORES_HEADER: &str = "Email,First,Last,Grade,Written,Computational\n";

    fn sheet(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn config(overrides: Overrides) -> GraderConfig {
        GraderConfig::resolve(None, overrides).unwrap()
    }

    #[test]
    fn grades_beginner_and_advanced_sections() {
        let dir = tempfile::tempdir().unwrap();
        let signin = sheet(
            &dir,
            "signin.csv",
            &format!(
                "{SIGNIN_HEADER}\
                 t,a@x.org,Ana,Diaz,North,9,R1\n\
                 t,b@x.org,Ben,Ng,North,10,R1\n\
                 t,c@x.org,Cy,Ode,South,11,R2\n\
                 t,d@x.org,Di,Park,South,12,R2\n"
            ),
        );
        let beginner = sheet(
            &dir,
            "beginner.csv",
            &format!(
                "{SCORES_HEADER}\
                 a@x.org,Ana,Diaz,9,80,60\n\
                 b@x.org,Ben,Ng,10,40,90\n\
                 ghost@x.org,Gus,Host,9,100,100\n"
            ),
        );
        let advanced = sheet(
            &dir,
            "advanced.csv",
            &format!("{SCORES_HEADER}c@x.org,Cy,Ode,11,50,50\nd@x.org,Di,Park,12,100,20\n"),
        );

        let config = config(Overrides {
            advanced_sheet: Some(advanced),
            ..Overrides::default()
        });
        let report = grade(&config, &signin, &beginner).unwrap();

        assert_eq!(report.scored, 4);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.cohorts.len(), 2);
        assert_eq!(report.cohorts[0].label, "Beginner section winners");
        assert_eq!(report.cohorts[1].label, "Advanced section winners");

        // Beginner 50/50: Ana 70, Ben 65. Advanced 40/60: Cy 50, Di 52.
        let beginner_overall: Vec<_> = report.cohorts[0]
            .winners
            .iter()
            .map(|w| (w.rank, w.key.email.as_str(), w.score))
            .collect();
        assert_eq!(beginner_overall, vec![(1, "a@x.org", 70.0), (2, "b@x.org", 65.0)]);
        let advanced_overall: Vec<_> = report.cohorts[1]
            .winners
            .iter()
            .map(|w| (w.rank, w.key.email.as_str()))
            .collect();
        assert_eq!(advanced_overall, vec![(1, "d@x.org"), (2, "c@x.org")]);
        assert!(report
            .cohorts
            .iter()
            .flat_map(|c| &c.winners)
            .all(|w| w.award == AwardCategory::Overall));
    }

    #[test]
    fn grade_split_produces_two_cohorts_with_exclusive_winners() {
        let dir = tempfile::tempdir().unwrap();
        let mut signin = String::from(SIGNIN_HEADER);
        let mut scores = String::from(SCORES_HEADER);
        for i in 0..12u32 {
            let grade = 9 + i % 4;
            signin.push_str(&format!("t,p{i}@x.org,P{i},L,S,{grade},R\n"));
            let (written, computational) = ((i * 7) % 50, (i * 11) % 50);
            scores.push_str(&format!("p{i}@x.org,P{i},L,{grade},{written},{computational}\n"));
        }
        let signin = sheet(&dir, "signin.csv", &signin);
        let beginner = sheet(&dir, "beginner.csv", &scores);

        let config = config(Overrides {
            grade_split: true,
            ..Overrides::default()
        });
        let report = grade(&config, &signin, &beginner).unwrap();

        assert_eq!(report.cohorts[0].label, "Underclassmen Winners");
        assert_eq!(report.cohorts[1].label, "Upperclassmen Winners");
        let mut seen = HashSet::new();
        for winner in report.cohorts.iter().flat_map(|c| &c.winners) {
            assert!(seen.insert(winner.key.email.clone()));
        }
        for winner in &report.cohorts[0].winners {
            assert!(winner.key.grade.parse::<u32>().unwrap() < 11);
        }
    }

    #[test]
    fn duplicate_score_rows_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let signin = sheet(
            &dir,
            "signin.csv",
            &format!("{SIGNIN_HEADER}t,a@x.org,Ana,Diaz,N,9,R\n"),
        );
        let beginner = sheet(
            &dir,
            "beginner.csv",
            &format!("{SCORES_HEADER}a@x.org,Ana,Diaz,9,80,60\na@x.org,Ana,Diaz,9,10,10\n"),
        );

        let err = grade(&config(Overrides::default()), &signin, &beginner).unwrap_err();
        assert!(matches!(err, GraderError::Configuration(_)));
    }

    #[test]
    fn cli_rejects_advanced_sheet_with_grade_split() {
        let result = Cli::try_parse_from([
            "contest-grader",
            "-s",
            "in.csv",
            "-A",
            "adv.csv",
            "-G",
            "grades.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_accepts_original_flags() {
        let cli = Cli::try_parse_from([
            "contest-grader", "-w", "50", "-c", "40", "-b", "30/70", "-s", "in.csv", "grades.csv",
        ])
        .unwrap();
        assert_eq!(cli.writemax, Some(50));
        assert_eq!(cli.compmax, Some(40));
        assert_eq!(cli.begdst.as_deref(), Some("30/70"));
        assert_eq!(cli.format, OutputFormat::Text);
    }
}
