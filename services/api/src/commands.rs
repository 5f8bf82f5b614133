use crate::infra::build_scorer;
use chrono::Utc;
use clap::Args;
use creditpath::config::AppConfig;
use creditpath::error::AppError;
use creditpath::scoring::{
    ApplicantRecord, CreditScorer, DefaultClassSource, PredictionResponse,
};
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding one applicant record
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Override the configured artifact directory
    #[arg(long)]
    pub(crate) artifacts: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ArtifactArgs {
    /// Override the configured artifact directory
    #[arg(long)]
    pub(crate) artifacts: Option<PathBuf>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let scorer = build_scorer(&config.scoring, args.artifacts)?;

    let raw = fs::read(&args.input)?;
    let record: ApplicantRecord = serde_json::from_slice(&raw)?;
    let result = scorer.score(&record)?;

    let response = PredictionResponse::from_result(result, Utc::now());
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub(crate) fn run_artifacts_check(args: ArtifactArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let dir = args
        .artifacts
        .clone()
        .unwrap_or_else(|| config.scoring.artifact_dir.clone());
    let scorer = build_scorer(&config.scoring, args.artifacts)?;

    println!("Artifacts at {} are valid", dir.display());
    print!("{}", render_artifact_summary(&scorer));
    Ok(())
}

fn describe_source(source: DefaultClassSource) -> &'static str {
    match source {
        DefaultClassSource::Pinned => "pinned by manifest",
        DefaultClassSource::KnownLabel => "matched a known default label",
        DefaultClassSource::NumericOne => "numeric class 1",
        DefaultClassSource::TextOne => "text class \"1\"",
        DefaultClassSource::Positional => "positional fallback",
    }
}

pub(crate) fn render_artifact_summary(scorer: &CreditScorer) -> String {
    let bundle = scorer.bundle();
    let classes: Vec<String> = bundle
        .classifier()
        .classes()
        .iter()
        .map(ToString::to_string)
        .collect();
    let sub_grades = bundle.sub_grades().allowed_labels();
    let default_class = bundle.default_class();
    let thresholds = scorer.decision_config().tier_thresholds;

    let lines = [
        format!("  Model version: {}", bundle.model_version()),
        format!(
            "  Features ({}): {}",
            bundle.feature_names().len(),
            bundle.feature_names().join(", ")
        ),
        format!("  Classes: {}", classes.join(", ")),
        format!(
            "  Default class: {} (index {}, {})",
            default_class.label,
            default_class.index,
            describe_source(default_class.source)
        ),
        format!(
            "  Sub-grades: {} ({} .. {})",
            sub_grades.len(),
            sub_grades.first().map(String::as_str).unwrap_or("-"),
            sub_grades.last().map(String::as_str).unwrap_or("-")
        ),
        format!(
            "  Tier thresholds: very_low <= {:.2}, low <= {:.2}, moderate <= {:.2}, high <= {:.2}",
            thresholds.very_low(),
            thresholds.low(),
            thresholds.moderate(),
            thresholds.high()
        ),
    ];

    lines.join("\n") + "\n"
}
