use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use stemsplit::{
    collect_inputs, prepare_output_dir, report_rule_warnings, run_batch, BatchOptions,
    BatchSummary,
};
use stemsplit_engine::SplitterConfig;
use stemsplit_rules::RuleIndex;

#[derive(Parser, Debug)]
#[command(name = "stemsplit")]
#[command(about = "Split MIDI files into remapped program-change stems", long_about = None)]
struct Args {
    /// Rule table (CSV with a header row and seven columns)
    #[arg(short, long)]
    rules: PathBuf,

    /// Output folder, created when missing
    #[arg(short, long)]
    output: PathBuf,

    /// MIDI files to process
    inputs: Vec<PathBuf>,

    /// Also process every .mid/.midi file in this folder
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Files processed in parallel
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// JSON settings file (drumChannel, maxChannel, loopStartToken, ...)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drum channel, 0-based (overrides the settings file)
    #[arg(long)]
    drum_channel: Option<u8>,

    /// Output file name suffix (overrides the settings file)
    #[arg(long)]
    suffix: Option<String>,

    /// Print each run log entry as a JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Suppress informational messages (only warnings and errors)
    #[arg(short, long)]
    quiet: bool,
}

fn load_config(args: &Args) -> Result<SplitterConfig> {
    let mut config = match &args.config {
        Some(path) => SplitterConfig::from_json_file(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?,
        None => SplitterConfig::default(),
    };
    if let Some(channel) = args.drum_channel {
        config.drum_channel = channel;
    }
    if let Some(suffix) = &args.suffix {
        config.output_suffix = suffix.clone();
    }
    config.validate().context("Invalid settings")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = load_config(&args)?;
    let inputs = collect_inputs(&args.inputs, args.input_dir.as_deref())?;

    let rules = RuleIndex::load(&args.rules)
        .with_context(|| format!("Failed to load rule table {}", args.rules.display()))?;
    let summary = rules.summary();
    log::info!(
        "Loaded {} rules ({} program rules, {} drum / {} melodic rule sets, {} skipped rows)",
        summary.rules,
        summary.program_rules,
        summary.drum_rule_sets,
        summary.melodic_rule_sets,
        summary.skipped_rows
    );
    log::info!(
        "Default channel types: {} remapped programs, {} original programs",
        summary.remapped_defaults,
        summary.original_defaults
    );
    let rule_warnings = report_rule_warnings(&rules, &args.rules, args.json);

    let options = BatchOptions {
        output_dir: args.output.clone(),
        jobs: args.jobs,
        json_log: args.json,
    };
    prepare_output_dir(&options.output_dir)?;

    let total = inputs.len();
    let outcomes = run_batch(inputs, Arc::new(rules), Arc::new(config), &options).await;
    let summary = BatchSummary::from_outcomes(&outcomes).with_rule_warnings(rule_warnings);
    log::info!(
        "Done: {} written, {} failed, {} tracks, {} warnings",
        summary.written,
        summary.failed,
        summary.tracks,
        summary.warnings
    );

    if summary.failed > 0 {
        anyhow::bail!("{} of {} files failed", summary.failed, total);
    }
    Ok(())
}
