use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use bookmatch::decide::{DEFAULT_AUTO_SCORE_THRESHOLD, DEFAULT_GAP_THRESHOLD};
use bookmatch::error::{parse_delay, parse_threshold};
use bookmatch::fetch::{DEFAULT_MAX_RESULTS, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
use bookmatch::interrupt::INTERRUPTED_EXIT;
use bookmatch::journal::Journal;
use bookmatch::manual::{AlwaysSkip, Suspended, TerminalResolver};
use bookmatch::table::{self, EnrichedWriter};
use bookmatch::{
    scorer_for, Candidate, CandidateFetcher, Capabilities, DecisionPolicy, HttpTransport,
    Interrupt, ManualResolver, RetryPolicy, RunSummary, ScorerChoice, TitleResolver,
};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser, Debug)]
#[command(
    name = "bookmatch",
    version,
    about = "Enrich a CSV of book titles with Goodreads metadata"
)]
struct Cli {
    /// Input CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// Column holding the book titles (default: first column)
    #[arg(short, long)]
    column: Option<String>,

    /// Output CSV (default: <input>_with_goodreads.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pause between successive catalog requests, in seconds
    #[arg(long, default_value = "1.5", value_parser = parse_delay)]
    delay: Duration,

    /// Top score at or above which the best match is taken without asking
    #[arg(long, default_value_t = DEFAULT_AUTO_SCORE_THRESHOLD, value_parser = parse_threshold)]
    auto_threshold: f64,

    /// Lead over the runner-up at or above which the best match is taken without asking
    #[arg(long, default_value_t = DEFAULT_GAP_THRESHOLD, value_parser = parse_threshold)]
    gap_threshold: f64,

    /// Never ask: always take the best-scoring match
    #[arg(long, action = ArgAction::SetTrue)]
    no_confirm: bool,

    /// Search results considered per title
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Attempts per title on network failure
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Similarity scorer
    #[arg(long, value_enum, default_value_t = ScorerChoice::Auto)]
    scorer: ScorerChoice,

    /// Maximum number of rows to look up (0 = all); later rows are copied through
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// Append one JSON line per decision to this file
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Enable debug logs (written to logs/bookmatch.log unless --log-file is given)
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Explicit log file path (enables file logging). Ignored if empty.
    #[arg(long, default_value = "")]
    log_file: String,
}

fn init_logging(args: &Cli) {
    if args.debug || !args.log_file.is_empty() {
        let log_path = if !args.log_file.is_empty() {
            PathBuf::from(&args.log_file)
        } else {
            PathBuf::from("logs").join("bookmatch.log")
        };
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::File::create(&log_path) {
            Ok(file) => {
                let cfg = ConfigBuilder::new()
                    .set_time_format_rfc3339()
                    .set_target_level(LevelFilter::Off)
                    .build();
                if let Err(e) = WriteLogger::init(LevelFilter::Debug, cfg, file) {
                    eprintln!("[warn] file logger init failed: {e}");
                } else {
                    println!("[debug] logs → {:?}", log_path);
                }
                return;
            }
            Err(e) => {
                eprintln!("[warn] cannot create log file {:?}: {e}", log_path);
            }
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn manual_resolver(args: &Cli, pb: &ProgressBar) -> Box<dyn ManualResolver> {
    if !args.no_confirm && !std::io::stdin().is_terminal() {
        warn!("stdin is not a terminal; ambiguous titles will be left blank");
        return Box::new(AlwaysSkip);
    }
    Box::new(Suspended::new(TerminalResolver::stdio(), pb.clone()))
}

async fn run() -> Result<()> {
    let args = Cli::parse();
    init_logging(&args);

    let input = table::read_table(&args.input)?;
    let column = table::resolve_column(&input.headers, args.column.as_deref())?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| table::default_output_path(&args.input));
    info!(
        "Processing {} entries from {:?} (column '{}')",
        input.rows.len(),
        args.input,
        &input.headers[column]
    );

    let caps = Capabilities::detect();
    let scorer = scorer_for(caps, args.scorer);
    debug!("capabilities: {caps:?}, scorer: {}", scorer.name());

    let policy = DecisionPolicy {
        auto_score_threshold: args.auto_threshold,
        gap_threshold: args.gap_threshold,
        no_confirm: args.no_confirm,
    };
    let fetcher = CandidateFetcher::new(HttpTransport::new(DEFAULT_TIMEOUT)?)
        .with_retry(RetryPolicy {
            max_retries: args.max_retries,
            ..RetryPolicy::default()
        })
        .with_max_results(args.max_results)
        .with_pace(args.delay);

    let pb = ProgressBar::new(input.rows.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?,
    );
    let mut resolver = TitleResolver::new(fetcher, scorer, policy, manual_resolver(&args, &pb));

    let interrupt = Interrupt::default();
    tokio::spawn(interrupt.clone().watch(tokio::signal::ctrl_c(), || {
        eprintln!("\ninterrupted; rows already written are kept, the rest is dropped");
        std::process::exit(INTERRUPTED_EXIT);
    }));

    let mut writer = EnrichedWriter::create(&output, &input.headers)?;
    let mut journal = args.journal.as_deref().map(Journal::open).transpose()?;
    let mut summary = RunSummary::default();

    for (idx, row) in input.rows.iter().enumerate() {
        if args.limit > 0 && idx >= args.limit {
            writer.write_row(row, &Candidate::empty())?;
            pb.inc(1);
            continue;
        }
        let title = table::title_cell(row, column);
        let outcome = resolver.resolve(title).await;
        if interrupt.is_raised() {
            // in-flight row is dropped
            std::process::exit(INTERRUPTED_EXIT);
        }
        writer.write_row(row, &outcome.resolution)?;
        if let Some(journal) = journal.as_mut() {
            journal.record(idx, title, &outcome)?;
        }
        summary.record(&outcome);
        pb.inc(1);
        pb.set_message(format!("#{idx} {:?}", outcome.state));
    }
    writer.finish()?;
    pb.finish_with_message("Done");

    info!(
        "Looked up {} rows: {} auto, {} escalated ({} picked by hand), {} without match, {} blank",
        summary.total(),
        summary.auto,
        summary.escalated,
        summary.manual_chosen,
        summary.no_match,
        summary.empty
    );
    println!("Results saved to: {}", output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}
