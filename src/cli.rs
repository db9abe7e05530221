use crate::config::RaceConfig;
use crate::output::{default_file_name, save_content};
use crate::tools::fetch::{race_with_cancel, Mode, RaceOutcome, Target};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const PREVIEW_CHARS: usize = 1000;

#[derive(Parser)]
#[command(
    name = "pagerace",
    version,
    about = "Fetch a single page by racing many retrieval strategies"
)]
struct Cli {
    /// Page to fetch; `https://` is assumed when no scheme is given
    #[arg(required_unless_present = "list")]
    url: Option<String>,

    /// Output file (defaults to <domain>_single_page_<timestamp>.html)
    output: Option<PathBuf>,

    /// Try strategies one at a time instead of racing them
    #[arg(short, long)]
    sequential: bool,

    /// Leave out the slow, extended-header and referrer-warming strategies
    #[arg(long)]
    standard: bool,

    /// Comma-separated strategy names, in attempt order
    #[arg(long, value_delimiter = ',')]
    strategies: Vec<String>,

    #[arg(long)]
    max_retries: Option<u32>,

    #[arg(long)]
    base_delay_ms: Option<u64>,

    /// Most strategies running at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-attempt timeout
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Seed for reproducible jitter and user agent rotation
    #[arg(long)]
    seed: Option<u64>,

    /// Config file (defaults to ~/.pagerace/config.json when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the outcome as JSON on stdout instead of saving a file
    #[arg(long)]
    json: bool,

    /// List built-in strategies and exit
    #[arg(long)]
    list: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, cfg: &mut RaceConfig) {
        if self.sequential {
            cfg.mode = Mode::Sequential;
        }
        if self.standard {
            cfg.aggressive = false;
        }
        if !self.strategies.is_empty() {
            cfg.strategies = Some(self.strategies.clone());
        }
        if let Some(n) = self.max_retries {
            cfg.max_retries = n;
        }
        if let Some(ms) = self.base_delay_ms {
            cfg.base_delay_ms = ms;
        }
        if let Some(n) = self.concurrency {
            cfg.concurrency_cap = n;
        }
        if let Some(ms) = self.timeout_ms {
            cfg.timeout_ms = ms;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
    }
}

/// Parse arguments, run the race and return the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    crate::log::init_logging(cli.verbose);

    if cli.list {
        for name in crate::tools::fetch::strategies::names(true) {
            println!("{name}");
        }
        return 0;
    }

    match run_with_args(cli) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

fn run_with_args(cli: Cli) -> anyhow::Result<bool> {
    let url = cli.url.as_deref().context("missing URL")?;
    let target = Target::parse(url)?;
    let mut cfg = RaceConfig::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut cfg);
    let options = cfg.to_options()?;
    let strategies = cfg.strategy_set()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to create async runtime")?;

    eprintln!("Target: {target}");
    eprintln!(
        "Racing {} strategies {}",
        strategies.len(),
        match options.mode {
            Mode::Concurrent => "concurrently",
            Mode::Sequential => "sequentially",
        }
    );

    let outcome = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping race");
                on_interrupt.cancel();
            }
        });
        race_with_cancel(&target, &strategies, &options, &cancel).await
    });

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(outcome.is_won());
    }

    match &outcome {
        RaceOutcome::Won {
            content,
            strategy,
            attempts,
            elapsed_ms,
        } => {
            let path = cli
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(default_file_name(&target, &chrono::Local::now())));
            save_content(&path, content, &target, strategy)
                .with_context(|| format!("failed to save {}", path.display()))?;

            eprintln!("✓ {strategy} won after {attempts} attempt(s) in {elapsed_ms}ms");
            eprintln!("  {} characters, {} tags", content.chars().count(), content.matches('<').count());
            eprintln!("  saved to {}", path.display());
            if cli.verbose {
                eprintln!("{}", preview(content));
            }
            Ok(true)
        }
        RaceOutcome::Exhausted { failures } => {
            eprintln!("✗ All strategies exhausted ({} errors)", outcome.error_count());
            for failure in failures {
                eprintln!("  {:<18} {}", failure.strategy, failure.cause);
            }
            if options.mode == Mode::Concurrent {
                eprintln!("Try --sequential; concurrent bursts can trip rate limits.");
            }
            Ok(false)
        }
    }
}

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
