use std::env;
use std::path::PathBuf;

use crate::regime::ClassificationMethod;

/// Parsed command-line options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub prices: PathBuf,
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub method: Option<ClassificationMethod>,
    pub period_len: Option<usize>,
    pub schedule_out: Option<PathBuf>,
    pub json: bool,
    pub analyze: bool,
}

/// What the binary should do.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Help,
    Run(CliOptions),
}

pub fn parse_args() -> Result<CliCommand, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

pub fn parse_args_from(args: &[String]) -> Result<CliCommand, String> {
    let mut i = 0usize;
    let mut prices = None;
    let mut opts = CliOptions::default();

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(CliCommand::Help),
            "--prices" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --prices (expected a CSV path)")?;
                if prices.replace(PathBuf::from(path)).is_some() {
                    return Err("--prices provided more than once".to_string());
                }
            }
            "--config" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --config (expected a TOML path)",
                )?;
                if opts.config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(
                    i,
                    "missing value for --preset (expected a preset name)",
                )?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                opts.seed = Some(seed);
            }
            "--method" => {
                i += 1;
                let raw = args.next_or_err(
                    i,
                    "missing value for --method (expected a method name)",
                )?;
                opts.method = Some(raw.parse()?);
            }
            "--period-len" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --period-len (expected a count)")?;
                let len = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        format!("--period-len value \"{raw}\" must be a positive integer")
                    })?;
                opts.period_len = Some(len);
            }
            "--schedule-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --schedule-out (expected a file path)",
                )?;
                if opts.schedule_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--schedule-out provided more than once".to_string());
                }
            }
            "--json" => opts.json = true,
            "--analyze" => opts.analyze = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.config.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }
    if opts.analyze && (opts.schedule_out.is_some() || opts.period_len.is_some()) {
        return Err(
            "`--analyze` cannot be combined with `--schedule-out` or `--period-len`".to_string(),
        );
    }
    if opts.period_len.is_some() && opts.schedule_out.is_some() {
        return Err("`--schedule-out` exports a single horizon; drop `--period-len`".to_string());
    }

    opts.prices = prices.ok_or_else(|| "missing required argument --prices".to_string())?;
    Ok(CliCommand::Run(opts))
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("bess-arb - regime-guided battery arbitrage optimizer");
    eprintln!();
    eprintln!("Usage: bess-arb --prices <csv> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!(
        "  --prices <path>          Price CSV with a `price` column and optional `timestamp`"
    );
    eprintln!("  --config <path>          Load optimizer config from a TOML file");
    eprintln!("  --preset <name>          Use a built-in preset (default, fast, thorough)");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!(
        "  --method <name>          Regime classifier (quantile, kmeans, volatility_adaptive,"
    );
    eprintln!("                           rolling_threshold, zscore)");
    eprintln!("  --period-len <n>         Optimize consecutive periods of n timesteps");
    eprintln!("  --schedule-out <path>    Export the schedule to CSV");
    eprintln!("  --json                   Print the result as JSON");
    eprintln!("  --analyze                Classify and decode only, no scheduling");
    eprintln!("  --help                   Show this help message");
}
