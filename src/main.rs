//! bess-arb entry point: CLI wiring around the optimizer.

use std::process;

use bess_arb::cli::{self, CliCommand, CliOptions};
use bess_arb::config::OptimizerConfig;
use bess_arb::io::{export_schedule_csv, load_prices};
use bess_arb::logging;
use bess_arb::observer::TracingObserver;
use bess_arb::optimizer::Optimizer;

/// Resolves the config source: `--config` file, then `--preset`, then default.
fn load_config(opts: &CliOptions) -> Result<OptimizerConfig, String> {
    let mut config = if let Some(path) = &opts.config {
        OptimizerConfig::from_toml_file(path).map_err(|e| e.to_string())?
    } else if let Some(name) = &opts.preset {
        OptimizerConfig::from_preset(name).map_err(|e| e.to_string())?
    } else {
        OptimizerConfig::default()
    };

    if let Some(seed) = opts.seed {
        config.run.seed = seed;
    }
    if let Some(method) = opts.method {
        config.regime.method = method;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(lines.join("\n"));
    }
    Ok(config)
}

fn run(opts: &CliOptions) -> Result<(), String> {
    let config = load_config(opts)?;
    let series = load_prices(&opts.prices).map_err(|e| e.to_string())?;
    let optimizer = Optimizer::new(config);

    if opts.analyze {
        let analysis = optimizer.analyze(&series.prices).map_err(|e| e.to_string())?;
        if opts.json {
            let json = serde_json::to_string_pretty(&analysis).map_err(|e| e.to_string())?;
            println!("{json}");
        } else {
            let [low, medium, high] = analysis.regime_counts;
            println!("Classifier:     {}", analysis.classification);
            println!("Regimes:        {low} low / {medium} medium / {high} high");
            println!("Log-likelihood: {:.4}", analysis.log_likelihood);
            let path: Vec<String> = analysis.path.iter().map(ToString::to_string).collect();
            println!("Decoded path:   {}", path.join(" "));
        }
        return Ok(());
    }

    if let Some(period_len) = opts.period_len {
        let results = optimizer.optimize_periods(&series, period_len);
        if opts.json {
            let entries: Vec<serde_json::Value> = results
                .iter()
                .map(|r| match r {
                    Ok(result) => serde_json::json!({ "success": true, "result": result }),
                    Err(err) => serde_json::json!({ "success": false, "error": err.to_string() }),
                })
                .collect();
            let json = serde_json::to_string_pretty(&entries).map_err(|e| e.to_string())?;
            println!("{json}");
        } else {
            for (index, result) in results.iter().enumerate() {
                match result {
                    Ok(result) => println!(
                        "\n[period {index}] method: {}\n{}",
                        result.method, result.kpis
                    ),
                    Err(err) => println!("\n[period {index}] skipped: {err}"),
                }
            }
        }
        return Ok(());
    }

    let result = optimizer
        .optimize_observed(&series, &mut TracingObserver)
        .map_err(|e| e.to_string())?;
    if opts.json {
        let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        println!("Schedule method: {}", result.method);
        println!("{}", result.kpis);
    }

    if let Some(path) = &opts.schedule_out {
        export_schedule_csv(&result, &series.prices, path)
            .map_err(|e| format!("failed to write CSV: {e}"))?;
        eprintln!("Schedule written to {}", path.display());
    }
    Ok(())
}

fn main() {
    logging::init();

    let opts = match cli::parse_args() {
        Ok(CliCommand::Help) => {
            cli::print_usage();
            return;
        }
        Ok(CliCommand::Run(opts)) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };

    if let Err(e) = run(&opts) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
