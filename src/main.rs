//! BESS simulator entry point: CLI wiring and config-driven study construction.

use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bess_sim::cli::Args;
use bess_sim::config::ScenarioConfig;
use bess_sim::io::export::export_csv;
use bess_sim::report::MonthlyTable;
use bess_sim::runner::{BatteryOverrides, SlackInput, run_study};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = args.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = args.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = args.seed {
        scenario.synthetic.seed = seed;
    }
    if args.no_optimize {
        scenario.optimizer.enabled = false;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let input = SlackInput::load(&scenario, args.slack_csv.as_deref()).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    let overrides = BatteryOverrides {
        power_mw: args.power_mw,
        capacity_mwh: args.capacity_mwh,
    };

    let study = run_study(&scenario, &input, &overrides).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    println!("{}", study.kpis);
    println!("{}", MonthlyTable(&study.monthly));
    println!("{}", study.profiles);

    if let Some(ref path) = args.output {
        let months = &input.months;
        if let Err(e) = export_csv(&input.slack_mw, &study.dispatch, |i| months.month_of(i), path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), "trajectory written");
    }
}
