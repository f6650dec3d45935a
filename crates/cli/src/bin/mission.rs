#[path = "mission/logging.rs"]
mod logging;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use flight_mission::export::{summary, writer_for_path};
use flight_mission::report;
use flight_mission::scenario::{Scenario, TriggerOverride};
use tracing::info;

use crate::logging::{LogFormat, init_logging};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Fly a multi-phase aircraft mission until every phase trigger fires"
)]
struct Cli {
    /// Mission manifest (YAML or TOML)
    #[arg(long)]
    mission: PathBuf,

    /// Replace a trigger threshold, in the trigger's unit: PHASE[:INDEX]=VALUE (repeatable)
    #[arg(long = "trigger", value_name = "PHASE[:INDEX]=VALUE")]
    triggers: Vec<TriggerOverride>,

    /// Write a JSON mission summary (`-` for stdout)
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write a CSV phase table (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormatArg::Human)]
    log_format: LogFormatArg,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum LogFormatArg {
    Human,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Human => LogFormat::Human,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format.into(), cli.verbose);

    let scenario = Scenario::load(&cli.mission)?.with_overrides(&cli.triggers)?;
    info!(mission = %scenario.name, overrides = cli.triggers.len(), "mission loaded");

    let outcome = scenario.trajectory.run()?;

    if let Some(path) = &cli.json {
        let mut writer = writer_for_path(path)?;
        summary::write_json(&mut *writer, &report::summarize(&scenario.name, &outcome))?;
        writer.flush()?;
    }
    if let Some(path) = &cli.csv {
        let mut writer = writer_for_path(path)?;
        report::write_phase_table(&mut *writer, &outcome)?;
    }

    if cli.json.as_deref() != Some(Path::new("-"))
        && cli.csv.as_deref() != Some(Path::new("-"))
    {
        println!("=== Mission {} ===", scenario.name);
        for phase in &outcome.phases {
            println!(
                "{:<16} {:>10.2} s -> {:>10.2} s  ({})",
                phase.name, phase.start_time, phase.end_time, phase.trigger
            );
        }
        println!("Final states at t = {:.3} s", outcome.final_states.time);
        for (name, quantity) in outcome.final_states.quantities() {
            println!("  {name:<12} = {:.6} {}", quantity.value, quantity.unit);
        }
    }

    Ok(())
}
