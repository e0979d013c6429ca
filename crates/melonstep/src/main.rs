use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use melon_core::command::parse_script;
use melon_core::io::definitions::load_catalog;
use melon_core::io::frame::make_frame;
use melon_core::{Command, EngineConfig, GameEngine};
use serde_json::json;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "melonstep",
    about = "Replays a command script and writes NDJSON snapshot frames"
)]
struct Args {
    /// NDJSON command script, one command per line.
    #[arg(long, value_name = "PATH")]
    script: PathBuf,

    /// Output NDJSON file path.
    #[arg(long)]
    out: PathBuf,

    /// Building and upgrade definitions (JSON). Uses the builtin catalog when omitted.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Engine policy document (JSON).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Cap on the time simulated at full rate by one tick.
    #[arg(long = "max-step-ms")]
    max_step_ms: Option<u64>,

    /// Trust the script to skip locked purchases.
    #[arg(long = "no-enforce-unlocks")]
    no_enforce_unlocks: bool,

    /// Enable catch-up beyond the step cap at this fraction of full rate.
    #[arg(long = "offline-rate", value_name = "RATE")]
    offline_rate: Option<f64>,

    /// Timestamp stamped on the fresh state before the first command.
    #[arg(long = "start-ms", default_value_t = 0u64)]
    start_ms: u64,

    /// Optional path to emit a per-command outcome summary as NDJSON.
    #[arg(long = "emit-outcomes", value_name = "PATH")]
    emit_outcomes: Option<PathBuf>,
}

fn engine_config(args: &Args) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(args.config.as_deref())?;
    if let Some(max_step_ms) = args.max_step_ms {
        config.max_step_ms = Some(max_step_ms);
    }
    if args.no_enforce_unlocks {
        config.enforce_unlocks = false;
    }
    if let Some(rate) = args.offline_rate {
        config.offline_progress_enabled = true;
        config.offline_progress_rate = rate;
    }
    config.validate()?;
    Ok(config)
}

/// Replay `commands`, returning one NDJSON frame per command plus the initial one.
fn replay(engine: &mut GameEngine, commands: &[Command]) -> Result<Vec<String>> {
    let mut lines = Vec::with_capacity(commands.len() + 1);
    lines.push(make_frame(0, None, None, engine.snapshot()).to_ndjson()?);
    for (index, command) in commands.iter().enumerate() {
        let outcome = engine.apply(command);
        let frame = make_frame(
            index as u64 + 1,
            Some(command.clone()),
            Some(outcome),
            engine.snapshot(),
        );
        lines.push(frame.to_ndjson()?);
    }
    Ok(lines)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let catalog = load_catalog(args.catalog.as_deref())?;
    let config = engine_config(&args)?;
    let script = File::open(&args.script)
        .with_context(|| format!("failed to open script {:?}", args.script))?;
    let commands = parse_script(BufReader::new(script))
        .with_context(|| format!("failed to parse script {:?}", args.script))?;
    debug!(commands = commands.len(), "script loaded");

    let mut engine = GameEngine::new(catalog, config, args.start_ms);
    let lines = replay(&mut engine, &commands)?;

    let frame_file =
        File::create(&args.out).with_context(|| format!("failed to create {:?}", args.out))?;
    let mut frame_writer = BufWriter::new(frame_file);
    for line in &lines {
        frame_writer.write_all(line.as_bytes())?;
    }
    frame_writer.flush()?;

    if let Some(path) = &args.emit_outcomes {
        let file = File::create(path)
            .with_context(|| format!("failed to create outcomes file at {:?}", path))?;
        let mut writer = BufWriter::new(file);
        let state = engine.state();
        let summary = json!({
            "commands": commands.len(),
            "phase": state.phase,
            "money": state.money,
            "melons": state.melons,
            "total_money_earned": state.total_money_earned,
            "melons_per_second": state.melons_per_second,
        });
        writer.write_all(serde_json::to_string(&summary)?.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }

    info!(
        frames = lines.len(),
        phase = engine.state().phase.name(),
        "replay complete"
    );
    Ok(())
}
