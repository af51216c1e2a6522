use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use param_automation_core::{
    AppConfig, EngineError, GroupState, Parameter, ParameterConfig, ParameterGroup, SmoothingState,
};
use tracing_subscriber::EnvFilter;

fn main() -> param_automation_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Simulate { target, smoothing } => run_simulate(&config, target, smoothing),
        Commands::Snapshot { output } => run_snapshot(&output),
        Commands::Restore { input } => run_restore(&config, &input),
    }
}

fn run_simulate(
    config: &AppConfig,
    target: f64,
    smoothing: f64,
) -> param_automation_core::Result<()> {
    let mut cutoff = Parameter::with_config(
        "cutoff",
        "Cutoff",
        20.0,
        20_000.0,
        1_000.0,
        ParameterConfig::default()
            .with_units("Hz")
            .with_skew(0.3)
            .with_step(1.0)
            .with_smoothing(smoothing),
    )?;
    cutoff.add_listener(|parameter, event| {
        tracing::debug!(
            id = parameter.id(),
            %event,
            value = %parameter.display_text(),
            "parameter changed"
        );
        Ok(())
    });

    tracing::info!(
        target_value = target,
        smoothing,
        rate_hz = config.frames.rate_hz,
        "simulating smoothing"
    );
    cutoff.set_value(target);

    let mut frames = 0;
    while cutoff.is_smoothing() && frames < config.frames.max_frames {
        cutoff.tick();
        frames += 1;
    }

    let elapsed = frames as f64 * config.frames.frame_seconds();
    if cutoff.smoothing_state() == SmoothingState::Smoothing {
        tracing::warn!(frames, elapsed, value = %cutoff.display_text(), "smoothing did not settle");
    } else {
        tracing::info!(frames, elapsed, value = %cutoff.display_text(), "smoothing settled");
    }
    Ok(())
}

fn run_snapshot(output: &Path) -> param_automation_core::Result<()> {
    let patch = demo_patch()?;
    tracing::info!(?output, parameters = patch.len(), "writing snapshot");
    std::fs::write(output, patch.serialize().to_json()?)?;
    Ok(())
}

fn run_restore(config: &AppConfig, input: &Path) -> param_automation_core::Result<()> {
    let raw = std::fs::read_to_string(input)?;
    let state = GroupState::from_json(&raw)?;

    let mut patch = demo_patch()?;
    if state.name != patch.name() {
        return Err(EngineError::msg(format!(
            "snapshot is for `{}`, expected `{}`",
            state.name,
            patch.name()
        )));
    }
    patch.deserialize(&state);

    let mut frames = 0;
    while patch.tick() > 0 && frames < config.frames.max_frames {
        frames += 1;
    }

    tracing::info!(?input, frames, "restored snapshot");
    for parameter in patch.get_all_parameters() {
        println!("{:<12} {}", parameter.name(), parameter.display_text());
    }
    Ok(())
}

fn demo_patch() -> param_automation_core::Result<ParameterGroup> {
    let mut patch = ParameterGroup::new("patch");
    patch.add_parameter(Parameter::with_config(
        "volume",
        "Volume",
        -60.0,
        6.0,
        0.0,
        ParameterConfig::default().with_units("dB").with_step(0.1),
    )?);

    let filter = patch.add_group(ParameterGroup::new("filter"));
    filter.add_parameter(Parameter::with_config(
        "cutoff",
        "Cutoff",
        20.0,
        20_000.0,
        1_000.0,
        ParameterConfig::default()
            .with_units("Hz")
            .with_skew(0.3)
            .with_step(1.0)
            .with_smoothing(0.8),
    )?);
    filter.add_parameter(Parameter::new("resonance", "Resonance", 0.0, 1.0, 0.2)?);

    let envelope = patch.add_group(ParameterGroup::new("envelope"));
    for (id, name, default) in [("attack", "Attack", 10.0), ("release", "Release", 250.0)] {
        envelope.add_parameter(Parameter::with_config(
            id,
            name,
            0.0,
            5_000.0,
            default,
            ParameterConfig::default().with_units("ms").with_skew(0.5),
        )?);
    }

    Ok(patch)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Parameter automation engine driver", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a smoothed parameter toward a target and report how long it took.
    Simulate {
        /// Target cutoff in Hz.
        #[arg(short, long, default_value_t = 8_000.0)]
        target: f64,
        /// Damping coefficient in [0, 1).
        #[arg(short, long, default_value_t = 0.9)]
        smoothing: f64,
    },
    /// Write the state of the demo patch as JSON.
    Snapshot {
        output: PathBuf,
    },
    /// Load a JSON state into the demo patch and print its values.
    Restore {
        input: PathBuf,
    },
}
