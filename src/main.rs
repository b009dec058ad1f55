use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use inklink::replay::{self, Recording};
use inklink::store::{self, DeviceInspection};
use inklink::{Config, SessionContext};

#[derive(Parser, Debug)]
#[command(name = "inklink")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("INKLINK_GIT_HASH"), ")"),
    about = "Smart pad connection manager and real-time ink capture"
)]
struct Cli {
    /// Show the remembered device and exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["forget_device", "replay"])]
    show_device: bool,

    /// Forget the remembered device and exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "replay")]
    forget_device: bool,

    /// Replay a recorded JSON sample stream and print the resulting strokes
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Render surface used for replay, e.g. 1920x1080
    #[arg(long, value_name = "WxH", value_parser = parse_surface, requires = "replay")]
    surface: Option<(f32, f32)>,

    /// Print machine-readable JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Write a documented default config file and exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["show_device", "forget_device", "replay"])]
    init_config: bool,
}

fn parse_surface(raw: &str) -> Result<(f32, f32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let parse = |value: &str| -> Result<f32, String> {
        value
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or_else(|| format!("invalid surface dimension '{value}'"))
    };
    Ok((parse(w)?, parse(h)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if cli.init_config {
        let path = Config::create_default_file()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = Config::load()?;

    if cli.show_device {
        return show_device(&config, cli.json);
    }

    if cli.forget_device {
        return forget_device(&config);
    }

    if let Some(path) = cli.replay {
        let mut recording: Recording = replay::load_recording(&path)?;
        if let Some((width, height)) = cli.surface {
            recording.surface = Some([width, height]);
        }
        let summary = replay::replay(recording, SessionContext::from_config(&config)).await?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            );
        } else {
            println!("{summary}");
        }
        return Ok(());
    }

    println!("inklink: Smart pad connection manager and real-time ink capture");
    println!();
    println!("Usage:");
    println!("  inklink --show-device         Show the remembered device");
    println!("  inklink --forget-device       Forget the remembered device");
    println!("  inklink --replay <FILE>       Replay a recorded sample stream");
    println!("  inklink --init-config         Write a default config file");
    println!("  inklink --help                Show help");
    println!();
    println!("Configuration: ~/.config/inklink/config.toml");

    Ok(())
}

fn store_options(config: &Config) -> Result<store::StoreOptions> {
    let config_dir = Config::config_dir()?;
    store::options_from_config(&config.storage, &config_dir)
}

fn show_device(config: &Config, json: bool) -> Result<()> {
    let options = store_options(config)?;
    let inspection = store::inspect_device(&options)?;

    if json {
        let device = inspection.saved.as_ref().map(|saved| &saved.descriptor);
        println!(
            "{}",
            serde_json::to_string_pretty(&device).context("Failed to serialise device")?
        );
        return Ok(());
    }

    print_inspection(&inspection);
    Ok(())
}

fn print_inspection(inspection: &DeviceInspection) {
    let Some(saved) = &inspection.saved else {
        println!("No device configured");
        if inspection.exists {
            println!(
                "  {} exists but could not be read",
                inspection.device_path.display()
            );
        }
        return;
    };

    let descriptor = &saved.descriptor;
    let caps = &descriptor.capabilities;
    println!("Remembered device");
    println!("  Name:      {}", descriptor.name);
    println!("  ESN:       {}", descriptor.serial_number);
    println!("  Id:        {}", descriptor.id);
    println!("  Transport: {}", descriptor.transport);
    println!(
        "  Sensor:    {}x{} @ {} µm, {} Hz",
        caps.width, caps.height, caps.point_pitch_um, caps.sampling_rate
    );
    if let Some(saved_at) = saved.saved_at {
        println!("  Saved:     {}", saved_at.to_rfc3339());
    }
    println!("  File:      {}", inspection.device_path.display());
}

fn forget_device(config: &Config) -> Result<()> {
    let options = store_options(config)?;
    let outcome = store::clear_device(&options)?;
    if outcome.removed_device {
        println!("Forgot remembered device");
    } else {
        println!("No device configured");
    }
    Ok(())
}
