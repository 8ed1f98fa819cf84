use crate::config::Settings;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "kiosk", version, about = "Cafeteria tray recognition kiosk")]
pub struct Cli {
    /// Settings file. Defaults to ./kiosk.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Detection service URL.
    #[arg(long, global = true)]
    pub server_url: Option<String>,

    /// Answer requests locally without contacting the service.
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Fail instead of falling back to the simulator.
    #[arg(long, global = true)]
    pub no_fallback: bool,

    /// Minimum confidence for reported items.
    #[arg(long, global = true, value_parser = parse_confidence)]
    pub confidence: Option<f32>,

    /// Only detect these classes. Repeatable.
    #[arg(long = "class", global = true)]
    pub classes: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recognize a single tray photo.
    Detect {
        image: PathBuf,

        /// Report single servings instead of estimated portions.
        #[arg(long)]
        no_portions: bool,

        /// Print the raw response as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Stream the images of a directory as webcam frames.
    Stream {
        dir: PathBuf,

        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,

        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Connect, print the connection status transitions, then disconnect.
    Status,
}

impl Cli {
    /// Apply command line overrides on top of the loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.server_url {
            settings.server.url = url.clone();
        }
        if self.no_fallback {
            settings.fallback_to_simulator = false;
        }
        if let Some(confidence) = self.confidence {
            settings.detection.confidence = confidence;
        }
        if !self.classes.is_empty() {
            settings.detection.classes = Some(self.classes.clone());
        }

        match &self.command {
            Command::Detect { no_portions, .. } if *no_portions => {
                settings.detection.enable_portion_calculation = false;
            }
            Command::Stream {
                interval_ms: Some(interval_ms),
                ..
            } => {
                settings.stream.interval_ms = *interval_ms;
            }
            _ => {}
        }
    }
}

fn parse_confidence(value: &str) -> Result<f32, String> {
    let confidence: f32 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(format!("confidence must be between 0 and 1, got {confidence}"))
    }
}
