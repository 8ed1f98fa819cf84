use anyhow::Context;
use clap::Parser;
use kiosk::{app, cli::Cli, config::get_configuration, logging::init_observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        get_configuration(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut settings);

    let _telemetry = init_observability(&settings)?;
    tracing::debug!(?settings, "Kiosk starting");

    app::run(&cli, &settings).await
}
