use std::io;

use clap::Parser;
use stashlog_cli::{Cli, Settings, execute};
use stashlog_logging::StashSubscriberBuilder;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let _guard = StashSubscriberBuilder::new()
        .with_config(settings.log_config(&cli))
        .try_init()?;

    let stdout = io::stdout();
    execute(&cli, &settings, &mut stdout.lock())
}
