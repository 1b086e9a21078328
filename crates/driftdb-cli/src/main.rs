use clap::Parser;
use driftdb_cli::Cli;
use driftdb_cli::commands;
use driftdb_logging::{DriftSubscriberBuilder, FileConfig, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut builder = DriftSubscriberBuilder::new()
        .with_config(LogConfig::cli())
        .with_level(cli.effective_log_level());
    if let Some(dir) = &cli.log_dir {
        builder = builder.with_file_output(FileConfig::new(dir));
    }
    let _guard = builder.init()?;

    let stdout = std::io::stdout();
    commands::run(cli, &mut stdout.lock()).await
}
