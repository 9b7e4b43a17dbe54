use camrec::config::{Cli, RecordingConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RecordingConfig::from_cli(cli)?;
    camrec::init_tracing(config.verbose);
    camrec::run(config).await?;
    Ok(())
}
