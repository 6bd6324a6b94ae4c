use clap::Parser;
use codediag_cli::Cli;
use color_eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    codediag_cli::init_tracing(cli.verbose)?;
    codediag_cli::run(cli).await?;
    Ok(())
}
