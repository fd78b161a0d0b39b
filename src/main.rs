use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    let cli = epub2pdf::cli::Cli::parse();
    epub2pdf::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    epub2pdf::convert::run(&cli)
}
