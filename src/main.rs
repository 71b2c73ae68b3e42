use std::process::ExitCode;

use clap::Parser;

use logopaint::cli::{self, CliArgs};
use logopaint::{log_info, logger};

fn main() -> ExitCode {
    logger::init();
    log_info!("logopaint {}", env!("CARGO_PKG_VERSION"));
    cli::run(CliArgs::parse())
}
