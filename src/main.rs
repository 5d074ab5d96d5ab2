use clap::Parser;
use scoretrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
