use clap::Parser;
use trendbreak::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
