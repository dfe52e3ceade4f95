use clap::Parser;
use emacross::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
