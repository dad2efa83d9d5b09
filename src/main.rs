use clap::Parser;
use swingsim::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
