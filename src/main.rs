use clap::Parser;
use credvault::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();
    cli::init_logging();

    if let Err(e) = cli::run(&cli) {
        cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
