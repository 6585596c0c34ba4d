mod cluster;
mod options;
mod paths;
mod plot;
mod progress;
mod summary;

use anyhow::Result;
use clap::Parser;
use options::{Cli, Command};

fn main() -> Result<()> {
    env_logger::init();
    let Cli { options, cmd } = Cli::parse();
    match cmd.unwrap_or(Command::Run) {
        Command::Run => options.run(),
        Command::Cluster => options.cluster().map(|_| ()),
        Command::Plot => options.plot(),
        Command::Summary { json } => options.summary(json),
    }
}
