use anyhow::Result;
use clap::Parser;

mod buffer;
mod cli;
mod console;
mod dispatch;
mod proto;
mod rx;
mod state;
mod stats;
mod transport;
mod tx;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Cli::parse();
    match args.cmd {
        cli::Cmd::Monitor(opts) => console::run(opts),
        cli::Cmd::Send(opts) => tx::run(opts),
    }
}
