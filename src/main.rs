use clap::Parser;
use std::io;

use prestatic::args::Args;
use prestatic::logging::setup_logging;
use prestatic::server::start_server;

fn main() -> io::Result<()> {
    setup_logging();
    let args = Args::parse();
    let settings = args.settings()?;
    start_server(settings)
}
