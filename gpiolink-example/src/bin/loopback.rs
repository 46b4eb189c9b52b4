//! Runs the master against the in-process reference slave. No hardware required.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gpiolink::sim::loopback::LoopbackLines;
use gpiolink::MasterEngine;
use gpiolink_example::config::Config;
use gpiolink_example::logging::setup_logger;

#[derive(Parser, Debug)]
#[command(version, about = "Exchange a message with the in-process reference slave")]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    message: Option<String>,

    #[arg(short, long)]
    reply: Option<String>,

    #[arg(short, long, default_value = "info")]
    log_level: log::LevelFilter,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logger(cli.log_level, None).expect("failed to initialize logger");
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let timing = config.timing_policy()?;
    let message = cli.message.unwrap_or(config.session.message.clone());
    let reply = cli.reply.unwrap_or(config.session.reply.clone());

    let lines = LoopbackLines::new(reply)?;
    let mut master = MasterEngine::new(lines, timing, message);
    master.run_session(None)?;
    let (lines, _) = master.into_parts();
    for report in lines.slave_reports() {
        log::info!("reference slave: {report}");
    }
    Ok(())
}
