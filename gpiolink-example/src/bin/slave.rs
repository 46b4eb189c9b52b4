use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gpiolink::executable::spawn_endpoint;
use gpiolink::hal::std::chardev::CharDevLines;
use gpiolink::{EndpointRole, SlaveEngine};
use gpiolink_example::config::Config;
use gpiolink_example::logging::setup_logger;

/// Answer the master with a repeating reply.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reply to send, overrides the configured one.
    #[arg(short, long)]
    reply: Option<String>,

    /// Stop after this many bytes. Runs until killed otherwise.
    #[arg(short = 'n', long)]
    count: Option<usize>,

    #[arg(short, long, default_value = "info")]
    log_level: log::LevelFilter,

    /// Additionally log into this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logger(cli.log_level, cli.log_file.as_deref()).expect("failed to initialize logger");
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
    let reply = cli.reply.unwrap_or(config.session.reply.clone());
    let paths = config.line_paths(EndpointRole::Slave);
    let lines = CharDevLines::open(EndpointRole::Slave, &paths, timing.edge_poll_interval())?;

    let mut slave = SlaveEngine::new(lines, timing, reply)?;
    if let Some(count) = cli.count {
        slave = slave.with_byte_limit(count);
    }
    let jh_slave = spawn_endpoint(slave, None)?;
    let summary = jh_slave
        .join()
        .map_err(|_| "slave thread panicked")??;
    log::info!(
        "{} finished after {} byte rounds",
        summary.task_name,
        summary.byte_rounds
    );
    Ok(())
}
