use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gpiolink::hal::std::chardev::CharDevLines;
use gpiolink::{EndpointRole, MasterEngine};
use gpiolink_example::config::Config;
use gpiolink_example::logging::setup_logger;
use gpiolink_example::report::JsonLinesReport;

/// Clock a message out to the slave and print its reply.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Message to send, overrides the configured one.
    #[arg(short, long)]
    message: Option<String>,

    #[arg(short, long, default_value = "info")]
    log_level: log::LevelFilter,

    /// Additionally log into this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write one JSON object per exchanged byte into this file.
    #[arg(short, long)]
    report: Option<PathBuf>,
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
    let message = cli.message.unwrap_or(config.session.message.clone());
    let paths = config.line_paths(EndpointRole::Master);
    let lines = CharDevLines::open(EndpointRole::Master, &paths, timing.edge_poll_interval())?;
    log::info!(
        "sending {:?} with a bit period of {:?}",
        message,
        timing.bit_period()
    );

    let summary = match cli.report {
        Some(report_path) => {
            let sink = JsonLinesReport::create(&report_path)?;
            let mut master = MasterEngine::new(lines, timing, message).with_sink(sink);
            let summary = master.run_session(None)?;
            let (_, mut sink) = master.into_parts();
            sink.flush()?;
            summary
        }
        None => MasterEngine::new(lines, timing, message).run_session(None)?,
    };
    log::info!(
        "{} finished after {} byte rounds",
        summary.task_name,
        summary.byte_rounds
    );
    Ok(())
}
