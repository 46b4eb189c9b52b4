use std::path::Path;
use std::time::SystemTime;

/// Log to stdout and, if given, additionally to `log_file`.
pub fn setup_logger(
    level: log::LevelFilter,
    log_file: Option<&Path>,
) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_micros(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());
    if let Some(log_file) = log_file {
        dispatch = dispatch.chain(fern::log_file(log_file)?);
    }
    dispatch.apply()?;
    Ok(())
}
