//! Optional stderr logger
//!
//! The crate itself only emits records through the `log` facade.
//! Applications that have no logger of their own can install this one,
//! either directly or by setting `ITIMER_INIT_LOGGER=true`.

use fern::colors::{Color, ColoredLevelConfig};

/// Install a `fern` logger writing to stderr at `level`.
///
/// Levels are coloured when stderr is a terminal. Fails if a global
/// logger has already been set.
pub fn init_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    dispatch(level).chain(std::io::stderr()).apply()?;

    Ok(())
}

/// The formatting and filtering of `init_logger`, without an output.
fn dispatch(level: log::LevelFilter) -> fern::Dispatch {
    let mut colors = ColoredLevelConfig::new();
    colors.info = Color::Blue;
    let tty = atty::is(atty::Stream::Stderr);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            if tty {
                out.finish(format_args!(
                    "{} {} [{}] {}",
                    chrono::Local::now().to_rfc3339(),
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "{} {} [{}] {}",
                    chrono::Local::now().to_rfc3339(),
                    record.level(),
                    record.target(),
                    message
                ))
            }
        })
        .level(level)
}
