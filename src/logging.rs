use std::error::Error;

use log::Level;

/// Sink for the operational messages raised by samplers and the provider.
///
/// Implementations are expected not to panic, but callers on the sampling
/// thread contain a panicking logger rather than letting it unwind the loop.
pub trait StatsLogger: Send + Sync {
    fn log(&self, source: &str, level: Level, message: &str, error: Option<&(dyn Error + 'static)>);
}

/// Forwards to the `log` facade, using the source tag as the log target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacadeLogger;

impl StatsLogger for LogFacadeLogger {
    fn log(&self, source: &str, level: Level, message: &str, error: Option<&(dyn Error + 'static)>) {
        match error {
            Some(err) => log::log!(target: source, level, "{}: {}", message, err),
            None => log::log!(target: source, level, "{}", message),
        }
    }
}
