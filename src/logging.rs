//! Logging bootstrap for the command-line tool.
//!
//! The library only talks to the `log` facade. Events use a stable
//! `event=... module=... key=value` layout so they can be grepped:
//!
//! ```text
//! DEBUG [photometa::resolve] event=resolve_hit module=resolve category=rating source=Xmp.xmp.Rating
//! WARN  [photometa::sidecar] event=sidecar_failed module=sidecar sidecar=a.jpg.xmp error="..."
//! ```

use flexi_logger::{Logger, LoggerHandle};
use log::debug;

pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn normalize_level(level: &str) -> Result<&'static str, String> {
    let wanted = level.trim().to_ascii_lowercase();
    LEVELS
        .into_iter()
        .find(|l| *l == wanted)
        .ok_or_else(|| format!("unsupported log level `{level}`; expected one of {LEVELS:?}"))
}

/// Start logging to stderr at `level`.
///
/// The returned handle must be kept alive for as long as logging is wanted.
pub fn init_logging(level: &str) -> Result<LoggerHandle, String> {
    let level = normalize_level(level)?;
    let handle = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;
    debug!(
        "event=app_start module=logging level={level} version={}",
        env!("CARGO_PKG_VERSION")
    );
    Ok(handle)
}
