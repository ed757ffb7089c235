use env_logger::fmt::Formatter;
use env_logger::Builder;
use log::{Level, LevelFilter, Record};
use std::io::{self, Write};
use std::path::Path;
use std::time::SystemTime;

pub fn setup_logging() {
    let colored = atty::is(atty::Stream::Stderr);
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .format(move |buf, record| write_record(buf, record, colored))
        .init();
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1B[31m",
        Level::Warn => "\x1B[33m",
        Level::Info => "\x1B[32m",
        Level::Debug => "\x1B[36m",
        Level::Trace => "\x1B[35m",
    }
}

fn write_record(buf: &mut Formatter, record: &Record, colored: bool) -> io::Result<()> {
    let level = record.level();
    let timestamp = humantime::format_rfc3339_millis(SystemTime::now());

    if colored {
        write!(buf, "{}{:>5}\x1B[0m", level_color(level), level)?;
    } else {
        write!(buf, "{:>5}", level)?;
    }
    write!(buf, " [{}] {}", timestamp, record.args())?;

    // Source location only at debug and below
    if level >= Level::Debug {
        write!(
            buf,
            " - {}:{}",
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0)
        )?;
    }
    writeln!(buf)
}

#[macro_export]
macro_rules! log_request {
    ($request:expr) => {
        log::info!("→ {} {}", $request.method, $request.target)
    };
}

#[macro_export]
macro_rules! log_response {
    ($response:expr, $duration:expr) => {
        log::info!(
            "← {} ({:?}) - {} bytes{}",
            $response.status,
            $duration,
            $response.body.len(),
            $response
                .header("Content-Encoding")
                .map(|e| format!(", {}", e))
                .unwrap_or_default()
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($error:expr, $context:expr) => {
        log::error!("❌ {} - {}", $context, $error)
    };
}

pub trait Loggable {
    fn log_description(&self) -> String;
}

impl<T: std::fmt::Display> Loggable for T {
    fn log_description(&self) -> String {
        self.to_string()
    }
}

impl Loggable for Path {
    fn log_description(&self) -> String {
        self.display().to_string()
    }
}

pub trait LoggingExt: Loggable {
    /// Runs `f`, tracing start and success at debug and failure at error.
    fn log_operation<F, T, E>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::fmt::Display;
}

impl<S: ?Sized + Loggable> LoggingExt for S {
    fn log_operation<F, T, E>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::fmt::Display,
    {
        log::debug!("Starting {} on {}", operation, self.log_description());
        f().inspect(|_| log::debug!("Completed {} on {}", operation, self.log_description()))
            .inspect_err(|e| {
                log::error!("Failed {} on {}: {}", operation, self.log_description(), e)
            })
    }
}
