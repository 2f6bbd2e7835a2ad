//! Logging setup and coloured status lines shared between verdict crates.
//!
//! Everything the tool prints to a person goes through `tracing`, so `-v`, `-s` and
//! `RUST_LOG` apply to it uniformly. The one exception is [`eprintln_yellow`].

use ansiterm::Colour;
use std::io;
use tracing::{Level, Metadata};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::MakeWriter,
};

pub fn println_red(txt: &str) {
    tracing::info!("{}", Colour::Red.paint(txt));
}

pub fn println_green(txt: &str) {
    tracing::info!("{}", Colour::Green.paint(txt));
}

pub fn println_yellow(txt: &str) {
    tracing::info!("{}", Colour::Yellow.paint(txt));
}

pub fn println_yellow_err(txt: &str) {
    tracing::warn!("{}", Colour::Yellow.paint(txt));
}

pub fn println_red_err(txt: &str) {
    tracing::error!("{}", Colour::Red.paint(txt));
}

/// Print a warning to stderr without going through the subscriber.
///
/// Printed even when logging is silenced.
pub fn eprintln_yellow(txt: &str) {
    eprintln!("{}", Colour::Yellow.paint(txt));
}

/// Where log lines are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogStream {
    /// WARN and ERROR go to stderr, everything else to stdout.
    #[default]
    Split,
    /// Everything goes to stderr, leaving stdout to a machine-readable report.
    Stderr,
}

impl LogStream {
    fn for_level(self, level: &Level) -> Box<dyn io::Write> {
        match self {
            LogStream::Split if *level > Level::WARN => Box::new(io::stdout()),
            _ => Box::new(io::stderr()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogStream {
    type Writer = Box<dyn io::Write>;

    fn make_writer(&'a self) -> Self::Writer {
        self.for_level(&Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.for_level(meta.level())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogOptions {
    /// Number of `-v` flags.
    pub verbosity: u8,
    pub silent: bool,
    pub stream: LogStream,
}

impl LogOptions {
    /// The level that replaces `RUST_LOG`, if any. Verbosity wins over `silent`.
    pub fn level_override(&self) -> Option<LevelFilter> {
        match (self.verbosity, self.silent) {
            (0, false) => None,
            (0, true) => Some(LevelFilter::OFF),
            (1, _) => Some(LevelFilter::DEBUG),
            _ => Some(LevelFilter::TRACE),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        match self.level_override() {
            Some(level) => EnvFilter::default().add_directive(level.into()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        }
    }
}

/// Install a subscriber that prints bare lines, so `tracing::info!` reads like `println!`.
///
/// `RUST_LOG` sets the level unless `-v` or `-s` was given; the default is `INFO`.
/// Calling this more than once keeps the first subscriber.
pub fn init_tracing_subscriber(options: LogOptions) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(options.env_filter())
        .with_ansi(true)
        .with_level(false)
        .with_target(false)
        .without_time()
        .with_writer(options.stream)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn verbosity_maps_to_debug_and_trace() {
        let v = LogOptions {
            verbosity: 1,
            ..Default::default()
        };
        assert_eq!(v.level_override(), Some(LevelFilter::DEBUG));
        let vv = LogOptions {
            verbosity: 2,
            silent: true,
            ..Default::default()
        };
        assert_eq!(vv.level_override(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn silent_turns_logging_off() {
        let options = LogOptions {
            silent: true,
            ..Default::default()
        };
        assert_eq!(options.level_override(), Some(LevelFilter::OFF));
        assert_eq!(LogOptions::default().level_override(), None);
    }

    #[test]
    fn split_stream_is_the_default() {
        assert_eq!(LogOptions::default().stream, LogStream::Split);
    }

    #[traced_test]
    #[test]
    fn coloured_lines_are_logged() {
        println_green("fixture ok");
        println_red_err("fixture failed");
        assert!(logs_contain("fixture ok"));
        assert!(logs_contain("fixture failed"));
    }
}
