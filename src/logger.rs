//! Console logging backend for the `log` facade
//!
//! The logger is installed once at startup with [ConsoleLogger::init] and
//! reconfigured from the loaded [crate::config::Config] with
//! [ConsoleLogger::configure]. Lines go to stderr and follow a [LogFormat]
//! template.

use std::{
    io::{IsTerminal, Write},
    sync::{PoisonError, RwLock},
};

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::DEFAULT_LOG_FORMAT;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Time,
    Level,
    Target,
    Message,
}

/// A parsed log line template
///
/// Recognized placeholders are `{time}`, `{level}`, `{target}` and
/// `{message}`. The Python logging spellings `%(asctime)s`, `%(levelname)s`,
/// `%(name)s` and `%(message)s` are accepted as well. Anything else is copied
/// literally.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFormat {
    segments: Vec<Segment>,
}

const PLACEHOLDERS: [(&str, Segment); 8] = [
    ("{time}", Segment::Time),
    ("{level}", Segment::Level),
    ("{target}", Segment::Target),
    ("{message}", Segment::Message),
    ("%(asctime)s", Segment::Time),
    ("%(levelname)s", Segment::Level),
    ("%(name)s", Segment::Target),
    ("%(message)s", Segment::Message),
];

impl LogFormat {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        'outer: while let Some(ch) = rest.chars().next() {
            for (placeholder, segment) in &PLACEHOLDERS {
                if let Some(after) = rest.strip_prefix(placeholder) {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment.clone());
                    rest = after;
                    continue 'outer;
                }
            }

            literal.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    fn render(&self, time: &str, level: Level, target: &str, message: &str) -> String {
        let mut line = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Time => line.push_str(time),
                Segment::Level => line.push_str(level.as_str()),
                Segment::Target => line.push_str(target),
                Segment::Message => line.push_str(message),
            }
        }
        line
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_LOG_FORMAT)
    }
}

/// Logger writing formatted lines to stderr
pub struct ConsoleLogger {
    format: RwLock<Option<LogFormat>>,
}

static LOGGER: ConsoleLogger = ConsoleLogger {
    format: RwLock::new(None),
};

impl ConsoleLogger {
    /// Installs the logger as the global `log` backend
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }

    /// Changes the level and line template of the installed logger
    pub fn configure(level: LevelFilter, format: &str) {
        *LOGGER
            .format
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(LogFormat::parse(format));
        log::set_max_level(level);
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        let message = record.args().to_string();
        let line = {
            let format = self.format.read().unwrap_or_else(PoisonError::into_inner);
            match format.as_ref() {
                Some(format) => format.render(&time, record.level(), record.target(), &message),
                None => LogFormat::default().render(&time, record.level(), record.target(), &message),
            }
        };

        let mut stderr = std::io::stderr();
        let _ = if stderr.is_terminal() {
            writeln!(stderr, "{}{}\x1B[0m", Self::color_for_level(record.level()), line)
        } else {
            writeln!(stderr, "{}", line)
        };
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
