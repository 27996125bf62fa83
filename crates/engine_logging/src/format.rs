//! Python-style record templates, e.g. `%(asctime)s - %(levelname)s - %(message)s`.

use chrono::{DateTime, Local};
use log::{Level, LevelFilter};

const ASCTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    AscTime,
    LevelName,
    Message,
    Name,
}

/// A parsed record template.
///
/// Recognised placeholders are `%(asctime)s`, `%(levelname)s`, `%(message)s`
/// and `%(name)s`. `%%` renders a single `%`. Anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFormat {
    segments: Vec<Segment>,
}

impl LogFormat {
    /// Parses a template string. Never fails.
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(pos) = rest.find('%') {
            literal.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("%%") {
                literal.push('%');
                rest = after;
                continue;
            }

            match parse_placeholder(tail) {
                Some((segment, consumed)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                    rest = &tail[consumed..];
                }
                None => {
                    literal.push('%');
                    rest = &tail[1..];
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Renders one record.
    pub fn render(&self, name: &str, level: Level, message: &str, time: DateTime<Local>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::AscTime => out.push_str(&time.format(ASCTIME_FORMAT).to_string()),
                Segment::LevelName => out.push_str(level_name(level)),
                Segment::Message => out.push_str(message),
                Segment::Name => out.push_str(name),
            }
        }
        out
    }
}

fn parse_placeholder(tail: &str) -> Option<(Segment, usize)> {
    let inner = tail.strip_prefix("%(")?;
    let close = inner.find(")s")?;
    let segment = match &inner[..close] {
        "asctime" => Segment::AscTime,
        "levelname" => Segment::LevelName,
        "message" => Segment::Message,
        "name" => Segment::Name,
        _ => return None,
    };
    // "%(" + key + ")s"
    Some((segment, close + 4))
}

/// Returns the display name used for `level` in rendered records.
pub fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Parses a configured level name (case-insensitive).
///
/// `CRITICAL` maps to the error filter, and `WARN` is accepted next to
/// `WARNING`. Returns `None` for unknown names.
pub fn parse_level_name(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_uppercase().as_str() {
        "CRITICAL" | "ERROR" => Some(LevelFilter::Error),
        "WARNING" | "WARN" => Some(LevelFilter::Warn),
        "INFO" => Some(LevelFilter::Info),
        "DEBUG" => Some(LevelFilter::Debug),
        "TRACE" => Some(LevelFilter::Trace),
        "OFF" => Some(LevelFilter::Off),
        _ => None,
    }
}
