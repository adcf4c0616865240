//! SQL statement logging sinks.
//!
//! A [`Client`](crate::Client) hands every statement it runs to its
//! [`SqlLogger`], rendered as `trace_id \t prefix statement` with the
//! arguments interpolated in place of the placeholders.

use crate::value::Value;
use std::sync::{Arc, Mutex};
use tracing::Level;

/// Receives rendered statement lines.
pub trait SqlLogger: Send + Sync {
    fn log(&self, level: Level, msg: &[u8]);
}

/// Discards everything. Pooled connections carry this while idle.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl SqlLogger for NoopLogger {
    fn log(&self, _level: Level, _msg: &[u8]) {}
}

/// Forwards statements to `tracing` under the `myorm.sql` target.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    /// Truncate long statements (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum statement length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }
}

impl SqlLogger for TracingLogger {
    fn log(&self, level: Level, msg: &[u8]) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let text = String::from_utf8_lossy(msg);
        let sql = match self.max_sql_length {
            Some(max) if text.len() > max => format!("{}...", truncate_bytes(&text, max)),
            _ => text.into_owned(),
        };
        emit_at_level!(level, target: "myorm.sql", sql = %sql);
    }
}

fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Keeps every line in memory. Handy in tests and for request-scoped capture.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured lines.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Captured messages without their levels.
    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, msg)| msg).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

impl SqlLogger for MemoryLogger {
    fn log(&self, level: Level, msg: &[u8]) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, String::from_utf8_lossy(msg).into_owned()));
        }
    }
}

/// Replace each `?` in `query` with its argument rendered as text.
///
/// Only text arguments are single-quoted. Placeholders beyond the argument
/// list are kept as-is; extra arguments are ignored.
pub fn interpolate(query: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(query.len() + args.len() * 8);
    let mut args = args.iter();
    for ch in query.chars() {
        if ch != '?' {
            out.push(ch);
            continue;
        }
        match args.next() {
            Some(Value::Text(s)) => {
                out.push('\'');
                out.push_str(s);
                out.push('\'');
            }
            Some(value) => out.push_str(&value.to_string()),
            None => out.push('?'),
        }
    }
    out
}

/// Render one log line.
pub(crate) fn format_line(trace_id: &str, prefix: &str, statement: &str) -> String {
    format!("{trace_id}\t{prefix}{statement}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_quotes_text_only() {
        let sql = "select * from people where name = ? and age > ? limit ?, ?";
        let args = [Value::from("tdj"), Value::from(3), Value::from(0), Value::from(10)];
        assert_eq!(
            interpolate(sql, &args),
            "select * from people where name = 'tdj' and age > 3 limit 0, 10"
        );
    }

    #[test]
    fn interpolate_keeps_unbound_placeholders() {
        assert_eq!(interpolate("a = ? and b = ?", &[Value::Null]), "a = NULL and b = ?");
    }

    #[test]
    fn memory_logger_captures_levels() {
        let logger = MemoryLogger::new();
        logger.log(Level::INFO, format_line("t-1", "[svc] ", "BEGIN").as_bytes());
        logger.log(Level::DEBUG, b"x");

        let lines = logger.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (Level::INFO, "t-1\t[svc] BEGIN".to_string()));

        logger.clear();
        assert!(logger.messages().is_empty());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_bytes("héllo", 2), "h");
        assert_eq!(truncate_bytes("abc", 10), "abc");
    }
}
