//! Console event formatter with a tree-like layout

pub mod filters;
pub mod levels;
pub mod styling;

use chrono::Local;
use console::style;
use std::fmt::{self as std_fmt, Debug};
use tracing::Level;
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};

use crate::utils::logging::text_utils;
use filters::should_show_message;
use levels::determine_processing_level;
use styling::{format_level, get_tree_prefix, style_message};

const LINE_WIDTH: usize = 120;

pub struct CleanFormatter {
    show_timestamps: bool,
    use_color: bool,
}

impl CleanFormatter {
    pub fn new(show_timestamps: bool, use_color: bool) -> Self {
        Self {
            show_timestamps,
            use_color,
        }
    }

    fn format_message(&self, message: &str, metadata_level: &Level) -> String {
        let level = determine_processing_level(message);
        let prefix = get_tree_prefix(level);

        let badge = format_level(metadata_level, self.use_color);
        let badge = if badge.is_empty() {
            badge
        } else {
            format!("{} ", badge)
        };

        // "[HH:MM:SS] " plus the two-column prefix
        let timestamp_width = if self.show_timestamps { 11 } else { 0 };
        let indent = timestamp_width + 2 + console::measure_text_width(&badge);
        let wrapped = text_utils::wrap_text(message, LINE_WIDTH.saturating_sub(indent));

        let mut lines = wrapped.lines();
        let first = lines.next().unwrap_or_default();
        let mut out = format!(
            "{} {}{}",
            prefix,
            badge,
            style_message(first, level, self.use_color)
        );
        for line in lines {
            out.push('\n');
            out.push_str(&" ".repeat(indent));
            out.push_str(&style_message(line, level, self.use_color));
        }
        out
    }
}

impl<S, N> FormatEvent<S, N> for CleanFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std_fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if !should_show_message(&visitor.message) {
            return Ok(());
        }

        let mut output = String::new();
        if self.show_timestamps {
            let now = Local::now().format("%H:%M:%S").to_string();
            let now = if self.use_color {
                style(now).dim().to_string()
            } else {
                now
            };
            output.push_str(&format!("[{}] ", now));
        }

        output.push_str(&self.format_message(&visitor.message, event.metadata().level()));

        writeln!(writer, "{}", output)
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value).trim_matches('"').to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stage_message() {
        let formatter = CleanFormatter::new(false, false);
        let line = formatter.format_message("[2/8] Extracting RPU", &Level::INFO);
        assert_eq!(line, "● [2/8] Extracting RPU");
    }

    #[test]
    fn test_format_warning_badge() {
        let formatter = CleanFormatter::new(false, false);
        let line = formatter.format_message("Audio track #3 (opus): skipped", &Level::WARN);
        assert_eq!(line, "  WARN  Audio track #3 (opus): skipped");
    }

    #[test]
    fn test_long_message_is_indented() {
        let formatter = CleanFormatter::new(true, false);
        let message = "word ".repeat(60);
        let line = formatter.format_message(message.trim(), &Level::INFO);
        let mut lines = line.lines();
        lines.next();
        let continuation = lines.next().unwrap();
        assert!(continuation.starts_with(&" ".repeat(13)));
    }
}
