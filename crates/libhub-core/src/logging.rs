//! Log formatting shared by the command line and the per-repository log buffers.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
};

use nu_ansi_term::Color::{Blue, Magenta, Red, Yellow};
use tracing::{level_filters::LevelFilter, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields, MakeWriter},
    registry::LookupSpan,
};

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// Prints the bare message, prefixed by the level for anything but `INFO`.
pub struct LogFormatter {
    ansi: bool,
}

impl LogFormatter {
    pub fn new(ansi: bool) -> Self {
        Self {
            ansi,
        }
    }

    fn prefix(&self, level: Level) -> Option<String> {
        let (color, label) = match level {
            Level::TRACE => (Magenta, "[TRACE]"),
            Level::DEBUG => (Blue, "[DEBUG]"),
            Level::INFO => return None,
            Level::WARN => (Yellow, "[WARN]"),
            Level::ERROR => (Red, "[ERROR]"),
        };

        Some(if self.ansi {
            color.paint(label).to_string()
        } else {
            label.to_string()
        })
    }
}

impl<S, N> FormatEvent<S, N> for LogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if let Some(prefix) = self.prefix(*event.metadata().level()) {
            write!(writer, "{prefix} ")?;
        }

        if let Some(message) = visitor.message {
            writeln!(writer, "{message}")
        } else {
            writeln!(writer)
        }
    }
}

/// In-memory log sink shared between a subscriber and its owner.
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written so far.
    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Builds a subscriber writing plain formatted events up to `level` into this buffer.
    pub fn subscriber(&self, level: LevelFilter) -> impl Subscriber + Send + Sync {
        fmt::Subscriber::builder()
            .with_max_level(level)
            .with_writer(self.clone())
            .with_ansi(false)
            .event_format(LogFormatter::new(false))
            .finish()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
