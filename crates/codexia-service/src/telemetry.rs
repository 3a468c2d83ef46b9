//! Log subscriber setup. Every formatted line is redacted before it is written.

use std::io::{self, Write};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::guard::redact;

/// Wraps another [`MakeWriter`] so each event is buffered, redacted, then
/// forwarded in one write.
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            buf: Vec::new(),
        }
    }
}

pub struct RedactingWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> RedactingWriter<W> {
    fn emit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&self.buf);
        self.inner.write_all(redact(&text).as_bytes())?;
        self.buf.clear();
        Ok(())
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit()?;
        self.inner.flush()
    }
}

impl<W: Write> Drop for RedactingWriter<W> {
    fn drop(&mut self) {
        let _ = self.emit();
    }
}

/// Install the global fmt subscriber on stderr. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(RedactingMakeWriter::new(io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Captured;

    #[test]
    fn log_lines_are_redacted() {
        let sink = Captured::default();
        let writer = {
            let sink = sink.clone();
            move || sink.clone()
        };
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(RedactingMakeWriter::new(writer))
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(npi = "1234567890", "note from test@example.com");
        });

        let logged = sink.text();
        assert!(logged.contains("[REDACTED_EMAIL]"), "{logged}");
        assert!(logged.contains("[REDACTED_NPI]"), "{logged}");
        assert!(!logged.contains("test@example.com"));
        assert!(!logged.contains("1234567890"));
    }

    #[test]
    fn partial_writes_redact_as_one_line() {
        let sink = Captured::default();
        {
            let mut w = RedactingWriter {
                inner: sink.clone(),
                buf: Vec::new(),
            };
            w.write_all(b"npi 12345").unwrap();
            w.write_all(b"67890 end\n").unwrap();
        }
        assert_eq!(sink.text(), "npi [REDACTED_NPI] end\n");
    }
}
