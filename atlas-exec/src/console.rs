use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::secrets::{SecretFilterWriter, SecretTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Heading,
    Info,
    Warning,
    Error,
    Plain,
}

impl Style {
    fn ansi(self) -> Option<&'static str> {
        match self {
            Style::Heading => Some("\x1b[1;36m"),
            Style::Info => Some("\x1b[32m"),
            Style::Warning => Some("\x1b[33m"),
            Style::Error => Some("\x1b[1;31m"),
            Style::Plain => None,
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Line-oriented user output. Everything written passes through the secret filter.
pub struct Console {
    out: Mutex<SecretFilterWriter<Box<dyn Write + Send>>>,
    color: bool,
}

impl Console {
    pub fn new(writer: Box<dyn Write + Send>, secrets: &Arc<SecretTracker>, color: bool) -> Self {
        Self {
            out: Mutex::new(secrets.filter_writer(writer)),
            color,
        }
    }

    pub fn stdout(secrets: &Arc<SecretTracker>, color: bool) -> Self {
        Self::new(Box::new(io::stdout()), secrets, color)
    }

    /// Writes `text` with every line indented two spaces per `indent`.
    pub fn write_line(&self, indent: usize, style: Style, text: &str) {
        let pad = "  ".repeat(indent);
        let mut buf = String::new();
        for line in text.lines() {
            buf.push_str(&pad);
            match style.ansi().filter(|_| self.color) {
                Some(code) => {
                    buf.push_str(code);
                    buf.push_str(line);
                    buf.push_str(RESET);
                }
                None => buf.push_str(line),
            }
            buf.push('\n');
        }
        if buf.is_empty() {
            buf.push('\n');
        }

        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let written = out.write_all(buf.as_bytes());
        if let Err(e) = written.and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "failed to write console output");
        }
    }

    pub fn flush(&self) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = out.flush() {
            tracing::warn!(error = %e, "failed to flush console output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn indents_every_line_and_redacts() {
        let secrets = Arc::new(SecretTracker::new());
        secrets.add_secret("hunter2");
        let buf = Shared::default();
        let console = Console::new(Box::new(buf.clone()), &secrets, false);
        console.write_line(2, Style::Info, "pass hunter2\nnext");
        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "    pass ***\n    next\n");
    }

    #[test]
    fn colors_only_when_enabled() {
        let secrets = Arc::new(SecretTracker::new());
        let buf = Shared::default();
        let console = Console::new(Box::new(buf.clone()), &secrets, true);
        console.write_line(0, Style::Warning, "careful");
        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "\x1b[33mcareful\x1b[0m\n");
    }
}
