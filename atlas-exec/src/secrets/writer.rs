use std::io::{self, Write};
use std::sync::Arc;

use crate::secrets::SecretTracker;

/// Line-buffering writer that redacts tracked secrets before forwarding text.
///
/// Text is held until a newline arrives so a secret split across several writes is still
/// matched. A trailing partial line is redacted and forwarded on `flush` or drop.
pub struct SecretFilterWriter<W: Write> {
    inner: W,
    secrets: Arc<SecretTracker>,
    pending: Vec<u8>,
}

impl<W: Write> SecretFilterWriter<W> {
    pub fn new(inner: W, secrets: Arc<SecretTracker>) -> Self {
        Self {
            inner,
            secrets,
            pending: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    fn emit(&mut self, bytes: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        let filtered = self.secrets.filter_string(&text);
        self.inner.write_all(filtered.as_bytes())
    }
}

impl<W: Write> Write for SecretFilterWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.emit(&line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for SecretFilterWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
