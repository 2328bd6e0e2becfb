use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::secrets::SecretFilterWriter;

/// Replacement text for every redacted secret. Alphanumeric secrets never match inside it,
/// so later replacements leave earlier ones intact.
pub const REDACTED: &str = "***";

/// Ordered set of secrets masked out of everything the engine prints or logs.
///
/// A secret never precedes a longer tracked secret that contains it, so overlapping secrets
/// are masked whole before any of their substrings is replaced.
#[derive(Debug, Default)]
pub struct SecretTracker {
    secrets: Mutex<Vec<String>>,
}

impl SecretTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `secret`, and each of its lines separately when it spans several.
    pub fn add_secret(&self, secret: &str) {
        if secret.is_empty() {
            return;
        }
        let mut candidates = vec![secret];
        candidates.extend(
            secret
                .split(['\r', '\n'])
                .filter(|line| !line.is_empty() && *line != secret),
        );

        let mut secrets = self.lock();
        for candidate in candidates {
            insert_ordered(&mut secrets, candidate);
        }
    }

    pub fn filter_string(&self, text: &str) -> String {
        let secrets = self.lock();
        let mut filtered = text.to_string();
        for secret in secrets.iter() {
            if filtered.contains(secret.as_str()) {
                filtered = filtered.replace(secret.as_str(), REDACTED);
            }
        }
        filtered
    }

    /// Wraps `writer` so that every complete line written through it is redacted.
    pub fn filter_writer<W: Write>(self: &Arc<Self>, writer: W) -> SecretFilterWriter<W> {
        SecretFilterWriter::new(writer, Arc::clone(self))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.secrets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Inserts `secret` right after the last tracked secret that contains it.
///
/// Anything `secret` contains already sits after every secret containing `secret`, so this
/// position also precedes all of them.
fn insert_ordered(secrets: &mut Vec<String>, secret: &str) {
    if secrets.iter().any(|existing| existing == secret) {
        return;
    }
    let position = secrets
        .iter()
        .rposition(|existing| existing.contains(secret))
        .map(|index| index + 1)
        .unwrap_or(0);
    secrets.insert(position, secret.to_string());
}
