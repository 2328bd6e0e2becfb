use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use atlas_core::{Operation, Value};
use serde::Serialize;

use crate::secrets::SecretTracker;

/// One record per operation activation (and per repeat iteration).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub operation: OperationSummary,
    pub path: String,
    pub started: String,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_in: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_out: Option<Value>,
    pub values: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub caught: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<String>,
}

impl From<&Operation> for OperationSummary {
    fn from(op: &Operation) -> Self {
        Self {
            message: op.message.clone(),
            target: op.target.clone(),
            condition: op.condition.clone(),
            request: op.request.clone(),
            template: op.template.clone(),
            workflow: op.workflow.clone(),
            write: op.write.clone(),
        }
    }
}

/// Numbered YAML files under a logs directory, shared by a run and all its sub-workflows.
#[derive(Debug)]
pub struct AuditLog {
    directory: Option<PathBuf>,
    counter: AtomicUsize,
    secrets: Arc<SecretTracker>,
}

impl AuditLog {
    pub fn new(directory: Option<PathBuf>, secrets: Arc<SecretTracker>) -> Self {
        Self {
            directory,
            counter: AtomicUsize::new(0),
            secrets,
        }
    }

    pub fn disabled(secrets: Arc<SecretTracker>) -> Self {
        Self::new(None, secrets)
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Writes `record`; failures are logged and otherwise ignored.
    pub fn write(&self, indent: usize, name: Option<&str>, record: &LogRecord) {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let Some(directory) = &self.directory else {
            return;
        };
        let path = directory.join(file_name(sequence, indent, name));
        if let Err(e) = self.write_file(directory, &path, record) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write audit log");
        }
    }

    fn write_file(&self, directory: &Path, path: &Path, record: &LogRecord) -> std::io::Result<()> {
        let text = serde_yaml::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::create_dir_all(directory)?;
        std::fs::write(path, self.secrets.filter_string(&text))
    }
}

/// `{sequence:03}-{2 dashes per indent}{slug}.yaml`
pub fn file_name(sequence: usize, indent: usize, name: Option<&str>) -> String {
    let slug: String = name
        .unwrap_or("operation")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{sequence:03}-{}{slug}.yaml", "-".repeat(2 * indent))
}
