use std::path::PathBuf;
use std::sync::Arc;

use atlas_core::{merge, Operation, Value};
use chrono::{DateTime, Utc};

use crate::blueprint::BlueprintPackage;
use crate::console::Console;
use crate::executor::audit::AuditLog;
use crate::patterns::PatternMatcher;
use crate::secrets::SecretTracker;
use crate::templates::TemplateRenderer;

/// Collaborators and flags shared by every activation of one workflow.
#[derive(Clone)]
pub struct ExecutionContext {
    pub templates: Arc<dyn TemplateRenderer>,
    pub patterns: Arc<dyn PatternMatcher>,
    pub blueprint: Arc<dyn BlueprintPackage>,
    pub secrets: Arc<SecretTracker>,
    pub console: Arc<Console>,
    pub audit: Arc<AuditLog>,
    pub dry_run: bool,
    pub interactive: bool,
    pub output_directory: PathBuf,
}

impl ExecutionContext {
    /// Same console, secrets, patterns and audit log; the sub-workflow's own templates.
    pub fn for_sub_workflow(
        &self,
        templates: Arc<dyn TemplateRenderer>,
        blueprint: Arc<dyn BlueprintPackage>,
    ) -> Self {
        Self {
            templates,
            blueprint,
            ..self.clone()
        }
    }
}

/// The state visible to one operation activation.
///
/// Contexts are immutable. `values_in` is fixed at construction through
/// [`OperationContext::with_values_in`], and an activation's output is returned to the caller
/// instead of being stored.
#[derive(Clone)]
pub struct OperationContext<'a> {
    exec: Arc<ExecutionContext>,
    parent: Option<&'a OperationContext<'a>>,
    operation: Option<&'a Operation>,
    indent: usize,
    path: String,
    started: DateTime<Utc>,
    values: Value,
    values_in: Option<Value>,
}

impl<'a> OperationContext<'a> {
    pub fn root(exec: Arc<ExecutionContext>, values: Value) -> Self {
        Self {
            exec,
            parent: None,
            operation: None,
            indent: 0,
            path: String::new(),
            started: Utc::now(),
            values,
            values_in: None,
        }
    }

    /// Context for an activation of `operation` beneath this one.
    ///
    /// Children are indented one step deeper only when this activation printed a message.
    pub fn create_child_context(
        &'a self,
        operation: &'a Operation,
        target: Option<&str>,
        values: Value,
    ) -> OperationContext<'a> {
        let path = match target.filter(|t| !t.is_empty()) {
            Some(target) if self.path.is_empty() => target.to_string(),
            Some(target) => format!("{}/{}", self.path, target),
            None => self.path.clone(),
        };
        OperationContext {
            exec: Arc::clone(&self.exec),
            parent: Some(self),
            operation: Some(operation),
            indent: self.child_indent(),
            path,
            started: Utc::now(),
            values,
            values_in: None,
        }
    }

    /// Context for the operations of a sub-workflow started from this activation.
    pub fn create_workflow_context(
        &'a self,
        exec: ExecutionContext,
        values: Value,
    ) -> OperationContext<'a> {
        OperationContext {
            exec: Arc::new(exec),
            parent: Some(self),
            operation: None,
            indent: self.child_indent(),
            path: self.path.clone(),
            started: Utc::now(),
            values,
            values_in: None,
        }
    }

    /// This context with `values_in` merged over its cumulative values.
    pub fn with_values_in(&self, values_in: Value) -> Self {
        Self {
            values: merge(&values_in, &self.values),
            values_in: Some(values_in),
            ..self.clone()
        }
    }

    pub fn exec(&self) -> &ExecutionContext {
        &self.exec
    }

    pub fn parent(&self) -> Option<&'a OperationContext<'a>> {
        self.parent
    }

    pub fn operation(&self) -> Option<&'a Operation> {
        self.operation
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn child_indent(&self) -> usize {
        match self.operation.and_then(|op| op.message.as_deref()) {
            Some(message) if !message.is_empty() => self.indent + 1,
            _ => self.indent,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn values_in(&self) -> Option<&Value> {
        self.values_in.as_ref()
    }
}
