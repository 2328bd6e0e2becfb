use std::sync::Arc;
use std::time::{Duration, Instant};

use atlas_core::{merge, Operation, RequestInfo, Value, Workflow};
use chrono::Utc;
use serde_json::json;

use crate::blueprint::{BlueprintManager, WorkflowLoader};
use crate::console::Style;
use crate::executor::audit::{LogRecord, OperationSummary};
use crate::executor::auth::{TokenProvider, TokenRequest};
use crate::executor::context::OperationContext;
use crate::executor::error::{OperationError, RequestError, WorkflowError};
use crate::executor::http::HttpClient;
use crate::executor::request::{build_request_parts, request_to_value, response_to_value};
use crate::executor::types::EngineConfig;
use crate::values::ValuesEngine;

/// Interprets operation trees.
///
/// Operations run depth-first and strictly in order. Each activation may suspend on an HTTP
/// exchange, a repeat delay or a sub-workflow load.
pub struct WorkflowEngine {
    values: ValuesEngine,
    http: Arc<dyn HttpClient>,
    tokens: Arc<dyn TokenProvider>,
    blueprints: Arc<dyn BlueprintManager>,
    loader: WorkflowLoader,
    config: EngineConfig,
}

/// What one activation leaves behind for its parent.
struct Activation {
    values_out: Option<Value>,
    /// Cumulative values after `values_in` and `values_out`.
    values: Value,
}

/// Working state of a single pass through an operation's action body.
struct Frame {
    values: Value,
    values_in: Option<Value>,
    request: Option<Value>,
    result: Option<Value>,
    nested: Option<Value>,
}

impl Frame {
    fn new(values: &Value) -> Self {
        Self {
            values: values.clone(),
            values_in: None,
            request: None,
            result: None,
            nested: None,
        }
    }

    /// Cumulative values overlaid with `{result}` and any nested operations' output.
    fn output_context(&self) -> Value {
        let mut context = self.values.clone();
        if let Some(result) = &self.result {
            context = merge(&json!({ "result": result }), &context);
        }
        if let Some(nested) = &self.nested {
            context = merge(nested, &context);
        }
        context
    }

    fn set_result(&mut self, result: Value) {
        self.result = Some(match self.result.take() {
            Some(previous) => merge(&result, &previous),
            None => result,
        });
    }
}

/// The action body's outcome after the catch guard has seen it.
struct Guarded {
    values_out: Option<Value>,
    caught: Option<Value>,
}

impl WorkflowEngine {
    pub fn new(
        values: ValuesEngine,
        http: Arc<dyn HttpClient>,
        tokens: Arc<dyn TokenProvider>,
        blueprints: Arc<dyn BlueprintManager>,
        config: EngineConfig,
    ) -> Self {
        Self {
            loader: WorkflowLoader::new(values.clone()),
            values,
            http,
            tokens,
            blueprints,
            config,
        }
    }

    pub fn loader(&self) -> &WorkflowLoader {
        &self.loader
    }

    /// Runs a workflow's operations and resolves its top-level `output`, when declared,
    /// against `merge(result, values)`.
    pub async fn execute_workflow(
        &self,
        context: &OperationContext<'_>,
        workflow: &Workflow,
    ) -> Result<Value, WorkflowError> {
        let result = self.execute_operations(context, &workflow.operations).await?;
        match &workflow.output {
            Some(output) => {
                let output_context = merge(&result, context.values());
                Ok(self.values.process_values(output, &output_context)?)
            }
            None => Ok(result),
        }
    }

    /// Runs `operations` in order and folds their outputs, later siblings winning.
    pub async fn execute_operations(
        &self,
        context: &OperationContext<'_>,
        operations: &[Operation],
    ) -> Result<Value, WorkflowError> {
        let mut cumulative = context.values().clone();
        let mut result = Value::Null;
        for operation in operations {
            if let Some(values_out) = self.execute_operation(context, operation, &cumulative).await? {
                cumulative = merge(&values_out, &cumulative);
                result = merge(&values_out, &result);
            }
        }
        Ok(result)
    }

    async fn execute_operation(
        &self,
        parent: &OperationContext<'_>,
        operation: &Operation,
        values: &Value,
    ) -> Result<Option<Value>, WorkflowError> {
        let Some(foreach) = &operation.foreach else {
            let target = self.resolve_target(operation, values)?;
            let context = parent.create_child_context(operation, target.as_deref(), values.clone());
            return Ok(self.execute_operation_inner(&context, operation).await?.values_out);
        };

        let iterations = self.values.process_values_foreach_in(&foreach.values, values)?;
        tracing::debug!(path = parent.path(), iterations = iterations.len(), "foreach");

        let mut iteration_values = Vec::with_capacity(iterations.len());
        let mut folded: Option<Value> = None;
        for item in iterations {
            let item_values = merge(&item, values);
            let target = self.resolve_target(operation, &item_values)?;
            let context = parent.create_child_context(operation, target.as_deref(), item_values);
            let activation = self.execute_operation_inner(&context, operation).await?;
            if let Some(values_out) = &activation.values_out {
                folded = Some(merge(values_out, folded.as_ref().unwrap_or(&Value::Null)));
            }
            iteration_values.push(activation.values);
        }

        match &foreach.output {
            Some(output) => Ok(Some(
                self.values.process_values_foreach_out(output, &iteration_values)?,
            )),
            None => Ok(folded),
        }
    }

    fn resolve_target(
        &self,
        operation: &Operation,
        values: &Value,
    ) -> Result<Option<String>, WorkflowError> {
        match &operation.target {
            Some(target) => Ok(self
                .values
                .evaluate_to_string(&Value::String(target.clone()), values)?),
            None => Ok(None),
        }
    }

    async fn execute_operation_inner(
        &self,
        context: &OperationContext<'_>,
        operation: &Operation,
    ) -> Result<Activation, WorkflowError> {
        let exec = context.exec();
        let pattern_okay = exec.patterns.is_match(context.path());
        let condition_okay = match &operation.condition {
            Some(condition) => self.values.evaluate_to_boolean(condition, context.values())?,
            None => true,
        };
        if !(pattern_okay && condition_okay) {
            tracing::debug!(path = context.path(), pattern_okay, condition_okay, "skipping operation");
            return Ok(Activation {
                values_out: None,
                values: context.values().clone(),
            });
        }

        if let Some(message) = &operation.message {
            if let Some(text) = self
                .values
                .evaluate_to_string(&Value::String(message.clone()), context.values())?
            {
                exec.console.write_line(context.indent(), Style::Heading, &text);
            }
        }

        let activation_started = tokio::time::Instant::now();
        loop {
            let iteration_started = Instant::now();
            let started = Utc::now();
            let mut frame = Frame::new(context.values());

            let outcome = self.execute_body(context, operation, &mut frame).await;
            let guarded = self.catch_guard(operation, &frame, outcome);
            self.write_audit(context, operation, &frame, &guarded, started, iteration_started);
            let values_out = guarded?.values_out;

            let values = match &values_out {
                Some(out) => merge(out, &frame.values),
                None => frame.values,
            };

            let Some(repeat) = &operation.repeat else {
                return Ok(Activation { values_out, values });
            };
            if !self.values.evaluate_to_boolean(&repeat.condition, &values)? {
                return Ok(Activation { values_out, values });
            }
            if let Some(timeout) = repeat.timeout.map(seconds) {
                if activation_started.elapsed() > timeout {
                    tracing::warn!(path = context.path(), ?timeout, "repeat timed out");
                    return Ok(Activation { values_out, values });
                }
            }
            if let Some(delay) = repeat.delay.map(seconds) {
                tokio::time::sleep(delay).await;
            }
            tracing::debug!(path = context.path(), "repeating operation");
        }
    }

    /// Values in, then request, template, sub-workflow, nested operations, output and throw.
    async fn execute_body(
        &self,
        context: &OperationContext<'_>,
        operation: &Operation,
        frame: &mut Frame,
    ) -> Result<Option<Value>, WorkflowError> {
        let scoped = match &operation.values {
            Some(values) => {
                let values_in = self.values.process_values(values, context.values())?;
                context.with_values_in(values_in)
            }
            None => context.clone(),
        };
        frame.values = scoped.values().clone();
        frame.values_in = scoped.values_in().cloned();

        if let Some(name) = &operation.request {
            self.execute_request(&scoped, name, frame).await?;
        }

        if let Some(name) = &operation.template {
            self.execute_template(&scoped, operation, name, frame)?;
        }

        if let Some(reference) = &operation.workflow {
            let result = self.execute_sub_workflow(&scoped, reference, frame).await?;
            frame.set_result(result);
        }

        let mut values_out = None;
        if let Some(children) = &operation.operations {
            let nested = Box::pin(self.execute_operations(&scoped, children)).await?;
            if operation.output.is_some() {
                frame.nested = Some(nested);
            } else {
                values_out = Some(nested);
            }
        }

        if let Some(output) = &operation.output {
            values_out = Some(self.values.process_values(output, &frame.output_context())?);
        }

        if let Some(throw) = &operation.throw {
            let output_context = frame.output_context();
            let message = match &throw.message {
                Some(message) => self
                    .values
                    .evaluate_to_string(&Value::String(message.clone()), &output_context)?,
                None => None,
            }
            .unwrap_or_else(|| "operation failed".to_string());
            let details = match &throw.details {
                Some(details) => self.values.process_values(details, &output_context)?,
                None => Value::Null,
            };
            context
                .exec()
                .console
                .write_line(context.child_indent(), Style::Error, &message);
            return Err(OperationError { message, details }.into());
        }

        Ok(values_out)
    }

    /// Decides whether `operation.catch` absorbs a failed body.
    ///
    /// The condition sees `{error}` merged over the output context at the point of failure, plus
    /// `result` from a nested failed request when this operation has no result of its own.
    /// A condition that cannot be evaluated does not catch.
    fn catch_guard(
        &self,
        operation: &Operation,
        frame: &Frame,
        outcome: Result<Option<Value>, WorkflowError>,
    ) -> Result<Guarded, WorkflowError> {
        let error = match outcome {
            Ok(values_out) => {
                return Ok(Guarded {
                    values_out,
                    caught: None,
                })
            }
            Err(error) => error,
        };
        let Some(catch) = &operation.catch else {
            return Err(error);
        };
        if !error.is_catchable() {
            return Err(error);
        }

        let error_value = error.to_value();
        let mut overlay = json!({ "error": error_value });
        // A request failing below this operation still exposes its response as `result`.
        if let (WorkflowError::Request(failed), None) = (&error, &frame.result) {
            overlay["result"] = failed.response.clone();
        }
        let error_context = merge(&overlay, &frame.output_context());
        let caught = match &catch.condition {
            Some(condition) => match self.values.evaluate_to_boolean(condition, &error_context) {
                Ok(caught) => caught,
                Err(e) => {
                    tracing::warn!(condition = condition.as_str(), error = %e, "catch condition failed");
                    false
                }
            },
            None => true,
        };
        if !caught {
            return Err(error);
        }

        tracing::debug!(error = %error, "error caught");
        let values_out = match &catch.output {
            Some(output) => Some(self.values.process_values(output, &error_context)?),
            None => None,
        };
        Ok(Guarded {
            values_out,
            caught: Some(error_value),
        })
    }

    async fn execute_request(
        &self,
        context: &OperationContext<'_>,
        name: &str,
        frame: &mut Frame,
    ) -> Result<(), WorkflowError> {
        let exec = context.exec();
        let rendered = exec.templates.render_value(name, &frame.values)?;
        let info: RequestInfo = serde_json::from_value(rendered).map_err(|e| {
            WorkflowError::InvalidRequest(format!("request template `{name}`: {e}"))
        })?;
        frame.request = Some(request_to_value(&info));
        let method = info.method.to_ascii_uppercase();

        if exec.dry_run && !info.is_get() {
            exec.console.write_line(
                context.child_indent(),
                Style::Warning,
                &format!("{method} {} (skipped, dry run)", info.url),
            );
            return Ok(());
        }

        let token = match &info.auth {
            Some(auth) => {
                let request = TokenRequest::from_auth(auth, exec.interactive);
                let token = self.tokens.acquire_token(&request).await?;
                exec.secrets.add_secret(token.expose_str());
                Some(token)
            }
            None => None,
        };

        let parts = build_request_parts(&info, token.as_ref())?;
        let started = Instant::now();
        let response = self
            .http
            .send(parts, self.config.request_timeout, self.config.max_response_bytes)
            .await?;
        tracing::debug!(
            method = method.as_str(),
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        let style = if response.status >= 400 { Style::Error } else { Style::Info };
        exec.console.write_line(
            context.child_indent(),
            style,
            &format!("{method} {} {}", info.url, response.status),
        );

        let response_value = response_to_value(&response);
        frame.set_result(response_value.clone());
        if response.status >= 400 {
            return Err(RequestError {
                method,
                url: info.url,
                status: response.status,
                request: frame.request.clone().unwrap_or(Value::Null),
                response: response_value,
            }
            .into());
        }
        Ok(())
    }

    fn execute_template(
        &self,
        context: &OperationContext<'_>,
        operation: &Operation,
        name: &str,
        frame: &mut Frame,
    ) -> Result<(), WorkflowError> {
        let exec = context.exec();
        let write = match &operation.write {
            Some(write) => self
                .values
                .evaluate_to_string(&Value::String(write.clone()), &frame.values)?
                .filter(|path| !path.is_empty()),
            None => None,
        };

        match write {
            Some(path) => {
                let target = exec.output_directory.join(&path);
                exec.templates.render_file(name, &frame.values, &target)?;
                tracing::debug!(template = name, path = %target.display(), "wrote template");
            }
            None => {
                let rendered = exec.templates.render_value(name, &frame.values)?;
                if operation.output.is_some() {
                    frame.set_result(rendered);
                }
            }
        }
        Ok(())
    }

    /// Loads `reference` relative to the current blueprint and runs it with this operation's
    /// `values` as its input.
    async fn execute_sub_workflow(
        &self,
        context: &OperationContext<'_>,
        reference: &str,
        frame: &Frame,
    ) -> Result<Value, WorkflowError> {
        let exec = context.exec();
        let package = self
            .blueprints
            .get_blueprint_package_dependency(exec.blueprint.as_ref(), reference)
            .await?;
        let input = frame.values_in.clone().unwrap_or_else(|| json!({}));
        let loaded = self.loader.load(package, &input)?;
        tracing::debug!(
            reference,
            operations = loaded.workflow.operation_count(),
            "running sub-workflow"
        );

        let sub_exec = exec.for_sub_workflow(loaded.templates, loaded.package);
        let sub_context = context.create_workflow_context(sub_exec, loaded.values);
        Box::pin(self.execute_workflow(&sub_context, &loaded.workflow)).await
    }

    fn write_audit(
        &self,
        context: &OperationContext<'_>,
        operation: &Operation,
        frame: &Frame,
        guarded: &Result<Guarded, WorkflowError>,
        started: chrono::DateTime<Utc>,
        iteration_started: Instant,
    ) {
        let (values_out, error, caught) = match guarded {
            Ok(guarded) => (
                guarded.values_out.clone(),
                guarded.caught.clone(),
                guarded.caught.is_some(),
            ),
            Err(error) => (None, Some(error.to_value()), false),
        };
        let record = LogRecord {
            operation: OperationSummary::from(operation),
            path: context.path().to_string(),
            started: started.to_rfc3339(),
            elapsed_ms: iteration_started.elapsed().as_millis() as u64,
            values_in: frame.values_in.clone(),
            values_out,
            values: frame.values.clone(),
            request: frame.request.clone(),
            result: frame.result.clone(),
            error,
            caught,
        };
        context
            .exec()
            .audit
            .write(context.indent(), operation.display_name(), &record);
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}
