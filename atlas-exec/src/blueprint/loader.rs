use std::sync::Arc;

use atlas_core::{merge, parse_values_str, parse_workflow_str, DocumentFormat, Value, Workflow};

use crate::blueprint::{BlueprintError, BlueprintPackage};
use crate::templates::{JinjaTemplateRenderer, TemplateRenderer};
use crate::values::ValuesEngine;

pub const WORKFLOW_FILE: &str = "workflow.yaml";
pub const VALUES_FILE: &str = "values.yaml";

/// A blueprint ready to run: its renderer, rendered workflow and initial values.
pub struct LoadedWorkflow {
    pub package: Arc<dyn BlueprintPackage>,
    pub templates: Arc<dyn TemplateRenderer>,
    pub workflow: Workflow,
    pub values: Value,
}

pub struct WorkflowLoader {
    values: ValuesEngine,
}

impl WorkflowLoader {
    pub fn new(values: ValuesEngine) -> Self {
        Self { values }
    }

    /// Renders `workflow.yaml` with the package defaults overlaid by `input`.
    pub fn load(
        &self,
        package: Arc<dyn BlueprintPackage>,
        input: &Value,
    ) -> Result<LoadedWorkflow, BlueprintError> {
        let templates: Arc<dyn TemplateRenderer> =
            Arc::new(JinjaTemplateRenderer::new(Arc::clone(&package)));

        let defaults = match read(package.as_ref(), VALUES_FILE)? {
            Some(text) => parse_values_str(&text, DocumentFormat::Yaml).map_err(|source| {
                BlueprintError::Parse {
                    location: package.location().to_string(),
                    path: VALUES_FILE.to_string(),
                    source,
                }
            })?,
            None => Value::Null,
        };
        let values = match merge(input, &defaults) {
            Value::Null => Value::Object(Default::default()),
            values => values,
        };

        if !package.exists(WORKFLOW_FILE) {
            return Err(BlueprintError::MissingFile {
                location: package.location().to_string(),
                path: WORKFLOW_FILE.to_string(),
            });
        }
        let rendered = templates.render(WORKFLOW_FILE, &values)?;
        let workflow = parse_workflow_str(&rendered, DocumentFormat::Yaml)
            .map_err(|source| BlueprintError::Parse {
                location: package.location().to_string(),
                path: WORKFLOW_FILE.to_string(),
                source,
            })?
            .workflow;

        let values = match &workflow.values {
            Some(declared) => merge(&self.values.process_values(declared, &values)?, &values),
            None => values,
        };

        tracing::debug!(
            location = package.location(),
            operations = workflow.operation_count(),
            "loaded workflow"
        );
        Ok(LoadedWorkflow {
            package,
            templates,
            workflow,
            values,
        })
    }
}

fn read(package: &dyn BlueprintPackage, path: &str) -> Result<Option<String>, BlueprintError> {
    package
        .open_text(path)
        .map_err(|source| BlueprintError::Read {
            path: std::path::Path::new(package.location()).join(path),
            source,
        })
}
