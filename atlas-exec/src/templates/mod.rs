use std::path::{Path, PathBuf};
use std::sync::Arc;

use atlas_core::expressions::register_filters;
use atlas_core::Value;
use minijinja::{Environment, Error as JinjaError, ErrorKind};

use crate::blueprint::BlueprintPackage;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template `{name}` failed to render: {message}")]
    Render { name: String, message: String },
    #[error("template `{name}` did not render valid YAML: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to write `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders named templates from a blueprint against a value context.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, values: &Value) -> Result<String, TemplateError>;

    /// Renders and parses the output as a YAML document. Blank output is `null`.
    fn render_value(&self, name: &str, values: &Value) -> Result<Value, TemplateError> {
        let text = self.render(name, values)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_yaml::from_str(&text).map_err(|source| TemplateError::Parse {
            name: name.to_string(),
            source,
        })
    }

    /// Renders straight to `path`, creating missing parent directories.
    fn render_file(&self, name: &str, values: &Value, path: &Path) -> Result<(), TemplateError> {
        let text = self.render(name, values)?;
        let write_err = |source: std::io::Error| TemplateError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, text).map_err(write_err)
    }
}

/// minijinja renderer whose template sources come from a blueprint package.
pub struct JinjaTemplateRenderer {
    env: Environment<'static>,
}

impl JinjaTemplateRenderer {
    pub fn new(package: Arc<dyn BlueprintPackage>) -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        register_filters(&mut env);
        env.set_loader(move |name| {
            package.open_text(name).map_err(|e| {
                JinjaError::new(ErrorKind::InvalidOperation, "failed to read template")
                    .with_source(e)
            })
        });
        Self { env }
    }
}

impl TemplateRenderer for JinjaTemplateRenderer {
    fn render(&self, name: &str, values: &Value) -> Result<String, TemplateError> {
        let render_err = |e: JinjaError| TemplateError::Render {
            name: name.to_string(),
            message: format!("{e:#}"),
        };
        let template = self.env.get_template(name).map_err(render_err)?;
        template.render(values).map_err(render_err)
    }
}
