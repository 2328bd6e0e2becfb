use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use atlas_core::{JinjaQueryEvaluator, Value};
use atlas_exec::executor::{EnvTokenProvider, ReqwestHttpClient};
use atlas_exec::{
    AuditLog, BlueprintManager, Console, DirectoryBlueprintManager, ExecutionContext,
    GlobPatternMatcher, OperationContext, SecretTracker, Style, ValuesEngine, WorkflowEngine,
};

use super::config::{blueprint_exit_code, build_engine_config, load_values};
use crate::exit_codes;
use crate::output::{print_error, OutputFormat};
use crate::{HttpArgs, OutputArgs, TargetArgs, ValuesArgs};

pub const OUTPUT_FILE: &str = "output.yaml";
pub const LOGS_DIRECTORY: &str = "logs";

pub struct DeployOptions {
    pub blueprint: String,
    pub values: ValuesArgs,
    pub dry_run: bool,
    pub targets: TargetArgs,
    pub output_directory: PathBuf,
    pub logs: bool,
    pub interactive: bool,
    pub http: HttpArgs,
    pub color: bool,
    pub output: OutputArgs,
}

pub async fn deploy_cmd(options: DeployOptions) -> i32 {
    let output = &options.output;
    let secrets = Arc::new(SecretTracker::new());
    let report = |message: &str| {
        print_error(output.format, output.quiet, &secrets.filter_string(message));
    };

    let values = match load_values(&options.values, &secrets) {
        Ok(v) => v,
        Err(e) => {
            report(&e);
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let patterns = match GlobPatternMatcher::new(&options.targets.targets, &options.targets.excludes) {
        Ok(p) => p,
        Err(e) => {
            report(&format!("invalid target pattern: {e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let http = match ReqwestHttpClient::new() {
        Ok(c) => c,
        Err(e) => {
            report(&e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let manager = Arc::new(DirectoryBlueprintManager::new());
    let package = match manager.get_blueprint_package(&options.blueprint).await {
        Ok(p) => p,
        Err(e) => {
            report(&e.to_string());
            return blueprint_exit_code(&e);
        }
    };

    let engine = WorkflowEngine::new(
        ValuesEngine::new(Arc::new(JinjaQueryEvaluator::new())),
        Arc::new(http),
        Arc::new(EnvTokenProvider::default()),
        manager,
        build_engine_config(&options.http),
    );

    let loaded = match engine.loader().load(package, &values) {
        Ok(l) => l,
        Err(e) => {
            report(&e.to_string());
            return blueprint_exit_code(&e);
        }
    };

    let console = Arc::new(Console::stdout(&secrets, options.color));
    let logs = options
        .logs
        .then(|| options.output_directory.join(LOGS_DIRECTORY));
    let exec = ExecutionContext {
        templates: loaded.templates,
        patterns: Arc::new(patterns),
        blueprint: loaded.package,
        secrets: Arc::clone(&secrets),
        console: Arc::clone(&console),
        audit: Arc::new(AuditLog::new(logs, Arc::clone(&secrets))),
        dry_run: options.dry_run,
        interactive: options.interactive,
        output_directory: options.output_directory.clone(),
    };
    tracing::info!(
        blueprint = options.blueprint.as_str(),
        operations = loaded.workflow.operation_count(),
        dry_run = options.dry_run,
        "starting deployment"
    );

    let context = OperationContext::root(Arc::new(exec), loaded.values);
    let result = match engine.execute_workflow(&context, &loaded.workflow).await {
        Ok(r) => r,
        Err(e) => {
            console.flush();
            report(&e.to_string());
            return exit_codes::RUN_FAILED;
        }
    };

    let text = match render_result(&result, output.format) {
        Ok(t) => t,
        Err(e) => {
            report(&e);
            return exit_codes::RUNTIME_ERROR;
        }
    };
    if let Err(e) = write_output(&options.output_directory, &text, &secrets) {
        report(&format!(
            "failed to write {}: {e}",
            options.output_directory.join(OUTPUT_FILE).display()
        ));
        return exit_codes::RUNTIME_ERROR;
    }
    if !output.quiet && !result.is_null() {
        console.write_line(0, Style::Plain, text.trim_end());
    }
    console.flush();
    exit_codes::SUCCESS
}

fn render_result(result: &Value, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Text => serde_yaml::to_string(result).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(result).map_err(|e| e.to_string()),
    }
}

/// Writes `output.yaml` through the secret filter.
fn write_output(directory: &Path, text: &str, secrets: &Arc<SecretTracker>) -> std::io::Result<()> {
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(directory.join(OUTPUT_FILE))?;
    let mut writer = secrets.filter_writer(file);
    writer.write_all(text.as_bytes())?;
    writer.flush()
}
