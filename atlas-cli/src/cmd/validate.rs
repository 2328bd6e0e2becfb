use std::sync::Arc;

use atlas_core::JinjaQueryEvaluator;
use atlas_exec::{BlueprintManager, DirectoryBlueprintManager, SecretTracker, ValuesEngine, WorkflowLoader};
use serde::Serialize;

use super::config::{blueprint_exit_code, load_values};
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, ValuesArgs};

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    blueprint: String,
    operations: usize,
    #[serde(rename = "topLevelOperations")]
    top_level_operations: usize,
}

pub async fn validate_cmd(blueprint: &str, values: ValuesArgs, output: OutputArgs) -> i32 {
    let secrets = SecretTracker::new();
    let values = match load_values(&values, &secrets) {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &secrets.filter_string(&e));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let package = match DirectoryBlueprintManager::new().get_blueprint_package(blueprint).await {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return blueprint_exit_code(&e);
        }
    };

    let loader = WorkflowLoader::new(ValuesEngine::new(Arc::new(JinjaQueryEvaluator::new())));
    match loader.load(package, &values) {
        Ok(loaded) => {
            let result = ValidateResult {
                valid: true,
                blueprint: blueprint.to_string(),
                operations: loaded.workflow.operation_count(),
                top_level_operations: loaded.workflow.operations.len(),
            };
            if output.format == OutputFormat::Text && !output.quiet {
                println!(
                    "ok: {} renders {} operations ({} top-level)",
                    blueprint, result.operations, result.top_level_operations
                );
            } else {
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &secrets.filter_string(&e.to_string()),
            );
            blueprint_exit_code(&e)
        }
    }
}
