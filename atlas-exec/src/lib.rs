#![forbid(unsafe_code)]

//! Runtime engine for Atlas deployment workflows.
//!
//! Document types and query evaluation live in `atlas-core`; this crate resolves values,
//! tracks secrets and interprets operation trees.

pub mod blueprint;
pub mod console;
pub mod executor;
pub mod patterns;
pub mod secrets;
pub mod templates;
pub mod values;

pub use crate::blueprint::{
    BlueprintError, BlueprintManager, BlueprintPackage, DirectoryBlueprintManager,
    DirectoryBlueprintPackage, LoadedWorkflow, WorkflowLoader,
};
pub use crate::console::{Console, Style};
pub use crate::executor::{
    AuditLog, EngineConfig, ExecutionContext, OperationContext, WorkflowEngine, WorkflowError,
};
pub use crate::patterns::{GlobPatternMatcher, PatternMatcher};
pub use crate::secrets::{SecretFilterWriter, SecretTracker, SecretValue};
pub use crate::templates::{JinjaTemplateRenderer, TemplateError, TemplateRenderer};
pub use crate::values::{ValuesEngine, ValuesError};
