mod error;
mod loader;
mod manager;
mod package;

pub use error::BlueprintError;
pub use loader::{LoadedWorkflow, WorkflowLoader, VALUES_FILE, WORKFLOW_FILE};
pub use manager::{BlueprintManager, DirectoryBlueprintManager};
pub use package::{BlueprintPackage, DirectoryBlueprintPackage};
