use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::blueprint::{BlueprintError, BlueprintPackage, DirectoryBlueprintPackage};

/// Resolves blueprint references to packages.
#[async_trait]
pub trait BlueprintManager: Send + Sync {
    async fn get_blueprint_package(
        &self,
        reference: &str,
    ) -> Result<Arc<dyn BlueprintPackage>, BlueprintError>;

    /// Resolves `reference` relative to the package that mentions it.
    async fn get_blueprint_package_dependency(
        &self,
        package: &dyn BlueprintPackage,
        reference: &str,
    ) -> Result<Arc<dyn BlueprintPackage>, BlueprintError>;
}

/// Resolves references as local directories.
#[derive(Debug, Clone, Default)]
pub struct DirectoryBlueprintManager {
    base: Option<PathBuf>,
}

impl DirectoryBlueprintManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level references resolve against `base` instead of the working directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    async fn open(&self, path: PathBuf, reference: &str) -> Result<Arc<dyn BlueprintPackage>, BlueprintError> {
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                tracing::debug!(path = %path.display(), "resolved blueprint");
                Ok(Arc::new(DirectoryBlueprintPackage::new(path)))
            }
            Ok(_) => Err(BlueprintError::NotFound {
                reference: reference.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlueprintError::NotFound {
                reference: reference.to_string(),
            }),
            Err(source) => Err(BlueprintError::Read { path, source }),
        }
    }
}

#[async_trait]
impl BlueprintManager for DirectoryBlueprintManager {
    async fn get_blueprint_package(
        &self,
        reference: &str,
    ) -> Result<Arc<dyn BlueprintPackage>, BlueprintError> {
        let path = match &self.base {
            Some(base) => base.join(reference),
            None => PathBuf::from(reference),
        };
        self.open(path, reference).await
    }

    async fn get_blueprint_package_dependency(
        &self,
        package: &dyn BlueprintPackage,
        reference: &str,
    ) -> Result<Arc<dyn BlueprintPackage>, BlueprintError> {
        let path = Path::new(package.location()).join(reference);
        self.open(path, reference).await
    }
}
