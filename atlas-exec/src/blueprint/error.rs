use std::path::PathBuf;

use atlas_core::ParseError;

use crate::templates::TemplateError;
use crate::values::ValuesError;

#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("blueprint `{reference}` not found")]
    NotFound { reference: String },
    #[error("blueprint `{location}` has no `{path}`")]
    MissingFile { location: String, path: String },
    #[error("failed to read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid `{path}` in blueprint `{location}`: {source}")]
    Parse {
        location: String,
        path: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Values(#[from] ValuesError),
}
