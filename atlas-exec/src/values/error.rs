use atlas_core::QueryError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ValuesError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("foreach arrays must have the same length: `{key}` has {actual} items, expected {expected}")]
    ForeachSizeMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
    #[error("foreach values did not contain any array to iterate")]
    NoArrays,
}
