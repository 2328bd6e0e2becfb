use crate::types::{AnyValue, Operation};

/// A rendered `workflow.yaml`: top-level values, the operation tree and an optional output.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<AnyValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<AnyValue>,
}

impl Workflow {
    /// Number of operations in the whole tree, nested ones included.
    pub fn operation_count(&self) -> usize {
        fn count(ops: &[Operation]) -> usize {
            ops.iter()
                .map(|op| 1 + op.operations.as_deref().map(count).unwrap_or(0))
                .sum()
        }
        count(&self.operations)
    }
}
