use crate::types::AnyValue;

/// One node of the workflow tree.
///
/// Action fields (`request`, `template`, `workflow`, `operations`) are not exclusive: every
/// populated one runs, in that order, within a single activation.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Path segment appended to the parent's path for target matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreach: Option<Foreach>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<AnyValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<AnyValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throw: Option<Throw>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<Catch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<Operation>>,
}

impl Operation {
    /// The first descriptive field set on the operation, used to name log records.
    pub fn display_name(&self) -> Option<&str> {
        [
            &self.message,
            &self.write,
            &self.request,
            &self.template,
            &self.workflow,
        ]
        .into_iter()
        .find_map(|field| field.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Foreach {
    pub values: AnyValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<AnyValue>,
}

/// Re-runs an activation while `condition` holds. `timeout` and `delay` are in seconds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Repeat {
    pub condition: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Throw {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AnyValue>,
}

/// An absent `condition` catches every catchable error.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Catch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<AnyValue>,
}
