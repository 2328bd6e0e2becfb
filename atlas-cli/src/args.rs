use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone, Default)]
pub struct ValuesArgs {
    /// Values file (YAML or JSON); later files win.
    #[arg(short = 'f', long = "values", value_name = "FILE")]
    pub values_files: Vec<PathBuf>,
    /// Set a value; dotted keys create nested maps.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
    /// Like --set, and the value is redacted from all output.
    #[arg(long = "secret", value_name = "KEY=VALUE")]
    pub secret_values: Vec<String>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct TargetArgs {
    /// Only run operations whose target path matches this glob.
    #[arg(long = "target", value_name = "GLOB")]
    pub targets: Vec<String>,
    /// Skip operations whose target path matches this glob.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct HttpArgs {
    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 30000)]
    pub timeout: u64,
    #[arg(long, default_value_t = 4_194_304)]
    pub max_response_bytes: usize,
}
