use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a blueprint's workflow and run it.
    Deploy {
        blueprint: String,
        #[command(flatten)]
        values: ValuesArgs,
        /// Skip every request that is not a GET.
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        targets: TargetArgs,
        #[arg(short = 'o', long, default_value = "out")]
        output_directory: PathBuf,
        /// Write one audit log per operation under <output-directory>/logs.
        #[arg(long)]
        logs: bool,
        #[arg(long)]
        no_interactive: bool,
        #[command(flatten)]
        http: HttpArgs,
        #[arg(long)]
        color: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Load and render a blueprint's workflow without running it.
    Validate {
        blueprint: String,
        #[command(flatten)]
        values: ValuesArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
