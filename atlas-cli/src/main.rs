use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "atlas", version, about = "Declarative deployment workflows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

// Diagnostics go to stderr; stdout carries console output only.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Deploy {
            blueprint,
            values,
            dry_run,
            targets,
            output_directory,
            logs,
            no_interactive,
            http,
            color,
            output,
        } => {
            cmd::deploy::deploy_cmd(cmd::deploy::DeployOptions {
                blueprint,
                values,
                dry_run,
                targets,
                output_directory,
                logs,
                interactive: !no_interactive,
                http,
                color,
                output,
            })
            .await
        }
        Command::Validate {
            blueprint,
            values,
            output,
        } => cmd::validate::validate_cmd(&blueprint, values, output).await,
    }
}
