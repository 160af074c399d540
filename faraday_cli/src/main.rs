use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::run::RunArgs;

mod run;

#[derive(Parser)]
#[clap(author, version, about = "EV fleet allocation and charge-scheduling optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,

    #[arg(long, global = true)]
    env: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate routes to vehicles over the rolling window.
    Allocation {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Schedule charging for vehicles with assigned routes.
    Scheduling {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Run allocation and charge scheduling together.
    Unified {
        #[command(flatten)]
        args: RunArgs,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage and argument errors exit 1 regardless of clap's default.
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    if let Some(env) = &cli.env {
        dotenvy::from_filename(env).ok();
    }

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let code = match cli.command {
        Commands::Allocation { args } => run::run(args, run::Command::Allocation),
        Commands::Scheduling { args } => run::run(args, run::Command::Scheduling),
        Commands::Unified { args } => run::run(args, run::Command::Unified),
    };

    ExitCode::from(code)
}
