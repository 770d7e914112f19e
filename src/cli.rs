//! Command-line entry: flags, one-shot `run`, or the interactive shell.

use crate::config::Config;
use crate::shell;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sakura")]
#[command(about = "The sakura language shell", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a sakura.toml configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a source file once and exit
    Run {
        /// Source file to compile
        file: PathBuf,

        /// Print the syntax tree
        #[arg(long)]
        ast: bool,

        /// Print the SakIR dump
        #[arg(long)]
        sakir: bool,

        /// Print the raw backend IR (requires a native backend)
        #[arg(long)]
        rawllvm: bool,

        /// Print the optimized backend IR (requires a native backend)
        #[arg(long)]
        llvmir: bool,
    },
}

/// Entry point for the binary. One-shot `run` exits non-zero on a failed
/// compile; the interactive shell prints the error and prompts again.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    sakura_runtime::gc::set_heap_limit(config.gc.heap_limit);

    match cli.command {
        Some(Commands::Run {
            file,
            ast,
            sakir,
            rawllvm,
            llvmir,
        }) => {
            let mut dump = config.dump;
            dump.ast |= ast;
            dump.sakir |= sakir;
            dump.rawllvm |= rawllvm;
            dump.llvmir |= llvmir;
            let result = shell::run_file(&file, &dump);
            sakura_runtime::gc::shutdown();
            result
        }
        None => {
            shell::run_shell(&config);
            Ok(())
        }
    }
}
