mod cli;

use clap::{Parser, Subcommand};

use cli::asm::{cmd_asm, AsmArgs};
use cli::build::{cmd_build, BuildArgs};
use cli::ir::{cmd_ir, IrArgs};
use cli::run::{cmd_run, RunArgs};

#[derive(Parser)]
#[command(name = "mbc", version, about = "Minstral BASIC compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile to Minstral assembly text
    Asm(AsmArgs),
    /// Compile and assemble into a native binary
    Build(BuildArgs),
    /// Compile to human-readable debug IR text
    Ir(IrArgs),
    /// Compile, assemble, and run the resulting binary
    Run(RunArgs),
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Command::Asm(args) => cmd_asm(args),
        Command::Build(args) => cmd_build(args),
        Command::Ir(args) => cmd_ir(args),
        Command::Run(args) => cmd_run(args),
    };

    std::process::exit(code);
}
