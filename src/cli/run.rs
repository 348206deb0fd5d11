//! `run` subcommand: compile, assemble, then execute the binary via `mas
//! exe`, propagating its exit status verbatim.

use std::path::PathBuf;

use clap::Args;

use super::build::compile_to_binary;
use super::{run_with_mas, CliError};

#[derive(Args)]
pub struct RunArgs {
    /// Input .mb file
    pub input: PathBuf,
    /// Output binary (default: a.out)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Skip the peephole optimizer
    #[arg(long = "unopt")]
    pub unopt: bool,
    /// Uppercase every ASCII letter in the intermediate assembly
    #[arg(long = "uppercase")]
    pub uppercase: bool,
    /// Do not prepend the bundled standard library
    #[arg(long = "freestanding")]
    pub freestanding: bool,
}

pub fn cmd_run(args: RunArgs) -> i32 {
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn run(args: RunArgs) -> Result<i32, CliError> {
    let out_path = compile_to_binary(
        &args.input,
        &args.output,
        args.unopt,
        args.uppercase,
        args.freestanding,
    )?;

    let status = run_with_mas(&out_path)?;
    Ok(status.code().unwrap_or(1))
}
