//! `build` subcommand: compile all the way to a native binary via the
//! external `mas` assembler.

use std::path::{Path, PathBuf};

use clap::Args;

use minstral_basic::backend::{Lowering, MinstralLowering};
use minstral_basic::ir::builder::lower;
use minstral_basic::optimize::optimize;

use super::{assemble_with_mas, maybe_uppercase, parse_program, resolve_output_path, CliError};

#[derive(Args)]
pub struct BuildArgs {
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

pub fn cmd_build(args: BuildArgs) -> i32 {
    match run(args) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

/// Lowers, optimizes, and assembles `args` down to a binary, returning the
/// intermediate `.min` path and the final output path on success. Shared by
/// `build` and `run`, which differ only in what they do after assembling.
pub(super) fn compile_to_binary(
    input: &Path,
    output: &Option<PathBuf>,
    unopt: bool,
    uppercase: bool,
    freestanding: bool,
) -> Result<PathBuf, CliError> {
    let compiled = parse_program(input, freestanding)?;

    let mut program = lower(&compiled.symtab, &compiled.root);
    if !unopt {
        program = optimize(program);
    }

    let text = MinstralLowering::new().lower(&program);
    let text = maybe_uppercase(text, uppercase);

    let intermediate = resolve_output_path(input, None, "min");
    super::write_output(&intermediate, &text)?;

    let out_path = output.clone().unwrap_or_else(|| PathBuf::from("a.out"));
    assemble_with_mas(&intermediate, &out_path)?;

    Ok(out_path)
}

fn run(args: BuildArgs) -> Result<(), CliError> {
    let out_path = compile_to_binary(
        &args.input,
        &args.output,
        args.unopt,
        args.uppercase,
        args.freestanding,
    )?;
    eprintln!("compiled -> {}", out_path.display());
    Ok(())
}
