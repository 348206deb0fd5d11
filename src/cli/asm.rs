//! `asm` subcommand: compile to Minstral assembly text without invoking the
//! external assembler.

use std::path::PathBuf;

use clap::Args;

use minstral_basic::backend::{Lowering, MinstralLowering};
use minstral_basic::ir::builder::lower;
use minstral_basic::optimize::optimize;

use super::{maybe_uppercase, parse_program, resolve_output_path, without_stdlib_stmts, CliError};

#[derive(Args)]
pub struct AsmArgs {
    /// Input .mb file
    pub input: PathBuf,
    /// Output .min file (default: <input> with a `min` extension)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Skip the peephole optimizer
    #[arg(long = "unopt")]
    pub unopt: bool,
    /// Uppercase every ASCII letter in the emitted text
    #[arg(long = "uppercase")]
    pub uppercase: bool,
    /// Do not prepend the bundled standard library
    #[arg(long = "freestanding")]
    pub freestanding: bool,
    /// Keep standard library code in the emitted assembly
    #[arg(long = "no-omit-libs")]
    pub no_omit_libs: bool,
}

pub fn cmd_asm(args: AsmArgs) -> i32 {
    match run(args) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn run(args: AsmArgs) -> Result<(), CliError> {
    let compiled = parse_program(&args.input, args.freestanding)?;

    let (root, symtab) = if args.no_omit_libs {
        let symtab = compiled.symtab.clone();
        (compiled.root, symtab)
    } else {
        without_stdlib_stmts(compiled)
    };

    let mut program = lower(&symtab, &root);
    if !args.unopt {
        program = optimize(program);
    }

    let text = MinstralLowering::new().lower(&program);
    let text = maybe_uppercase(text, args.uppercase);

    let out_path = resolve_output_path(&args.input, args.output, "min");
    super::write_output(&out_path, &text)
}
