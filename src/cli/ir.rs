//! `ir` subcommand: emit the human-readable debug IR text instead of
//! assembly.

use std::path::PathBuf;

use clap::Args;

use minstral_basic::ir::builder::lower;
use minstral_basic::optimize::optimize;

use super::{maybe_uppercase, parse_program, resolve_output_path, CliError};

#[derive(Args)]
pub struct IrArgs {
    /// Input .mb file
    pub input: PathBuf,
    /// Output .ir file (default: <input> with an `ir` extension)
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
    /// Retain Nop instructions in the debug text
    #[arg(long = "nops")]
    pub nops: bool,
}

pub fn cmd_ir(args: IrArgs) -> i32 {
    match run(args) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn run(args: IrArgs) -> Result<(), CliError> {
    let compiled = parse_program(&args.input, args.freestanding)?;

    let mut program = lower(&compiled.symtab, &compiled.root);
    if !args.unopt {
        program = optimize(program);
    }

    let text = program.render(args.nops);
    let text = maybe_uppercase(text, args.uppercase);

    let out_path = resolve_output_path(&args.input, args.output, "ir");
    super::write_output(&out_path, &text)
}
