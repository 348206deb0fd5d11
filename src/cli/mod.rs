//! Shared CLI plumbing: the four subcommands (`asm`, `build`, `ir`, `run`)
//! all parse the same way and differ only in what they do with the
//! resulting [`Program`]. Grounded on `examples/mastercyb-trident/src/cli/
//! mod.rs`'s `resolve_input`/`process::exit`-on-error idiom and
//! `original_source/src/compile.c`'s stdlib-prepend/output-path logic.

pub mod asm;
pub mod build;
pub mod ir;
pub mod run;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use minstral_basic::ast::{Ast, AstKind, ScopeInfo, GLOBAL};
use minstral_basic::parser::parse_with_symtab;
use minstral_basic::span::Span;
use minstral_basic::sym::SymbolTable;

/// Fixed path of the bundled standard library, prepended to every
/// non-freestanding compilation.
pub const STDLIB_PATH: &str = "/usr/local/share/minstral-basic/basic.mb";

pub enum CliError {
    Io { action: &'static str, path: PathBuf, source: std::io::Error },
    CompileFailed,
    Spawn { program: &'static str, source: std::io::Error },
    AssemblerFailed { program: &'static str, status: ExitStatus },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io { action, path, source } => {
                write!(f, "cannot {action} '{}': {source}", path.display())
            }
            CliError::CompileFailed => write!(f, "compilation failed"),
            CliError::Spawn { program, source } => {
                write!(f, "failed to run '{program}': {source}")
            }
            CliError::AssemblerFailed { program, status } => match status.code() {
                Some(code) => write!(f, "'{program}' exited with status {code}"),
                None => write!(f, "'{program}' was terminated by a signal"),
            },
        }
    }
}

/// The result of parsing a user file, with the standard library (unless
/// freestanding) prepended to the same symbol table and the same root
/// statement list.
pub struct CompiledInput {
    pub root: Ast,
    pub symtab: SymbolTable,
    /// Number of leading statements in `root` that came from the stdlib,
    /// so `asm` can omit them from the emitted text by default.
    pub stdlib_stmt_count: usize,
}

fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })
}

fn root_stmts(root: Ast) -> Vec<Ast> {
    match root.kind {
        AstKind::Root(stmts) => stmts,
        _ => unreachable!("parse_with_symtab always returns an AstKind::Root"),
    }
}

/// Parses `input`, prepending the standard library onto the same symbol
/// table unless `freestanding`. A stdlib parse error aborts immediately,
/// without attempting the user file, per spec.
pub fn parse_program(input: &Path, freestanding: bool) -> Result<CompiledInput, CliError> {
    let mut symtab = SymbolTable::new();
    let mut stdlib_stmt_count = 0;
    let mut stmts = Vec::new();

    if !freestanding {
        let stdlib_path = Path::new(STDLIB_PATH);
        let stdlib_src = read_source(stdlib_path)?;
        let out = parse_with_symtab(&stdlib_src, STDLIB_PATH, "__stdlib", symtab);
        if out.diagnostics.had_errors() {
            out.diagnostics.render_all(STDLIB_PATH, &stdlib_src);
            return Err(CliError::CompileFailed);
        }
        symtab = out.symtab;
        let lib_stmts = root_stmts(out.root);
        stdlib_stmt_count = lib_stmts.len();
        stmts.extend(lib_stmts);
    }

    let user_src = read_source(input)?;
    let file = input.display().to_string();
    let out = parse_with_symtab(&user_src, &file, "__main", symtab);
    if out.diagnostics.had_errors() {
        out.diagnostics.render_all(&file, &user_src);
        return Err(CliError::CompileFailed);
    }
    stmts.extend(root_stmts(out.root));

    let root = Ast::new(
        AstKind::Root(stmts),
        ScopeInfo {
            full: GLOBAL.to_string(),
            func: GLOBAL.to_string(),
            file,
            module: "__main".to_string(),
        },
        Span::dummy(),
    );

    Ok(CompiledInput {
        root,
        symtab: out.symtab,
        stdlib_stmt_count,
    })
}

/// Drops the leading stdlib statements from a parsed root, for `asm`'s
/// default stdlib-omission behaviour. The shared symbol table is returned
/// untouched, so calls into omitted subroutines still resolve and still
/// emit a `call`.
pub fn without_stdlib_stmts(input: CompiledInput) -> (Ast, SymbolTable) {
    let CompiledInput { root, symtab, stdlib_stmt_count } = input;
    let scope = root.scope.clone();
    let span = root.span;
    let mut stmts = root_stmts(root);
    stmts.drain(..stdlib_stmt_count);
    (Ast::new(AstKind::Root(stmts), scope, span), symtab)
}

/// Replaces the input file's extension, or uses `-o` verbatim if given.
pub fn resolve_output_path(input: &Path, output: Option<PathBuf>, ext: &str) -> PathBuf {
    output.unwrap_or_else(|| input.with_extension(ext))
}

/// Applies `-uppercase`'s whole-output ASCII uppercase pass, shared between
/// the assembly and IR-text output paths.
pub fn maybe_uppercase(text: String, uppercase: bool) -> String {
    if uppercase {
        text.to_ascii_uppercase()
    } else {
        text
    }
}

pub fn write_output(path: &Path, text: &str) -> Result<(), CliError> {
    std::fs::write(path, text).map_err(|source| CliError::Io {
        action: "write",
        path: path.to_path_buf(),
        source,
    })
}

/// Shells out `mas asm -o <out> <asm>`, deleting `asm_path` on success.
pub fn assemble_with_mas(asm_path: &Path, out_path: &Path) -> Result<(), CliError> {
    let status = std::process::Command::new("mas")
        .arg("asm")
        .arg("-o")
        .arg(out_path)
        .arg(asm_path)
        .status()
        .map_err(|source| CliError::Spawn { program: "mas", source })?;

    if !status.success() {
        return Err(CliError::AssemblerFailed { program: "mas asm", status });
    }

    std::fs::remove_file(asm_path).map_err(|source| CliError::Io {
        action: "remove",
        path: asm_path.to_path_buf(),
        source,
    })
}

/// Shells out `mas exe ./<out>`, returning the child's raw exit status so
/// the caller can propagate it verbatim.
pub fn run_with_mas(out_path: &Path) -> Result<ExitStatus, CliError> {
    let target = format!("./{}", out_path.display());
    std::process::Command::new("mas")
        .arg("exe")
        .arg(target)
        .status()
        .map_err(|source| CliError::Spawn { program: "mas", source })
}
