//! AST node shapes, mirroring `ast.h`'s tagged union one-for-one.

use crate::lexeme::TokenKind;
use crate::span::Span;
use crate::sym::SymRef;

/// The empty scope is global; it is a `@`-prefix of every other scope.
pub const GLOBAL: &str = "";

#[derive(Clone, Debug, Default)]
pub struct ScopeInfo {
    pub full: String,
    pub func: String,
    pub file: String,
    pub module: String,
}

#[derive(Clone, Debug)]
pub struct Ast {
    pub kind: AstKind,
    pub scope: ScopeInfo,
    pub span: Span,
}

impl Ast {
    pub fn new(kind: AstKind, scope: ScopeInfo, span: Span) -> Self {
        Self { kind, scope, span }
    }

    pub fn nop(scope: ScopeInfo, span: Span) -> Self {
        Self::new(AstKind::Nop, scope, span)
    }

    pub fn is_nop(&self) -> bool {
        matches!(self.kind, AstKind::Nop)
    }
}

#[derive(Clone, Debug)]
pub enum AstKind {
    Nop,
    Root(Vec<Ast>),
    Int(i64),
    Var {
        name: String,
        sym: Option<SymRef>,
    },
    Func {
        name: String,
        ty: String,
        /// Parameter names/types/order live on the `Func` symbol's
        /// `param_syms` (see `sym.rs`) rather than duplicated here, since
        /// both parser passes need them and only one pass ever parses the
        /// parameter-list tokens.
        body: Vec<Ast>,
        sym: Option<SymRef>,
    },
    Call {
        name: String,
        args: Vec<Ast>,
        sym: Option<SymRef>,
    },
    Decl {
        name: String,
        ty: String,
        value: Option<Box<Ast>>,
        sym: Option<SymRef>,
    },
    Assign {
        name: String,
        value: Box<Ast>,
        sym: Option<SymRef>,
    },
    Ret {
        value: Option<Box<Ast>>,
        sym: Option<SymRef>,
    },
    AsmBlock(String),
    Oper(TokenKind),
    Math {
        values: Vec<Ast>,
        is_float: bool,
    },
    Parens(Box<Ast>),
    Condition {
        values: Vec<Ast>,
        is_float: bool,
    },
    If {
        condition: Box<Ast>,
        body: Vec<Ast>,
        else_body: Vec<Ast>,
    },
    For {
        counter: Box<Ast>,
        /// `None` means the counter is a bare `Var`. Carried for shape
        /// parity with the counter's own start value, but unused by
        /// lowering: it re-derives whether to emit an initial store from
        /// `counter`'s own node kind instead, exactly as the reference does.
        start: Option<Box<Ast>>,
        end: Box<Ast>,
        step: Box<Ast>,
        body: Vec<Ast>,
        reverse: bool,
    },
    While {
        condition: Box<Ast>,
        body: Vec<Ast>,
    },
    Not(Box<Ast>),
    Unary(TokenKind, Box<Ast>),
}

pub fn asttype_to_string(kind: &AstKind) -> &'static str {
    match kind {
        AstKind::Nop => "nop",
        AstKind::Root(_) => "root",
        AstKind::Int(_) => "int",
        AstKind::Var { .. } => "var",
        AstKind::Func { .. } => "subroutine",
        AstKind::Call { .. } => "call",
        AstKind::Decl { .. } => "declaration",
        AstKind::Assign { .. } => "assignment",
        AstKind::Ret { .. } => "return",
        AstKind::AsmBlock(_) => "asm block",
        AstKind::Oper(_) => "operator",
        AstKind::Math { .. } => "math expression",
        AstKind::Parens(_) => "parenthesized expression",
        AstKind::Condition { .. } => "condition",
        AstKind::If { .. } => "if statement",
        AstKind::For { .. } => "for loop",
        AstKind::While { .. } => "while loop",
        AstKind::Not(_) => "logical not",
        AstKind::Unary(..) => "unary expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_round_trips() {
        let ast = Ast::nop(ScopeInfo::default(), Span::dummy());
        assert!(ast.is_nop());
        assert_eq!(asttype_to_string(&ast.kind), "nop");
    }
}
