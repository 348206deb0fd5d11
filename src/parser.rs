//! Two-pass parser: pass 1 registers subroutine signatures so bodies can
//! forward-reference each other; pass 2 re-runs over the same token buffer
//! with that flag cleared and fills in every body and statement.

use crate::ast::{asttype_to_string, Ast, AstKind, ScopeInfo, GLOBAL};
use crate::diagnostic::{Diagnostic, DiagnosticBag};
use crate::lexeme::TokenKind;
use crate::lexer::Lexer;
use crate::span::{Span, Spanned};
use crate::sym::{ParserScope, SymRef, Symbol, SymbolKind, SymbolTable};

#[derive(Debug)]
pub struct ParseOutput {
    pub root: Ast,
    pub symtab: SymbolTable,
    pub diagnostics: DiagnosticBag,
}

pub fn parse(source: &str, file: &str, module: &str) -> ParseOutput {
    parse_with_symtab(source, file, module, SymbolTable::new())
}

/// Parse into a caller-supplied symbol table instead of a fresh one, so a
/// standard-library file and the user's file that calls into it can share
/// one table across two independent two-pass parses.
pub fn parse_with_symtab(source: &str, file: &str, module: &str, symtab: SymbolTable) -> ParseOutput {
    let (tokens, lex_diags) = Lexer::new(source).tokenize();

    let mut parser = Parser {
        tokens,
        pos: 0,
        first_pass: true,
        in_math: false,
        in_condition: false,
        in_loop: false,
        in_if: false,
        scope: ParserScope::new(file, module),
        symtab,
        diagnostics: DiagnosticBag::new(),
    };

    for d in lex_diags {
        parser.diagnostics.push(d);
    }

    parser.run_pass_one();

    parser.pos = 0;
    parser.first_pass = false;
    let root_stmts = parser.run_pass_two();

    let root = Ast::new(
        AstKind::Root(root_stmts),
        ScopeInfo {
            full: String::new(),
            func: String::new(),
            file: file.to_string(),
            module: module.to_string(),
        },
        Span::dummy(),
    );

    ParseOutput {
        root,
        symtab: parser.symtab,
        diagnostics: parser.diagnostics,
    }
}

struct Parser {
    tokens: Vec<Spanned<TokenKind>>,
    pos: usize,
    first_pass: bool,
    in_math: bool,
    in_condition: bool,
    in_loop: bool,
    in_if: bool,
    scope: ParserScope,
    symtab: SymbolTable,
    diagnostics: DiagnosticBag,
}

impl Parser {
    // -- token stream helpers -----------------------------------------

    fn cur(&self) -> &TokenKind {
        &self.tokens[self.pos].node
    }

    fn cur_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn peek(&self, offset: isize) -> &TokenKind {
        let idx = (self.pos as isize + offset).clamp(0, self.tokens.len() as isize - 1) as usize;
        &self.tokens[idx].node
    }

    fn advance(&mut self) {
        if !matches!(self.cur(), TokenKind::Eof) {
            self.pos += 1;
        }
    }

    fn eat_exact(&mut self, expected: TokenKind) {
        if std::mem::discriminant(self.cur()) != std::mem::discriminant(&expected) {
            let span = self.cur_span();
            self.error_at(
                span,
                format!(
                    "found {} when expecting {}",
                    self.cur().description(),
                    expected.description()
                ),
            );
        }
        self.advance();
    }

    fn eat_until_exact(&mut self, target: &TokenKind) {
        while !matches!(self.cur(), TokenKind::Eof)
            && std::mem::discriminant(self.cur()) != std::mem::discriminant(target)
        {
            self.advance();
        }
    }

    fn eat_ident(&mut self) -> String {
        match self.cur().clone() {
            TokenKind::Ident(s) => {
                self.advance();
                s
            }
            other => {
                let span = self.cur_span();
                self.error_at(
                    span,
                    format!("found {} when expecting an identifier", other.description()),
                );
                self.advance();
                String::new()
            }
        }
    }

    fn is_ident(&self, value: &str) -> bool {
        matches!(self.cur(), TokenKind::Ident(s) if s == value)
    }

    fn error_at(&mut self, span: Span, msg: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(msg, span));
    }

    // -- expression-kind predicates -------------------------------------

    fn is_math(&self) -> bool {
        match self.cur() {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Shl
            | TokenKind::Shr => true,
            // && / || never actually occur (the lexer has no doubled-symbol
            // rule), but the lookahead guard is kept for fidelity with the
            // reference, which distinguishes bitwise from (unused) doubled
            // bitwise forms this way.
            TokenKind::Amp | TokenKind::Pipe | TokenKind::Caret => {
                std::mem::discriminant(self.peek(1)) != std::mem::discriminant(self.cur())
            }
            _ => false,
        }
    }

    fn is_conditional_and_or(&self) -> bool {
        self.is_ident("and") || self.is_ident("or")
    }

    fn is_condition(&self) -> bool {
        self.cur().is_comparison() || self.is_conditional_and_or()
    }

    // -- expressions ------------------------------------------------------

    fn parse_oper(&mut self) -> Ast {
        let span = self.cur_span();
        let kind = self.cur().clone();
        self.advance();
        Ast::new(AstKind::Oper(kind), self.scope.snapshot(), span)
    }

    fn parse_math(&mut self, first: Option<Ast>) -> Ast {
        let was_in_math = self.in_math;
        if !was_in_math {
            self.in_math = true;
        }

        let first = first.unwrap_or_else(|| self.parse_value());
        let span = first.span;
        let mut values = vec![first];

        while self.is_math() {
            values.push(self.parse_oper());
            values.push(self.parse_value());
        }

        if !was_in_math {
            self.in_math = false;
        }

        Ast::new(
            AstKind::Math {
                values,
                is_float: false,
            },
            self.scope.snapshot(),
            span,
        )
    }

    /// Rewrite a bare value with no immediately-following comparison (or one
    /// followed by `and`/`or`) into the three-element `value != 0` form.
    fn truthy_fragment(&mut self, value: Ast) -> Vec<Ast> {
        if !self.is_condition() || self.is_conditional_and_or() {
            let span = value.span;
            let scope = self.scope.snapshot();
            vec![
                value,
                Ast::new(AstKind::Oper(TokenKind::Neq), scope.clone(), span),
                Ast::new(AstKind::Int(0), scope, span),
            ]
        } else {
            vec![value]
        }
    }

    fn parse_condition(&mut self, begin: Option<Ast>) -> Ast {
        let was_in_condition = self.in_condition;
        if !was_in_condition {
            self.in_condition = true;
        }

        let begin = begin.unwrap_or_else(|| self.parse_value());
        let span = begin.span;
        let mut values = self.truthy_fragment(begin);

        while self.is_condition() {
            if self.is_conditional_and_or() {
                let op_span = self.cur_span();
                let is_and = self.is_ident("and");
                self.advance();
                values.push(Ast::new(
                    AstKind::Oper(if is_and { TokenKind::Amp } else { TokenKind::Pipe }),
                    self.scope.snapshot(),
                    op_span,
                ));

                let lhs = self.parse_value();
                values.extend(self.truthy_fragment(lhs));
                continue;
            }

            let oper = self.parse_oper();
            values.push(oper);
            values.push(self.parse_value());
        }

        if !was_in_condition {
            self.in_condition = false;
        }

        Ast::new(
            AstKind::Condition {
                values,
                is_float: false,
            },
            self.scope.snapshot(),
            span,
        )
    }

    fn parse_value(&mut self) -> Ast {
        let value = self.parse_stmt();

        match &value.kind {
            AstKind::Nop
            | AstKind::Int(_)
            | AstKind::Var { .. }
            | AstKind::Call { .. }
            | AstKind::Math { .. }
            | AstKind::Parens(_)
            | AstKind::Condition { .. } => {}
            _ => {
                let span = value.span;
                self.error_at(span, format!("invalid value '{}'", asttype_to_string(&value.kind)));
            }
        }

        let mut value = value;
        if !self.in_math && self.is_math() {
            value = self.parse_math(Some(value));
        }
        if !self.in_condition && self.is_condition() {
            value = self.parse_condition(Some(value));
        }
        value
    }

    fn parse_parens(&mut self) -> Ast {
        let was_math = self.in_math;
        let was_cond = self.in_condition;
        self.in_math = false;
        self.in_condition = false;

        let span = self.cur_span();
        self.eat_exact(TokenKind::LParen);
        let inner = Box::new(self.parse_value());
        self.eat_exact(TokenKind::RParen);

        self.in_math = was_math;
        self.in_condition = was_cond;

        Ast::new(AstKind::Parens(inner), self.scope.snapshot(), span)
    }

    fn parse_constant(&mut self) -> Ast {
        let span = self.cur_span();
        let value = match self.cur() {
            TokenKind::Int(n) => *n,
            _ => 0,
        };
        self.advance();
        Ast::new(AstKind::Int(value), self.scope.snapshot(), span)
    }

    // -- statements ---------------------------------------------------

    fn parse_stmt(&mut self) -> Ast {
        while matches!(self.cur(), TokenKind::Eol) {
            self.advance();
        }

        match self.cur().clone() {
            TokenKind::Eof => Ast::nop(self.scope.snapshot(), self.cur_span()),
            TokenKind::Ident(_) => self.parse_id(),
            TokenKind::Int(_) => self.parse_constant(),
            TokenKind::LParen => self.parse_parens(),
            other => {
                let span = self.cur_span();
                self.error_at(span, format!("invalid statement '{}'", other.description()));
                self.advance();
                Ast::nop(self.scope.snapshot(), span)
            }
        }
    }

    fn parse_id(&mut self) -> Ast {
        let span = self.cur_span();
        let id = self.eat_ident();

        if matches!(self.cur(), TokenKind::Equal) {
            self.advance();
            return self.parse_assign(id, span);
        }
        if matches!(self.cur(), TokenKind::LParen) {
            return self.parse_call(id, span);
        }

        match id.as_str() {
            "sub" => return self.parse_subroutine(),
            "if" => return self.parse_if(span),
            "return" => return self.parse_ret(span),
            "for" => return self.parse_for(span),
            "while" => return self.parse_while(span),
            "asm" => return self.parse_asm(span),
            _ => {}
        }

        if let Some(sym_ref) =
            self.symtab
                .find(SymbolKind::Decl, &id, &self.scope.cur_scope, &self.scope.cur_module)
        {
            return self.parse_var(id, sym_ref, span);
        }

        self.error_at(span, format!("undefined identifier '{id}'"));
        Ast::nop(self.scope.snapshot(), span)
    }

    fn parse_var(&mut self, id: String, sym_ref: SymRef, span: Span) -> Ast {
        let ast = Ast::new(
            AstKind::Var {
                name: id,
                sym: Some(sym_ref),
            },
            self.scope.snapshot(),
            span,
        );

        if self.is_math() && matches!(self.peek(1), TokenKind::Equal) {
            return self.parse_compound_math(ast);
        }

        ast
    }

    fn parse_compound_math(&mut self, dst: Ast) -> Ast {
        let op_span = self.cur_span();
        let op_kind = self.cur().clone();
        self.advance();
        self.eat_exact(TokenKind::Equal);

        let value = self.parse_value();
        let value_span = value.span;

        let math = Ast::new(
            AstKind::Math {
                values: vec![
                    dst.clone(),
                    Ast::new(AstKind::Oper(op_kind), self.scope.snapshot(), op_span),
                    value,
                ],
                is_float: false,
            },
            self.scope.snapshot(),
            value_span,
        );

        match dst.kind {
            AstKind::Var { name, sym } => {
                Ast::new(AstKind::Assign { name, value: Box::new(math), sym }, self.scope.snapshot(), dst.span)
            }
            _ => unreachable!("parse_compound_math only runs with a Var destination"),
        }
    }

    fn parse_call(&mut self, name: String, span: Span) -> Ast {
        let Some(sym_ref) = self.symtab.find(SymbolKind::Func, &name, GLOBAL, &self.scope.cur_module) else {
            self.error_at(span, format!("undefined subroutine '{name}'"));
            self.eat_until_exact(&TokenKind::RParen);
            self.eat_exact(TokenKind::RParen);
            return Ast::nop(self.scope.snapshot(), span);
        };

        self.eat_exact(TokenKind::LParen);
        let mut args = Vec::new();
        while !matches!(self.cur(), TokenKind::Eof | TokenKind::RParen) {
            if !args.is_empty() {
                self.eat_exact(TokenKind::Comma);
            }
            args.push(self.parse_value());
        }
        self.eat_exact(TokenKind::RParen);

        Ast::new(
            AstKind::Call {
                name,
                args,
                sym: Some(sym_ref),
            },
            self.scope.snapshot(),
            span,
        )
    }

    fn parse_assign(&mut self, name: String, span: Span) -> Ast {
        let existing = self
            .symtab
            .find(SymbolKind::Decl, &name, &self.scope.cur_scope, &self.scope.cur_module);

        match existing {
            None => {
                let value = self.parse_value();
                let sym_ref = self.symtab.add(Symbol {
                    kind: SymbolKind::Decl,
                    name: name.clone(),
                    scope: self.scope.cur_scope.clone(),
                    func: self.scope.cur_func.clone(),
                    module: self.scope.cur_module.clone(),
                    file: self.scope.cur_file.clone(),
                    span,
                    ty: "i64".to_string(),
                    param_count: 0,
                    param_syms: Vec::new(),
                });
                Ast::new(
                    AstKind::Decl {
                        name,
                        ty: "i64".to_string(),
                        value: Some(Box::new(value)),
                        sym: Some(sym_ref),
                    },
                    self.scope.snapshot(),
                    span,
                )
            }
            Some(sym_ref) => {
                let value = self.parse_value();
                Ast::new(
                    AstKind::Assign {
                        name,
                        value: Box::new(value),
                        sym: Some(sym_ref),
                    },
                    self.scope.snapshot(),
                    span,
                )
            }
        }
    }

    fn parse_ret(&mut self, span: Span) -> Ast {
        let value = if self.cur_span().line != span.line {
            None
        } else {
            Some(Box::new(self.parse_value()))
        };

        let sym_ref = self
            .symtab
            .find(SymbolKind::Func, &self.scope.cur_func, GLOBAL, &self.scope.cur_module);

        Ast::new(AstKind::Ret { value, sym: sym_ref }, self.scope.snapshot(), span)
    }

    fn parse_asm(&mut self, span: Span) -> Ast {
        let mut code = String::new();

        loop {
            if matches!(self.cur(), TokenKind::Eof) || self.is_ident("end") {
                break;
            }

            let next_is_at = matches!(self.cur(), TokenKind::At) || matches!(self.peek(1), TokenKind::At);
            code.push_str(&self.cur().raw_text());
            self.advance();
            if !next_is_at {
                code.push(' ');
            }

            if matches!(self.cur(), TokenKind::Comma) {
                self.advance();
                code.push('\n');
            }
        }

        if self.is_ident("end") {
            self.advance();
        }

        Ast::new(AstKind::AsmBlock(code), self.scope.snapshot(), span)
    }

    fn parse_if(&mut self, span: Span) -> Ast {
        let condition = Box::new(self.parse_condition(None));

        let old_scope = self.scope.cur_scope.clone();
        self.scope.cur_scope = format!("{}@if{}{}", old_scope, span.line, span.col);

        let was_in_if = self.in_if;
        self.in_if = true;
        let body = self.parse_body(false);
        self.in_if = was_in_if;

        let else_body = if self.is_ident("else") {
            let else_span = self.cur_span();
            self.advance();
            self.scope.cur_scope = format!("{}@else{}{}", self.scope.cur_scope, span.line, span.col);
            let single = self.is_ident("if") && self.cur_span().line == else_span.line;
            self.parse_body(single)
        } else {
            Vec::new()
        };

        self.scope.cur_scope = old_scope;

        Ast::new(AstKind::If { condition, body, else_body }, self.scope.snapshot(), span)
    }

    fn parse_for(&mut self, span: Span) -> Ast {
        let was_in_loop = self.in_loop;
        self.in_loop = true;

        let reverse = if self.is_ident("rev") {
            self.advance();
            true
        } else {
            false
        };

        let old_scope = self.scope.cur_scope.clone();
        self.scope.cur_scope = format!("{}@for{}{}", old_scope, span.line, span.col);

        let counter = self.parse_stmt();
        let start: Option<Box<Ast>> = match &counter.kind {
            AstKind::Var { .. } => None,
            AstKind::Decl { value, .. } => value.clone(),
            AstKind::Assign { value, .. } => Some(value.clone()),
            other => {
                let cspan = counter.span;
                self.error_at(
                    cspan,
                    format!(
                        "invalid counter value; expected variable or assignment but found '{}'",
                        asttype_to_string(other)
                    ),
                );
                None
            }
        };

        self.advance(); // the separating word ("to")
        let end = Box::new(self.parse_value());

        let step = if self.is_ident("step") {
            self.advance();
            Box::new(self.parse_value())
        } else {
            let span = self.cur_span();
            Box::new(Ast::new(
                AstKind::Int(if reverse { -1 } else { 1 }),
                self.scope.snapshot(),
                span,
            ))
        };

        let body = self.parse_body(false);

        self.in_loop = was_in_loop;
        self.scope.cur_scope = old_scope;

        Ast::new(
            AstKind::For {
                counter: Box::new(counter),
                start,
                end,
                step,
                body,
                reverse,
            },
            self.scope.snapshot(),
            span,
        )
    }

    fn parse_while(&mut self, span: Span) -> Ast {
        let old_scope = self.scope.cur_scope.clone();
        self.scope.cur_scope = format!("{}@while{}{}", old_scope, span.line, span.col);

        let condition = Box::new(self.parse_condition(None));

        let was_in_loop = self.in_loop;
        self.in_loop = true;
        let body = self.parse_body(false);
        self.in_loop = was_in_loop;

        self.scope.cur_scope = old_scope;

        Ast::new(AstKind::While { condition, body }, self.scope.snapshot(), span)
    }

    fn parse_body(&mut self, single_stmt: bool) -> Vec<Ast> {
        let mut body = Vec::new();

        loop {
            while matches!(self.cur(), TokenKind::Eol) {
                self.advance();
            }

            if matches!(self.cur(), TokenKind::Eof) || self.is_ident("end") {
                break;
            }
            if self.in_if && self.is_ident("else") {
                return body;
            }

            let stmt = self.parse_stmt();

            match &stmt.kind {
                AstKind::Nop => continue,
                AstKind::Decl { .. }
                | AstKind::Assign { .. }
                | AstKind::Call { .. }
                | AstKind::Ret { .. }
                | AstKind::AsmBlock(_)
                | AstKind::If { .. }
                | AstKind::For { .. }
                | AstKind::While { .. } => {}
                other => {
                    let sspan = stmt.span;
                    let func = self.scope.cur_func.clone();
                    self.error_at(
                        sspan,
                        format!("invalid statement '{}' in subroutine '{}'", asttype_to_string(other), func),
                    );
                }
            }

            body.push(stmt);

            if single_stmt {
                break;
            }
        }

        if !single_stmt {
            self.advance(); // the matching "end"
        }

        body
    }

    fn skip_body(&mut self) {
        self.advance();
        let mut indents: i32 = 1;

        while !matches!(self.cur(), TokenKind::Eof) && indents > 0 {
            if let TokenKind::Ident(s) = self.cur() {
                if s == "if" || s == "for" || s == "while" {
                    indents += 1;
                } else if s == "end" {
                    indents -= 1;
                }
            }
            self.advance();
        }
    }

    fn parse_subroutine(&mut self) -> Ast {
        let span = self.cur_span();
        let name = self.eat_ident();

        if let Some(sym_ref) = self.symtab.find(SymbolKind::Func, &name, GLOBAL, &self.scope.cur_module) {
            if self.first_pass {
                let sym = self.symtab.get(sym_ref).clone();
                self.error_at(
                    span,
                    format!(
                        "redefinition of subroutine '{}'; first defined at {}:{}:{}",
                        name, sym.file, sym.span.line, sym.span.col
                    ),
                );
                self.eat_until_exact(&TokenKind::RParen);
                self.eat_exact(TokenKind::RParen);
                self.skip_body();
                return Ast::nop(self.scope.snapshot(), span);
            }

            // Second pass: the signature is already registered. Skip past
            // the parameter list tokens and parse only the body.
            self.eat_until_exact(&TokenKind::RParen);
            self.eat_exact(TokenKind::RParen);

            let saved = self.scope.enter_func(&name);
            let body = self.parse_body(false);
            self.scope.leave_func(saved);

            let ty = self.symtab.get(sym_ref).ty.clone();
            return Ast::new(
                AstKind::Func {
                    name,
                    ty,
                    body,
                    sym: Some(sym_ref),
                },
                self.scope.snapshot(),
                span,
            );
        }

        // First sighting: register the signature, skip the body.
        let saved = self.scope.enter_func(&name);
        self.eat_exact(TokenKind::LParen);

        let mut param_syms = Vec::new();
        while !matches!(self.cur(), TokenKind::Eof | TokenKind::RParen) {
            if !param_syms.is_empty() {
                self.eat_exact(TokenKind::Comma);
            }

            let pspan = self.cur_span();
            let pname = self.eat_ident();

            if self
                .symtab
                .find(SymbolKind::Decl, &pname, &self.scope.cur_scope, &self.scope.cur_module)
                .is_some()
            {
                self.error_at(pspan, format!("redefinition of variable '{pname}'"));
            } else {
                let sym_ref = self.symtab.add(Symbol {
                    kind: SymbolKind::Decl,
                    name: pname,
                    scope: self.scope.cur_scope.clone(),
                    func: self.scope.cur_func.clone(),
                    module: self.scope.cur_module.clone(),
                    file: self.scope.cur_file.clone(),
                    span: pspan,
                    ty: "i64".to_string(),
                    param_count: 0,
                    param_syms: Vec::new(),
                });
                param_syms.push(sym_ref);
            }
        }

        self.eat_exact(TokenKind::RParen);
        self.scope.leave_func(saved);

        let param_count = param_syms.len();
        self.symtab.add(Symbol {
            kind: SymbolKind::Func,
            name,
            scope: GLOBAL.to_string(),
            func: String::new(),
            module: self.scope.cur_module.clone(),
            file: self.scope.cur_file.clone(),
            span,
            ty: "i64".to_string(),
            param_count,
            param_syms,
        });

        self.skip_body();
        Ast::nop(self.scope.snapshot(), span)
    }

    // -- top-level drivers ----------------------------------------------

    fn run_pass_one(&mut self) {
        while !matches!(self.cur(), TokenKind::Eof) {
            if self.is_ident("sub") {
                self.parse_stmt();
            } else {
                self.advance();
            }
        }
    }

    fn run_pass_two(&mut self) -> Vec<Ast> {
        let mut stmts = Vec::new();

        while !matches!(self.cur(), TokenKind::Eof) {
            let stmt = self.parse_stmt();

            match &stmt.kind {
                AstKind::Nop => continue,
                AstKind::Func { .. }
                | AstKind::Call { .. }
                | AstKind::Decl { .. }
                | AstKind::Assign { .. }
                | AstKind::Ret { .. }
                | AstKind::AsmBlock(_)
                | AstKind::If { .. }
                | AstKind::For { .. }
                | AstKind::While { .. } => {}
                other => {
                    let sspan = stmt.span;
                    self.error_at(sspan, format!("invalid statement '{}'", asttype_to_string(other)));
                }
            }

            stmts.push(stmt);
        }

        stmts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> ParseOutput {
        let out = parse(src, "t.mb", "__main");
        assert!(!out.diagnostics.had_errors(), "unexpected errors: {:?}", {
            let mut msgs = Vec::new();
            for d in out.diagnostics.iter() {
                msgs.push(d.message.clone());
            }
            msgs
        });
        out
    }

    #[test]
    fn parses_a_trivial_subroutine() {
        let out = parse_ok("sub main()\n    return 1\nend\n");
        let AstKind::Root(stmts) = &out.root.kind else { panic!() };
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0].kind, AstKind::Func { .. }));
    }

    #[test]
    fn forward_reference_between_subroutines_resolves() {
        let out = parse_ok("sub a()\n    return b()\nend\nsub b()\n    return 1\nend\n");
        let AstKind::Root(stmts) = &out.root.kind else { panic!() };
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn duplicate_subroutine_is_an_error() {
        let out = parse("sub main()\n    return 1\nend\nsub main()\n    return 2\nend\n", "t.mb", "__main");
        assert!(out.diagnostics.had_errors());
    }

    #[test]
    fn bare_value_condition_normalizes_to_neq_zero() {
        let out = parse_ok("sub main()\n    if 1\n        return 1\n    end\n    return 0\nend\n");
        let AstKind::Root(stmts) = &out.root.kind else { panic!() };
        let AstKind::Func { body, .. } = &stmts[0].kind else { panic!() };
        let AstKind::If { condition, .. } = &body[0].kind else { panic!() };
        let AstKind::Condition { values, .. } = &condition.kind else { panic!() };
        assert_eq!(values.len(), 3);
        assert!(matches!(values[1].kind, AstKind::Oper(TokenKind::Neq)));
    }

    #[test]
    fn compound_assign_desugars_to_assign_of_math() {
        let out = parse_ok("sub main()\n    s = 0\n    s += 1\n    return s\nend\n");
        let AstKind::Root(stmts) = &out.root.kind else { panic!() };
        let AstKind::Func { body, .. } = &stmts[0].kind else { panic!() };
        assert!(matches!(body[1].kind, AstKind::Assign { .. }));
        let AstKind::Assign { value, .. } = &body[1].kind else { panic!() };
        assert!(matches!(value.kind, AstKind::Math { .. }));
    }

    #[test]
    fn for_loop_scope_nests_under_function_scope() {
        let out = parse_ok("sub main()\n    for i = 1 to 4\n        x = i\n    end\n    return 0\nend\n");
        let AstKind::Root(stmts) = &out.root.kind else { panic!() };
        let AstKind::Func { body, .. } = &stmts[0].kind else { panic!() };
        let AstKind::For { body: for_body, .. } = &body[0].kind else { panic!() };
        assert!(for_body[0].scope.full.starts_with("main@for"));
    }
}
