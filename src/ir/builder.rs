//! AST → IR lowering. Grounded on `ir.c` in full: the three-tier math
//! precedence-deferral algorithm, short-circuit condition lowering, and the
//! control-flow op sequences for `if`/`for`/`while` are ported statement for
//! statement, not just op-for-op.

use crate::ast::{Ast, AstKind, GLOBAL};
use crate::lexeme::TokenKind;
use crate::sym::{SymRef, SymbolTable};

use super::{IrOp, IrValue, Program, Source};

pub fn lower(symtab: &SymbolTable, root: &Ast) -> Program {
    let mut builder = IrBuilder {
        symtab,
        program: Program::default(),
        label_count: 0,
        cur_loop_label: 0,
        cur_end_loop_label: 0,
        // `ir.c` keeps one `static` global `temp_var`, stamped once with the
        // root's scope and reused verbatim by every `push_math`/
        // `push_condition` call; mirror that with a single field here
        // instead of re-deriving a node-local one per call.
        temp_var: temp_var_value(source_of(root)),
    };

    let AstKind::Root(stmts) = &root.kind else {
        panic!("lower expects a Root ast at the top level")
    };

    builder.push(IrOp::NewVar, IrValue::none(), builder.temp_var.clone());

    for stmt in stmts {
        builder.push_stmt(stmt);
    }

    builder.push(IrOp::Nop, IrValue::none(), IrValue::none());
    builder.program
}

struct IrBuilder<'a> {
    symtab: &'a SymbolTable,
    program: Program,
    label_count: u32,
    cur_loop_label: u32,
    cur_end_loop_label: u32,
    /// The single global `@temp` scratch variable, declared once in `lower`
    /// and shared by every `push_math`/`push_condition` call, mirroring
    /// `ir.c`'s one `static` `temp_var`.
    temp_var: IrValue,
}

impl<'a> IrBuilder<'a> {
    fn push(&mut self, op: IrOp, dst: IrValue, src: IrValue) {
        self.program.push(op, dst, src);
    }

    fn next_label(&mut self) -> u32 {
        let label = self.label_count;
        self.label_count += 1;
        label
    }

    fn source_of_symref(&self, r: SymRef) -> Source {
        let sym = self.symtab.get(r);
        Source {
            scope: sym.scope.clone(),
            func: sym.func.clone(),
            module: sym.module.clone(),
        }
    }

    fn ast_to_value(&mut self, ast: &Ast) -> IrValue {
        match &ast.kind {
            AstKind::Nop => IrValue::None,
            AstKind::Int(n) => IrValue::Int(*n),
            AstKind::Var { name, sym } => {
                let source = sym.map(|r| self.source_of_symref(r)).unwrap_or_else(|| source_of(ast));
                IrValue::var(source, name.clone())
            }
            AstKind::Call { name, .. } => {
                self.push_stmt(ast);
                IrValue::Ret {
                    source: Source {
                        scope: GLOBAL.to_string(),
                        func: name.clone(),
                        module: ast.scope.module.clone(),
                    },
                }
            }
            AstKind::Math { .. } => {
                self.push_stmt(ast);
                IrValue::reg()
            }
            AstKind::Parens(inner) => self.ast_to_value(inner),
            AstKind::Condition { .. } => {
                self.push_stmt(ast);
                IrValue::reg()
            }
            AstKind::Not(inner) => {
                let v = self.ast_to_value(inner);
                self.push(IrOp::Load, IrValue::reg(), v);
                self.push(IrOp::Not, IrValue::reg(), IrValue::reg());
                IrValue::reg()
            }
            AstKind::Unary(_, inner) => {
                let v = self.ast_to_value(inner);
                self.push(IrOp::Load, IrValue::reg(), v);
                self.push(IrOp::Neg, IrValue::reg(), IrValue::reg());
                IrValue::reg()
            }
            other => unreachable!("ast_to_value called on a non-value ast: {other:?}"),
        }
    }

    fn push_stmt(&mut self, ast: &Ast) {
        match &ast.kind {
            AstKind::Func { .. } => self.push_func(ast),
            AstKind::Call { .. } => self.push_call(ast),
            AstKind::Decl { .. } => self.push_decl(ast),
            AstKind::Assign { .. } => self.push_assign(ast),
            AstKind::Ret { .. } => self.push_ret(ast),
            AstKind::AsmBlock(code) => {
                self.push(IrOp::InlineAsm, IrValue::none(), IrValue::String(code.clone()));
            }
            AstKind::Math { .. } => self.push_math(ast),
            AstKind::Condition { .. } => self.push_condition(ast),
            AstKind::If { .. } => self.push_if(ast),
            AstKind::For { .. } => self.push_for(ast),
            AstKind::While { .. } => self.push_while(ast),
            AstKind::Nop => {}
            other => unreachable!("push_stmt called on a value-only ast: {other:?}"),
        }
    }

    fn push_func(&mut self, ast: &Ast) {
        let AstKind::Func { name, body, sym, .. } = &ast.kind else {
            unreachable!()
        };
        let sym_ref = sym.expect("Func ast must carry its symbol");
        let source = source_of(ast);

        self.push(
            IrOp::FuncBegin,
            IrValue::none(),
            IrValue::Ident { source: source.clone(), name: name.clone() },
        );
        self.label_count = 0;

        let param_syms = self.symtab.get(sym_ref).param_syms.clone();
        for p in param_syms {
            let p_source = self.source_of_symref(p);
            let p_name = self.symtab.get(p).name.clone();
            self.push(IrOp::NewVar, IrValue::none(), IrValue::var(p_source, p_name));
        }

        for stmt in body {
            self.push_stmt(stmt);
        }

        let ends_in_ret = matches!(body.last().map(|s| &s.kind), Some(AstKind::Ret { .. }));
        if !ends_in_ret {
            self.push(IrOp::Ret, IrValue::none(), IrValue::none());
        }

        self.push(IrOp::FuncEnd, IrValue::none(), IrValue::none());
    }

    fn push_call(&mut self, ast: &Ast) {
        let AstKind::Call { name, args, sym } = &ast.kind else {
            unreachable!()
        };
        let Some(sym_ref) = sym else { return };
        let ident_source = self.source_of_symref(*sym_ref);
        let param_syms = self.symtab.get(*sym_ref).param_syms.clone();

        for (arg, p) in args.iter().zip(param_syms.iter()) {
            let v = self.ast_to_value(arg);
            self.push(IrOp::Load, IrValue::reg(), v);
            let p_source = self.source_of_symref(*p);
            let p_name = self.symtab.get(*p).name.clone();
            self.push(IrOp::Store, IrValue::var(p_source, p_name), IrValue::reg());
        }

        self.push(
            IrOp::Call,
            IrValue::none(),
            IrValue::Ident { source: ident_source, name: name.clone() },
        );
    }

    fn push_decl(&mut self, ast: &Ast) {
        let AstKind::Decl { name, value, sym, .. } = &ast.kind else {
            unreachable!()
        };
        let sym_ref = sym.expect("Decl ast must carry its symbol");
        let source = self.source_of_symref(sym_ref);
        let var = IrValue::var(source, name.clone());

        self.push(IrOp::NewVar, IrValue::none(), var.clone());
        let init = value.as_ref().expect("Decl always carries an initial value");
        let v = self.ast_to_value(init);
        self.push(IrOp::Load, IrValue::reg(), v);
        self.push(IrOp::Store, var, IrValue::reg());
    }

    fn push_assign(&mut self, ast: &Ast) {
        let AstKind::Assign { name, value, sym } = &ast.kind else {
            unreachable!()
        };
        let sym_ref = sym.expect("Assign ast must carry its symbol");
        let source = self.source_of_symref(sym_ref);

        let v = self.ast_to_value(value);
        self.push(IrOp::Load, IrValue::reg(), v);
        self.push(IrOp::Store, IrValue::var(source, name.clone()), IrValue::reg());
    }

    fn push_ret(&mut self, ast: &Ast) {
        let AstKind::Ret { value, .. } = &ast.kind else {
            unreachable!()
        };

        if let Some(value) = value {
            let v = self.ast_to_value(value);
            self.push(IrOp::Load, IrValue::reg(), v);
            self.push(IrOp::Store, IrValue::Ret { source: source_of(ast) }, IrValue::reg());
        }

        self.push(IrOp::Ret, IrValue::none(), IrValue::none());
    }

    fn push_math(&mut self, ast: &Ast) {
        let AstKind::Math { values, .. } = &ast.kind else {
            unreachable!()
        };
        let n = values.len();

        let temp_reg = IrValue::reg();
        let temp_var = self.temp_var.clone();

        let mut mid_opers: Vec<TokenKind> = Vec::new();
        let mut low_opers: Vec<TokenKind> = Vec::new();

        let first = self.ast_to_value(&values[0]);
        self.push(IrOp::Load, temp_reg.clone(), first);
        self.push(IrOp::Push, IrValue::none(), temp_reg.clone());

        let mut i = 1;
        while i < n {
            let oper = oper_kind(&values[i]);
            let prec = oper_to_prec(&oper);
            let value = &values[i + 1];

            if prec == 2 {
                let v = self.ast_to_value(value);
                self.push(IrOp::Load, temp_reg.clone(), v);
                self.push(IrOp::Store, temp_var.clone(), temp_reg.clone());
                self.push(IrOp::Pop, temp_reg.clone(), IrValue::none());
                self.push(oper_to_optype(&oper), temp_reg.clone(), temp_var.clone());
                self.push(IrOp::Push, IrValue::none(), temp_reg.clone());
                i += 2;
                continue;
            }

            let next_tier_breaks = i + 2 >= n || oper_to_prec(&oper_kind(&values[i + 2])) != prec;

            if prec == 1 && higher_prec_later(values, i) && next_tier_breaks {
                let v = self.ast_to_value(value);
                self.push(IrOp::Load, temp_reg.clone(), v);
                self.push(IrOp::Push, IrValue::none(), temp_reg.clone());
                mid_opers.push(oper);
                i += 2;
                continue;
            }

            if !mid_opers.is_empty() {
                flush_math_opers(self, &mid_opers, &temp_reg, &temp_var);
                mid_opers.clear();
            }

            if prec == 0 && higher_prec_later(values, i) && next_tier_breaks {
                let v = self.ast_to_value(value);
                self.push(IrOp::Load, temp_reg.clone(), v);
                self.push(IrOp::Push, IrValue::none(), temp_reg.clone());
                low_opers.push(oper);
                i += 2;
                continue;
            }

            if !low_opers.is_empty() {
                flush_math_opers(self, &low_opers, &temp_reg, &temp_var);
                low_opers.clear();
            }

            let v = self.ast_to_value(value);
            self.push(IrOp::Load, temp_reg.clone(), v);
            self.push(IrOp::Store, temp_var.clone(), temp_reg.clone());
            self.push(IrOp::Pop, temp_reg.clone(), IrValue::none());
            self.push(oper_to_optype(&oper), temp_reg.clone(), temp_var.clone());
            self.push(IrOp::Push, IrValue::none(), temp_reg.clone());

            i += 2;
        }

        flush_math_opers(self, &mid_opers, &temp_reg, &temp_var);
        flush_math_opers(self, &low_opers, &temp_reg, &temp_var);

        self.push(IrOp::Pop, temp_reg, IrValue::none());
    }

    fn push_condition(&mut self, ast: &Ast) {
        let AstKind::Condition { values, .. } = &ast.kind else {
            unreachable!()
        };
        let count = values.len();
        let source = source_of(ast);

        let temp_reg = IrValue::reg();
        let temp_var = self.temp_var.clone();

        let done_label = self.next_label();
        let mut pushed = false;

        let mut i = 2;
        while i < count {
            let left = &values[i - 2];
            let right = &values[i];
            let oper = oper_kind(&values[i - 1]);

            let left_v = self.ast_to_value(left);
            self.push(IrOp::Load, temp_reg.clone(), left_v);

            if loading_value_will_corrupt(right) {
                self.push(IrOp::Push, IrValue::none(), temp_reg.clone());
                let right_v = self.ast_to_value(right);
                self.push(IrOp::Load, temp_var.clone(), right_v);
                self.push(IrOp::Pop, IrValue::none(), temp_reg.clone());
                self.push(IrOp::Compare, temp_reg.clone(), temp_var.clone());
            } else {
                let right_v = self.ast_to_value(right);
                self.push(IrOp::Compare, temp_reg.clone(), right_v);
            }

            let set_op = match oper {
                TokenKind::Eq => IrOp::Eq,
                TokenKind::Neq => IrOp::Neq,
                TokenKind::Lt => IrOp::Lt,
                TokenKind::Lte => IrOp::Lte,
                TokenKind::Gt => IrOp::Gt,
                _ => IrOp::Gte,
            };
            self.push(set_op, temp_reg.clone(), IrValue::none());

            let last_oper = if i > 3 { Some(oper_kind(&values[i - 3])) } else { None };
            let next_oper = if i + 1 == count { None } else { Some(oper_kind(&values[i + 1])) };

            if last_oper == Some(TokenKind::Amp) {
                self.push(IrOp::Store, temp_var.clone(), temp_reg.clone());
                self.push(IrOp::Pop, temp_reg.clone(), IrValue::none());
            }

            if last_oper == Some(TokenKind::Amp) && i != 2 {
                self.push(IrOp::And, temp_reg.clone(), temp_var.clone());
                if next_oper != Some(TokenKind::Amp) {
                    self.push(IrOp::BranchTrue, IrValue::branch(source.clone(), done_label), IrValue::none());
                }
            } else {
                let mut just_popped = false;

                if last_oper != Some(TokenKind::Amp) && next_oper != Some(TokenKind::Amp) && count > 3 {
                    if pushed {
                        self.push(IrOp::Store, temp_var.clone(), temp_reg.clone());
                        self.push(IrOp::Pop, temp_reg.clone(), IrValue::none());
                        just_popped = true;
                    }
                    self.push(IrOp::BranchTrue, IrValue::branch(source.clone(), done_label), IrValue::none());
                }

                if last_oper == Some(TokenKind::Pipe) {
                    if !just_popped {
                        self.push(IrOp::Store, temp_var.clone(), temp_reg.clone());
                        self.push(IrOp::Pop, temp_reg.clone(), IrValue::none());
                    }
                    self.push(IrOp::Or, temp_reg.clone(), temp_var.clone());
                }
            }

            if count > 3 && (next_oper == Some(TokenKind::Amp) || next_oper == Some(TokenKind::Pipe)) {
                self.push(IrOp::Push, IrValue::none(), temp_reg.clone());
                pushed = true;
            }

            i += 4;
        }

        self.push(IrOp::NewBranch, IrValue::branch(source, done_label), IrValue::none());
    }

    fn push_block(&mut self, block: &[Ast]) {
        for stmt in block {
            self.push_stmt(stmt);
        }
    }

    fn push_if(&mut self, ast: &Ast) {
        let AstKind::If { condition, body, else_body } = &ast.kind else {
            unreachable!()
        };
        if body.is_empty() && else_body.is_empty() {
            return;
        }

        self.push_condition(condition);

        let source = source_of(ast);
        let true_label = self.next_label();
        let false_label = self.next_label();
        let final_label = if !else_body.is_empty() { self.next_label() } else { false_label };

        self.push(IrOp::BranchTrue, IrValue::branch(source.clone(), true_label), IrValue::none());
        self.push(IrOp::Jump, IrValue::branch(source.clone(), false_label), IrValue::none());

        self.push(IrOp::NewBranch, IrValue::branch(source.clone(), true_label), IrValue::none());
        self.push_block(body);

        if !else_body.is_empty() {
            self.push(IrOp::Jump, IrValue::branch(source.clone(), final_label), IrValue::none());
            self.push(IrOp::NewBranch, IrValue::branch(source.clone(), false_label), IrValue::none());
            self.push_block(else_body);
        }

        self.push(IrOp::NewBranch, IrValue::branch(source, final_label), IrValue::none());
    }

    fn push_for(&mut self, ast: &Ast) {
        let AstKind::For { counter, end, step, body, reverse, .. } = &ast.kind else {
            unreachable!()
        };
        let source = source_of(ast);

        if matches!(counter.kind, AstKind::Decl { .. } | AstKind::Assign { .. }) {
            self.push_stmt(counter);
        }

        let condition_label = self.next_label();
        let next_loop_label = self.next_label();
        let final_label = self.next_label();

        self.push(IrOp::NewBranch, IrValue::branch(source.clone(), condition_label), IrValue::none());

        let var = self.counter_var(counter);

        self.push(IrOp::Load, IrValue::reg(), var.clone());
        let end_v = self.ast_to_value(end);
        self.push(IrOp::Compare, IrValue::reg(), end_v);
        self.push(if *reverse { IrOp::Lt } else { IrOp::Gte }, IrValue::reg(), IrValue::none());
        self.push(IrOp::BranchFalse, IrValue::branch(source.clone(), final_label), IrValue::reg());

        let saved_loop = (self.cur_loop_label, self.cur_end_loop_label);
        self.cur_loop_label = next_loop_label;
        self.cur_end_loop_label = final_label;

        self.push_block(body);

        self.push(IrOp::NewBranch, IrValue::branch(source.clone(), next_loop_label), IrValue::none());

        self.push(IrOp::Load, IrValue::reg(), var.clone());
        let step_v = self.ast_to_value(step);
        self.push(IrOp::Add, IrValue::reg(), step_v);
        self.push(IrOp::Store, var, IrValue::reg());

        self.cur_loop_label = saved_loop.0;
        self.cur_end_loop_label = saved_loop.1;

        self.push(IrOp::Jump, IrValue::branch(source.clone(), condition_label), IrValue::none());
        self.push(IrOp::NewBranch, IrValue::branch(source, final_label), IrValue::none());
    }

    fn counter_var(&self, counter: &Ast) -> IrValue {
        match &counter.kind {
            AstKind::Var { name, sym } => {
                let s = sym.map(|r| self.source_of_symref(r)).unwrap_or_else(|| source_of(counter));
                IrValue::var(s, name.clone())
            }
            AstKind::Decl { name, sym, .. } => {
                let s = sym.map(|r| self.source_of_symref(r)).unwrap_or_else(|| source_of(counter));
                IrValue::var(s, name.clone())
            }
            AstKind::Assign { name, sym, .. } => {
                let s = sym.map(|r| self.source_of_symref(r)).unwrap_or_else(|| source_of(counter));
                IrValue::var(s, name.clone())
            }
            other => unreachable!("for-loop counter must be Var, Decl, or Assign, found {other:?}"),
        }
    }

    fn push_while(&mut self, ast: &Ast) {
        let AstKind::While { condition, body } = &ast.kind else {
            unreachable!()
        };
        let source = source_of(ast);

        let condition_label = self.next_label();
        let final_label = self.next_label();

        self.push(IrOp::NewBranch, IrValue::branch(source.clone(), condition_label), IrValue::none());
        self.push_condition(condition);

        self.push(IrOp::BranchFalse, IrValue::branch(source.clone(), final_label), IrValue::none());

        // The reference never re-targets these before the loop body runs
        // here, so a `break`/`continue` inside a `while` resolves to
        // whatever enclosing `for` last set them, if any.
        let saved_loop = (self.cur_loop_label, self.cur_end_loop_label);

        self.push_block(body);

        self.push(IrOp::Jump, IrValue::branch(source.clone(), condition_label), IrValue::none());
        self.push(IrOp::NewBranch, IrValue::branch(source, final_label), IrValue::none());

        self.cur_loop_label = saved_loop.0;
        self.cur_end_loop_label = saved_loop.1;
    }
}

fn flush_math_opers(builder: &mut IrBuilder, opers: &[TokenKind], temp_reg: &IrValue, temp_var: &IrValue) {
    for oper in opers {
        builder.push(IrOp::Pop, temp_var.clone(), IrValue::none());
        builder.push(IrOp::Pop, temp_reg.clone(), IrValue::none());
        builder.push(oper_to_optype(oper), temp_reg.clone(), temp_var.clone());
        builder.push(IrOp::Push, IrValue::none(), temp_reg.clone());
    }
}

fn source_of(ast: &Ast) -> Source {
    Source {
        scope: ast.scope.full.clone(),
        func: ast.scope.func.clone(),
        module: ast.scope.module.clone(),
    }
}

fn temp_var_value(source: Source) -> IrValue {
    IrValue::var(source, "@temp")
}

fn oper_kind(ast: &Ast) -> TokenKind {
    match &ast.kind {
        AstKind::Oper(k) => k.clone(),
        other => unreachable!("expected an Oper node, found {other:?}"),
    }
}

fn loading_value_will_corrupt(ast: &Ast) -> bool {
    matches!(ast.kind, AstKind::Call { .. } | AstKind::Math { .. } | AstKind::Condition { .. })
}

fn oper_to_prec(op: &TokenKind) -> u8 {
    op.math_tier().unwrap_or(0)
}

fn oper_to_optype(op: &TokenKind) -> IrOp {
    match op {
        TokenKind::Plus => IrOp::Add,
        TokenKind::Minus => IrOp::Sub,
        TokenKind::Star => IrOp::Mul,
        TokenKind::Slash => IrOp::Div,
        TokenKind::Percent => IrOp::Mod,
        TokenKind::Shl => IrOp::Shl,
        TokenKind::Shr => IrOp::Shr,
        TokenKind::Amp => IrOp::And,
        TokenKind::Pipe => IrOp::Or,
        _ => IrOp::Xor,
    }
}

fn higher_prec_later(values: &[Ast], cur: usize) -> bool {
    let cur_prec = oper_to_prec(&oper_kind(&values[cur]));
    let mut i = cur + 2;
    while i < values.len() {
        if oper_to_prec(&oper_kind(&values[i])) > cur_prec {
            return true;
        }
        i += 2;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lower_source(src: &str) -> String {
        let out = parse(src, "t.mb", "__main");
        assert!(!out.diagnostics.had_errors());
        lower(&out.symtab, &out.root).render(false)
    }

    #[test]
    fn return_constant_stores_into_ret_slot() {
        let text = lower_source("sub main()\n    return 5\nend\n");
        assert!(text.contains("load @acc, 5\n"));
        assert!(text.contains("store , @acc\n"));
        assert!(text.ends_with("return\nend main\n"));
    }

    #[test]
    fn math_precedence_defers_lower_tier_operators() {
        // 1 + 2 * 3 must multiply before the deferred add is flushed.
        let text = lower_source("sub main()\n    return 1 + 2 * 3\nend\n");
        let mul_pos = text.find("mul").unwrap();
        let add_pos = text.find("add").unwrap();
        assert!(mul_pos < add_pos, "multiply must be emitted before the deferred add:\n{text}");
    }

    #[test]
    fn call_stores_each_argument_into_its_parameter() {
        let text = lower_source("sub add(a, b)\n    return a + b\nend\nsub main()\n    return add(1, 2)\nend\n");
        assert!(text.contains("store a, @acc\n"));
        assert!(text.contains("store b, @acc\n"));
        assert!(text.contains("call add\n"));
    }

    #[test]
    fn for_loop_reverse_flag_selects_lt_comparison() {
        let forward = lower_source("sub main()\n    for i = 0 to 10\n        x = i\n    end\n    return 0\nend\n");
        let reverse = lower_source("sub main()\n    for rev i = 10 to 0\n        x = i\n    end\n    return 0\nend\n");
        assert!(forward.contains("\ngte @acc\n"));
        assert!(reverse.contains("\nlt @acc\n"));
    }

    #[test]
    fn while_loop_branches_on_condition() {
        let text = lower_source("sub main()\n    while 1\n        return 1\n    end\n    return 0\nend\n");
        assert!(text.contains("branch false"));
        assert!(text.contains("jump"));
    }
}
