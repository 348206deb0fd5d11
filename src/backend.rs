//! Minstral assembly backend: walks a [`Program`] and emits `.text`,
//! subroutine, and `.data` regions. Ported from
//! `backends/minstral.c::emit_asm`/`emit_stmt` and friends.

use std::collections::HashSet;

use crate::ir::{Instr, IrOp, IrValue, Program};

/// Lowers a completed [`Program`] into target assembly text.
pub trait Lowering {
    fn lower(&mut self, program: &Program) -> String;
}

/// The reference keeps a 1000-slot FNV1a hash table of seen variables with
/// silent collisions; this keeps a plain set plus an insertion-ordered list
/// instead, per the redesign note in `SPEC_FULL.md` §9 — same dedup
/// behavior, no collision risk.
#[derive(Default)]
pub struct MinstralLowering {
    seen_vars: HashSet<String>,
    data_lines: Vec<String>,
}

impl MinstralLowering {
    pub fn new() -> Self {
        Self::default()
    }

    fn mangled_var(scope: &str, name: &str) -> String {
        format!("_{scope}{name}")
    }

    fn add_variable(&mut self, scope: &str, name: &str) {
        let mangled = Self::mangled_var(scope, name);
        if self.seen_vars.insert(mangled.clone()) {
            self.data_lines.push(format!("{mangled} dat 0\n"));
        }
    }

    fn value_text(value: &IrValue) -> String {
        match value {
            IrValue::None | IrValue::Reg(_) => String::new(),
            IrValue::Int(n) => n.to_string(),
            IrValue::Var { source, name } => Self::mangled_var(&source.scope, name),
            IrValue::Ident { name, .. } => name.clone(),
            IrValue::Ret { source } => format!("_{}@ret", source.func),
            IrValue::Stack => "^".to_string(),
            IrValue::Branch { source, label } => format!("_{}@l{label}", source.func),
            IrValue::String(s) => s.clone(),
        }
    }

    fn emit_func_begin(&mut self, instr: &Instr) -> String {
        let IrValue::Ident { source, name } = &instr.src else {
            unreachable!("FuncBegin's src must be an Ident")
        };
        self.add_variable(&source.scope, &format!("{name}@ret"));
        format!("_{name} dsr\n")
    }

    fn emit_new_var(&mut self, instr: &Instr) -> String {
        let IrValue::Var { source, name } = &instr.src else {
            unreachable!("NewVar's src must be a Var")
        };
        self.add_variable(&source.scope, name);
        String::new()
    }

    fn emit_load(&self, instr: &Instr) -> String {
        if matches!(instr.src, IrValue::Reg(_)) {
            return String::new();
        }
        format!("lda {}\n", Self::value_text(&instr.src))
    }

    fn emit_store(&self, instr: &Instr) -> String {
        format!("sta {}\n", Self::value_text(&instr.dst))
    }

    fn emit_call(&self, instr: &Instr) -> String {
        let IrValue::Ident { name, .. } = &instr.src else {
            unreachable!("Call's src must be an Ident")
        };
        format!("csr _{name}\n")
    }

    fn emit_inline_asm(&self, instr: &Instr) -> String {
        let IrValue::String(s) = &instr.src else {
            unreachable!("InlineAsm's src must be a String")
        };
        if s.is_empty() {
            String::new()
        } else if s.ends_with('\n') {
            s.clone()
        } else {
            format!("{s}\n")
        }
    }

    fn emit_push(&self, instr: &Instr) -> String {
        format!("psh {}\n", Self::value_text(&instr.src))
    }

    fn emit_pop(&self, instr: &Instr) -> String {
        if matches!(instr.dst, IrValue::Reg(_)) {
            return "pop\n".to_string();
        }
        format!("pop {}\n", Self::value_text(&instr.dst))
    }

    fn emit_math(&self, instr: &Instr) -> String {
        let mut src = instr.src.clone();
        if matches!(instr.src, IrValue::Reg(_)) && matches!(instr.dst, IrValue::Stack) {
            src = IrValue::Stack;
        }
        let src_text = Self::value_text(&src);
        let acc = matches!(instr.src, IrValue::Reg(_));

        match instr.op {
            IrOp::Add => format!("add {src_text}\n"),
            IrOp::Sub => format!("sub {src_text}\n"),
            IrOp::Mul => format!("mul {src_text}\n"),
            IrOp::Div => format!("div {src_text}\n"),
            IrOp::Mod => format!("mod {src_text}\n"),
            IrOp::Shl => format!("shl {src_text}\n"),
            // The reference emits `shl` here too; preserved rather than
            // silently fixed since it's a named behavior, not a slip.
            IrOp::Shr => format!("shl {src_text}\n"),
            IrOp::And => format!("and {src_text}\n"),
            IrOp::Or => format!("or {src_text}\n"),
            IrOp::Xor => format!("xor {src_text}\n"),
            IrOp::Not if acc => "not\n".to_string(),
            IrOp::Not => format!("not {src_text}\n"),
            _ if acc => "neg\n".to_string(),
            _ => format!("neg {src_text}\n"),
        }
    }

    fn emit_swp(&self, instr: &Instr) -> String {
        format!("swp {}\n", Self::value_text(&instr.dst))
    }

    fn emit_compare(&self, instr: &Instr) -> String {
        format!("cmp {}\n", Self::value_text(&instr.src))
    }

    fn emit_status(&self, instr: &Instr) -> String {
        let dst = Self::value_text(&instr.dst);
        match instr.op {
            IrOp::Eq => format!("seq {dst}\n"),
            IrOp::Neq => format!("sne {dst}\n"),
            IrOp::Lt => format!("slt {dst}\n"),
            IrOp::Lte => format!("sle {dst}\n"),
            IrOp::Gt => format!("sgt {dst}\n"),
            _ => format!("sge {dst}\n"),
        }
    }

    fn emit_branch_bool(&self, instr: &Instr) -> String {
        let dst = Self::value_text(&instr.dst);
        let mnemonic = if instr.op == IrOp::BranchTrue { "bne" } else { "beq" };
        format!("cmp 0\n{mnemonic} {dst}\n")
    }

    fn emit_new_branch(&self, instr: &Instr) -> String {
        let IrValue::Branch { source, label } = &instr.dst else {
            unreachable!("NewBranch's dst must be a Branch")
        };
        format!("_{}@l{label}\n", source.func)
    }

    fn emit_jump(&self, instr: &Instr) -> String {
        format!("jmp {}\n", Self::value_text(&instr.dst))
    }

    fn emit_stmt(&mut self, instr: &Instr) -> String {
        match instr.op {
            IrOp::Nop | IrOp::FuncEnd => String::new(),
            IrOp::FuncBegin => self.emit_func_begin(instr),
            IrOp::Ret => "rsr\n".to_string(),
            IrOp::NewVar => self.emit_new_var(instr),
            IrOp::Load => self.emit_load(instr),
            IrOp::Store => self.emit_store(instr),
            IrOp::Call => self.emit_call(instr),
            IrOp::InlineAsm => self.emit_inline_asm(instr),
            IrOp::Push => self.emit_push(instr),
            IrOp::Pop => self.emit_pop(instr),
            IrOp::Add
            | IrOp::Sub
            | IrOp::Mul
            | IrOp::Div
            | IrOp::Mod
            | IrOp::Shl
            | IrOp::Shr
            | IrOp::And
            | IrOp::Or
            | IrOp::Xor
            | IrOp::Not
            | IrOp::Neg => self.emit_math(instr),
            IrOp::Swp => self.emit_swp(instr),
            IrOp::Compare => self.emit_compare(instr),
            IrOp::Eq | IrOp::Neq | IrOp::Lt | IrOp::Lte | IrOp::Gt | IrOp::Gte => self.emit_status(instr),
            IrOp::BranchTrue | IrOp::BranchFalse => self.emit_branch_bool(instr),
            IrOp::NewBranch => self.emit_new_branch(instr),
            IrOp::Jump => self.emit_jump(instr),
        }
    }
}

impl Lowering for MinstralLowering {
    fn lower(&mut self, program: &Program) -> String {
        let mut code = String::from(".text\n");
        let mut subroutines = String::new();
        let mut in_subroutine = false;

        for instr in &program.instrs {
            let stmt = self.emit_stmt(instr);

            if instr.op == IrOp::FuncBegin {
                in_subroutine = true;
            }

            if in_subroutine {
                subroutines.push_str(&stmt);
                if instr.op == IrOp::FuncEnd {
                    in_subroutine = false;
                }
                continue;
            }

            code.push_str(&stmt);
        }

        code.push_str("hlt\n");
        code.push_str(&subroutines);

        if !self.data_lines.is_empty() {
            code.push_str(".data\n");
            for line in &self.data_lines {
                code.push_str(line);
            }
        }

        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::lower;
    use crate::parser::parse;

    fn assemble(src: &str) -> String {
        let out = parse(src, "t.mb", "__main");
        assert!(!out.diagnostics.had_errors());
        let program = lower(&out.symtab, &out.root);
        MinstralLowering::new().lower(&program)
    }

    #[test]
    fn wraps_main_body_with_text_and_halt() {
        let code = assemble("sub main()\n    return 0\nend\n");
        assert!(code.starts_with(".text\n"));
        assert!(code.contains("hlt\n"));
    }

    #[test]
    fn subroutine_emits_dsr_label_and_rsr() {
        let code = assemble("sub main()\n    return 0\nend\n");
        assert!(code.contains("_main dsr\n"));
        assert!(code.contains("rsr\n"));
    }

    #[test]
    fn declared_variable_appears_in_data_section() {
        let code = assemble("sub main()\n    x = 5\n    return x\nend\n");
        assert!(code.contains(".data\n"));
        assert!(code.contains("dat 0\n"));
    }

    #[test]
    fn right_shift_emits_the_preserved_shl_mnemonic() {
        let code = assemble("sub main()\n    return 8 >> 1\nend\n");
        assert!(code.contains("shl"));
        assert!(!code.contains("shr"));
    }
}
