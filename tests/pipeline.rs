//! Integration tests over the concrete scenarios named in spec §8,
//! exercising the full parse -> lower -> optimize -> backend pipeline
//! through the public crate surface.

use std::io::Write;

use minstral_basic::backend::{Lowering, MinstralLowering};
use minstral_basic::ir::builder::lower;
use minstral_basic::optimize::optimize;
use minstral_basic::parser::parse;

fn assemble(src: &str) -> String {
    let out = parse(src, "t.mb", "__main");
    assert!(!out.diagnostics.had_errors(), "unexpected parse errors");
    let program = optimize(lower(&out.symtab, &out.root));
    MinstralLowering::new().lower(&program)
}

fn debug_ir(src: &str) -> String {
    let out = parse(src, "t.mb", "__main");
    assert!(!out.diagnostics.had_errors(), "unexpected parse errors");
    let program = optimize(lower(&out.symtab, &out.root));
    program.render(false)
}

#[test]
fn arithmetic_precedence_orders_multiplication_before_addition() {
    let ir = debug_ir("sub main()\n    return 1 + 2 * 3\nend\n");
    let mul_pos = ir.find("mul").expect("multiplication op present");
    let add_pos = ir.find("add").expect("addition op present");
    assert!(mul_pos < add_pos, "tier-2 operator must lower before tier-1:\n{ir}");
}

#[test]
fn and_condition_combines_two_comparisons_into_one_exit_branch() {
    let ir = debug_ir(
        "sub main()\n    x = 10\n    if x > 5 and x < 20\n        return 1\n    else\n        return 0\n    end\nend\n",
    );
    assert_eq!(ir.matches("gt").count(), 1, "one greater-than comparison:\n{ir}");
    assert_eq!(ir.matches("lt").count(), 1, "one less-than comparison:\n{ir}");
    assert!(ir.contains("branch_true") || ir.contains("branch true"), "short-circuit on a true branch:\n{ir}");
}

#[test]
fn for_loop_emits_cond_step_and_final_labels_with_default_step() {
    let ir = debug_ir("sub main()\n    s = 0\n    for i = 1 to 4\n        s += i\n    end\n    return s\nend\n");
    let label_defs = ir.lines().filter(|l| l.ends_with(':')).count();
    assert_eq!(label_defs, 3, "condition, step, and final labels:\n{ir}");
}

#[test]
fn reverse_for_loop_with_step_uses_less_than_for_its_exit_test() {
    let ir = debug_ir("sub main()\n    for rev i = 10 to 0 step 2\n    end\n    return 0\nend\n");
    assert!(ir.contains("lt "), "reverse loops compare with Lt:\n{ir}");
    assert!(!ir.contains("gte "), "forward-only comparison must not appear:\n{ir}");
}

#[test]
fn forward_for_loop_uses_greater_equal_for_its_exit_test() {
    let ir = debug_ir("sub main()\n    for i = 0 to 4\n    end\n    return 0\nend\n");
    assert!(ir.contains("gte "), "forward loops compare with Gte:\n{ir}");
}

#[test]
fn call_stores_its_argument_before_entering_the_callee() {
    let asm = assemble("sub f(a)\n    return a + 1\nend\n\nsub main()\n    return f(41)\nend\n");
    let store_pos = asm.find("sta _fa\n").expect("argument stored into its parameter slot");
    let call_pos = asm.find("csr _f\n").expect("call into the subroutine");
    assert!(store_pos < call_pos, "store must precede the call:\n{asm}");
}

#[test]
fn inline_asm_statements_are_comma_split_into_separate_lines() {
    let asm = assemble("sub main()\n    asm nop, nop end\n    return 0\nend\n");
    assert_eq!(asm.matches("nop").count(), 2, "both inline instructions preserved:\n{asm}");
    let nop_block: String = asm.lines().filter(|l| l.contains("nop")).collect::<Vec<_>>().join("\n");
    assert!(nop_block.lines().count() == 2, "comma-separated instructions land on separate lines:\n{asm}");
}

#[test]
fn function_return_slot_appears_exactly_once_in_data() {
    let asm = assemble("sub main()\n    return 1\nend\n");
    assert_eq!(asm.matches("_main@ret dat 0\n").count(), 1);
}

#[test]
fn right_shift_preserves_the_shl_mnemonic_bug() {
    let asm = assemble("sub main()\n    return 8 >> 1\nend\n");
    assert!(asm.contains("shl"));
    assert!(!asm.contains("shr"));
}

#[test]
fn compile_entry_point_reads_a_real_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("scratch source file");
    write!(file, "sub main()\n    return 1 + 2 * 3\nend\n").unwrap();
    let source = std::fs::read_to_string(file.path()).unwrap();

    let program = minstral_basic::compile(&source, "scratch.mb", "__main", false)
        .expect("well-formed program compiles");
    assert!(!program.instrs.is_empty());
}
