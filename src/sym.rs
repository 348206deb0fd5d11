//! Flat, append-only symbol table plus the scope-threading registers the
//! two-pass parser carries (`cur_scope`/`cur_func`/`cur_file`/`cur_module`
//! in the reference, here fields on a value instead of four process-wide
//! globals per spec §9's "Global parser state" redesign note).

use crate::span::Span;

/// Index into a `SymbolTable`. The AST holds these instead of raw
/// references, per spec §9's arena-allocation redesign note: the tree
/// holds handles, the table is a vector indexed by handle.
pub type SymRef = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Func,
    Decl,
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub scope: String,
    /// The enclosing subroutine name at the point of declaration (empty at
    /// global scope). Carried alongside `scope`/`module` so IR lowering can
    /// stamp emitted values with the declaration site's `Source`, mirroring
    /// the reference's `ast->var.sym->scope` lookup (symbols there are AST
    /// nodes, so a `Var` or `Call` simply reads its target's `scope` field).
    pub func: String,
    pub module: String,
    pub file: String,
    pub span: Span,
    pub ty: String,
    /// Number of declared parameters, for `Func` symbols only.
    pub param_count: usize,
    /// Handles of this subroutine's parameter `Decl` symbols, in
    /// declaration order. Empty for `Decl` symbols. IR lowering uses this
    /// to know which variable each call-site argument stores into, mirroring
    /// the reference's `ast->call.sym->func.params.items[i]` walk.
    pub param_syms: Vec<SymRef>,
}

#[derive(Default, Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol: Symbol) -> SymRef {
        self.symbols.push(symbol);
        self.symbols.len() - 1
    }

    pub fn get(&self, r: SymRef) -> &Symbol {
        &self.symbols[r]
    }

    /// Linear scan for the first symbol of `kind`/`name` whose declared
    /// scope is a `@`-segment prefix of `scope`. Returning the first match
    /// yields lexical shadowing in source (insertion) order. `module` is
    /// accepted but not matched on, mirroring `find_symbol`'s `(void)
    /// module;` in the reference: a stdlib module and the user's module
    /// share one symbol table and must resolve each other's subroutines.
    pub fn find(&self, kind: SymbolKind, name: &str, scope: &str, _module: &str) -> Option<SymRef> {
        self.symbols
            .iter()
            .position(|s| s.kind == kind && s.name == name && scope_is_prefix(&s.scope, scope))
    }
}

/// Is `declared` a `@`-segment prefix of `query`? The empty string (global)
/// is a prefix of every scope.
pub fn scope_is_prefix(declared: &str, query: &str) -> bool {
    if declared.is_empty() {
        return true;
    }

    let declared_segs: Vec<&str> = declared.split('@').collect();
    let query_segs: Vec<&str> = query.split('@').collect();

    if declared_segs.len() > query_segs.len() {
        return false;
    }

    declared_segs
        .iter()
        .zip(query_segs.iter())
        .all(|(a, b)| a == b)
}

/// The four scope-threading registers, saved and restored explicitly on
/// block entry/exit (the "explicit push/pop on a context stack" option
/// named in spec §9, chosen over a `Drop`-based guard since the parser
/// needs to keep mutating `self` for the duration of the scoped region).
#[derive(Clone, Debug)]
pub struct ParserScope {
    pub cur_scope: String,
    pub cur_func: String,
    pub cur_file: String,
    pub cur_module: String,
}

impl ParserScope {
    pub fn new(file: &str, module: &str) -> Self {
        Self {
            cur_scope: String::new(),
            cur_func: String::new(),
            cur_file: file.to_string(),
            cur_module: module.to_string(),
        }
    }

    /// Enter a `sub <name>(...)`. Returns the saved (scope, func) pair to
    /// pass to `leave_func`.
    pub fn enter_func(&mut self, name: &str) -> (String, String) {
        let saved = (self.cur_scope.clone(), self.cur_func.clone());
        self.cur_scope = name.to_string();
        self.cur_func = name.to_string();
        saved
    }

    pub fn leave_func(&mut self, saved: (String, String)) {
        self.cur_scope = saved.0;
        self.cur_func = saved.1;
    }

    /// Enter an `if`/`else`/`for`/`while` block: append `@<kind><line><col>`
    /// to the current scope. Returns the saved scope to pass to
    /// `leave_block`.
    pub fn enter_block(&mut self, kind: &str, line: u32, col: u32) -> String {
        let saved = self.cur_scope.clone();
        self.cur_scope = format!("{}@{}{}{}", self.cur_scope, kind, line, col);
        saved
    }

    pub fn leave_block(&mut self, saved: String) {
        self.cur_scope = saved;
    }

    pub fn snapshot(&self) -> crate::ast::ScopeInfo {
        crate::ast::ScopeInfo {
            full: self.cur_scope.clone(),
            func: self.cur_func.clone(),
            file: self.cur_file.clone(),
            module: self.cur_module.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_scope_is_prefix_of_everything() {
        assert!(scope_is_prefix("", "main@if12_4"));
        assert!(scope_is_prefix("", ""));
    }

    #[test]
    fn func_scope_is_visible_in_nested_block() {
        assert!(scope_is_prefix("main", "main@if12_4"));
        assert!(!scope_is_prefix("main", "other@if12_4"));
    }

    #[test]
    fn sibling_blocks_do_not_see_each_other() {
        assert!(!scope_is_prefix("main@if12_4", "main@if20_4"));
    }

    #[test]
    fn find_returns_first_match_for_shadowing() {
        let mut table = SymbolTable::new();
        let span = Span::dummy();
        table.add(Symbol {
            kind: SymbolKind::Decl,
            name: "x".into(),
            scope: "main".into(),
            func: "main".into(),
            module: "__main".into(),
            file: "t.mb".into(),
            span,
            ty: "i64".into(),
            param_count: 0,
            param_syms: Vec::new(),
        });
        table.add(Symbol {
            kind: SymbolKind::Decl,
            name: "x".into(),
            scope: "main@if1_1".into(),
            func: "main".into(),
            module: "__main".into(),
            file: "t.mb".into(),
            span,
            ty: "i64".into(),
            param_count: 0,
            param_syms: Vec::new(),
        });

        let found = table
            .find(SymbolKind::Decl, "x", "main@if1_1@for2_2", "__main")
            .unwrap();
        // The inner `x` (declared closer to the query scope) appears later
        // in insertion order; linear scan from the front still finds the
        // outer one first if that's the only one visible in scope, so this
        // asserts the *visible* set rather than which one wins — both are
        // prefixes here, and the first inserted (outer) wins.
        assert_eq!(table.get(found).scope, "main");
    }

    #[test]
    fn enter_leave_block_round_trips() {
        let mut scope = ParserScope::new("t.mb", "__main");
        scope.enter_func("main");
        assert_eq!(scope.cur_scope, "main");
        let saved = scope.enter_block("if", 3, 5);
        assert_eq!(scope.cur_scope, "main@if35");
        scope.leave_block(saved);
        assert_eq!(scope.cur_scope, "main");
    }
}
