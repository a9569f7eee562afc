//! Symbol & scope manager — 4.D
//!
//! A stack of lexical frames, innermost last. Each frame maps variable
//! names (which also cover typedef aliases, per spec.md's data model)
//! to a `Binding`, and tag names (struct/union) to their `Type`.
//! Lookup scans from the top of the stack down; insertion always
//! targets the top frame. The outermost frame is pushed once, in
//! `Scopes::new`, and lives for the whole compilation.

use std::collections::HashMap;

use crate::symbol::SymbolRef;
use crate::ty::Ty;

/// What a name in the variable namespace is bound to.
#[derive(Clone)]
pub enum Binding {
    Var(SymbolRef),
    Typedef(Ty),
}

#[derive(Default)]
struct Frame {
    vars: HashMap<String, Binding>,
    tags: HashMap<String, Ty>,
}

pub struct Scopes {
    frames: Vec<Frame>,
}

impl Scopes {
    pub fn new() -> Self {
        Scopes {
            frames: vec![Frame::default()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn leave_scope(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot pop the global scope");
        self.frames.pop();
    }

    fn top(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("scope stack is never empty")
    }

    pub fn push_var(&mut self, name: &str, sym: SymbolRef) {
        self.top().vars.insert(name.to_string(), Binding::Var(sym));
    }

    pub fn push_typedef(&mut self, name: &str, ty: Ty) {
        self.top().vars.insert(name.to_string(), Binding::Typedef(ty));
    }

    pub fn push_tag(&mut self, name: &str, ty: Ty) {
        self.top().tags.insert(name.to_string(), ty);
    }

    /// Innermost-first linear scan; `None` if unbound anywhere.
    pub fn find_var(&self, name: &str) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|f| f.vars.get(name))
    }

    pub fn find_tag(&self, name: &str) -> Option<&Ty> {
        self.frames.iter().rev().find_map(|f| f.tags.get(name))
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Object;
    use crate::ty::int_ty;

    #[test]
    fn inner_scope_shadows_outer() {
        use std::rc::Rc;

        let mut scopes = Scopes::new();
        let outer = Object::new_var("x".into(), int_ty(), false);
        scopes.push_var("x", outer.clone());

        scopes.enter_scope();
        let inner = Object::new_var("x".into(), int_ty(), true);
        scopes.push_var("x", inner.clone());
        match scopes.find_var("x") {
            Some(Binding::Var(s)) => assert!(Rc::ptr_eq(s, &inner)),
            _ => panic!("expected a var binding"),
        }

        scopes.leave_scope();
        match scopes.find_var("x") {
            Some(Binding::Var(s)) => assert!(Rc::ptr_eq(s, &outer)),
            _ => panic!("expected a var binding"),
        }
    }

    #[test]
    fn tags_and_vars_are_independent_namespaces() {
        let mut scopes = Scopes::new();
        scopes.push_tag("Point", int_ty());
        assert!(scopes.find_var("Point").is_none());
        assert!(scopes.find_tag("Point").is_some());
    }

    #[test]
    fn global_scope_cannot_be_popped_away_entirely() {
        let scopes = Scopes::new();
        assert!(scopes.find_var("anything").is_none());
    }
}
