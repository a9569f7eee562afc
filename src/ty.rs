//! Type model — 4.B
//!
//! Types form a DAG (a struct's members reference other types; a
//! pointer's base may itself be a pointer) that is built once during
//! parsing and never mutated afterward. `Rc<Type>` is the idiomatic
//! stand-in for the arena-allocated, never-freed `Type*` of the
//! original: cheap to clone, naturally shared (every `int` variable
//! points at an equivalent but independently-built `Type`, exactly as
//! the C version allocates a fresh one per call), and with no cycle
//! that would need a `Weak` to break (design notes §9).

use std::rc::Rc;

pub type Ty = Rc<Type>;

/// A struct/union field: name, type, and byte offset within the
/// aggregate (always 0 for union members).
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: Ty,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Void,
    Char,
    Short,
    Int,
    Long,
    Ptr(Ty),
    Func { return_ty: Ty, params: Vec<Ty> },
    Array(Ty, usize),
    Struct(Rc<Vec<Member>>),
    Union(Rc<Vec<Member>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub kind: TypeKind,
    pub size: i64,
    pub align: i64,
}

fn mk(kind: TypeKind, size: i64, align: i64) -> Ty {
    Rc::new(Type { kind, size, align })
}

pub fn void_ty() -> Ty {
    mk(TypeKind::Void, 1, 1)
}
pub fn char_ty() -> Ty {
    mk(TypeKind::Char, 1, 1)
}
pub fn short_ty() -> Ty {
    mk(TypeKind::Short, 2, 2)
}
pub fn int_ty() -> Ty {
    mk(TypeKind::Int, 4, 4)
}
pub fn long_ty() -> Ty {
    mk(TypeKind::Long, 8, 8)
}

pub fn is_integer(t: &Ty) -> bool {
    matches!(
        t.kind,
        TypeKind::Char | TypeKind::Short | TypeKind::Int | TypeKind::Long
    )
}

impl Type {
    /// PTR and ARRAY both have an element/pointee type; everything
    /// else doesn't. Used by pointer-arithmetic dispatch and by
    /// `common_type`.
    pub fn base(&self) -> Option<&Ty> {
        match &self.kind {
            TypeKind::Ptr(b) => Some(b),
            TypeKind::Array(b, _) => Some(b),
            _ => None,
        }
    }

    pub fn is_struct_or_union(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_) | TypeKind::Union(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(..))
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, TypeKind::Func { .. })
    }

    pub fn members(&self) -> Option<&[Member]> {
        match &self.kind {
            TypeKind::Struct(m) | TypeKind::Union(m) => Some(m),
            _ => None,
        }
    }

    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.members()?.iter().find(|m| m.name == name)
    }
}

pub fn pointer_to(base: Ty) -> Ty {
    mk(TypeKind::Ptr(base), 8, 8)
}

pub fn func_type(return_ty: Ty, params: Vec<Ty>) -> Ty {
    mk(TypeKind::Func { return_ty, params }, 1, 1)
}

pub fn array_of(base: Ty, len: usize) -> Ty {
    let size = base.size * len as i64;
    let align = base.align;
    mk(TypeKind::Array(base, len), size, align)
}

/// Shallow clone, preserved from the original's `copyType` (used there
/// to thread a parameter type through the function type's linked
/// list). Kept for parity; our `Vec<Ty>`-based `Func::params` doesn't
/// strictly need it, but callers use it when a type needs to be
/// duplicated before it's folded into a new compound type.
pub fn copy_type(t: &Ty) -> Ty {
    Rc::new((**t).clone())
}

/// The "usual arithmetic conversion", simplified per spec.md to a
/// pointer/LONG/INT choice: if either operand carries a base type
/// (pointer or array), the result is a pointer to that base; else if
/// either side is 8 bytes, LONG; otherwise INT.
pub fn common_type(a: &Ty, b: &Ty) -> Ty {
    if let Some(base) = a.base() {
        return pointer_to(base.clone());
    }
    if a.size == 8 || b.size == 8 {
        long_ty()
    } else {
        int_ty()
    }
}

pub fn round_up(n: i64, align: i64) -> i64 {
    (n + align - 1) / align * align
}

/// Lay out a struct: iterate members in declaration order, round the
/// running offset up to each member's alignment, then advance by its
/// size. Final size is rounded up to the struct's own alignment (the
/// max member alignment).
pub fn struct_type(raw_members: Vec<(String, Ty)>) -> Ty {
    let mut offset = 0i64;
    let mut align = 1i64;
    let mut members = Vec::with_capacity(raw_members.len());
    for (name, mty) in raw_members {
        offset = round_up(offset, mty.align);
        align = align.max(mty.align);
        members.push(Member {
            name,
            offset,
            ty: mty.clone(),
        });
        offset += mty.size;
    }
    let size = round_up(offset, align);
    mk(TypeKind::Struct(Rc::new(members)), size, align)
}

/// Lay out a union: every member sits at offset 0; size is the
/// largest member, rounded up to the max member alignment.
pub fn union_type(raw_members: Vec<(String, Ty)>) -> Ty {
    let mut align = 1i64;
    let mut size = 0i64;
    let mut members = Vec::with_capacity(raw_members.len());
    for (name, mty) in raw_members {
        align = align.max(mty.align);
        size = size.max(mty.size);
        members.push(Member {
            name,
            offset: 0,
            ty: mty,
        });
    }
    let size = round_up(size, align);
    mk(TypeKind::Union(Rc::new(members)), size, align)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_to_is_always_8_bytes() {
        let p = pointer_to(char_ty());
        assert_eq!(p.size, 8);
        assert_eq!(p.align, 8);
    }

    #[test]
    fn array_size_is_element_size_times_len() {
        let a = array_of(int_ty(), 3);
        assert_eq!(a.size, 12);
        assert_eq!(a.align, 4);
    }

    #[test]
    fn struct_layout_respects_alignment() {
        // struct { char a; int b; } -> a@0, pad to 4, b@4, size 8.
        let s = struct_type(vec![("a".into(), char_ty()), ("b".into(), int_ty())]);
        let members = s.members().unwrap();
        assert_eq!(members[0].offset, 0);
        assert_eq!(members[1].offset, 4);
        assert_eq!(s.size, 8);
        assert_eq!(s.align, 4);
    }

    #[test]
    fn union_size_is_max_member_rounded_to_align() {
        // union { int a; char b[4]; } -> size 4, align 4.
        let u = union_type(vec![("a".into(), int_ty()), ("b".into(), array_of(char_ty(), 4))]);
        assert_eq!(u.size, 4);
        assert_eq!(u.align, 4);
        assert!(u.members().unwrap().iter().all(|m| m.offset == 0));
    }

    #[test]
    fn common_type_prefers_pointer_base() {
        let p = pointer_to(int_ty());
        let c = common_type(&p, &int_ty());
        assert_eq!(c.base().unwrap().kind, TypeKind::Int);
    }

    #[test]
    fn common_type_promotes_to_long_when_either_side_is_8_bytes() {
        assert_eq!(common_type(&long_ty(), &int_ty()).kind, TypeKind::Long);
        assert_eq!(common_type(&int_ty(), &int_ty()).kind, TypeKind::Int);
    }
}
