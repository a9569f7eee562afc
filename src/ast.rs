//! Abstract syntax tree and the type-annotation pass (4.B's `add_type`,
//! 4.E's pointer-arithmetic dispatch) that runs as each node is built.
//!
//! Per spec.md's design notes §9 ("model as a discriminated union with
//! per-variant payloads"), `NodeKind` is a Rust enum with one variant
//! per AST node kind, carrying exactly the fields that kind uses,
//! rather than the original's single struct with a `NodeKind` tag and
//! a field grab-bag most variants leave unused.
//!
//! Every constructor here fully annotates the node's `ty` before
//! returning it, so by the time the parser has a `Node` in hand the
//! invariant "every expression node has a non-null type" already
//! holds; there's no separate post-order walk over a finished tree.

use crate::diagnostics::CompileError;
use crate::symbol::SymbolRef;
use crate::token::Token;
use crate::ty::{self, Member, Ty, TypeKind};

/// Source span carried by a node purely for diagnostics; copied out of
/// the token that introduced the node; `line` included for messages
/// that don't fall back to `CompileError`'s byte-offset rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub loc: usize,
    pub len: usize,
    pub line: usize,
}

impl From<&Token> for Span {
    fn from(t: &Token) -> Self {
        Span {
            loc: t.loc,
            len: t.len,
            line: t.line,
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// `Some` for every expression node once construction returns;
    /// `None` for the pure-statement kinds (`Return`, `If`, `For`,
    /// `Block`, `ExprStmt`), which have no value of their own.
    pub ty: Option<Ty>,
    pub span: Span,
}

#[derive(Debug)]
pub enum NodeKind {
    // --- expressions ---
    Num(i64),
    Var(SymbolRef),
    Neg(Box<Node>),
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
    Eq(Box<Node>, Box<Node>),
    Ne(Box<Node>, Box<Node>),
    Lt(Box<Node>, Box<Node>),
    Le(Box<Node>, Box<Node>),
    Assign(Box<Node>, Box<Node>),
    Addr(Box<Node>),
    Deref(Box<Node>),
    Member(Box<Node>, Member),
    Comma(Box<Node>, Box<Node>),
    Cast(Box<Node>),
    Funcall {
        name: String,
        func_ty: Ty,
        args: Vec<Node>,
    },
    /// GNU statement expression `({ ... })`: its value is the last
    /// statement, which must be an `ExprStmt`.
    StmtExpr(Vec<Node>),

    // --- statements ---
    Return(Box<Node>),
    If {
        cond: Box<Node>,
        then: Box<Node>,
        els: Option<Box<Node>>,
    },
    For {
        init: Option<Box<Node>>,
        cond: Option<Box<Node>>,
        inc: Option<Box<Node>>,
        body: Box<Node>,
    },
    Block(Vec<Node>),
    ExprStmt(Box<Node>),
}

impl Node {
    /// The node's type, for expression kinds. Panics if called on a
    /// pure-statement node — a programming error in the compiler, not
    /// a user-facing condition.
    pub fn ty(&self) -> &Ty {
        self.ty
            .as_ref()
            .expect("ty() called on a node with no type")
    }
}

fn expr(kind: NodeKind, ty: Ty, span: Span) -> Node {
    Node {
        kind,
        ty: Some(ty),
        span,
    }
}

fn stmt(kind: NodeKind, span: Span) -> Node {
    Node { kind, ty: None, span }
}

/// NUM: INT if the value fits a 32-bit signed range, else LONG.
pub fn new_num(val: i64, span: Span) -> Node {
    let ty = if val >= i32::MIN as i64 && val <= i32::MAX as i64 {
        ty::int_ty()
    } else {
        ty::long_ty()
    };
    expr(NodeKind::Num(val), ty, span)
}

/// A LONG-typed NUM literal, regardless of magnitude — used for the
/// pointee-size scale factor in pointer arithmetic (spec.md: "using a
/// LONG-typed literal"), where `new_num`'s magnitude-based INT/LONG
/// inference would otherwise pick INT for any realistic struct/array size.
fn new_long_num(val: i64, span: Span) -> Node {
    expr(NodeKind::Num(val), ty::long_ty(), span)
}

/// VAR: type of the bound symbol.
pub fn new_var(sym: SymbolRef, span: Span) -> Node {
    let ty = sym.borrow().ty.clone();
    expr(NodeKind::Var(sym), ty, span)
}

/// NEG: convert operand to `common_type(INT, operand)`.
pub fn new_neg(operand: Node, span: Span) -> Node {
    let ty = ty::common_type(&ty::int_ty(), operand.ty());
    let operand = new_cast(operand, ty.clone(), span);
    expr(NodeKind::Neg(Box::new(operand)), ty, span)
}

/// MUL/DIV: apply the usual arithmetic conversion to both operands;
/// node type is the (now-shared) operand type.
pub fn new_mul(lhs: Node, rhs: Node, span: Span) -> Node {
    let ty = ty::common_type(lhs.ty(), rhs.ty());
    let lhs = new_cast(lhs, ty.clone(), span);
    let rhs = new_cast(rhs, ty.clone(), span);
    expr(NodeKind::Mul(Box::new(lhs), Box::new(rhs)), ty, span)
}

pub fn new_div(lhs: Node, rhs: Node, span: Span) -> Node {
    let ty = ty::common_type(lhs.ty(), rhs.ty());
    let lhs = new_cast(lhs, ty.clone(), span);
    let rhs = new_cast(rhs, ty.clone(), span);
    expr(NodeKind::Div(Box::new(lhs), Box::new(rhs)), ty, span)
}

/// EQ/NE/LT/LE: usual arithmetic conversion on the operands; node type
/// is always INT.
pub fn new_eq(lhs: Node, rhs: Node, span: Span) -> Node {
    let (lhs, rhs) = convert_pair(lhs, rhs, span);
    expr(NodeKind::Eq(Box::new(lhs), Box::new(rhs)), ty::int_ty(), span)
}

pub fn new_ne(lhs: Node, rhs: Node, span: Span) -> Node {
    let (lhs, rhs) = convert_pair(lhs, rhs, span);
    expr(NodeKind::Ne(Box::new(lhs), Box::new(rhs)), ty::int_ty(), span)
}

pub fn new_lt(lhs: Node, rhs: Node, span: Span) -> Node {
    let (lhs, rhs) = convert_pair(lhs, rhs, span);
    expr(NodeKind::Lt(Box::new(lhs), Box::new(rhs)), ty::int_ty(), span)
}

pub fn new_le(lhs: Node, rhs: Node, span: Span) -> Node {
    let (lhs, rhs) = convert_pair(lhs, rhs, span);
    expr(NodeKind::Le(Box::new(lhs), Box::new(rhs)), ty::int_ty(), span)
}

fn convert_pair(lhs: Node, rhs: Node, span: Span) -> (Node, Node) {
    let ty = ty::common_type(lhs.ty(), rhs.ty());
    (new_cast(lhs, ty.clone(), span), new_cast(rhs, ty, span))
}

/// Pointer-arithmetic dispatch for `+` (4.E):
/// int+int -> ADD; int+ptr -> swap then ptr+int;
/// ptr+int -> ADD with the int scaled by the pointee size; ptr+ptr is
/// an error.
pub fn new_add(lhs: Node, rhs: Node, src: &str, span: Span) -> Result<Node, CompileError> {
    let lhs_is_num = ty::is_integer(lhs.ty());
    let rhs_is_num = ty::is_integer(rhs.ty());
    if lhs_is_num && rhs_is_num {
        return Ok(new_add_ints(lhs, rhs, span));
    }
    if lhs.ty().base().is_some() && rhs.ty().base().is_some() {
        return Err(CompileError::at(src, span.loc, "invalid operands: pointer + pointer"));
    }
    // Canonicalize to ptr + int.
    let (ptr, int) = if lhs_is_num { (rhs, lhs) } else { (lhs, rhs) };
    let base = ptr.ty().base().expect("non-pointer, non-integer operand").clone();
    let scale = new_long_num(base.size, span);
    let scaled = new_mul(int, scale, span);
    let ty = ptr.ty().clone();
    Ok(expr(NodeKind::Add(Box::new(ptr), Box::new(scaled)), ty, span))
}

/// Pointer-arithmetic dispatch for `-`: int-int -> SUB; ptr-ptr -> SUB
/// then divide by element size (result INT); ptr-int -> SUB with the
/// int scaled (result keeps the pointer type); int-ptr is an error.
pub fn new_sub(lhs: Node, rhs: Node, src: &str, span: Span) -> Result<Node, CompileError> {
    let lhs_is_num = ty::is_integer(lhs.ty());
    let rhs_is_num = ty::is_integer(rhs.ty());
    if lhs_is_num && rhs_is_num {
        return Ok(new_sub_like(lhs, rhs, span));
    }
    let lhs_base = lhs.ty().base().cloned();
    let rhs_base = rhs.ty().base().cloned();
    match (lhs_base, rhs_base) {
        (Some(base), Some(_)) => {
            let ty = lhs.ty().clone();
            let diff = expr(NodeKind::Sub(Box::new(lhs), Box::new(rhs)), ty, span);
            let scale = new_long_num(base.size, span);
            Ok(new_div(new_cast(diff, ty::long_ty(), span), scale, span))
        }
        (Some(base), None) => {
            let scale = new_long_num(base.size, span);
            let scaled = new_mul(rhs, scale, span);
            let ty = lhs.ty().clone();
            Ok(expr(NodeKind::Sub(Box::new(lhs), Box::new(scaled)), ty, span))
        }
        _ => Err(CompileError::at(src, span.loc, "invalid operands for '-'")),
    }
}

fn new_add_ints(lhs: Node, rhs: Node, span: Span) -> Node {
    // ADD follows the same usual-arithmetic-conversion rule as MUL/DIV
    // (spec.md: "node type = LHS type" after conversion).
    let ty = ty::common_type(lhs.ty(), rhs.ty());
    let lhs = new_cast(lhs, ty.clone(), span);
    let rhs = new_cast(rhs, ty.clone(), span);
    expr(NodeKind::Add(Box::new(lhs), Box::new(rhs)), ty, span)
}

fn new_sub_like(lhs: Node, rhs: Node, span: Span) -> Node {
    let ty = ty::common_type(lhs.ty(), rhs.ty());
    let lhs = new_cast(lhs, ty.clone(), span);
    let rhs = new_cast(rhs, ty.clone(), span);
    expr(NodeKind::Sub(Box::new(lhs), Box::new(rhs)), ty, span)
}

/// ASSIGN: LHS must not be an array; non-struct/union RHS is cast to
/// the LHS type. Node type is the LHS type.
pub fn new_assign(lhs: Node, rhs: Node, src: &str, span: Span) -> Result<Node, CompileError> {
    if lhs.ty().is_array() {
        return Err(CompileError::at(src, span.loc, "not an lvalue"));
    }
    let lhs_ty = lhs.ty().clone();
    let rhs = if lhs_ty.is_struct_or_union() {
        rhs
    } else {
        new_cast(rhs, lhs_ty.clone(), span)
    };
    Ok(expr(NodeKind::Assign(Box::new(lhs), Box::new(rhs)), lhs_ty, span))
}

/// ADDR: pointer to the array's element type if the operand is an
/// array (arrays decay), else a pointer to the operand's own type.
pub fn new_addr(operand: Node, span: Span) -> Node {
    let ty = match &operand.ty().kind {
        TypeKind::Array(base, _) => ty::pointer_to(base.clone()),
        _ => ty::pointer_to(operand.ty().clone()),
    };
    expr(NodeKind::Addr(Box::new(operand)), ty, span)
}

/// DEREF: the operand must carry a base type; dereferencing `void*` is
/// an error.
pub fn new_deref(operand: Node, src: &str, span: Span) -> Result<Node, CompileError> {
    let base = match operand.ty().base() {
        Some(b) => b.clone(),
        None => {
            return Err(CompileError::at(
                src,
                span.loc,
                "invalid pointer dereference of non-pointer type",
            ))
        }
    };
    if matches!(base.kind, TypeKind::Void) {
        return Err(CompileError::at(src, span.loc, "dereferencing a void pointer"));
    }
    Ok(expr(NodeKind::Deref(Box::new(operand)), base, span))
}

/// MEMBER: node type is the member's own type.
pub fn new_member(lhs: Node, member: Member, span: Span) -> Node {
    let ty = member.ty.clone();
    expr(NodeKind::Member(Box::new(lhs), member), ty, span)
}

/// COMMA: node type is the RHS type.
pub fn new_comma(lhs: Node, rhs: Node, span: Span) -> Node {
    let ty = rhs.ty().clone();
    expr(NodeKind::Comma(Box::new(lhs), Box::new(rhs)), ty, span)
}

/// Wrap `expr` in a CAST node to type `to`. A no-op cast (same type)
/// is still represented explicitly, matching the original's
/// `newCast`, so that codegen's narrowing-sequence logic has a single
/// place to look at.
pub fn new_cast(value: Node, to: Ty, span: Span) -> Node {
    expr(NodeKind::Cast(Box::new(value)), to, span)
}

/// FUNCALL: node type is the callee's return type. `func_ty` must be a
/// FUNC type; the parser is responsible for having resolved that
/// before calling this.
pub fn new_funcall(name: String, func_ty: Ty, args: Vec<Node>, span: Span) -> Node {
    let return_ty = match &func_ty.kind {
        TypeKind::Func { return_ty, .. } => return_ty.clone(),
        _ => unreachable!("new_funcall requires a FUNC type"),
    };
    expr(
        NodeKind::Funcall {
            name,
            func_ty,
            args,
        },
        return_ty,
        span,
    )
}

/// STMT_EXPR: type of the last statement's expression, which must be
/// an `ExprStmt` (a trailing `if`/`for`/`block` leaves no value).
pub fn new_stmt_expr(body: Vec<Node>, src: &str, span: Span) -> Result<Node, CompileError> {
    let ty = match body.last() {
        Some(Node {
            kind: NodeKind::ExprStmt(e),
            ..
        }) => e.ty().clone(),
        Some(_) => {
            return Err(CompileError::at(
                src,
                span.loc,
                "statement expression returning void is not supported",
            ))
        }
        None => ty::void_ty(),
    };
    Ok(expr(NodeKind::StmtExpr(body), ty, span))
}

pub fn new_return(value: Node, span: Span) -> Node {
    stmt(NodeKind::Return(Box::new(value)), span)
}

pub fn new_if(cond: Node, then: Node, els: Option<Node>, span: Span) -> Node {
    stmt(
        NodeKind::If {
            cond: Box::new(cond),
            then: Box::new(then),
            els: els.map(Box::new),
        },
        span,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn new_for(
    init: Option<Node>,
    cond: Option<Node>,
    inc: Option<Node>,
    body: Node,
    span: Span,
) -> Node {
    stmt(
        NodeKind::For {
            init: init.map(Box::new),
            cond: cond.map(Box::new),
            inc: inc.map(Box::new),
            body: Box::new(body),
        },
        span,
    )
}

pub fn new_block(body: Vec<Node>, span: Span) -> Node {
    stmt(NodeKind::Block(body), span)
}

pub fn new_expr_stmt(value: Node, span: Span) -> Node {
    stmt(NodeKind::ExprStmt(Box::new(value)), span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Object;

    fn span() -> Span {
        Span { loc: 0, len: 1, line: 1 }
    }

    #[test]
    fn num_picks_int_or_long_by_range() {
        assert_eq!(new_num(5, span()).ty().kind, TypeKind::Int);
        assert_eq!(new_num(i64::from(i32::MAX) + 1, span()).ty().kind, TypeKind::Long);
    }

    #[test]
    fn ptr_plus_int_scales_by_pointee_size_with_a_long_typed_literal() {
        let p_sym = Object::new_var("p".into(), ty::pointer_to(ty::int_ty()), true);
        let p = new_var(p_sym, span());
        let one = new_num(1, span());
        let added = new_add(p, one, "", span()).unwrap();
        assert!(added.ty().base().is_some());
        match &added.kind {
            // The scale factor is cast up to LONG by `new_mul`'s usual
            // arithmetic conversion, since it's built as a LONG literal.
            NodeKind::Add(_, rhs) => match &rhs.kind {
                NodeKind::Mul(_, scale) => assert_eq!(scale.ty().size, 8),
                _ => panic!("expected scaled rhs"),
            },
            _ => panic!("expected Add node"),
        }
    }

    #[test]
    fn ptr_minus_ptr_divides_by_element_size_and_yields_int() {
        let a = Object::new_var("a".into(), ty::pointer_to(ty::int_ty()), true);
        let b = Object::new_var("b".into(), ty::pointer_to(ty::int_ty()), true);
        let diff = new_sub(new_var(a, span()), new_var(b, span()), "", span()).unwrap();
        assert_eq!(diff.ty().kind, TypeKind::Int);
    }

    #[test]
    fn ptr_plus_ptr_is_rejected() {
        let a = Object::new_var("a".into(), ty::pointer_to(ty::int_ty()), true);
        let b = Object::new_var("b".into(), ty::pointer_to(ty::int_ty()), true);
        assert!(new_add(new_var(a, span()), new_var(b, span()), "p+p", span()).is_err());
    }

    #[test]
    fn deref_of_void_pointer_is_an_error() {
        let v = Object::new_var("v".into(), ty::pointer_to(ty::void_ty()), true);
        assert!(new_deref(new_var(v, span()), "*v", span()).is_err());
    }

    #[test]
    fn assign_to_array_is_rejected() {
        let a = Object::new_var("a".into(), ty::array_of(ty::int_ty(), 3), true);
        let rhs = new_num(1, span());
        assert!(new_assign(new_var(a, span()), rhs, "a=1", span()).is_err());
    }
}
