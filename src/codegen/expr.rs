//! Expression evaluation: every node here leaves its value in `a0`.
//! `gen_addr` is the lvalue half — it leaves an *address* in `a0`
//! instead, used by `Assign`, `Addr`, and as the first step of loading
//! a `Var`/`Member`/`Deref`.

use crate::ast::Node;
use crate::ast::NodeKind;
use crate::diagnostics::CompileError;
use crate::ty::{Ty, TypeKind};

use super::state::{CodeGen, ARG_REGS};
use super::statements;

/// Compute the address of an lvalue into `a0`. Only `Var`, `Deref`,
/// `Member`, and `Comma` (whose address is its RHS's address) can
/// reach here — the parser (`ast::new_assign`/`new_addr`) is
/// responsible for rejecting every other expression as a non-lvalue
/// before codegen ever sees it.
pub fn gen_addr(cg: &mut CodeGen, node: &Node) -> Result<(), CompileError> {
    match &node.kind {
        NodeKind::Var(sym) => {
            let obj = sym.borrow();
            if obj.is_local {
                cg.emit(&format!("  addi a0, fp, {}", obj.offset));
            } else {
                cg.emit(&format!("  la a0, {}", obj.name));
            }
            Ok(())
        }
        NodeKind::Deref(operand) => gen_expr(cg, operand),
        NodeKind::Member(lhs, member) => {
            gen_addr(cg, lhs)?;
            cg.emit(&format!("  addi a0, a0, {}", member.offset));
            Ok(())
        }
        NodeKind::Comma(lhs, rhs) => {
            gen_expr(cg, lhs)?;
            gen_addr(cg, rhs)
        }
        _ => unreachable!("gen_addr called on a non-lvalue node: {:?}", node.kind),
    }
}

fn load(cg: &mut CodeGen, ty: &Ty) {
    // Arrays, structs, and unions decay to their own address; there is
    // nothing to load into a register.
    if ty.is_array() || ty.is_struct_or_union() {
        return;
    }
    let insn = match ty.kind {
        TypeKind::Char => "lb",
        TypeKind::Short => "lh",
        TypeKind::Int => "lw",
        _ => "ld",
    };
    cg.emit(&format!("  {insn} a0, 0(a0)"));
}

/// Store `a0` at the address in `a1`.
fn store(cg: &mut CodeGen, ty: &Ty) {
    if ty.is_struct_or_union() {
        // Struct/union assignment by value is rejected at parse time
        // (spec.md 4.E); codegen never sees one.
        unreachable!("struct/union assignment should have been rejected while parsing");
    }
    let insn = match ty.kind {
        TypeKind::Char => "sb",
        TypeKind::Short => "sh",
        TypeKind::Int => "sw",
        _ => "sd",
    };
    cg.emit(&format!("  {insn} a1, 0(a0)"));
}

/// Spill an incoming argument register straight to its parameter's
/// stack slot, during the function prologue.
pub fn store_param(cg: &mut CodeGen, reg: &str, offset: i64, ty: &Ty) {
    let insn = match ty.kind {
        TypeKind::Char => "sb",
        TypeKind::Short => "sh",
        TypeKind::Int => "sw",
        _ => "sd",
    };
    cg.emit(&format!("  {insn} {reg}, {offset}(fp)"));
}

fn width_suffix(ty: &Ty) -> &'static str {
    if ty.size == 8 {
        ""
    } else {
        "w"
    }
}

/// Sign-extending narrowing sequence for a CAST node, picked by the
/// target type's size; casting to VOID or to LONG/PTR-width is a no-op.
fn emit_cast(cg: &mut CodeGen, to: &Ty) {
    if matches!(to.kind, TypeKind::Void) {
        return;
    }
    let shift = match to.size {
        1 => Some(56),
        2 => Some(48),
        4 => Some(32),
        _ => None,
    };
    if let Some(n) = shift {
        cg.emit(&format!("  slli a0, a0, {n}"));
        cg.emit(&format!("  srai a0, a0, {n}"));
    }
}

pub fn gen_expr(cg: &mut CodeGen, node: &Node) -> Result<(), CompileError> {
    match &node.kind {
        NodeKind::Num(v) => {
            cg.emit(&format!("  li a0, {v}"));
            Ok(())
        }
        NodeKind::Var(_) | NodeKind::Member(..) => {
            gen_addr(cg, node)?;
            load(cg, node.ty());
            Ok(())
        }
        NodeKind::Deref(operand) => {
            gen_expr(cg, operand)?;
            load(cg, node.ty());
            Ok(())
        }
        NodeKind::Addr(operand) => gen_addr(cg, operand),
        NodeKind::Assign(lhs, rhs) => {
            gen_addr(cg, lhs)?;
            cg.push();
            gen_expr(cg, rhs)?;
            cg.pop("a1");
            store(cg, lhs.ty());
            Ok(())
        }
        NodeKind::Neg(operand) => {
            gen_expr(cg, operand)?;
            cg.emit(&format!("  neg{} a0, a0", width_suffix(node.ty())));
            Ok(())
        }
        NodeKind::Add(l, r) => binary(cg, l, r, &format!("add{}", width_suffix(node.ty()))),
        NodeKind::Sub(l, r) => binary(cg, l, r, &format!("sub{}", width_suffix(node.ty()))),
        NodeKind::Mul(l, r) => binary(cg, l, r, &format!("mul{}", width_suffix(node.ty()))),
        NodeKind::Div(l, r) => binary(cg, l, r, &format!("div{}", width_suffix(node.ty()))),
        NodeKind::Eq(l, r) => {
            binary(cg, l, r, "xor")?;
            cg.emit("  seqz a0, a0");
            Ok(())
        }
        NodeKind::Ne(l, r) => {
            binary(cg, l, r, "xor")?;
            cg.emit("  snez a0, a0");
            Ok(())
        }
        NodeKind::Lt(l, r) => binary(cg, l, r, "slt"),
        NodeKind::Le(l, r) => {
            // lhs <= rhs  <=>  !(rhs < lhs)
            gen_expr(cg, r)?;
            cg.push();
            gen_expr(cg, l)?;
            cg.pop("a1"); // a1 = rhs, a0 = lhs
            cg.emit("  slt a0, a1, a0"); // a0 = (rhs < lhs)
            cg.emit("  xori a0, a0, 1");
            Ok(())
        }
        NodeKind::Comma(l, r) => {
            gen_expr(cg, l)?;
            gen_expr(cg, r)
        }
        NodeKind::Cast(operand) => {
            gen_expr(cg, operand)?;
            emit_cast(cg, node.ty());
            Ok(())
        }
        NodeKind::Funcall { name, args, .. } => {
            if args.len() > ARG_REGS.len() {
                unreachable!("calls with more than 6 arguments are rejected while parsing");
            }
            for arg in args {
                gen_expr(cg, arg)?;
                cg.push();
            }
            for reg in ARG_REGS.iter().take(args.len()).rev() {
                cg.pop(reg);
            }
            cg.emit(&format!("  call {name}"));
            Ok(())
        }
        NodeKind::StmtExpr(body) => {
            let Some((last, init)) = body.split_last() else {
                return Ok(());
            };
            for s in init {
                statements::gen_stmt(cg, s)?;
            }
            match &last.kind {
                NodeKind::ExprStmt(e) => gen_expr(cg, e),
                _ => statements::gen_stmt(cg, last),
            }
        }
        NodeKind::Return(_) | NodeKind::If { .. } | NodeKind::For { .. } | NodeKind::Block(_) | NodeKind::ExprStmt(_) => {
            unreachable!("statement node reached gen_expr: {:?}", node.kind)
        }
    }
}

/// Lowers RHS first, pushing its value; then LHS, left in `a0`; then
/// pops RHS back into `a1`, so `a0` and `a1` hold LHS and RHS
/// respectively once the operator instruction runs.
fn binary(cg: &mut CodeGen, lhs: &Node, rhs: &Node, op: &str) -> Result<(), CompileError> {
    gen_expr(cg, rhs)?;
    cg.push();
    gen_expr(cg, lhs)?;
    cg.pop("a1");
    cg.emit(&format!("  {op} a0, a0, a1"));
    Ok(())
}
