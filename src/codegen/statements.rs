//! Control-flow lowering: `if`, `for`/`while` (desugared to the same
//! `For` node), `block`, `return`, and the expression-statement
//! wrapper that discards `a0`. Every statement is preceded by a
//! `.loc 1 <lineno>` directive, independent of `-g`'s `.file` header.

use crate::ast::{Node, NodeKind};
use crate::diagnostics::CompileError;

use super::expr::gen_expr;
use super::state::CodeGen;

pub fn gen_stmt(cg: &mut CodeGen, node: &Node) -> Result<(), CompileError> {
    cg.emit(&format!("  .loc 1 {}", node.span.line));
    match &node.kind {
        NodeKind::ExprStmt(e) => gen_expr(cg, e),
        NodeKind::Block(stmts) => {
            for s in stmts {
                gen_stmt(cg, s)?;
            }
            Ok(())
        }
        NodeKind::Return(e) => {
            gen_expr(cg, e)?;
            cg.emit(&format!("  j .L.return.{}", cg.current_function()));
            Ok(())
        }
        NodeKind::If { cond, then, els } => {
            let n = cg.next_label();
            gen_expr(cg, cond)?;
            cg.emit(&format!("  beqz a0, .L.else.{n}"));
            gen_stmt(cg, then)?;
            cg.emit(&format!("  j .L.end.{n}"));
            cg.emit(&format!(".L.else.{n}:"));
            if let Some(e) = els {
                gen_stmt(cg, e)?;
            }
            cg.emit(&format!(".L.end.{n}:"));
            Ok(())
        }
        NodeKind::For { init, cond, inc, body } => {
            let n = cg.next_label();
            if let Some(e) = init {
                gen_expr(cg, e)?;
            }
            cg.emit(&format!(".L.begin.{n}:"));
            if let Some(c) = cond {
                gen_expr(cg, c)?;
                cg.emit(&format!("  beqz a0, .L.end.{n}"));
            }
            gen_stmt(cg, body)?;
            if let Some(e) = inc {
                gen_expr(cg, e)?;
            }
            cg.emit(&format!("  j .L.begin.{n}"));
            cg.emit(&format!(".L.end.{n}:"));
            Ok(())
        }
        NodeKind::Num(_)
        | NodeKind::Var(_)
        | NodeKind::Neg(_)
        | NodeKind::Add(..)
        | NodeKind::Sub(..)
        | NodeKind::Mul(..)
        | NodeKind::Div(..)
        | NodeKind::Eq(..)
        | NodeKind::Ne(..)
        | NodeKind::Lt(..)
        | NodeKind::Le(..)
        | NodeKind::Assign(..)
        | NodeKind::Addr(_)
        | NodeKind::Deref(_)
        | NodeKind::Member(..)
        | NodeKind::Comma(..)
        | NodeKind::Cast(_)
        | NodeKind::Funcall { .. }
        | NodeKind::StmtExpr(_) => unreachable!("expression node reached gen_stmt: {:?}", node.kind),
    }
}
