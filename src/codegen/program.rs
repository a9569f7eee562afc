//! Entry point: frame-size computation followed by one `.text`
//! emission pass per function (spec.md 4.F).

use crate::config::CompilerConfig;
use crate::diagnostics::CompileError;
use crate::symbol::SymbolRef;
use crate::ty;

use super::data;
use super::expr::store_param;
use super::state::{CodeGen, ARG_REGS};
use super::statements::gen_stmt;

/// Tokenize, parse, and type-check have already run; `globals` holds
/// every top-level symbol (functions and variables, in declaration
/// order) produced by [`crate::parser::parse`].
pub fn codegen_program(globals: &[SymbolRef], input_path: &str, config: &CompilerConfig) -> Result<String, CompileError> {
    assign_lvar_offsets(globals);

    let mut cg = CodeGen::new();
    if config.emit_debug_directives {
        cg.emit(&format!("  .file 1 \"{input_path}\""));
    }
    data::emit_globals(&mut cg, globals, config.data_bytes_per_line);
    cg.emit("  .text");
    for g in globals {
        let is_def = {
            let obj = g.borrow();
            obj.is_function && obj.is_definition
        };
        if is_def {
            emit_function(&mut cg, g, config)?;
        }
    }
    Ok(cg.into_output())
}

/// Assign each local (parameters first, then body locals, in
/// declaration order) a negative, alignment-respecting offset from
/// `fp`, then round the function's total frame size up to 16 bytes —
/// the RISC-V calling convention's stack alignment requirement.
fn assign_lvar_offsets(globals: &[SymbolRef]) {
    for g in globals {
        let mut obj = g.borrow_mut();
        if !obj.is_function {
            continue;
        }
        let mut offset = 0i64;
        for local in &obj.locals {
            let mut l = local.borrow_mut();
            offset += l.ty.size;
            offset = ty::round_up(offset, l.ty.align);
            l.offset = -offset;
        }
        obj.frame_size = ty::round_up(offset, 16);
    }
}

fn emit_function(cg: &mut CodeGen, sym: &SymbolRef, config: &CompilerConfig) -> Result<(), CompileError> {
    let obj = sym.borrow();
    let name = obj.name.clone();
    let frame_size = obj.frame_size;

    cg.emit(&format!("  .globl {name}"));
    cg.emit(&format!("{name}:"));
    cg.set_current_function(&name);

    // Prologue: save the caller's frame pointer and return address,
    // then carve out this function's frame.
    cg.emit("  addi sp, sp, -16");
    cg.emit("  sd ra, 8(sp)");
    cg.emit("  sd fp, 0(sp)");
    cg.emit("  mv fp, sp");
    cg.emit(&format!("  addi sp, sp, -{frame_size}"));

    for (i, p) in obj.params.iter().enumerate() {
        let p = p.borrow();
        let reg = ARG_REGS.get(i).expect("at most 6 parameters, enforced while parsing");
        store_param(cg, reg, p.offset, &p.ty);
    }

    let body = obj.body.as_ref().expect("a function definition always has a body");
    gen_stmt(cg, body)?;
    if cg.depth() != 0 {
        let msg = format!("internal error: push/pop imbalance (depth {}) while generating '{name}'", cg.depth());
        if config.panic_on_internal_error {
            panic!("{msg}");
        }
        return Err(CompileError::fatal(msg));
    }

    cg.emit(&format!(".L.return.{name}:"));
    cg.emit("  mv sp, fp");
    cg.emit("  ld fp, 0(sp)");
    cg.emit("  ld ra, 8(sp)");
    cg.emit("  addi sp, sp, 16");
    cg.emit("  ret");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::token::tokenize;

    fn compile(src: &str) -> String {
        let toks = tokenize(src).unwrap();
        let globals = parse(src, &toks).unwrap();
        codegen_program(&globals, "test.c", &CompilerConfig::new()).unwrap()
    }

    #[test]
    fn emits_globl_main_and_balanced_frame() {
        let asm = compile("int main(){ return 5*(9-6)/3 + 1; }");
        assert!(asm.contains("  .globl main"));
        assert!(asm.contains("main:"));
        assert!(asm.contains(".L.return.main:"));
    }

    #[test]
    fn frame_size_is_16_byte_aligned() {
        let asm = compile("int main(){ int a; char b; long c; return 0; }");
        let allocs: Vec<i64> = asm
            .lines()
            .filter(|l| l.trim_start().starts_with("addi sp, sp, -"))
            .map(|l| l.rsplit('-').next().unwrap().trim().parse().unwrap())
            .collect();
        // [0] is the fixed 16-byte ra/fp save area; [1] is the computed frame size.
        assert_eq!(allocs[1] % 16, 0);
    }

    #[test]
    fn recursive_call_emits_call_instruction() {
        let asm = compile("int fib(int n){ if (n<=1) return 1; return fib(n-1)+fib(n-2); } int main(){ return fib(9); }");
        assert!(asm.contains("  call fib"));
        assert!(asm.contains("  .globl fib"));
    }

    #[test]
    fn string_literal_lands_in_data_section() {
        let asm = compile(r#"int puts_like(char *s){return 0;} int main(){ return puts_like("hi"); }"#);
        assert!(asm.contains("  .data"));
        assert!(asm.lines().any(|l| l.trim_start().starts_with(".byte")));
    }

    #[test]
    fn debug_directives_are_opt_in() {
        let toks = tokenize("int main(){return 0;}").unwrap();
        let globals = parse("int main(){return 0;}", &toks).unwrap();
        let plain = codegen_program(&globals, "t.c", &CompilerConfig::new()).unwrap();
        assert!(!plain.contains(".file"));
        let with_debug = codegen_program(&globals, "t.c", &CompilerConfig::new().with_debug_directives(true)).unwrap();
        assert!(with_debug.contains(".file 1 \"t.c\""));
    }
}
