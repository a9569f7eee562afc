//! `.data` section emission for global variables, including the
//! anonymous string-literal globals the parser synthesizes.

use crate::symbol::SymbolRef;

use super::state::CodeGen;

pub fn emit_globals(cg: &mut CodeGen, globals: &[SymbolRef], bytes_per_line: Option<usize>) {
    for g in globals {
        let obj = g.borrow();
        if obj.is_function {
            continue;
        }
        cg.emit("  .data");
        match &obj.init_data {
            Some(bytes) => {
                cg.emit(&format!("{}:", obj.name));
                emit_bytes(cg, bytes, bytes_per_line);
            }
            None => {
                cg.emit(&format!("  .globl {}", obj.name));
                cg.emit(&format!("{}:", obj.name));
                cg.emit(&format!("  .zero {}", obj.ty.size));
            }
        }
    }
}

fn emit_bytes(cg: &mut CodeGen, bytes: &[u8], bytes_per_line: Option<usize>) {
    let chunk_size = bytes_per_line.unwrap_or(1).max(1);
    for chunk in bytes.chunks(chunk_size) {
        let values: Vec<String> = chunk.iter().map(|b| b.to_string()).collect();
        cg.emit(&format!("  .byte {}", values.join(", ")));
    }
}
