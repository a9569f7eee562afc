//! The assembly writer plus the bits of mutable state a single-pass
//! emitter needs to carry between calls: the evaluation stack's
//! current depth (so every `push` has a matching `pop`, checked with
//! a `debug_assert!` at the end of each function), a label counter for
//! `if`/`for`, and the name of the function currently being emitted
//! (so `return` can jump to its epilogue label).

use std::fmt::Write as _;

/// Registers used to pass the first six integer/pointer arguments,
/// per the RISC-V calling convention (spec.md 4.F).
pub const ARG_REGS: [&str; 6] = ["a0", "a1", "a2", "a3", "a4", "a5"];

pub struct CodeGen {
    out: String,
    depth: i64,
    label_seq: u32,
    cur_fn: String,
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            out: String::new(),
            depth: 0,
            label_seq: 0,
            cur_fn: String::new(),
        }
    }

    pub fn emit(&mut self, line: &str) {
        writeln!(self.out, "{line}").expect("writing to a String never fails");
    }

    pub fn into_output(self) -> String {
        self.out
    }

    pub fn depth(&self) -> i64 {
        self.depth
    }

    pub fn set_current_function(&mut self, name: &str) {
        self.cur_fn = name.to_string();
    }

    pub fn current_function(&self) -> &str {
        &self.cur_fn
    }

    pub fn next_label(&mut self) -> u32 {
        self.label_seq += 1;
        self.label_seq
    }

    /// Push `a0` onto the evaluation stack.
    pub fn push(&mut self) {
        self.emit("  addi sp, sp, -8");
        self.emit("  sd a0, 0(sp)");
        self.depth += 1;
    }

    /// Pop the top of the evaluation stack into `reg`.
    pub fn pop(&mut self, reg: &str) {
        self.emit(&format!("  ld {reg}, 0(sp)"));
        self.emit("  addi sp, sp, 8");
        self.depth -= 1;
    }
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}
