//! `rvcc` — a self-contained compiler translating a C-like subset
//! straight into RISC-V 64 assembly text, through four stages that
//! share one AST/symbol model: tokenizer ([`token`]) → parser
//! ([`parser`], which also does type-checking as it builds the AST) →
//! code generator ([`codegen`]). [`driver::compile`] wires the stages
//! together; [`config::CompilerConfig`] controls the ambient,
//! non-functional knobs.
//!
//! Everything allocated while compiling one translation unit — types,
//! symbols, AST nodes — lives for the whole call and is dropped only
//! when its last reference (an `Rc`) goes away; nothing is freed
//! mid-compilation (design notes, §5/§9).

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod parser;
pub mod scope;
pub mod symbol;
pub mod token;
pub mod ty;

pub use config::CompilerConfig;
pub use diagnostics::CompileError;
pub use driver::compile;
