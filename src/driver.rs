//! Pipeline orchestration: tokenize → parse → codegen. The one place
//! that knows about all three stages in order, so `main.rs` and the
//! library's integration tests have a single entry point instead of
//! having to thread tokens and the symbol table by hand.

use tracing::debug;

use crate::codegen;
use crate::config::CompilerConfig;
use crate::diagnostics::CompileError;
use crate::parser;
use crate::token;

/// Compile one translation unit, returning the generated RISC-V
/// assembly text. `input_path` is used only for diagnostics and, if
/// `config.emit_debug_directives` is set, the `.file` directive — it
/// need not be a real filesystem path (the CLI passes `-` for stdin).
pub fn compile(source: &str, input_path: &str, config: &CompilerConfig) -> Result<String, CompileError> {
    debug!(bytes = source.len(), path = input_path, "tokenizing");
    let tokens = token::tokenize(source)?;

    debug!(tokens = tokens.len(), "parsing");
    let globals = parser::parse(source, &tokens)?;

    debug!(symbols = globals.len(), "generating code");
    codegen::codegen_program(&globals, input_path, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_program() {
        let asm = compile("int main(){ return 0; }", "min.c", &CompilerConfig::new()).unwrap();
        assert!(asm.contains("  .globl main"));
    }

    #[test]
    fn propagates_tokenizer_errors() {
        let err = compile("int main(){ return 国; }", "bad.c", &CompilerConfig::new()).unwrap_err();
        assert!(err.to_string().contains("invalid character"));
    }

    #[test]
    fn propagates_parser_errors() {
        let err = compile("int main(){ return undeclared_fn(1); }", "bad.c", &CompilerConfig::new()).unwrap_err();
        assert!(err.to_string().contains("implicit declaration"));
    }
}
