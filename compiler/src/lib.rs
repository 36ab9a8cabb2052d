//! Provides the compilation of a regular expression pattern into the
//! bytecode program executed by the `regexpr_runtime` crate.
//!
//! # Example
//!
//! ```rust
//! // Compilation of a pattern into a runnable program is accomplished by a
//! // single function exposed in the `regexpr_compiler` crate.
//! use regexpr_compiler::compile_with_dialect;
//!
//! // The pattern dialect, such as which operators need a backslash, is
//! // selected through syntax flags.
//! use regexpr_compiler::syntax::{Dialect, SyntaxFlags};
//!
//! // Evaluating a subject against a program is accomplished via the
//! // `regexpr_runtime` crate.
//! use regexpr_runtime::{search, CompiledPattern, Registers};
//!
//! let mut pattern = CompiledPattern::new();
//! compile_with_dialect(b"(l+)o", &Dialect::new(SyntaxFlags::EGREP), &mut pattern)
//!     .expect("failed to compile");
//!
//! // Searching returns the offset of the leftmost match and, when given
//! // registers, the span of each group. Register 0 spans the whole match.
//! let mut regs = Registers::new();
//! let offset = search(&pattern, b"hello\nworld", 0, 11, Some(&mut regs));
//!
//! assert_eq!(Ok(Some(2)), offset);
//! assert_eq!(Some(2..5), regs.span(0));
//! assert_eq!(Some(2..4), regs.span(1));
//! ```

pub mod bytecode;
pub mod compat;
pub mod compiler;
pub mod optimizer;
pub mod syntax;

pub use compiler::{
    compile, compile_pattern, compile_with_dialect, CompileError, CompileErrorKind, MAX_NESTING,
};
pub use syntax::{set_syntax, Dialect, SyntaxFlags};
