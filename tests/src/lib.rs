//! Behavioural tests spanning the compiler and runtime crates.

#[cfg(test)]
mod dialects;
#[cfg(test)]
mod matching;
#[cfg(test)]
mod properties;

#[cfg(test)]
mod support {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use regexpr_compiler::syntax::{Dialect, SyntaxFlags};
    use regexpr_compiler::{compile_with_dialect, CompileError};
    use regexpr_runtime::CompiledPattern;

    /// Serializes tests that read or replace the process-wide default
    /// dialect.
    static DEFAULT_SYNTAX: Mutex<()> = Mutex::new(());

    pub fn lock_default_syntax() -> MutexGuard<'static, ()> {
        DEFAULT_SYNTAX
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn compile_under(flags: SyntaxFlags, pattern: &[u8]) -> Result<CompiledPattern, CompileError> {
        let mut target = CompiledPattern::new();
        compile_with_dialect(pattern, &Dialect::new(flags), &mut target).map(|_| target)
    }
}
