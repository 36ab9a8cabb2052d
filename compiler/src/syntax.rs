//! Syntax flags and the operator tables derived from them.
//!
//! A [Dialect] resolves every pattern byte to a [Role], once for bytes
//! appearing on their own and once for bytes following a backslash, and
//! assigns each role a precedence level.

use std::sync::{PoisonError, RwLock};

/// A set of syntax flag bits selecting a pattern dialect.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SyntaxFlags(u32);

impl SyntaxFlags {
    /// `(` and `)` group without a backslash.
    pub const NO_BK_PARENS: Self = Self(1);
    /// `|` alternates without a backslash.
    pub const NO_BK_VBAR: Self = Self(2);
    /// `\+` and `\?` are operators while `+` and `?` are literals.
    pub const BK_PLUS_QM: Self = Self(4);
    /// `|` binds tighter than `^` and `$`.
    pub const TIGHT_VBAR: Self = Self(8);
    /// A newline alternates like `|`.
    pub const NEWLINE_OR: Self = Self(16);
    /// Misplaced operators are errors instead of literals.
    pub const CONTEXT_INDEP_OPS: Self = Self(32);
    /// Enables `\n`, `\t`, `\xHH` style escapes and `\vNN` backreferences.
    pub const ANSI_HEX: Self = Self(64);
    /// Disables `\w \W \< \> \b \B` and the buffer anchors.
    pub const NO_GNU_EXTENSIONS: Self = Self(128);

    pub const EMACS: Self = Self(0);
    pub const AWK: Self = Self(
        Self::NO_BK_PARENS.0 | Self::NO_BK_VBAR.0 | Self::CONTEXT_INDEP_OPS.0,
    );
    pub const EGREP: Self = Self(Self::AWK.0 | Self::NEWLINE_OR.0);
    pub const GREP: Self = Self(Self::BK_PLUS_QM.0 | Self::NEWLINE_OR.0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for SyntaxFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// The syntactic meaning of a pattern byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    End,
    Normal,
    AnyChar,
    Quote,
    Bol,
    Eol,
    Optional,
    Star,
    Plus,
    Or,
    OpenPar,
    ClosePar,
    Memory,
    ExtendedMemory,
    OpenSet,
    BegBuf,
    EndBuf,
    WordChar,
    NotWordChar,
    WordBeg,
    WordEnd,
    WordBound,
    NotWordBound,
}

const ROLE_COUNT: usize = Role::NotWordBound as usize + 1;

/// The number of precedence levels.
pub const NUM_LEVELS: usize = 5;

const DEFAULT_PRECEDENCE: u8 = 4;

/// Resolved operator tables for one set of syntax flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    flags: SyntaxFlags,
    plain: [Role; 256],
    quoted: [Role; 256],
    precedence: [u8; ROLE_COUNT],
}

impl Default for Dialect {
    fn default() -> Self {
        Self::new(SyntaxFlags::EMACS)
    }
}

impl Dialect {
    /// Derives the operator tables for a set of flags.
    pub const fn new(flags: SyntaxFlags) -> Self {
        let mut plain = [Role::Normal; 256];
        let mut quoted = [Role::Normal; 256];
        let mut precedence = [DEFAULT_PRECEDENCE; ROLE_COUNT];

        let mut digit = b'0';
        while digit <= b'9' {
            quoted[digit as usize] = Role::Memory;
            digit += 1;
        }

        plain[b'\\' as usize] = Role::Quote;

        if flags.contains(SyntaxFlags::NO_BK_PARENS) {
            plain[b'(' as usize] = Role::OpenPar;
            plain[b')' as usize] = Role::ClosePar;
        } else {
            quoted[b'(' as usize] = Role::OpenPar;
            quoted[b')' as usize] = Role::ClosePar;
        }

        if flags.contains(SyntaxFlags::NO_BK_VBAR) {
            plain[b'|' as usize] = Role::Or;
        } else {
            quoted[b'|' as usize] = Role::Or;
        }

        plain[b'*' as usize] = Role::Star;
        if flags.contains(SyntaxFlags::BK_PLUS_QM) {
            quoted[b'+' as usize] = Role::Plus;
            quoted[b'?' as usize] = Role::Optional;
        } else {
            plain[b'+' as usize] = Role::Plus;
            plain[b'?' as usize] = Role::Optional;
        }

        if flags.contains(SyntaxFlags::NEWLINE_OR) {
            plain[b'\n' as usize] = Role::Or;
        }

        plain[b'[' as usize] = Role::OpenSet;
        plain[b'^' as usize] = Role::Bol;
        plain[b'$' as usize] = Role::Eol;
        plain[b'.' as usize] = Role::AnyChar;

        if !flags.contains(SyntaxFlags::NO_GNU_EXTENSIONS) {
            quoted[b'w' as usize] = Role::WordChar;
            quoted[b'W' as usize] = Role::NotWordChar;
            quoted[b'<' as usize] = Role::WordBeg;
            quoted[b'>' as usize] = Role::WordEnd;
            quoted[b'b' as usize] = Role::WordBound;
            quoted[b'B' as usize] = Role::NotWordBound;
            quoted[b'`' as usize] = Role::BegBuf;
            quoted[b'\'' as usize] = Role::EndBuf;
        }

        if flags.contains(SyntaxFlags::ANSI_HEX) {
            quoted[b'v' as usize] = Role::ExtendedMemory;
        }

        precedence[Role::End as usize] = 0;
        precedence[Role::ClosePar as usize] = 1;
        if flags.contains(SyntaxFlags::TIGHT_VBAR) {
            precedence[Role::Or as usize] = 3;
            precedence[Role::Bol as usize] = 2;
            precedence[Role::Eol as usize] = 2;
        } else {
            precedence[Role::Or as usize] = 2;
            precedence[Role::Bol as usize] = 3;
            precedence[Role::Eol as usize] = 3;
        }

        Self {
            flags,
            plain,
            quoted,
            precedence,
        }
    }

    pub const fn flags(&self) -> SyntaxFlags {
        self.flags
    }

    /// Returns the role of an unescaped byte.
    #[inline]
    pub const fn plain_role(&self, b: u8) -> Role {
        self.plain[b as usize]
    }

    /// Returns the role of a byte following a backslash.
    #[inline]
    pub const fn quoted_role(&self, b: u8) -> Role {
        self.quoted[b as usize]
    }

    #[inline]
    pub const fn precedence(&self, role: Role) -> usize {
        self.precedence[role as usize] as usize
    }

    pub const fn has(&self, flag: SyntaxFlags) -> bool {
        self.flags.contains(flag)
    }
}

/// The dialect used by the boundary functions that don't take one
/// explicitly.
static DEFAULT_DIALECT: RwLock<Dialect> = RwLock::new(Dialect::new(SyntaxFlags::EMACS));

/// Replaces the process-wide default dialect, returning the previous flags.
///
/// # Example
///
/// ```
/// use regexpr_compiler::syntax::{default_dialect, set_syntax, SyntaxFlags};
///
/// let previous = set_syntax(SyntaxFlags::EGREP);
/// assert_eq!(SyntaxFlags::EGREP, default_dialect().flags());
///
/// set_syntax(previous);
/// ```
pub fn set_syntax(flags: SyntaxFlags) -> SyntaxFlags {
    let mut dialect = DEFAULT_DIALECT
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let previous = dialect.flags();
    *dialect = Dialect::new(flags);
    previous
}

/// Returns a copy of the process-wide default dialect.
pub fn default_dialect() -> Dialect {
    *DEFAULT_DIALECT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
}
