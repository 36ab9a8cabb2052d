//! Per-byte character classification used by the word assertions and the
//! `\w`/`\W` class matchers.

use std::sync::OnceLock;

/// A set of syntax classes a byte may belong to. Stored in the bytecode as
/// the single operand of `SyntaxSpec` and `NotSyntaxSpec`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyntaxClass(u8);

impl SyntaxClass {
    pub const NONE: Self = Self(0);
    pub const WORD: Self = Self(1);
    pub const WHITESPACE: Self = Self(2);
    pub const DIGIT: Self = Self(4);
    pub const OCTAL_DIGIT: Self = Self(8);
    pub const HEX_DIGIT: Self = Self(16);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if the two class sets share any member class.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for SyntaxClass {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::fmt::Display for SyntaxClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(SyntaxClass, &str); 5] = [
            (SyntaxClass::WORD, "word"),
            (SyntaxClass::WHITESPACE, "whitespace"),
            (SyntaxClass::DIGIT, "digit"),
            (SyntaxClass::OCTAL_DIGIT, "octal"),
            (SyntaxClass::HEX_DIGIT, "hex"),
        ];

        let mut first = true;
        for (class, name) in NAMES {
            if self.intersects(class) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }

        if first {
            write!(f, "none")
        } else {
            Ok(())
        }
    }
}

static SYNTAX_TABLE: OnceLock<[SyntaxClass; 256]> = OnceLock::new();

fn build_syntax_table() -> [SyntaxClass; 256] {
    let mut table = [SyntaxClass::NONE; 256];

    for b in b'a'..=b'z' {
        table[b as usize] = SyntaxClass::WORD;
    }
    for b in b'A'..=b'Z' {
        table[b as usize] = SyntaxClass::WORD;
    }
    for b in b'0'..=b'9' {
        table[b as usize] = SyntaxClass::WORD | SyntaxClass::DIGIT | SyntaxClass::HEX_DIGIT;
    }
    for b in b'0'..=b'7' {
        table[b as usize] = table[b as usize] | SyntaxClass::OCTAL_DIGIT;
    }
    for b in (b'a'..=b'f').chain(b'A'..=b'F') {
        table[b as usize] = table[b as usize] | SyntaxClass::HEX_DIGIT;
    }
    table[b'_' as usize] = SyntaxClass::WORD;

    for b in 9..=13u8 {
        table[b as usize] = SyntaxClass::WHITESPACE;
    }
    table[b' ' as usize] = SyntaxClass::WHITESPACE;

    table
}

/// Returns the process-wide classification table, building it on first use.
pub fn syntax_table() -> &'static [SyntaxClass; 256] {
    SYNTAX_TABLE.get_or_init(build_syntax_table)
}

/// Returns the syntax classes of a single byte.
#[inline]
pub fn syntax_of(b: u8) -> SyntaxClass {
    syntax_table()[b as usize]
}

#[inline]
pub fn is_word(b: u8) -> bool {
    syntax_of(b).intersects(SyntaxClass::WORD)
}

/// Returns the numeric value of an ASCII hex digit.
pub fn hex_value(b: u8) -> Option<u8> {
    if !syntax_of(b).intersects(SyntaxClass::HEX_DIGIT) {
        return None;
    }

    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// A byte remapping applied to every subject byte and pattern literal
/// before comparison.
pub type TranslateTable = [u8; 256];

/// Returns the identity translation.
pub fn identity_table() -> TranslateTable {
    let mut table = [0u8; 256];
    for (idx, slot) in table.iter_mut().enumerate() {
        *slot = idx as u8;
    }
    table
}

/// Returns a translation folding ASCII upper case onto lower case, for
/// case-insensitive matching.
///
/// # Example
///
/// ```
/// use regexpr_runtime::syntax::casefold_table;
///
/// let table = casefold_table();
/// assert_eq!(b'a', table[b'A' as usize]);
/// assert_eq!(b'a', table[b'a' as usize]);
/// assert_eq!(b'[', table[b'[' as usize]);
/// ```
pub fn casefold_table() -> TranslateTable {
    let mut table = identity_table();
    for b in b'A'..=b'Z' {
        table[b as usize] = b.to_ascii_lowercase();
    }
    table
}
