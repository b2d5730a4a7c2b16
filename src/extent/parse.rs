// Extent-string grammar.
//
// A specification is a non-empty, comma-separated list of `offset:length`
// pairs with no whitespace: `offset = "-"? digit+`, `length = digit+`.
// A negative offset (canonically -1) denotes a sparse extent. Extents are
// kept exactly as written; nothing is coalesced or reordered.

use std::num::IntErrorKind;

use super::Extent;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentParseError {
    /// The pair at this index violates the grammar.
    BadGrammar { pair: usize },
    /// A numeric literal in the pair at this index does not fit an i64.
    Overflow { pair: usize },
    /// The pair at this index has a zero length.
    ZeroLength { pair: usize },
}

impl std::fmt::Display for ExtentParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadGrammar { pair } => write!(f, "malformed extent pair #{pair}"),
            Self::Overflow { pair } => write!(f, "extent pair #{pair} overflows 64 bits"),
            Self::ZeroLength { pair } => write!(f, "extent pair #{pair} has zero length"),
        }
    }
}

impl std::error::Error for ExtentParseError {}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parses an extent specification such as `0:100,-1:50,200:25`.
///
/// The empty string is rejected; callers only supply a specification when
/// extents are in use.
pub fn parse_extents(spec: &str) -> Result<Vec<Extent>, ExtentParseError> {
    if spec.is_empty() {
        return Err(ExtentParseError::BadGrammar { pair: 0 });
    }
    spec.split(',')
        .enumerate()
        .map(|(pair, text)| parse_pair(pair, text))
        .collect()
}

fn parse_pair(pair: usize, text: &str) -> Result<Extent, ExtentParseError> {
    let (offset_text, length_text) = text
        .split_once(':')
        .ok_or(ExtentParseError::BadGrammar { pair })?;

    let offset = parse_literal(pair, offset_text, true)?;
    let length = parse_literal(pair, length_text, false)?;
    if length == 0 {
        return Err(ExtentParseError::ZeroLength { pair });
    }
    Ok(Extent::new(offset, length as u64))
}

/// Parses one numeric literal, enforcing the `"-"? digit+` shape before
/// handing off to the integer parser (which would also accept `+` signs
/// and rejects nothing we allow).
fn parse_literal(pair: usize, text: &str, signed: bool) -> Result<i64, ExtentParseError> {
    let digits = match text.strip_prefix('-') {
        Some(rest) if signed => rest,
        Some(_) => return Err(ExtentParseError::BadGrammar { pair }),
        None => text,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExtentParseError::BadGrammar { pair });
    }
    text.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            ExtentParseError::Overflow { pair }
        }
        _ => ExtentParseError::BadGrammar { pair },
    })
}
