//! Errors surfaced at the crate boundary.

use thiserror::Error;

/// An error raised while reading, transforming or writing a font.
#[derive(Debug, Error)]
pub enum Error {
    /// Input bytes are truncated, structurally invalid, or violate a
    /// wire-format invariant.
    #[error("malformed {section}: {source}")]
    MalformedInput {
        section: &'static str,
        #[source]
        source: read_cff::Error,
    },
    /// Input is syntactically valid but uses a feature outside the
    /// supported set.
    #[error("unsupported feature in {section}: {source}")]
    UnsupportedFeature {
        section: &'static str,
        #[source]
        source: read_cff::Error,
    },
    /// An encoded value does not fit in its wire field.
    #[error("overflow in {0}")]
    Overflow(&'static str),
    /// A requested transformation would violate a font invariant.
    #[error("inconsistent font: {0}")]
    Inconsistency(String),
    /// Evaluation of a glyph's charstring failed.
    #[error("charstring for glyph {glyph}: {source}")]
    CharstringFault {
        glyph: u32,
        #[source]
        source: read_cff::Error,
    },
}

impl Error {
    /// Wraps a read error, separating the unsupported-feature kinds from
    /// plain malformed input.
    pub(crate) fn reading(section: &'static str, source: read_cff::Error) -> Self {
        use read_cff::Error as E;
        match source {
            E::UnsupportedVersion(_)
            | E::MultipleFonts(_)
            | E::UnsupportedCharstringType(_)
            | E::ReservedFloatNibble
            | E::UnsupportedCharsetFormat(_)
            | E::UnsupportedEncodingFormat(_)
            | E::UnsupportedExpertEncoding
            | E::UnsupportedFdSelectFormat(_) => Self::UnsupportedFeature { section, source },
            _ => Self::MalformedInput { section, source },
        }
    }

    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistency(message.into())
    }
}
