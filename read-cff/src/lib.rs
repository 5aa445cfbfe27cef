//! Parsing CFF version 1 tables.
//!
//! Everything in this crate is a zero-copy view over a borrowed byte slice
//! containing a single CFF table. The companion `write-cff` crate owns the
//! mutable font model and the serializers.

#![deny(rustdoc::broken_intra_doc_links)]

mod charset;
mod data;
mod encoding;
mod error;
mod fd_select;
mod index;
mod stack;
mod string;
mod table;

pub mod charstring;
pub mod dict;

pub use charset::{Charset, CharsetIter, CharsetKind};
pub use data::{Cursor, FontData};
pub use encoding::{Encoding, EncodingKind, SupplementIter, STANDARD_ENCODING};
pub use error::{Error, ReadError};
pub use fd_select::FdSelect;
pub use index::Index;
pub use stack::{Number, Stack};
pub use string::{Latin1String, StringId, STANDARD_STRINGS};
pub use table::{Cff, Header};

/// Public re-export of the font-types crate.
pub use font_types as types;
