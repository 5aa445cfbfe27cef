//! Building, subsetting and writing CFF version 1 tables.
//!
//! The [`Font`] type is the owned, mutable model: it is constructed either
//! by [`Font::read`] from the bytes of an existing table or field by field,
//! transformed with [`Font::subset`], and serialized with [`Font::write`].
//! The zero-copy parsing views live in the companion `read-cff` crate.

#![deny(rustdoc::broken_intra_doc_links)]

mod encoding;
mod error;
mod font;
mod glyph;
mod index;
mod parse;
mod strings;
mod subset;
mod write;

pub mod charset;
pub mod charstring;
pub mod dict;
pub mod fd_select;
pub mod number;

pub use encoding::Encoding;
pub use error::Error;
pub use font::{CidOutlines, Font, FontInfo, Outlines, PrivateDict, SimpleOutlines, SubFont};
pub use glyph::{Command, Glyph};
pub use index::write_index;
pub use strings::StringTable;
pub use subset::SubsetMode;

/// Public re-export of the read crate.
pub use read_cff as read;

/// Public re-export of the font-types crate.
pub use font_types as types;
