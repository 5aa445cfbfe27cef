//! Subsetting and flavor conversion.

use std::collections::HashMap;

use crate::encoding::Encoding;
use crate::error::Error;
use crate::font::{CidOutlines, Font, Outlines, SimpleOutlines, SubFont};

/// How [`Font::subset`] treats the font's flavor.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SubsetMode {
    /// Keep the source flavor.
    Preserve,
    /// Produce a simple font; converts CID-keyed sources when legal.
    ToSimple,
    /// Produce a CID-keyed font; converts simple sources.
    ToCidKeyed,
}

impl Font {
    /// Produces a new font containing the listed glyphs, in list order.
    ///
    /// The list must start with glyph 0. Private DICTs and subroutine
    /// sets are carried over unchanged; since glyphs are stored as decoded
    /// command lists, the re-encoded charstrings of the subset never call
    /// into the carried subroutines.
    pub fn subset(&self, glyph_ids: &[u16], mode: SubsetMode) -> Result<Font, Error> {
        self.validate()?;
        if glyph_ids.first() != Some(&0) {
            return Err(Error::inconsistent(
                "subset list must start with glyph 0 (.notdef)",
            ));
        }
        let mut glyphs = Vec::with_capacity(glyph_ids.len());
        for &gid in glyph_ids {
            glyphs.push(
                self.glyphs
                    .get(gid as usize)
                    .ok_or_else(|| {
                        Error::inconsistent(format!("subset references missing glyph {gid}"))
                    })?
                    .clone(),
            );
        }

        let outlines = match (&self.outlines, mode) {
            (Outlines::Simple(simple), SubsetMode::Preserve | SubsetMode::ToSimple) => {
                Outlines::Simple(subset_simple(simple, glyph_ids))
            }
            (Outlines::Simple(simple), SubsetMode::ToCidKeyed) => {
                for glyph in &mut glyphs {
                    glyph.name = None;
                }
                Outlines::Cid(simple_to_cid(simple, glyph_ids.len()))
            }
            (Outlines::Cid(cid), SubsetMode::Preserve | SubsetMode::ToCidKeyed) => {
                Outlines::Cid(subset_cid(cid, glyph_ids))
            }
            (Outlines::Cid(cid), SubsetMode::ToSimple) => {
                let (outlines, names) = cid_to_simple(cid, glyph_ids)?;
                for (glyph, name) in glyphs.iter_mut().zip(names) {
                    glyph.name = Some(name);
                }
                Outlines::Simple(outlines)
            }
        };

        let font = Font {
            name: self.name.clone(),
            info: self.info.clone(),
            glyphs,
            global_subrs: self.global_subrs.clone(),
            outlines,
        };
        font.validate()?;
        Ok(font)
    }
}

fn subset_simple(simple: &SimpleOutlines, glyph_ids: &[u16]) -> SimpleOutlines {
    let new_gid: HashMap<u16, u16> = glyph_ids
        .iter()
        .enumerate()
        .map(|(new, old)| (*old, new as u16))
        .collect();
    let mut encoding = Encoding::new();
    for (code, old_gid) in simple.encoding.mappings() {
        // Codes for dropped glyphs become unmapped.
        if let Some(gid) = new_gid.get(&old_gid) {
            encoding.set(code, *gid);
        }
    }
    SimpleOutlines {
        private: simple.private.clone(),
        encoding,
    }
}

fn simple_to_cid(simple: &SimpleOutlines, glyph_count: usize) -> CidOutlines {
    CidOutlines {
        cids: (0..glyph_count as u16).collect(),
        sub_fonts: vec![SubFont {
            font_name: None,
            font_matrix: None,
            private: simple.private.clone(),
        }],
        fd_select: vec![0; glyph_count],
        ..Default::default()
    }
}

fn subset_cid(cid: &CidOutlines, glyph_ids: &[u16]) -> CidOutlines {
    CidOutlines {
        registry: cid.registry.clone(),
        ordering: cid.ordering.clone(),
        supplement: cid.supplement,
        cid_font_version: cid.cid_font_version,
        cid_font_revision: cid.cid_font_revision,
        cid_font_type: cid.cid_font_type,
        uid_base: cid.uid_base,
        cid_count: cid.cid_count,
        cids: glyph_ids.iter().map(|gid| cid.cids[*gid as usize]).collect(),
        // Subfonts are kept as-is, so the remapped selectors stay valid.
        sub_fonts: cid.sub_fonts.clone(),
        fd_select: glyph_ids
            .iter()
            .map(|gid| cid.fd_select[*gid as usize])
            .collect(),
    }
}

/// Downconverts a CID-keyed subset to a simple font.
///
/// Legal only when one private DICT covers every retained glyph and the
/// retained CIDs are the identity mapping. Glyph names are synthesized
/// deterministically: `.notdef` for glyph 0 and `cidNNNNN` otherwise.
fn cid_to_simple(
    cid: &CidOutlines,
    glyph_ids: &[u16],
) -> Result<(SimpleOutlines, Vec<String>), Error> {
    let fd = cid.fd_select[0];
    if glyph_ids.iter().any(|gid| cid.fd_select[*gid as usize] != fd) {
        return Err(Error::inconsistent(
            "cannot convert to simple: retained glyphs span multiple private DICTs",
        ));
    }
    if glyph_ids.iter().any(|gid| cid.cids[*gid as usize] != *gid) {
        return Err(Error::inconsistent(
            "cannot convert to simple: retained CIDs are not the identity mapping",
        ));
    }
    let names = glyph_ids
        .iter()
        .map(|gid| {
            if *gid == 0 {
                ".notdef".to_owned()
            } else {
                format!("cid{:05}", cid.cids[*gid as usize])
            }
        })
        .collect();
    Ok((
        SimpleOutlines {
            private: cid.sub_fonts[fd as usize].private.clone(),
            encoding: Encoding::new(),
        },
        names,
    ))
}
