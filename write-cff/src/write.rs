//! Serializing the font model, with fix-point offset resolution.
//!
//! Several top DICT operators hold byte offsets of later sections, and the
//! integer encoding of an offset changes size with its value. The writer
//! therefore starts with zero offsets and re-encodes the offset-bearing
//! DICTs until a full pass changes nothing. Offsets only ever grow, so the
//! loop converges; a handful of passes covers every operand width.

use read_cff::dict::Operator;
use read_cff::STANDARD_ENCODING;

use crate::charset::encode_charset;
use crate::charstring::encode_charstring;
use crate::dict::{Dict, Operand};
use crate::encoding::Encoding;
use crate::error::Error;
use crate::fd_select::encode_fd_select;
use crate::font::{number_operand, Font, Outlines, DEFAULT_FONT_MATRIX};
use crate::index::write_index;
use crate::strings::StringTable;

const MAX_FIX_POINT_PASSES: usize = 8;
const HEADER_LEN: usize = 4;

impl Font {
    /// Serializes the font as a self-contained CFF 1 table.
    pub fn write(&self) -> Result<Vec<u8>, Error> {
        self.validate()?;
        log::debug!(
            "writing table for {:?}: {} glyphs, {}",
            self.name,
            self.glyphs.len(),
            if self.is_cid_keyed() {
                "CID-keyed"
            } else {
                "simple"
            }
        );
        match &self.outlines {
            Outlines::Simple(_) => self.write_simple(),
            Outlines::Cid(_) => self.write_cid(),
        }
    }

    fn write_simple(&self) -> Result<Vec<u8>, Error> {
        let Outlines::Simple(simple) = &self.outlines else {
            unreachable!()
        };
        let mut strings = StringTable::new();

        // Glyph SIDs drive the charset and any encoding supplements.
        // Interned first so their identifiers do not depend on the
        // metadata strings.
        let mut sids = vec![0u16];
        for (gid, glyph) in self.glyphs.iter().enumerate().skip(1) {
            let name = glyph
                .name
                .as_deref()
                .ok_or_else(|| Error::inconsistent(format!("glyph {gid} has no name")))?;
            sids.push(strings.lookup(name)?.to_u16());
        }
        let top_template = self.top_dict_template();
        // Interning pass; the bytes are rebuilt once offsets are known.
        top_template.encode(&mut strings)?;
        let string_index = write_index(&strings.custom_bytes())?;

        let name_index = write_index(&[self.name.as_bytes()])?;
        let gsubr_index = write_index(&self.global_subrs)?;
        let charstrings_index = self.encode_charstrings()?;

        // An identity mapping within the ISOAdobe range needs no charset
        // at all: offset 0 selects the predefined identity.
        let is_identity = sids.iter().enumerate().all(|(gid, sid)| *sid as usize == gid);
        let charset_bytes = if is_identity && sids.len() <= 229 {
            None
        } else {
            Some(encode_charset(&sids)?)
        };
        let encoding_bytes = if is_standard_encoding(&simple.encoding, &sids) {
            None
        } else {
            Some(simple.encoding.encode(&sids)?)
        };
        let local_subr_index = (!simple.private.local_subrs.is_empty())
            .then(|| write_index(&simple.private.local_subrs))
            .transpose()?;

        let mut top_index_bytes = Vec::new();
        let mut private_bytes = Vec::new();
        for pass in 0..MAX_FIX_POINT_PASSES {
            // The local subr INDEX sits directly after the private DICT,
            // so the subrs operator holds the DICT's own length.
            let subrs_offset = match &local_subr_index {
                Some(_) => Some(dict_offset(private_bytes.len())?),
                None => None,
            };
            let new_private = simple
                .private
                .to_dict(subrs_offset)
                .encode(&mut strings)?;

            let mut offset = HEADER_LEN
                + name_index.len()
                + top_index_bytes.len()
                + string_index.len()
                + gsubr_index.len();
            let encoding_offset = encoding_bytes.as_ref().map(|bytes| {
                let at = offset;
                offset += bytes.len();
                at
            });
            let charset_offset = charset_bytes.as_ref().map(|bytes| {
                let at = offset;
                offset += bytes.len();
                at
            });
            let charstrings_offset = offset;
            offset += charstrings_index.len();
            let private_offset = offset;

            let mut top = top_template.clone();
            if let Some(at) = encoding_offset {
                top.set_int(Operator::Encoding, dict_offset(at)?);
            }
            if let Some(at) = charset_offset {
                top.set_int(Operator::Charset, dict_offset(at)?);
            }
            top.set_int(Operator::Charstrings, dict_offset(charstrings_offset)?);
            top.set(
                Operator::Private,
                vec![
                    Operand::Int(new_private.len() as i32),
                    Operand::Int(dict_offset(private_offset)?),
                ],
            );
            let new_top_index = write_index(&[top.encode(&mut strings)?])?;

            let converged = new_top_index == top_index_bytes && new_private == private_bytes;
            log::trace!(
                "pass {pass}: top DICT INDEX {} bytes, private DICT {} bytes",
                new_top_index.len(),
                new_private.len()
            );
            top_index_bytes = new_top_index;
            private_bytes = new_private;
            if converged {
                let sections = [
                    Some(name_index.as_slice()),
                    Some(top_index_bytes.as_slice()),
                    Some(string_index.as_slice()),
                    Some(gsubr_index.as_slice()),
                    encoding_bytes.as_deref(),
                    charset_bytes.as_deref(),
                    Some(charstrings_index.as_slice()),
                    Some(private_bytes.as_slice()),
                    local_subr_index.as_deref(),
                ];
                return assemble(&sections);
            }
        }
        Err(Error::inconsistent("section offsets failed to converge"))
    }

    fn write_cid(&self) -> Result<Vec<u8>, Error> {
        let Outlines::Cid(cid) = &self.outlines else {
            unreachable!()
        };
        let mut strings = StringTable::new();
        let top_template = self.top_dict_template();
        top_template.encode(&mut strings)?;
        let fd_templates: Vec<Dict> = cid
            .sub_fonts
            .iter()
            .map(|sub_font| {
                let mut dict = Dict::new();
                if let Some(name) = &sub_font.font_name {
                    dict.set_str(Operator::FontName, name);
                }
                if let Some(matrix) = sub_font.font_matrix {
                    dict.set(
                        Operator::FontMatrix,
                        matrix.iter().map(|v| number_operand(*v)).collect(),
                    );
                }
                dict
            })
            .collect();
        for template in &fd_templates {
            template.encode(&mut strings)?;
        }
        let string_index = write_index(&strings.custom_bytes())?;

        let name_index = write_index(&[self.name.as_bytes()])?;
        let gsubr_index = write_index(&self.global_subrs)?;
        let charstrings_index = self.encode_charstrings()?;
        let charset_bytes = encode_charset(&cid.cids)?;
        let fd_select_bytes = encode_fd_select(&cid.fd_select)?;
        let subr_indexes: Vec<Option<Vec<u8>>> = cid
            .sub_fonts
            .iter()
            .map(|sub_font| {
                (!sub_font.private.local_subrs.is_empty())
                    .then(|| write_index(&sub_font.private.local_subrs))
                    .transpose()
            })
            .collect::<Result<_, _>>()?;
        let subr_total: usize = subr_indexes
            .iter()
            .flatten()
            .map(|bytes| bytes.len())
            .sum::<usize>();

        let fd_count = cid.sub_fonts.len();
        let mut top_index_bytes = Vec::new();
        let mut fd_array_bytes = Vec::new();
        let mut private_bytes: Vec<Vec<u8>> = vec![Vec::new(); fd_count];
        for pass in 0..MAX_FIX_POINT_PASSES {
            // Private DICTs are laid out back to back, followed by the
            // local subr INDEXes in the same order.
            let private_total: usize = private_bytes.iter().map(|bytes| bytes.len()).sum();
            let mut new_privates = Vec::with_capacity(fd_count);
            let mut before = 0usize; // private bytes before this FD
            let mut subrs_before = 0usize;
            for (fd, sub_font) in cid.sub_fonts.iter().enumerate() {
                let subrs_offset = match &subr_indexes[fd] {
                    Some(_) => Some(dict_offset(private_total - before + subrs_before)?),
                    None => None,
                };
                new_privates
                    .push(sub_font.private.to_dict(subrs_offset).encode(&mut strings)?);
                before += private_bytes[fd].len();
                subrs_before += subr_indexes[fd].as_ref().map_or(0, |bytes| bytes.len());
            }

            let mut offset = HEADER_LEN
                + name_index.len()
                + top_index_bytes.len()
                + string_index.len()
                + gsubr_index.len();
            let charset_offset = offset;
            offset += charset_bytes.len();
            let fd_select_offset = offset;
            offset += fd_select_bytes.len();
            let charstrings_offset = offset;
            offset += charstrings_index.len();
            let fd_array_offset = offset;
            offset += fd_array_bytes.len();
            let privates_base = offset;

            let mut fd_dict_bytes = Vec::with_capacity(fd_count);
            let mut private_at = privates_base;
            for (fd, template) in fd_templates.iter().enumerate() {
                let mut dict = template.clone();
                dict.set(
                    Operator::Private,
                    vec![
                        Operand::Int(new_privates[fd].len() as i32),
                        Operand::Int(dict_offset(private_at)?),
                    ],
                );
                private_at += new_privates[fd].len();
                fd_dict_bytes.push(dict.encode(&mut strings)?);
            }
            let new_fd_array = write_index(&fd_dict_bytes)?;

            let mut top = top_template.clone();
            top.set_int(Operator::Charset, dict_offset(charset_offset)?);
            top.set_int(Operator::FdSelect, dict_offset(fd_select_offset)?);
            top.set_int(Operator::Charstrings, dict_offset(charstrings_offset)?);
            top.set_int(Operator::FdArray, dict_offset(fd_array_offset)?);
            let new_top_index = write_index(&[top.encode(&mut strings)?])?;

            let converged = new_top_index == top_index_bytes
                && new_fd_array == fd_array_bytes
                && new_privates == private_bytes;
            log::trace!(
                "pass {pass}: top {} bytes, FDArray {} bytes, privates {} bytes, subrs {} bytes",
                new_top_index.len(),
                new_fd_array.len(),
                new_privates.iter().map(|b| b.len()).sum::<usize>(),
                subr_total,
            );
            top_index_bytes = new_top_index;
            fd_array_bytes = new_fd_array;
            private_bytes = new_privates;
            if converged {
                let mut sections: Vec<Option<&[u8]>> = vec![
                    Some(name_index.as_slice()),
                    Some(top_index_bytes.as_slice()),
                    Some(string_index.as_slice()),
                    Some(gsubr_index.as_slice()),
                    Some(charset_bytes.as_slice()),
                    Some(fd_select_bytes.as_slice()),
                    Some(charstrings_index.as_slice()),
                    Some(fd_array_bytes.as_slice()),
                ];
                sections.extend(private_bytes.iter().map(|bytes| Some(bytes.as_slice())));
                sections.extend(subr_indexes.iter().map(|bytes| bytes.as_deref()));
                return assemble(&sections);
            }
        }
        Err(Error::inconsistent("section offsets failed to converge"))
    }

    /// Encodes every glyph against its governing private DICT.
    fn encode_charstrings(&self) -> Result<Vec<u8>, Error> {
        let mut charstrings = Vec::with_capacity(self.glyphs.len());
        for (gid, glyph) in self.glyphs.iter().enumerate() {
            let private = self
                .private_for_glyph(gid)
                .ok_or_else(|| Error::inconsistent(format!("glyph {gid} has no private DICT")))?;
            charstrings.push(encode_charstring(glyph, private)?);
        }
        write_index(&charstrings)
    }

    /// Builds the offset-free part of the top DICT.
    fn top_dict_template(&self) -> Dict {
        let info = &self.info;
        let mut top = Dict::new();
        if let Outlines::Cid(cid) = &self.outlines {
            top.set(
                Operator::Ros,
                vec![
                    Operand::Str(cid.registry.clone()),
                    Operand::Str(cid.ordering.clone()),
                    Operand::Int(cid.supplement),
                ],
            );
            if cid.cid_font_version != 0.0 {
                top.set(
                    Operator::CidFontVersion,
                    vec![number_operand(cid.cid_font_version)],
                );
            }
            if cid.cid_font_revision != 0.0 {
                top.set(
                    Operator::CidFontRevision,
                    vec![number_operand(cid.cid_font_revision)],
                );
            }
            if cid.cid_font_type != 0 {
                top.set_int(Operator::CidFontType, cid.cid_font_type);
            }
            if cid.cid_count != 8720 {
                top.set_int(Operator::CidCount, cid.cid_count as i32);
            }
            if let Some(uid_base) = cid.uid_base {
                top.set_int(Operator::UidBase, uid_base);
            }
        }
        if let Some(value) = &info.version {
            top.set_str(Operator::Version, value);
        }
        if let Some(value) = &info.notice {
            top.set_str(Operator::Notice, value);
        }
        if let Some(value) = &info.copyright {
            top.set_str(Operator::Copyright, value);
        }
        if let Some(value) = &info.full_name {
            top.set_str(Operator::FullName, value);
        }
        if let Some(value) = &info.family_name {
            top.set_str(Operator::FamilyName, value);
        }
        if let Some(value) = &info.weight {
            top.set_str(Operator::Weight, value);
        }
        if info.is_fixed_pitch {
            top.set_int(Operator::IsFixedPitch, 1);
        }
        if info.italic_angle != 0.0 {
            top.set(Operator::ItalicAngle, vec![number_operand(info.italic_angle)]);
        }
        if info.underline_position != -100.0 {
            top.set(
                Operator::UnderlinePosition,
                vec![number_operand(info.underline_position)],
            );
        }
        if info.underline_thickness != 50.0 {
            top.set(
                Operator::UnderlineThickness,
                vec![number_operand(info.underline_thickness)],
            );
        }
        if info.paint_type != 0 {
            top.set_int(Operator::PaintType, info.paint_type);
        }
        if info.stroke_width != 0.0 {
            top.set(Operator::StrokeWidth, vec![number_operand(info.stroke_width)]);
        }
        let matrix_is_default = info
            .font_matrix
            .iter()
            .zip(DEFAULT_FONT_MATRIX.iter())
            .all(|(a, b)| (a - b).abs() < 1e-5);
        if !matrix_is_default {
            top.set(
                Operator::FontMatrix,
                info.font_matrix.iter().map(|v| number_operand(*v)).collect(),
            );
        }
        if let Some(bbox) = info.font_bbox {
            top.set(
                Operator::FontBbox,
                bbox.iter().map(|v| number_operand(*v)).collect(),
            );
        }
        if let Some(unique_id) = info.unique_id {
            top.set_int(Operator::UniqueId, unique_id);
        }
        if !info.xuid.is_empty() {
            top.set(
                Operator::Xuid,
                info.xuid.iter().map(|v| Operand::Int(*v)).collect(),
            );
        }
        if let Some(value) = &info.postscript {
            top.set_str(Operator::PostScript, value);
        }
        if let Some(value) = &info.base_font_name {
            top.set_str(Operator::BaseFontName, value);
        }
        if let Some(value) = info.synthetic_base {
            top.set_int(Operator::SyntheticBase, value);
        }
        top
    }
}

/// `true` when the encoding is exactly what offset 0 (the predefined
/// standard encoding) would produce for these glyph SIDs.
fn is_standard_encoding(encoding: &Encoding, sids: &[u16]) -> bool {
    (0..=255u8).all(|code| {
        let sid = STANDARD_ENCODING[code as usize] as u16;
        let expected = if sid == 0 {
            0
        } else {
            sids.iter()
                .position(|s| *s == sid)
                .map(|gid| gid as u16)
                .unwrap_or(0)
        };
        encoding.glyph(code) == expected
    })
}

fn dict_offset(offset: usize) -> Result<i32, Error> {
    i32::try_from(offset).map_err(|_| Error::Overflow("section offset"))
}

/// Concatenates the header and sections, skipping absent ones.
fn assemble(sections: &[Option<&[u8]>]) -> Result<Vec<u8>, Error> {
    let total = HEADER_LEN
        + sections
            .iter()
            .flatten()
            .map(|bytes| bytes.len())
            .sum::<usize>();
    let total_u32 = u32::try_from(total).map_err(|_| Error::Overflow("table size"))?;
    let off_size = ((4 - total_u32.leading_zeros() / 8).max(1)) as u8;
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&[1, 0, HEADER_LEN as u8, off_size]);
    for section in sections.iter().flatten() {
        out.extend_from_slice(section);
    }
    log::debug!("assembled {} bytes in {} sections", out.len(), sections.len());
    Ok(out)
}
