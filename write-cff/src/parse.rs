//! Reading a complete CFF table into the owned model.

use std::collections::HashMap;

use read_cff::dict::Operator;
use read_cff::{
    Charset, Cff, Encoding as EncodingView, EncodingKind, FdSelect, FontData, Index, ReadError,
    STANDARD_ENCODING,
};

use crate::charstring::decode_charstring;
use crate::dict::Dict;
use crate::encoding::Encoding;
use crate::error::Error;
use crate::font::{CidOutlines, Font, FontInfo, Outlines, PrivateDict, SimpleOutlines, SubFont};
use crate::strings::StringTable;

fn malformed(section: &'static str, message: &'static str) -> Error {
    Error::MalformedInput {
        section,
        source: ReadError::MalformedData(message).into(),
    }
}

impl Font {
    /// Parses a byte slice containing exactly one CFF 1 table.
    ///
    /// Every charstring is decoded eagerly; the resulting font owns plain
    /// command lists and no longer refers to the input buffer.
    pub fn read(bytes: &[u8]) -> Result<Self, Error> {
        let cff = Cff::new(bytes).map_err(|e| Error::reading("CFF table", e))?;
        let name = cff
            .name()
            .map_err(|e| Error::reading("name INDEX", e))?
            .to_string();
        let strings = StringTable::from_index(cff.strings())?;
        let top_data = cff
            .top_dict_data()
            .map_err(|e| Error::reading("top DICT INDEX", e))?;
        let top = Dict::from_bytes(top_data, &strings).map_err(|e| Error::reading("top DICT", e))?;
        if let Some(cs_type) = top.int(Operator::CharstringType) {
            if cs_type != 2 {
                return Err(Error::UnsupportedFeature {
                    section: "top DICT",
                    source: read_cff::Error::UnsupportedCharstringType(cs_type),
                });
            }
        }

        let data = cff.offset_data();
        let charstrings_offset = offset_arg(&top, Operator::Charstrings)
            .ok_or_else(|| malformed("top DICT", "missing or invalid CharStrings offset"))?;
        let charstrings = data
            .split_off(charstrings_offset)
            .ok_or_else(|| malformed("charstrings INDEX", "offset out of bounds"))
            .and_then(|d| Index::read(d).map_err(|e| Error::reading("charstrings INDEX", e)))?;
        let num_glyphs = charstrings.count() as u32;
        if num_glyphs == 0 {
            return Err(malformed("charstrings INDEX", "font has no glyphs"));
        }

        let charset_offset = offset_arg(&top, Operator::Charset).unwrap_or(0);
        let charset = Charset::new(data, charset_offset, num_glyphs)
            .map_err(|e| Error::reading("charset", e))?;
        let info = font_info_from(&top);
        let global_subrs = cff.global_subrs();

        let mut font = if top.contains(Operator::Ros) {
            read_cid(&cff, &top, &strings, &charset, &charstrings, num_glyphs)?
        } else {
            read_simple(&cff, &top, &strings, &charset, &charstrings, num_glyphs)?
        };
        font.name = name;
        font.info = info;
        font.global_subrs = global_subrs.iter().map(Vec::from).collect();
        Ok(font)
    }
}

/// Reads a DICT offset operand, which must be a non-negative integer.
fn offset_arg(dict: &Dict, op: Operator) -> Option<usize> {
    usize::try_from(dict.int(op)?).ok()
}

fn font_info_from(top: &Dict) -> FontInfo {
    let mut info = FontInfo::default();
    let owned = |s: Option<&str>| s.map(str::to_owned);
    info.version = owned(top.string(Operator::Version));
    info.notice = owned(top.string(Operator::Notice));
    info.copyright = owned(top.string(Operator::Copyright));
    info.full_name = owned(top.string(Operator::FullName));
    info.family_name = owned(top.string(Operator::FamilyName));
    info.weight = owned(top.string(Operator::Weight));
    info.postscript = owned(top.string(Operator::PostScript));
    info.base_font_name = owned(top.string(Operator::BaseFontName));
    info.is_fixed_pitch = top.float(Operator::IsFixedPitch).unwrap_or(0.0) != 0.0;
    if let Some(value) = top.float(Operator::ItalicAngle) {
        info.italic_angle = value;
    }
    if let Some(value) = top.float(Operator::UnderlinePosition) {
        info.underline_position = value;
    }
    if let Some(value) = top.float(Operator::UnderlineThickness) {
        info.underline_thickness = value;
    }
    if let Some(value) = top.int(Operator::PaintType) {
        info.paint_type = value;
    }
    if let Some(value) = top.float(Operator::StrokeWidth) {
        info.stroke_width = value;
    }
    if let Some(matrix) = top.floats(Operator::FontMatrix) {
        if matrix.len() == 6 {
            info.font_matrix = [
                matrix[0], matrix[1], matrix[2], matrix[3], matrix[4], matrix[5],
            ];
        }
    }
    if let Some(bbox) = top.floats(Operator::FontBbox) {
        if bbox.len() == 4 {
            info.font_bbox = Some([bbox[0], bbox[1], bbox[2], bbox[3]]);
        }
    }
    info.unique_id = top.int(Operator::UniqueId);
    if let Some(operands) = top.get(Operator::Xuid) {
        info.xuid = operands.iter().filter_map(|o| o.as_i32()).collect();
    }
    info.synthetic_base = top.int(Operator::SyntheticBase);
    info
}

/// Reads the private DICT referenced by a top or font DICT, returning the
/// typed model plus the local subroutine INDEX view for decoding.
fn read_private<'a>(
    data: FontData<'a>,
    dict: &Dict,
    strings: &StringTable,
) -> Result<(PrivateDict, Option<Index<'a>>), Error> {
    let Some(operands) = dict.get(Operator::Private) else {
        return Ok((PrivateDict::default(), None));
    };
    let (size, offset) = match operands {
        [size, offset] => match (size.as_i32(), offset.as_i32()) {
            (Some(size), Some(offset)) if size >= 0 && offset >= 0 => {
                (size as usize, offset as usize)
            }
            _ => return Err(malformed("private DICT", "invalid size/offset pair")),
        },
        _ => return Err(malformed("private DICT", "invalid size/offset pair")),
    };
    let private_data = data
        .slice(offset..offset + size)
        .ok_or_else(|| malformed("private DICT", "region out of bounds"))?;
    let private_dict = Dict::from_bytes(private_data.as_bytes(), strings)
        .map_err(|e| Error::reading("private DICT", e))?;
    let mut private = PrivateDict::from_dict(&private_dict);
    let subrs = match private_dict.int(Operator::Subrs) {
        Some(subrs_offset) => {
            let subrs_offset = usize::try_from(subrs_offset)
                .map_err(|_| malformed("local subr INDEX", "negative offset"))?;
            let subrs_data = data
                .split_off(offset + subrs_offset)
                .ok_or_else(|| malformed("local subr INDEX", "offset out of bounds"))?;
            let index =
                Index::read(subrs_data).map_err(|e| Error::reading("local subr INDEX", e))?;
            private.local_subrs = index.iter().map(Vec::from).collect();
            Some(index)
        }
        None => None,
    };
    Ok((private, subrs))
}

fn read_simple(
    cff: &Cff,
    top: &Dict,
    strings: &StringTable,
    charset: &Charset,
    charstrings: &Index,
    num_glyphs: u32,
) -> Result<Font, Error> {
    let data = cff.offset_data();
    let (private, local_subrs) = read_private(data, top, strings)?;

    // Glyph to SID in glyph order, and the reverse for encoding lookups.
    let mut sids = Vec::with_capacity(num_glyphs as usize);
    let mut gid_for_sid: HashMap<u16, u16> = HashMap::new();
    for (gid, sid) in charset.iter() {
        sids.push(sid);
        gid_for_sid.entry(sid.to_u16()).or_insert(gid.to_u32() as u16);
    }
    if sids.len() != num_glyphs as usize {
        return Err(malformed("charset", "charset does not cover every glyph"));
    }

    let encoding_offset = offset_arg(top, Operator::Encoding).unwrap_or(0);
    let encoding_view = EncodingView::new(data, encoding_offset)
        .map_err(|e| Error::reading("encoding", e))?;
    let mut encoding = Encoding::new();
    match encoding_view.kind() {
        EncodingKind::Standard => {
            for code in 0..=255u8 {
                let sid = STANDARD_ENCODING[code as usize] as u16;
                if sid != 0 {
                    if let Some(gid) = gid_for_sid.get(&sid) {
                        encoding.set(code, *gid);
                    }
                }
            }
        }
        _ => {
            for (code, gid) in encoding_view.primary() {
                if gid as u32 >= num_glyphs {
                    return Err(malformed("encoding", "code maps to a missing glyph"));
                }
                encoding.set(code, gid);
            }
            for (code, sid) in encoding_view.supplements() {
                let gid = gid_for_sid
                    .get(&sid.to_u16())
                    .ok_or_else(|| malformed("encoding", "supplement names a missing glyph"))?;
                encoding.set(code, *gid);
            }
        }
    }

    let global_subrs = cff.global_subrs();
    let mut glyphs = Vec::with_capacity(num_glyphs as usize);
    for gid in 0..num_glyphs as usize {
        let charstring = charstrings
            .get(gid)
            .map_err(|e| Error::reading("charstrings INDEX", e))?;
        let mut glyph = decode_charstring(charstring, &private, global_subrs, local_subrs.as_ref())
            .map_err(|source| Error::CharstringFault {
                glyph: gid as u32,
                source,
            })?;
        glyph.name = Some(
            strings
                .get(sids[gid])
                .ok_or_else(|| malformed("charset", "SID has no string"))?
                .to_owned(),
        );
        glyphs.push(glyph);
    }

    Ok(Font {
        name: String::new(),
        info: FontInfo::default(),
        glyphs,
        global_subrs: Vec::new(),
        outlines: Outlines::Simple(SimpleOutlines { private, encoding }),
    })
}

fn read_cid(
    cff: &Cff,
    top: &Dict,
    strings: &StringTable,
    charset: &Charset,
    charstrings: &Index,
    num_glyphs: u32,
) -> Result<Font, Error> {
    let data = cff.offset_data();
    let ros = top
        .get(Operator::Ros)
        .ok_or_else(|| malformed("top DICT", "missing ROS"))?;
    let (registry, ordering, supplement) = match ros {
        [registry, ordering, supplement] => (
            registry
                .as_str()
                .ok_or_else(|| malformed("top DICT", "ROS registry must be a string"))?,
            ordering
                .as_str()
                .ok_or_else(|| malformed("top DICT", "ROS ordering must be a string"))?,
            supplement
                .as_f64()
                .ok_or_else(|| malformed("top DICT", "ROS supplement must be a number"))?,
        ),
        _ => return Err(malformed("top DICT", "ROS requires three operands")),
    };

    let fd_array_offset = offset_arg(top, Operator::FdArray)
        .ok_or_else(|| malformed("top DICT", "CID-keyed font without FDArray"))?;
    let fd_array = data
        .split_off(fd_array_offset)
        .ok_or_else(|| malformed("FDArray INDEX", "offset out of bounds"))
        .and_then(|d| Index::read(d).map_err(|e| Error::reading("FDArray INDEX", e)))?;

    let mut sub_fonts = Vec::with_capacity(fd_array.count());
    let mut local_subr_views = Vec::with_capacity(fd_array.count());
    for i in 0..fd_array.count() {
        let fd_data = fd_array
            .get(i)
            .map_err(|e| Error::reading("FDArray INDEX", e))?;
        let fd_dict =
            Dict::from_bytes(fd_data, strings).map_err(|e| Error::reading("font DICT", e))?;
        let (private, local_subrs) = read_private(data, &fd_dict, strings)?;
        let font_matrix = fd_dict.floats(Operator::FontMatrix).and_then(|m| {
            (m.len() == 6).then(|| [m[0], m[1], m[2], m[3], m[4], m[5]])
        });
        sub_fonts.push(SubFont {
            font_name: fd_dict.string(Operator::FontName).map(str::to_owned),
            font_matrix,
            private,
        });
        local_subr_views.push(local_subrs);
    }
    if sub_fonts.is_empty() {
        return Err(malformed("FDArray INDEX", "CID-keyed font has no font DICTs"));
    }

    let fd_select = match offset_arg(top, Operator::FdSelect) {
        Some(offset) => {
            let view = FdSelect::new(data, offset, num_glyphs)
                .map_err(|e| Error::reading("FDSelect", e))?;
            view.iter(num_glyphs).collect::<Vec<_>>()
        }
        None => vec![0; num_glyphs as usize],
    };
    if fd_select.len() != num_glyphs as usize {
        return Err(malformed("FDSelect", "FDSelect does not cover every glyph"));
    }

    let cids: Vec<u16> = charset.iter().map(|(_, sid)| sid.to_u16()).collect();
    if cids.len() != num_glyphs as usize {
        return Err(malformed("charset", "charset does not cover every glyph"));
    }

    let global_subrs = cff.global_subrs();
    let mut glyphs = Vec::with_capacity(num_glyphs as usize);
    for gid in 0..num_glyphs as usize {
        let fd = fd_select[gid] as usize;
        let sub_font = sub_fonts
            .get(fd)
            .ok_or_else(|| malformed("FDSelect", "selector references a missing font DICT"))?;
        let charstring = charstrings
            .get(gid)
            .map_err(|e| Error::reading("charstrings INDEX", e))?;
        let glyph = decode_charstring(
            charstring,
            &sub_font.private,
            global_subrs,
            local_subr_views[fd].as_ref(),
        )
        .map_err(|source| Error::CharstringFault {
            glyph: gid as u32,
            source,
        })?;
        glyphs.push(glyph);
    }

    Ok(Font {
        name: String::new(),
        info: FontInfo::default(),
        glyphs,
        global_subrs: Vec::new(),
        outlines: Outlines::Cid(CidOutlines {
            registry: registry.to_owned(),
            ordering: ordering.to_owned(),
            supplement: supplement as i32,
            cid_font_version: top.float(Operator::CidFontVersion).unwrap_or(0.0),
            cid_font_revision: top.float(Operator::CidFontRevision).unwrap_or(0.0),
            cid_font_type: top.int(Operator::CidFontType).unwrap_or(0),
            uid_base: top.int(Operator::UidBase),
            cid_count: top
                .int(Operator::CidCount)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(8720),
            cids,
            sub_fonts,
            fd_select,
        }),
    })
}
