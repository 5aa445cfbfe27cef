//! CFF charset support.

use font_types::GlyphId;

use crate::data::FontData;
use crate::error::{Error, ReadError};
use crate::string::StringId;

/// Character set mapping glyph identifiers to string identifiers.
///
/// For CID-keyed fonts the "string identifiers" are CID values; the wire
/// format is identical.
#[derive(Clone)]
pub struct Charset<'a> {
    kind: CharsetKind<'a>,
    num_glyphs: u32,
}

/// Predefined and custom character sets.
///
/// A charset offset of 0, 1 or 2 selects one of the predefined sets; any
/// other offset locates a custom charset in one of three formats.
#[derive(Clone)]
pub enum CharsetKind<'a> {
    IsoAdobe,
    Expert,
    ExpertSubset,
    /// An array of `num_glyphs - 1` 16-bit SIDs, one per glyph.
    Format0(&'a [u8]),
    /// Runs of consecutive SIDs as `(first: u16, n_left: u8)`.
    Format1(&'a [u8]),
    /// Runs of consecutive SIDs as `(first: u16, n_left: u16)`.
    Format2(&'a [u8]),
}

impl<'a> Charset<'a> {
    pub fn new(
        cff_data: FontData<'a>,
        charset_offset: usize,
        num_glyphs: u32,
    ) -> Result<Self, Error> {
        let kind = match charset_offset {
            0 => CharsetKind::IsoAdobe,
            1 => CharsetKind::Expert,
            2 => CharsetKind::ExpertSubset,
            _ => {
                let data = cff_data
                    .split_off(charset_offset)
                    .ok_or(ReadError::OutOfBounds)?;
                let mut cursor = data.cursor();
                let format = cursor.read::<u8>()?;
                // Glyph 0 is implicit in every format.
                let to_cover = num_glyphs.saturating_sub(1) as usize;
                match format {
                    0 => CharsetKind::Format0(cursor.read_bytes(to_cover * 2)?),
                    1 | 2 => {
                        let record_len = if format == 1 { 3 } else { 4 };
                        let start = cursor.position();
                        let mut covered = 0usize;
                        while covered < to_cover {
                            let first = cursor.read::<u16>()?;
                            let n_left = if format == 1 {
                                cursor.read::<u8>()? as u32
                            } else {
                                cursor.read::<u16>()? as u32
                            };
                            if (first as u32 + n_left) > u16::MAX as u32 {
                                return Err(ReadError::MalformedData(
                                    "charset run overflows the SID range",
                                )
                                .into());
                            }
                            covered += n_left as usize + 1;
                        }
                        let end = cursor.position();
                        let ranges = data
                            .slice(start..end)
                            .ok_or(ReadError::OutOfBounds)?
                            .as_bytes();
                        if format == 1 {
                            CharsetKind::Format1(ranges)
                        } else {
                            debug_assert_eq!((end - start) % record_len, 0);
                            CharsetKind::Format2(ranges)
                        }
                    }
                    _ => return Err(Error::UnsupportedCharsetFormat(format)),
                }
            }
        };
        Ok(Self { kind, num_glyphs })
    }

    pub fn kind(&self) -> &CharsetKind<'a> {
        &self.kind
    }

    pub fn num_glyphs(&self) -> u32 {
        self.num_glyphs
    }

    /// Returns the string identifier for the given glyph identifier.
    pub fn string_id(&self, glyph_id: GlyphId) -> Result<StringId, Error> {
        let gid = glyph_id.to_u32();
        if gid >= self.num_glyphs {
            return Err(ReadError::OutOfBounds.into());
        }
        match &self.kind {
            // The ISOAdobe charset is an identity mapping of gid -> sid up
            // to 228 entries.
            CharsetKind::IsoAdobe => {
                if gid <= 228 {
                    Ok(StringId::new(gid as u16))
                } else {
                    Err(ReadError::OutOfBounds.into())
                }
            }
            CharsetKind::Expert => EXPERT_CHARSET
                .get(gid as usize)
                .copied()
                .map(StringId::new)
                .ok_or_else(|| ReadError::OutOfBounds.into()),
            CharsetKind::ExpertSubset => EXPERT_SUBSET_CHARSET
                .get(gid as usize)
                .copied()
                .map(StringId::new)
                .ok_or_else(|| ReadError::OutOfBounds.into()),
            CharsetKind::Format0(sids) => {
                if gid == 0 {
                    return Ok(StringId::new(0));
                }
                FontData::new(sids)
                    .read_at::<u16>((gid as usize - 1) * 2)
                    .map(StringId::new)
                    .map_err(Into::into)
            }
            CharsetKind::Format1(ranges) => string_id_from_ranges(ranges, 3, gid),
            CharsetKind::Format2(ranges) => string_id_from_ranges(ranges, 4, gid),
        }
    }

    /// Returns an iterator over the string identifier of every glyph, in
    /// glyph order.
    pub fn iter(&self) -> CharsetIter<'a, '_> {
        CharsetIter {
            charset: self,
            gid: 0,
            range: None,
            range_pos: 0,
        }
    }
}

fn read_range(ranges: &[u8], record_len: usize, index: usize) -> Result<(u32, u32), Error> {
    let data = FontData::new(ranges);
    let first = data.read_at::<u16>(index * record_len)? as u32;
    let n_left = if record_len == 3 {
        data.read_at::<u8>(index * record_len + 2)? as u32
    } else {
        data.read_at::<u16>(index * record_len + 2)? as u32
    };
    Ok((first, n_left))
}

fn string_id_from_ranges(ranges: &[u8], record_len: usize, gid: u32) -> Result<StringId, Error> {
    // The notdef glyph isn't explicitly mapped, so glyph i is covered by
    // position i - 1 of the run sequence.
    if gid == 0 {
        return Ok(StringId::new(0));
    }
    let mut pos = gid - 1;
    for index in 0..ranges.len() / record_len {
        let (first, n_left) = read_range(ranges, record_len, index)?;
        if pos <= n_left {
            return u16::try_from(first + pos)
                .map(StringId::new)
                .map_err(|_| ReadError::OutOfBounds.into());
        }
        pos -= n_left + 1;
    }
    Err(ReadError::OutOfBounds.into())
}

/// Iterator over the string identifier mappings in a charset, in glyph
/// order.
///
/// Each lookup in a range based charset is a linear scan, so iteration
/// keeps its position in the run sequence instead of calling
/// [`Charset::string_id`] per glyph.
#[derive(Clone)]
pub struct CharsetIter<'a, 'b> {
    charset: &'b Charset<'a>,
    gid: u32,
    /// Current run: (first sid, n_left, next range index).
    range: Option<(u32, u32, usize)>,
    range_pos: u32,
}

impl Iterator for CharsetIter<'_, '_> {
    type Item = (GlyphId, StringId);

    fn next(&mut self) -> Option<Self::Item> {
        if self.gid >= self.charset.num_glyphs {
            return None;
        }
        let gid = GlyphId::new(self.gid);
        self.gid += 1;
        let (ranges, record_len) = match &self.charset.kind {
            CharsetKind::Format1(ranges) => (*ranges, 3),
            CharsetKind::Format2(ranges) => (*ranges, 4),
            _ => {
                let sid = self.charset.string_id(gid).ok()?;
                return Some((gid, sid));
            }
        };
        if gid.to_u32() == 0 {
            return Some((gid, StringId::new(0)));
        }
        loop {
            match self.range {
                Some((first, n_left, _)) if self.range_pos <= n_left => {
                    let sid = u16::try_from(first + self.range_pos).ok()?;
                    self.range_pos += 1;
                    return Some((gid, StringId::new(sid)));
                }
                Some((_, _, next_index)) => {
                    let (first, n_left) = read_range(ranges, record_len, next_index).ok()?;
                    self.range = Some((first, n_left, next_index + 1));
                    self.range_pos = 0;
                }
                None => {
                    let (first, n_left) = read_range(ranges, record_len, 0).ok()?;
                    self.range = Some((first, n_left, 1));
                    self.range_pos = 0;
                }
            }
        }
    }
}

/// See "Expert" charset in Adobe Technical Note #5176, Appendix C.
#[rustfmt::skip]
const EXPERT_CHARSET: &[u16] = &[
      0,    1,  229,  230,  231,  232,  233,  234,  235,  236,  237,  238,   13,   14,   15,   99,
    239,  240,  241,  242,  243,  244,  245,  246,  247,  248,   27,   28,  249,  250,  251,  252,
    253,  254,  255,  256,  257,  258,  259,  260,  261,  262,  263,  264,  265,  266,  109,  110,
    267,  268,  269,  270,  271,  272,  273,  274,  275,  276,  277,  278,  279,  280,  281,  282,
    283,  284,  285,  286,  287,  288,  289,  290,  291,  292,  293,  294,  295,  296,  297,  298,
    299,  300,  301,  302,  303,  304,  305,  306,  307,  308,  309,  310,  311,  312,  313,  314,
    315,  316,  317,  318,  158,  155,  163,  319,  320,  321,  322,  323,  324,  325,  326,  150,
    164,  169,  327,  328,  329,  330,  331,  332,  333,  334,  335,  336,  337,  338,  339,  340,
    341,  342,  343,  344,  345,  346,  347,  348,  349,  350,  351,  352,  353,  354,  355,  356,
    357,  358,  359,  360,  361,  362,  363,  364,  365,  366,  367,  368,  369,  370,  371,  372,
    373,  374,  375,  376,  377,  378,
];

/// See "Expert Subset" charset in Adobe Technical Note #5176, Appendix C.
#[rustfmt::skip]
const EXPERT_SUBSET_CHARSET: &[u16] = &[
      0,    1,  231,  232,  235,  236,  237,  238,   13,   14,   15,   99,  239,  240,  241,  242,
    243,  244,  245,  246,  247,  248,   27,   28,  249,  250,  251,  253,  254,  255,  256,  257,
    258,  259,  260,  261,  262,  263,  264,  265,  266,  109,  110,  267,  268,  269,  270,  272,
    300,  301,  302,  305,  314,  315,  158,  155,  163,  320,  321,  322,  323,  324,  325,  326,
    150,  164,  169,  327,  328,  329,  330,  331,  332,  333,  334,  335,  336,  337,  338,  339,
    340,  341,  342,  343,  344,  345,  346
];

#[cfg(test)]
mod tests {
    use super::*;
    use cff_test_data::BeBuffer;

    #[test]
    fn iso_adobe_identity() {
        let charset = Charset::new(FontData::new(&[]), 0, 64).unwrap();
        for gid in 0..64u32 {
            assert_eq!(
                charset.string_id(GlyphId::new(gid)).unwrap(),
                StringId::new(gid as u16)
            );
        }
        assert!(charset.string_id(GlyphId::new(64)).is_err());
    }

    #[test]
    fn expert_lookup() {
        let charset = Charset::new(FontData::new(&[]), 1, 20).unwrap();
        assert_eq!(charset.string_id(GlyphId::new(2)).unwrap().to_u16(), 229);
        assert_eq!(charset.string_id(GlyphId::new(12)).unwrap().to_u16(), 13);
    }

    #[test]
    fn format0() {
        let buf = BeBuffer::new()
            .extend([0u8; 4]) // padding to make a plausible offset
            .push(0u8)
            .extend([1u16, 3, 15]);
        let charset = Charset::new(FontData::new(&buf), 4, 4).unwrap();
        let sids: Vec<_> = charset.iter().map(|(_, sid)| sid.to_u16()).collect();
        assert_eq!(sids, vec![0, 1, 3, 15]);
    }

    #[test]
    fn format1_runs() {
        let buf = BeBuffer::new()
            .extend([0u8; 4])
            .push(1u8)
            .push(8u16)
            .push(2u8)
            .push(1200u16)
            .push(0u8)
            .push(20u16)
            .push(1u8);
        let charset = Charset::new(FontData::new(&buf), 4, 7).unwrap();
        let expected = [0u16, 8, 9, 10, 1200, 20, 21];
        for (gid, sid) in expected.iter().enumerate() {
            assert_eq!(
                charset.string_id(GlyphId::new(gid as u32)).unwrap().to_u16(),
                *sid
            );
        }
        assert!(charset
            .iter()
            .map(|(_, sid)| sid.to_u16())
            .eq(expected.iter().copied()));
    }

    #[test]
    fn format2_long_run() {
        let buf = BeBuffer::new()
            .extend([0u8; 4])
            .push(2u8)
            .push(3u16)
            .push(514u16);
        let charset = Charset::new(FontData::new(&buf), 4, 515).unwrap();
        assert_eq!(charset.string_id(GlyphId::new(1)).unwrap().to_u16(), 3);
        assert_eq!(charset.string_id(GlyphId::new(514)).unwrap().to_u16(), 516);
        assert_eq!(charset.iter().count(), 515);
    }

    #[test]
    fn unknown_format() {
        let buf = BeBuffer::new().extend([0u8; 4]).push(7u8);
        assert!(matches!(
            Charset::new(FontData::new(&buf), 4, 2),
            Err(Error::UnsupportedCharsetFormat(7))
        ));
    }

    #[test]
    fn truncated_runs() {
        let buf = BeBuffer::new().extend([0u8; 4]).push(1u8).push(8u16);
        assert!(Charset::new(FontData::new(&buf), 4, 40).is_err());
    }
}
