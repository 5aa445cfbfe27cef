//! CFF encoding support.
//!
//! An encoding maps one-byte character codes to glyphs. Unlike charsets,
//! the two custom formats identify glyphs positionally: format 0 lists one
//! code per glyph and format 1 assigns ranges of codes to consecutive
//! glyphs, starting from glyph 1 in both cases. An optional supplement maps
//! additional codes to glyphs named by SID.

use crate::data::FontData;
use crate::error::{Error, ReadError};
use crate::string::StringId;

#[derive(Clone)]
pub struct Encoding<'a> {
    kind: EncodingKind<'a>,
    supplements: &'a [u8],
}

#[derive(Clone)]
pub enum EncodingKind<'a> {
    /// The predefined standard encoding (offset 0).
    Standard,
    /// One code per glyph, in glyph order starting at glyph 1.
    Format0(&'a [u8]),
    /// Code ranges `(first: u8, n_left: u8)` covering consecutive glyphs
    /// starting at glyph 1.
    Format1(&'a [u8]),
}

impl<'a> Encoding<'a> {
    pub fn new(cff_data: FontData<'a>, encoding_offset: usize) -> Result<Self, Error> {
        match encoding_offset {
            0 => {
                return Ok(Self {
                    kind: EncodingKind::Standard,
                    supplements: &[],
                })
            }
            1 => return Err(Error::UnsupportedExpertEncoding),
            _ => {}
        }
        let data = cff_data
            .split_off(encoding_offset)
            .ok_or(ReadError::OutOfBounds)?;
        let mut cursor = data.cursor();
        let format = cursor.read::<u8>()?;
        let kind = match format & 0x7f {
            0 => {
                let n_codes = cursor.read::<u8>()? as usize;
                EncodingKind::Format0(cursor.read_bytes(n_codes)?)
            }
            1 => {
                let n_ranges = cursor.read::<u8>()? as usize;
                let ranges = cursor.read_bytes(n_ranges * 2)?;
                for range in ranges.chunks_exact(2) {
                    if range[0] as u32 + range[1] as u32 > 255 {
                        return Err(
                            ReadError::MalformedData("encoding range overflows the code space")
                                .into(),
                        );
                    }
                }
                EncodingKind::Format1(ranges)
            }
            _ => return Err(Error::UnsupportedEncodingFormat(format)),
        };
        let supplements = if format & 0x80 != 0 {
            let n_sups = cursor.read::<u8>()? as usize;
            cursor.read_bytes(n_sups * 3)?
        } else {
            &[]
        };
        Ok(Self { kind, supplements })
    }

    pub fn kind(&self) -> &EncodingKind<'a> {
        &self.kind
    }

    /// Returns an iterator over the primary `(code, glyph index)` pairs.
    ///
    /// The standard encoding maps codes to SIDs rather than glyphs, so it
    /// yields nothing here; use [`STANDARD_ENCODING`] together with the
    /// font's charset instead.
    pub fn primary(&self) -> impl Iterator<Item = (u8, u16)> + 'a {
        let (codes, ranges) = match &self.kind {
            EncodingKind::Standard => (&[][..], &[][..]),
            EncodingKind::Format0(codes) => (*codes, &[][..]),
            EncodingKind::Format1(ranges) => (&[][..], *ranges),
        };
        let per_code = codes
            .iter()
            .enumerate()
            .map(|(i, code)| (*code, i as u16 + 1));
        let mut gid = 1u16;
        let per_range = ranges.chunks_exact(2).flat_map(move |range| {
            let start_gid = gid;
            gid += range[1] as u16 + 1;
            (0..=range[1]).map(move |i| (range[0] + i, start_gid + i as u16))
        });
        per_code.chain(per_range)
    }

    /// Returns an iterator over the supplemental `(code, SID)` pairs.
    pub fn supplements(&self) -> SupplementIter<'a> {
        SupplementIter {
            data: self.supplements,
        }
    }
}

/// Iterator over the supplemental encoding entries.
#[derive(Clone)]
pub struct SupplementIter<'a> {
    data: &'a [u8],
}

impl Iterator for SupplementIter<'_> {
    type Item = (u8, StringId);

    fn next(&mut self) -> Option<Self::Item> {
        let (entry, rest) = self.data.split_first_chunk::<3>()?;
        self.data = rest;
        Some((
            entry[0],
            StringId::new(u16::from_be_bytes([entry[1], entry[2]])),
        ))
    }
}

/// The predefined standard encoding: character code to SID.
///
/// The glyph for a code is found by locating the SID in the font's charset.
/// See "Appendix B - Predefined Encodings" in Adobe Technical Note #5176.
#[rustfmt::skip]
pub const STANDARD_ENCODING: [u8; 256] = [
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      1,   2,   3,   4,   5,   6,   7,   8,   9,  10,  11,  12,  13,  14,  15,  16,
     17,  18,  19,  20,  21,  22,  23,  24,  25,  26,  27,  28,  29,  30,  31,  32,
     33,  34,  35,  36,  37,  38,  39,  40,  41,  42,  43,  44,  45,  46,  47,  48,
     49,  50,  51,  52,  53,  54,  55,  56,  57,  58,  59,  60,  61,  62,  63,  64,
     65,  66,  67,  68,  69,  70,  71,  72,  73,  74,  75,  76,  77,  78,  79,  80,
     81,  82,  83,  84,  85,  86,  87,  88,  89,  90,  91,  92,  93,  94,  95,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,  96,  97,  98,  99, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110,
      0, 111, 112, 113, 114,   0, 115, 116, 117, 118, 119, 120, 121, 122,   0, 123,
      0, 124, 125, 126, 127, 128, 129, 130, 131,   0, 132, 133,   0, 134, 135, 136,
    137,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0, 138,   0, 139,   0,   0,   0,   0, 140, 141, 142, 143,   0,   0,   0,   0,
      0, 144,   0,   0,   0, 145,   0,   0, 146, 147, 148, 149,   0,   0,   0,   0,
];

#[cfg(test)]
mod tests {
    use super::*;
    use cff_test_data::BeBuffer;

    #[test]
    fn format0_with_supplement() {
        let buf = BeBuffer::new()
            .extend([0u8; 2])
            .push(0x80u8) // format 0 + supplement
            .push(3u8)
            .extend([65u8, 66, 67])
            .push(1u8) // one supplement
            .push(200u8)
            .push(391u16);
        let encoding = Encoding::new(FontData::new(&buf), 2).unwrap();
        let primary: Vec<_> = encoding.primary().collect();
        assert_eq!(primary, vec![(65, 1), (66, 2), (67, 3)]);
        let sups: Vec<_> = encoding.supplements().collect();
        assert_eq!(sups, vec![(200, StringId::new(391))]);
    }

    #[test]
    fn format1_ranges() {
        let buf = BeBuffer::new()
            .extend([0u8; 2])
            .push(1u8)
            .push(2u8)
            .extend([32u8, 2, 48, 1]);
        let encoding = Encoding::new(FontData::new(&buf), 2).unwrap();
        let primary: Vec<_> = encoding.primary().collect();
        assert_eq!(
            primary,
            vec![(32, 1), (33, 2), (34, 3), (48, 4), (49, 5)]
        );
    }

    #[test]
    fn standard_encoding_is_empty_primary() {
        let encoding = Encoding::new(FontData::new(&[]), 0).unwrap();
        assert!(matches!(encoding.kind(), EncodingKind::Standard));
        assert_eq!(encoding.primary().count(), 0);
        // code 'A' is SID 34 in the standard encoding
        assert_eq!(STANDARD_ENCODING[b'A' as usize], 34);
    }

    #[test]
    fn expert_encoding_rejected() {
        assert!(matches!(
            Encoding::new(FontData::new(&[]), 1),
            Err(Error::UnsupportedExpertEncoding)
        ));
    }

    #[test]
    fn range_overflow_rejected() {
        let buf = BeBuffer::new()
            .extend([0u8; 2])
            .push(1u8)
            .push(1u8)
            .extend([250u8, 10]);
        assert!(Encoding::new(FontData::new(&buf), 2).is_err());
    }
}
