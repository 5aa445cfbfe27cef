//! The owned encoding model and its serializer.

use crate::error::Error;

/// The built-in encoding of a simple font: a 256-slot table mapping
/// character codes to glyph indices, with 0 meaning "unmapped".
///
/// Glyph 0 is the `.notdef` glyph and can never be encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Encoding {
    codes: [u16; 256],
}

impl Encoding {
    pub fn new() -> Self {
        Self { codes: [0; 256] }
    }

    pub fn set(&mut self, code: u8, glyph: u16) {
        self.codes[code as usize] = glyph;
    }

    /// Returns the glyph index for a code, or 0 if the code is unmapped.
    pub fn glyph(&self, code: u8) -> u16 {
        self.codes[code as usize]
    }

    /// Returns the mapped `(code, glyph)` pairs in code order.
    pub fn mappings(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter(|(_, gid)| **gid != 0)
            .map(|(code, gid)| (code as u8, *gid))
    }

    /// Serializes the encoding, choosing the smaller of formats 0 and 1 and
    /// spilling everything the primary formats cannot express into a
    /// supplement.
    ///
    /// The primary formats assign one code each to a prefix of the glyph
    /// order, so codes for glyphs beyond the first gap, second codes for
    /// the same glyph, and codes for glyphs past index 255 all become
    /// supplemental `(code, SID)` pairs resolved through `glyph_sids`.
    pub(crate) fn encode(&self, glyph_sids: &[u16]) -> Result<Vec<u8>, Error> {
        let num_glyphs = glyph_sids.len();
        // Codes per glyph, ascending in code because mappings() is.
        let mut codes_by_glyph: Vec<Vec<u8>> = vec![Vec::new(); num_glyphs];
        for (code, gid) in self.mappings() {
            codes_by_glyph
                .get_mut(gid as usize)
                .ok_or_else(|| Error::inconsistent("encoding references a missing glyph"))?
                .push(code);
        }
        // The primary formats cover glyphs 1..=k for the longest prefix
        // with codes; one byte holds the count.
        let k = codes_by_glyph
            .iter()
            .skip(1)
            .take(255)
            .take_while(|codes| !codes.is_empty())
            .count();
        let primaries: Vec<u8> = codes_by_glyph
            .iter()
            .skip(1)
            .take(k)
            .map(|codes| codes[0])
            .collect();

        let mut supplements: Vec<(u8, u16)> = Vec::new();
        for (gid, codes) in codes_by_glyph.iter().enumerate().skip(1) {
            let extra = if gid <= k { &codes[1..] } else { &codes[..] };
            for code in extra {
                supplements.push((*code, glyph_sids[gid]));
            }
        }
        if supplements.len() > 255 {
            return Err(Error::Overflow("encoding supplement count"));
        }

        let mut ranges: Vec<(u8, u8)> = Vec::new();
        for code in &primaries {
            match ranges.last_mut() {
                Some((first, n_left)) if (*first as usize + *n_left as usize + 1) == *code as usize
                    && *n_left < 255 =>
                {
                    *n_left += 1
                }
                _ => ranges.push((*code, 0)),
            }
        }
        let format0_len = 2 + primaries.len();
        let format1_len = 2 + ranges.len() * 2;

        let supplement_flag = if supplements.is_empty() { 0 } else { 0x80 };
        let mut out = Vec::new();
        if format0_len <= format1_len {
            out.push(supplement_flag);
            out.push(primaries.len() as u8);
            out.extend_from_slice(&primaries);
        } else {
            out.push(1 | supplement_flag);
            out.push(ranges.len() as u8);
            for (first, n_left) in ranges {
                out.push(first);
                out.push(n_left);
            }
        }
        if !supplements.is_empty() {
            out.push(supplements.len() as u8);
            for (code, sid) in supplements {
                out.push(code);
                out.extend_from_slice(&sid.to_be_bytes());
            }
        }
        Ok(out)
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.mappings()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use read_cff::{Encoding as ReadEncoding, FontData};

    /// Decodes primary and supplement entries back into a code table,
    /// resolving supplement SIDs through the same sid array.
    fn decode(bytes: &[u8], glyph_sids: &[u16]) -> Encoding {
        // Pad so the encoding is not at the predefined offsets 0 and 1.
        let mut padded = vec![0u8; 2];
        padded.extend_from_slice(bytes);
        let parsed = ReadEncoding::new(FontData::new(&padded), 2).expect("failed to parse");
        let mut encoding = Encoding::new();
        for (code, gid) in parsed.primary() {
            encoding.set(code, gid);
        }
        for (code, sid) in parsed.supplements() {
            let gid = glyph_sids
                .iter()
                .position(|s| *s == sid.to_u16())
                .expect("supplement names a missing glyph");
            encoding.set(code, gid as u16);
        }
        encoding
    }

    fn round_trip(encoding: &Encoding, glyph_sids: &[u16]) -> Encoding {
        let bytes = encoding.encode(glyph_sids).unwrap();
        decode(&bytes, glyph_sids)
    }

    fn sids(n: u16) -> Vec<u16> {
        (0..n).map(|i| 500 + i).collect()
    }

    #[test]
    fn dense_prefix_uses_format0_or_1() {
        let glyph_sids = sids(5);
        let mut encoding = Encoding::new();
        for (code, gid) in [(65u8, 1u16), (66, 2), (67, 3), (70, 4)] {
            encoding.set(code, gid);
        }
        // 3 consecutive codes + 1 jump: format 1 has 2 ranges (6 bytes)
        // vs format 0 with 4 codes (6 bytes); tie goes to format 0.
        let bytes = encoding.encode(&glyph_sids).unwrap();
        assert_eq!(bytes[0] & 0x7f, 0);
        assert_eq!(round_trip(&encoding, &glyph_sids), encoding);
    }

    #[test]
    fn long_range_uses_format1() {
        let glyph_sids = sids(40);
        let mut encoding = Encoding::new();
        for gid in 1..40u16 {
            encoding.set(32 + gid as u8, gid);
        }
        let bytes = encoding.encode(&glyph_sids).unwrap();
        assert_eq!(bytes[0] & 0x7f, 1);
        assert_eq!(round_trip(&encoding, &glyph_sids), encoding);
    }

    #[test]
    fn double_mapped_glyph_goes_to_supplement() {
        let glyph_sids = sids(3);
        let mut encoding = Encoding::new();
        encoding.set(65, 1);
        encoding.set(97, 1); // second code for glyph 1
        encoding.set(66, 2);
        let bytes = encoding.encode(&glyph_sids).unwrap();
        assert!(bytes[0] & 0x80 != 0);
        assert_eq!(round_trip(&encoding, &glyph_sids), encoding);
    }

    #[test]
    fn gap_in_glyph_order_goes_to_supplement() {
        let glyph_sids = sids(4);
        let mut encoding = Encoding::new();
        encoding.set(65, 1);
        // glyph 2 unencoded, glyph 3 encoded: must become a supplement
        encoding.set(90, 3);
        let bytes = encoding.encode(&glyph_sids).unwrap();
        assert!(bytes[0] & 0x80 != 0);
        assert_eq!(round_trip(&encoding, &glyph_sids), encoding);
    }

    #[test]
    fn missing_glyph_rejected() {
        let glyph_sids = sids(2);
        let mut encoding = Encoding::new();
        encoding.set(65, 7);
        assert!(matches!(
            encoding.encode(&glyph_sids),
            Err(Error::Inconsistency(_))
        ));
    }
}
