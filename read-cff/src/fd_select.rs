//! Parsing for CFF FDSelect structures.

use font_types::GlyphId;

use crate::data::FontData;
use crate::error::{Error, ReadError};

/// Mapping from glyph index to font DICT index for CID-keyed fonts.
#[derive(Clone)]
pub enum FdSelect<'a> {
    /// One font DICT index per glyph.
    Format0 { fds: &'a [u8] },
    /// Ranges of glyphs sharing a font DICT index, as
    /// `(first: u16, fd: u8)` records followed by a sentinel glyph count.
    Format3 { ranges: &'a [u8] },
}

impl<'a> FdSelect<'a> {
    pub fn new(
        cff_data: FontData<'a>,
        fd_select_offset: usize,
        num_glyphs: u32,
    ) -> Result<Self, Error> {
        let data = cff_data
            .split_off(fd_select_offset)
            .ok_or(ReadError::OutOfBounds)?;
        let mut cursor = data.cursor();
        let format = cursor.read::<u8>()?;
        match format {
            0 => Ok(Self::Format0 {
                fds: cursor.read_bytes(num_glyphs as usize)?,
            }),
            3 => {
                let n_ranges = cursor.read::<u16>()? as usize;
                let ranges = cursor.read_bytes(n_ranges * 3)?;
                let sentinel = cursor.read::<u16>()?;
                if sentinel as u32 != num_glyphs {
                    return Err(
                        ReadError::MalformedData("FDSelect sentinel does not match glyph count")
                            .into(),
                    );
                }
                let mut prev: Option<u16> = None;
                for range in ranges.chunks_exact(3) {
                    let first = u16::from_be_bytes([range[0], range[1]]);
                    match prev {
                        None if first != 0 => {
                            return Err(ReadError::MalformedData(
                                "first FDSelect range must start at glyph 0",
                            )
                            .into())
                        }
                        Some(prev) if first <= prev => {
                            return Err(ReadError::MalformedData(
                                "FDSelect ranges must be strictly ascending",
                            )
                            .into())
                        }
                        _ => {}
                    }
                    if first as u32 >= num_glyphs {
                        return Err(ReadError::OutOfBounds.into());
                    }
                    prev = Some(first);
                }
                if n_ranges == 0 && num_glyphs > 0 {
                    return Err(
                        ReadError::MalformedData("FDSelect covers no glyphs").into()
                    );
                }
                Ok(Self::Format3 { ranges })
            }
            _ => Err(Error::UnsupportedFdSelectFormat(format)),
        }
    }

    /// Returns the font DICT index for the given glyph identifier.
    pub fn font_index(&self, glyph_id: GlyphId) -> Result<u8, Error> {
        let gid = glyph_id.to_u32();
        match self {
            Self::Format0 { fds } => fds
                .get(gid as usize)
                .copied()
                .ok_or_else(|| ReadError::OutOfBounds.into()),
            Self::Format3 { ranges } => {
                if gid > u16::MAX as u32 {
                    return Err(ReadError::OutOfBounds.into());
                }
                let gid = gid as u16;
                // Find the last range whose first glyph is <= gid.
                let ix = ranges
                    .chunks_exact(3)
                    .take_while(|range| u16::from_be_bytes([range[0], range[1]]) <= gid)
                    .count();
                let range = ranges
                    .chunks_exact(3)
                    .nth(ix.checked_sub(1).ok_or(ReadError::OutOfBounds)?)
                    .ok_or(ReadError::OutOfBounds)?;
                Ok(range[2])
            }
        }
    }

    /// Returns an iterator over the font DICT index of every glyph.
    pub fn iter(&self, num_glyphs: u32) -> impl Iterator<Item = u8> + '_ {
        (0..num_glyphs).filter_map(move |gid| self.font_index(GlyphId::new(gid)).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cff_test_data::BeBuffer;

    #[test]
    fn format0() {
        let buf = BeBuffer::new().push(0u8).extend([0u8, 1, 1, 2]);
        let select = FdSelect::new(FontData::new(&buf), 0, 4).unwrap();
        let fds: Vec<_> = select.iter(4).collect();
        assert_eq!(fds, vec![0, 1, 1, 2]);
        assert!(select.font_index(GlyphId::new(4)).is_err());
    }

    #[test]
    fn format3() {
        let buf = BeBuffer::new()
            .push(3u8)
            .push(3u16)
            .push(0u16)
            .push(0u8)
            .push(10u16)
            .push(4u8)
            .push(32u16)
            .push(1u8)
            .push(40u16);
        let select = FdSelect::new(FontData::new(&buf), 0, 40).unwrap();
        for (range, fd) in [(0u32..10, 0u8), (10..32, 4), (32..40, 1)] {
            for gid in range {
                assert_eq!(select.font_index(GlyphId::new(gid)).unwrap(), fd);
            }
        }
    }

    #[test]
    fn format3_bad_sentinel() {
        let buf = BeBuffer::new()
            .push(3u8)
            .push(1u16)
            .push(0u16)
            .push(0u8)
            .push(9u16);
        assert!(FdSelect::new(FontData::new(&buf), 0, 40).is_err());
    }

    #[test]
    fn format3_requires_ascending_firsts() {
        let buf = BeBuffer::new()
            .push(3u8)
            .push(2u16)
            .push(0u16)
            .push(0u8)
            .push(0u16)
            .push(1u8)
            .push(8u16);
        assert!(FdSelect::new(FontData::new(&buf), 0, 8).is_err());
    }

    #[test]
    fn unknown_format() {
        let buf = BeBuffer::new().push(1u8);
        assert!(matches!(
            FdSelect::new(FontData::new(&buf), 0, 1),
            Err(Error::UnsupportedFdSelectFormat(1))
        ));
    }
}
