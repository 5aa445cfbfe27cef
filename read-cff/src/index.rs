//! Parsing for CFF INDEX structures.

use font_types::Uint24;

use crate::data::FontData;
use crate::error::{Error, ReadError};

/// A CFF INDEX: an ordered sequence of blobs with a packed offset table.
///
/// The offset array is validated eagerly when the index is read: the first
/// offset must be 1, subsequent offsets must be non-decreasing, and the data
/// region named by the final offset must lie within the enclosing region.
#[derive(Clone, Default)]
pub struct Index<'a> {
    count: u16,
    off_size: u8,
    offsets: &'a [u8],
    data: &'a [u8],
    size_in_bytes: usize,
}

impl<'a> Index<'a> {
    /// Reads an index that starts at the beginning of the given data.
    ///
    /// Trailing bytes beyond the end of the index are ignored; use
    /// [`size_in_bytes`](Self::size_in_bytes) to find where the index ends.
    pub fn read(data: FontData<'a>) -> Result<Self, Error> {
        let mut cursor = data.cursor();
        let count = cursor.read::<u16>()?;
        if count == 0 {
            // An empty INDEX is just the two count bytes.
            return Ok(Self {
                size_in_bytes: 2,
                ..Default::default()
            });
        }
        let off_size = cursor.read::<u8>()?;
        if !(1..=4).contains(&off_size) {
            return Err(Error::InvalidIndexOffsetSize(off_size));
        }
        let n_offsets = count as usize + 1;
        let offsets = cursor.read_bytes(n_offsets * off_size as usize)?;
        if read_offset(0, count as usize, off_size, offsets)? != 0 {
            return Err(Error::ZeroOffsetInIndex);
        }
        let mut prev = 0;
        for i in 1..n_offsets {
            let next = read_offset(i, count as usize, off_size, offsets)?;
            if next < prev {
                return Err(Error::IndexOffsetsNotAscending);
            }
            prev = next;
        }
        let data = cursor.read_bytes(prev)?;
        Ok(Self {
            count,
            off_size,
            offsets,
            data,
            size_in_bytes: cursor.position(),
        })
    }

    /// Returns the number of objects in the index.
    pub fn count(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the total size in bytes of the index table.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    /// Returns the offset of the object at the given index.
    pub fn get_offset(&self, index: usize) -> Result<usize, Error> {
        read_offset(index, self.count as usize, self.off_size, self.offsets)
    }

    /// Returns the data for the object at the given index.
    pub fn get(&self, index: usize) -> Result<&'a [u8], Error> {
        self.data
            .get(self.get_offset(index)?..self.get_offset(index + 1)?)
            .ok_or_else(|| ReadError::OutOfBounds.into())
    }

    /// Returns an iterator over the objects in the index.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.count()).filter_map(|i| self.get(i).ok())
    }

    /// Computes the bias that is added to a subroutine operator in a
    /// charstring.
    pub fn subr_bias(&self) -> i32 {
        let count = self.count;
        if count < 1240 {
            107
        } else if count < 33900 {
            1131
        } else {
            32768
        }
    }
}

/// Reads an offset which is encoded as a variable sized integer.
///
/// Offsets in the offset array are relative to the byte that precedes the
/// object data, so 1 is subtracted from the stored value.
fn read_offset(
    index: usize,
    count: usize,
    off_size: u8,
    offset_data: &[u8],
) -> Result<usize, Error> {
    if index > count {
        Err(ReadError::OutOfBounds)?;
    }
    let data_offset = index * off_size as usize;
    let offset_data = FontData::new(offset_data);
    match off_size {
        1 => offset_data.read_at::<u8>(data_offset)? as usize,
        2 => offset_data.read_at::<u16>(data_offset)? as usize,
        3 => offset_data.read_at::<Uint24>(data_offset)?.to_u32() as usize,
        4 => offset_data.read_at::<u32>(data_offset)? as usize,
        _ => return Err(Error::InvalidIndexOffsetSize(off_size)),
    }
    .checked_sub(1)
    .ok_or(Error::ZeroOffsetInIndex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cff_test_data::BeBuffer;

    #[test]
    fn empty_index() {
        let index = Index::read(FontData::new(&[0, 0])).unwrap();
        assert_eq!(index.count(), 0);
        assert_eq!(index.size_in_bytes(), 2);
        assert!(index.get(0).is_err());
    }

    #[test]
    fn three_blobs() {
        // [[], [1], [2, 3]]
        let bytes = [0x00u8, 0x03, 0x01, 0x01, 0x01, 0x02, 0x04, 0x01, 0x02, 0x03];
        let index = Index::read(FontData::new(&bytes)).unwrap();
        assert_eq!(index.count(), 3);
        assert_eq!(index.get(0).unwrap(), &[]);
        assert_eq!(index.get(1).unwrap(), &[1]);
        assert_eq!(index.get(2).unwrap(), &[2, 3]);
        assert_eq!(index.size_in_bytes(), bytes.len());
    }

    #[test]
    fn rejects_bad_offset_size() {
        let buf = BeBuffer::new().push(1u16).push(5u8).push(1u8).push(1u8);
        assert!(matches!(
            Index::read(FontData::new(&buf)),
            Err(Error::InvalidIndexOffsetSize(5))
        ));
    }

    #[test]
    fn rejects_nonzero_first_offset() {
        let buf = BeBuffer::new().push(1u16).push(1u8).push(2u8).push(3u8);
        assert!(matches!(
            Index::read(FontData::new(&buf)),
            Err(Error::ZeroOffsetInIndex)
        ));
    }

    #[test]
    fn rejects_descending_offsets() {
        let buf = BeBuffer::new()
            .push(2u16)
            .push(1u8)
            .extend([1u8, 5, 3])
            .extend([0u8; 4]);
        assert!(matches!(
            Index::read(FontData::new(&buf)),
            Err(Error::IndexOffsetsNotAscending)
        ));
    }

    #[test]
    fn rejects_truncated_body() {
        let buf = BeBuffer::new().push(1u16).push(1u8).extend([1u8, 9]);
        assert!(matches!(
            Index::read(FontData::new(&buf)),
            Err(Error::Read(ReadError::OutOfBounds))
        ));
    }

    #[test]
    fn wide_offsets() {
        for off_size in 1u8..=4 {
            let mut buf = BeBuffer::new().push(2u16).push(off_size);
            for offset in [1u32, 3, 6] {
                buf = match off_size {
                    1 => buf.push(offset as u8),
                    2 => buf.push(offset as u16),
                    3 => buf.push(Uint24::new(offset)),
                    4 => buf.push(offset),
                    _ => unreachable!(),
                };
            }
            buf = buf.extend([7u8, 8, 9, 10, 11]);
            let index = Index::read(FontData::new(&buf)).unwrap();
            assert_eq!(index.count(), 2);
            assert_eq!(index.get(0).unwrap(), &[7, 8]);
            assert_eq!(index.get(1).unwrap(), &[9, 10, 11]);
        }
    }

    #[test]
    fn subr_bias_thresholds() {
        let make = |count: u16| Index {
            count,
            ..Default::default()
        };
        assert_eq!(make(0).subr_bias(), 107);
        assert_eq!(make(1239).subr_bias(), 107);
        assert_eq!(make(1240).subr_bias(), 1131);
        assert_eq!(make(33899).subr_bias(), 1131);
        assert_eq!(make(33900).subr_bias(), 32768);
    }
}
