//! Serialization of CFF INDEX structures.

use font_types::{Scalar, Uint24};

use crate::error::Error;

/// Serializes a sequence of blobs as a CFF INDEX.
///
/// The offset size is the smallest that can represent the final offset. An
/// empty sequence canonicalizes to the two zero count bytes.
pub fn write_index<T: AsRef<[u8]>>(items: &[T]) -> Result<Vec<u8>, Error> {
    let count = u16::try_from(items.len()).map_err(|_| Error::Overflow("INDEX count"))?;
    let mut out = Vec::new();
    out.extend_from_slice(&count.to_be_bytes());
    if count == 0 {
        return Ok(out);
    }
    // Offsets are relative to the byte preceding the data, so they start
    // at one.
    let mut offsets = Vec::with_capacity(items.len() + 1);
    let mut offset = 1u32;
    offsets.push(offset);
    for item in items {
        let len = u32::try_from(item.as_ref().len()).map_err(|_| Error::Overflow("INDEX item"))?;
        offset = offset
            .checked_add(len)
            .ok_or(Error::Overflow("INDEX data size"))?;
        offsets.push(offset);
    }
    let off_size = (4 - offset.leading_zeros() / 8).max(1) as u8;
    out.push(off_size);
    for offset in offsets {
        match off_size {
            1 => out.push(offset as u8),
            2 => out.extend_from_slice(&(offset as u16).to_be_bytes()),
            3 => out.extend_from_slice(Uint24::new(offset).to_raw().as_ref()),
            4 => out.extend_from_slice(&offset.to_be_bytes()),
            _ => unreachable!(),
        }
    }
    for item in items {
        out.extend_from_slice(item.as_ref());
    }
    Ok(out)
}
