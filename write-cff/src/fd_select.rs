//! Serialization of CFF FDSelect structures.

use crate::error::Error;

/// Serializes a glyph to font DICT index mapping.
///
/// Format 3 is used while its range compression actually saves bytes;
/// otherwise the flat format 0 array is emitted.
pub fn encode_fd_select(fds: &[u8]) -> Result<Vec<u8>, Error> {
    let num_glyphs =
        u16::try_from(fds.len()).map_err(|_| Error::Overflow("FDSelect glyph count"))?;
    let mut ranges: Vec<(u16, u8)> = Vec::new();
    for (gid, fd) in fds.iter().enumerate() {
        if ranges.last().map(|(_, prev)| prev) != Some(fd) {
            ranges.push((gid as u16, *fd));
        }
    }
    let format0_len = 1 + fds.len();
    let format3_len = 3 + ranges.len() * 3 + 2;
    let mut out = Vec::new();
    if format3_len < format0_len {
        out.push(3);
        out.extend_from_slice(&(ranges.len() as u16).to_be_bytes());
        for (first, fd) in ranges {
            out.extend_from_slice(&first.to_be_bytes());
            out.push(fd);
        }
        out.extend_from_slice(&num_glyphs.to_be_bytes());
    } else {
        out.push(0);
        out.extend_from_slice(fds);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use font_types::GlyphId;
    use read_cff::{FdSelect, FontData};

    fn decode(bytes: &[u8], num_glyphs: u32) -> Vec<u8> {
        let select = FdSelect::new(FontData::new(bytes), 0, num_glyphs).unwrap();
        (0..num_glyphs)
            .map(|gid| select.font_index(GlyphId::new(gid)).unwrap())
            .collect()
    }

    #[test]
    fn uniform_mapping_picks_format3() {
        let fds = vec![0u8; 100];
        let bytes = encode_fd_select(&fds).unwrap();
        assert_eq!(bytes, vec![3, 0, 1, 0, 0, 0, 0, 100]);
        assert_eq!(decode(&bytes, 100), fds);
    }

    #[test]
    fn alternating_mapping_picks_format0() {
        let fds: Vec<u8> = (0..20).map(|i| i % 2).collect();
        let bytes = encode_fd_select(&fds).unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(decode(&bytes, 20), fds);
    }

    #[test]
    fn tie_goes_to_format0() {
        // 10 glyphs in 2 ranges: format 3 needs 11 bytes, format 0 needs
        // 11 bytes, so format 0 wins the tie.
        let fds = [0u8, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let bytes = encode_fd_select(&fds).unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(decode(&bytes, 10), fds);
    }

    #[test]
    fn random_round_trips() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(0xfd5e1ec7);
        for _ in 0..50 {
            let len = rng.gen_range(1..2000usize);
            let mut fds = Vec::with_capacity(len);
            let mut fd = 0u8;
            for _ in 0..len {
                if rng.gen_bool(0.01) {
                    fd = rng.gen_range(0..8);
                }
                fds.push(fd);
            }
            let bytes = encode_fd_select(&fds).unwrap();
            assert_eq!(decode(&bytes, len as u32), fds);
        }
    }
}
