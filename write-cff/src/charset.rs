//! Serialization of CFF charsets.

use crate::error::Error;

/// Serializes a glyph to SID (or CID) mapping, choosing the smallest of
/// the three wire formats.
///
/// The first entry must be zero; glyph 0 is implicit on the wire.
pub fn encode_charset(sids: &[u16]) -> Result<Vec<u8>, Error> {
    if sids.first() != Some(&0) {
        return Err(Error::inconsistent("charset must map glyph 0 to SID 0"));
    }
    let tail = &sids[1..];
    let runs = consecutive_runs(tail);
    let format0_len = 1 + tail.len() * 2;
    // Format 1 stores a run length in one byte, so long runs split.
    let format1_runs: usize = runs.iter().map(|(_, len)| len.div_ceil(256)).sum();
    let format1_len = 1 + format1_runs * 3;
    let format2_len = 1 + runs.len() * 4;

    let mut out = Vec::new();
    if format0_len <= format1_len && format0_len <= format2_len {
        out.push(0);
        for sid in tail {
            out.extend_from_slice(&sid.to_be_bytes());
        }
    } else if format1_len <= format2_len {
        out.push(1);
        for (first, len) in runs {
            let mut emitted = 0;
            while emitted < len {
                let chunk = (len - emitted).min(256);
                out.extend_from_slice(&(first + emitted as u16).to_be_bytes());
                out.push((chunk - 1) as u8);
                emitted += chunk;
            }
        }
    } else {
        out.push(2);
        for (first, len) in runs {
            out.extend_from_slice(&first.to_be_bytes());
            out.extend_from_slice(&((len - 1) as u16).to_be_bytes());
        }
    }
    Ok(out)
}

/// Splits a SID sequence into runs of consecutive values.
fn consecutive_runs(sids: &[u16]) -> Vec<(u16, usize)> {
    let mut runs: Vec<(u16, usize)> = Vec::new();
    for sid in sids {
        match runs.last_mut() {
            Some((first, len)) if (*first as usize + *len) == *sid as usize => *len += 1,
            _ => runs.push((*sid, 1)),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use read_cff::{Charset, FontData};

    fn decode(bytes: &[u8], num_glyphs: u32) -> Vec<u16> {
        // Prepend padding so the charset is not at a predefined offset.
        let mut padded = vec![0u8; 4];
        padded.extend_from_slice(bytes);
        Charset::new(FontData::new(&padded), 4, num_glyphs)
            .unwrap()
            .iter()
            .map(|(_, sid)| sid.to_u16())
            .collect()
    }

    #[test]
    fn sparse_picks_format0() {
        let sids = [0u16, 1, 3, 15];
        let bytes = encode_charset(&sids).unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0x01, 0x00, 0x03, 0x00, 0x0f]);
        assert_eq!(decode(&bytes, sids.len() as u32), sids);
    }

    #[test]
    fn short_run_picks_format1() {
        let sids: Vec<u16> = std::iter::once(0).chain(2..=15).collect();
        let bytes = encode_charset(&sids).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x02, 0x0d]);
        assert_eq!(decode(&bytes, sids.len() as u32), sids);
    }

    #[test]
    fn long_run_picks_format2() {
        let sids: Vec<u16> = std::iter::once(0).chain(3..=516).collect();
        let bytes = encode_charset(&sids).unwrap();
        assert_eq!(bytes, vec![0x02, 0x00, 0x03, 0x02, 0x01]);
        assert_eq!(decode(&bytes, sids.len() as u32), sids);
    }

    #[test]
    fn long_run_splits_in_format1() {
        // One run of 300: format 1 needs two records (6 bytes + format),
        // format 2 needs one (5 bytes), so format 2 wins. Force a
        // comparison by also checking a two-run shape where format 1 wins.
        let sids: Vec<u16> = std::iter::once(0)
            .chain(10..=20)
            .chain(100..=110)
            .collect();
        let bytes = encode_charset(&sids).unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(decode(&bytes, sids.len() as u32), sids);
    }

    #[test]
    fn notdef_only() {
        let bytes = encode_charset(&[0]).unwrap();
        assert_eq!(bytes, vec![0]);
        assert_eq!(decode(&bytes, 1), vec![0]);
    }

    #[test]
    fn glyph0_must_be_notdef() {
        assert!(encode_charset(&[5, 6]).is_err());
    }

    #[test]
    fn random_round_trips() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let len = rng.gen_range(1..200usize);
            let mut sids = vec![0u16];
            let mut next = 1u16;
            for _ in 1..len {
                // Mix runs and jumps to exercise every format.
                if rng.gen_bool(0.7) {
                    sids.push(next);
                } else {
                    next = next.saturating_add(rng.gen_range(2..500));
                    sids.push(next);
                }
                next = next.saturating_add(1);
            }
            let bytes = encode_charset(&sids).unwrap();
            assert_eq!(decode(&bytes, sids.len() as u32), sids);
        }
    }
}
