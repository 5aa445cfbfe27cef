//! Encoders for the CFF numeric wire formats.
//!
//! DICTs and charstrings share the small integer encodings; they differ in
//! the widest form, where DICTs store a 32-bit integer and charstrings a
//! 16.16 fixed point value. Real numbers only occur in DICTs and use the
//! nibble-packed decimal format.

use font_types::Fixed;

/// Appends a DICT integer using the smallest available encoding.
pub fn encode_int(out: &mut Vec<u8>, value: i32) {
    match value {
        -107..=107 => out.push((value + 139) as u8),
        108..=1131 => {
            let v = value - 108;
            out.push(((v >> 8) + 247) as u8);
            out.push((v & 0xff) as u8);
        }
        -1131..=-108 => {
            let v = -value - 108;
            out.push(((v >> 8) + 251) as u8);
            out.push((v & 0xff) as u8);
        }
        -32768..=32767 => {
            out.push(0x1c);
            out.extend_from_slice(&(value as i16).to_be_bytes());
        }
        _ => {
            out.push(0x1d);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Returns the encoded length of a DICT integer.
pub fn int_len(value: i32) -> usize {
    match value {
        -107..=107 => 1,
        -1131..=1131 => 2,
        -32768..=32767 => 3,
        _ => 5,
    }
}

/// Appends a charstring number using the smallest available encoding.
///
/// Values with a fractional part, and integers outside the 16-bit range,
/// use the five byte 16.16 form.
pub fn encode_type2_number(out: &mut Vec<u8>, value: Fixed) {
    let bits = value.to_bits();
    let int = bits >> 16;
    if bits & 0xffff == 0 && (-32768..=32767).contains(&int) {
        match int {
            -107..=107 => out.push((int + 139) as u8),
            108..=1131 => {
                let v = int - 108;
                out.push(((v >> 8) + 247) as u8);
                out.push((v & 0xff) as u8);
            }
            -1131..=-108 => {
                let v = -int - 108;
                out.push(((v >> 8) + 251) as u8);
                out.push((v & 0xff) as u8);
            }
            _ => {
                out.push(28);
                out.extend_from_slice(&(int as i16).to_be_bytes());
            }
        }
    } else {
        out.push(255);
        out.extend_from_slice(&bits.to_be_bytes());
    }
}

/// Returns the encoded length of a charstring number.
pub fn type2_number_len(value: Fixed) -> usize {
    let bits = value.to_bits();
    let int = bits >> 16;
    if bits & 0xffff == 0 && (-32768..=32767).contains(&int) {
        match int {
            -107..=107 => 1,
            -1131..=1131 => 2,
            _ => 3,
        }
    } else {
        5
    }
}

/// Appends a real number in binary coded decimal form.
///
/// Builds a representation with at most nine significant digits, strips
/// trailing zeros, and chooses between plain decimal and exponent notation
/// by nibble count.
pub fn encode_real(out: &mut Vec<u8>, value: f64) {
    out.push(0x1e);
    let mut nibbles = real_nibbles(value);
    nibbles.push(0xf);
    if nibbles.len() % 2 != 0 {
        nibbles.push(0xf);
    }
    for pair in nibbles.chunks_exact(2) {
        out.push(pair[0] << 4 | pair[1]);
    }
}

/// Returns the encoded length of a real number, including the lead byte.
pub fn real_len(value: f64) -> usize {
    1 + (real_nibbles(value).len() + 2) / 2
}

const NIBBLE_POINT: u8 = 0xa;
const NIBBLE_EXP: u8 = 0xb;
const NIBBLE_EXP_NEG: u8 = 0xc;
const NIBBLE_MINUS: u8 = 0xe;

fn real_nibbles(value: f64) -> Vec<u8> {
    if value == 0.0 {
        return vec![0];
    }
    let negative = value < 0.0;
    // Nine significant digits round-trip everything the decoder produces.
    let formatted = format!("{:.8e}", value.abs());
    let (mantissa, exponent) = formatted
        .split_once('e')
        .unwrap_or((formatted.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let mut digits: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();
    while digits.len() > 1 && digits.last() == Some(&0) {
        digits.pop();
    }
    // value = 0.<digits> * 10^point with a nonzero leading digit
    let point = exponent + 1;
    let count = digits.len() as i32;

    // Plain decimal notation
    let mut plain = Vec::new();
    if point >= count {
        plain.extend_from_slice(&digits);
        plain.extend(std::iter::repeat(0).take((point - count) as usize));
    } else if point > 0 {
        plain.extend_from_slice(&digits[..point as usize]);
        plain.push(NIBBLE_POINT);
        plain.extend_from_slice(&digits[point as usize..]);
    } else {
        plain.push(NIBBLE_POINT);
        plain.extend(std::iter::repeat(0).take((-point) as usize));
        plain.extend_from_slice(&digits);
    }

    // Exponent notation
    let mut scientific = vec![digits[0]];
    if digits.len() > 1 {
        scientific.push(NIBBLE_POINT);
        scientific.extend_from_slice(&digits[1..]);
    }
    if exponent != 0 {
        scientific.push(if exponent < 0 {
            NIBBLE_EXP_NEG
        } else {
            NIBBLE_EXP
        });
        let mut exp_digits = Vec::new();
        let mut e = exponent.unsigned_abs();
        loop {
            exp_digits.push((e % 10) as u8);
            e /= 10;
            if e == 0 {
                break;
            }
        }
        exp_digits.reverse();
        scientific.extend_from_slice(&exp_digits);
    }

    let mut nibbles = if plain.len() <= scientific.len() {
        plain
    } else {
        scientific
    };
    if negative {
        nibbles.insert(0, NIBBLE_MINUS);
    }
    nibbles
}
