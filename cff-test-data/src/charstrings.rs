//! Hand-assembled Type 2 charstrings for interpreter and re-encoder tests.

/// Appends a Type 2 integer using the smallest encoding.
///
/// Kept independent of the production encoder so the two can check each
/// other.
pub fn push_int(out: &mut Vec<u8>, value: i32) {
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
            out.push(28);
            out.extend_from_slice(&(value as i16).to_be_bytes());
        }
        _ => {
            // 16.16 with a zero fraction
            out.push(255);
            out.extend_from_slice(&(value << 16).to_be_bytes());
        }
    }
}

fn build(ops: &[(&[i32], &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (args, op) in ops {
        for arg in *args {
            push_int(&mut out, *arg);
        }
        out.extend_from_slice(op);
    }
    out
}

pub const RMOVETO: &[u8] = &[21];
pub const RLINETO: &[u8] = &[5];
pub const HLINETO: &[u8] = &[6];
pub const RRCURVETO: &[u8] = &[8];
pub const HSTEMHM: &[u8] = &[18];
pub const ENDCHAR: &[u8] = &[14];

/// Two nested axis-aligned squares, no hints, explicit width of 1000.
///
/// Written with plain rmoveto/rlineto so a smarter re-encoding always
/// exists.
pub fn nested_squares() -> Vec<u8> {
    build(&[
        (&[1000 - 500, 50, 50], RMOVETO), // width delta from nominal 500
        (&[900, 0], RLINETO),
        (&[0, 900], RLINETO),
        (&[-900, 0], RLINETO),
        (&[50, -850], RMOVETO),
        (&[800, 0], RLINETO),
        (&[0, 800], RLINETO),
        (&[-800, 0], RLINETO),
        (&[], ENDCHAR),
    ])
}

/// A single open path with line and curve runs exercising the mixed
/// operators.
pub fn lines_and_curves() -> Vec<u8> {
    build(&[
        (&[25, 0], RMOVETO),
        (&[100, 200, -50], HLINETO),
        (&[10, 20, 30, 40, 50, 60], RRCURVETO),
        (&[], ENDCHAR),
    ])
}

/// Stem hints followed by a hintmask, then a small closed path.
pub fn hinted_bar() -> Vec<u8> {
    let mut out = Vec::new();
    for arg in [100, 50, 300, 50] {
        push_int(&mut out, arg);
    }
    out.extend_from_slice(HSTEMHM);
    for arg in [40, 60] {
        push_int(&mut out, arg);
    }
    // vstem args folded into the hintmask
    out.push(19); // hintmask
    out.push(0b1110_0000);
    for (args, op) in [
        (&[40i32, 100][..], RMOVETO),
        (&[60, 0][..], RLINETO),
        (&[0, 250][..], RLINETO),
        (&[-60, 0][..], RLINETO),
    ] {
        for arg in args {
            push_int(&mut out, *arg);
        }
        out.extend_from_slice(op);
    }
    out.extend_from_slice(ENDCHAR);
    out
}
