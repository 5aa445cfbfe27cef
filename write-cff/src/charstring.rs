//! Decoding charstrings into glyphs and re-encoding them optimally.
//!
//! The encoder re-expresses a glyph's commands as relative deltas, splits
//! them into runs delimited by move and mask commands, and for each run
//! finds the cheapest covering sequence of operators by shortest-path
//! search over "position within the run" nodes.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use font_types::Fixed;
use read_cff::charstring::{self, ops, CommandSink};
use read_cff::Index;

use crate::error::Error;
use crate::font::PrivateDict;
use crate::glyph::{Command, Glyph};
use crate::number::{encode_type2_number, type2_number_len};

/// Operand stack budget the encoder packs against.
///
/// The interpreter accepts twice this, but emitting at the documented
/// limit keeps the output safe for every consumer.
const MAX_OPERANDS: usize = 48;

/// Decodes a charstring into a glyph.
///
/// The private DICT supplies the width defaults; the subroutine indexes
/// resolve `callsubr`/`callgsubr`.
pub fn decode_charstring(
    data: &[u8],
    private: &PrivateDict,
    global_subrs: &Index,
    local_subrs: Option<&Index>,
) -> Result<Glyph, read_cff::Error> {
    let mut builder = GlyphBuilder::default();
    charstring::evaluate(data, global_subrs, local_subrs, &mut builder)?;
    let mut glyph = builder.glyph;
    glyph.width = match builder.raw_width {
        Some(stored) => stored.wrapping_add(private.nominal_width_x),
        None => private.default_width_x,
    };
    Ok(glyph)
}

#[derive(Default)]
struct GlyphBuilder {
    glyph: Glyph,
    raw_width: Option<Fixed>,
}

impl CommandSink for GlyphBuilder {
    fn width(&mut self, width: Fixed) {
        self.raw_width = Some(width);
    }

    fn hstem(&mut self, y: Fixed, y1: Fixed) {
        self.glyph.hstems.push((y, y1));
    }

    fn vstem(&mut self, x: Fixed, x1: Fixed) {
        self.glyph.vstems.push((x, x1));
    }

    fn hint_mask(&mut self, mask: &[u8]) {
        self.glyph.commands.push(Command::HintMask(mask.to_vec()));
    }

    fn counter_mask(&mut self, mask: &[u8]) {
        self.glyph.commands.push(Command::CounterMask(mask.to_vec()));
    }

    fn move_to(&mut self, x: Fixed, y: Fixed) {
        self.glyph.commands.push(Command::MoveTo(x, y));
    }

    fn line_to(&mut self, x: Fixed, y: Fixed) {
        self.glyph.commands.push(Command::LineTo(x, y));
    }

    fn curve_to(&mut self, cx0: Fixed, cy0: Fixed, cx1: Fixed, cy1: Fixed, x: Fixed, y: Fixed) {
        self.glyph
            .commands
            .push(Command::CurveTo(cx0, cy0, cx1, cy1, x, y));
    }

    fn close(&mut self) {}
}

/// Encodes a glyph as a Type 2 charstring.
///
/// The advance width is stored iff it differs from the private DICT's
/// default width, as its offset from the nominal width. The result never
/// references subroutines.
pub fn encode_charstring(glyph: &Glyph, private: &PrivateDict) -> Result<Vec<u8>, Error> {
    let total_stems = glyph.hstems.len() + glyph.vstems.len();
    let expected_mask_len = total_stems.div_ceil(8);
    for command in &glyph.commands {
        if let Command::HintMask(mask) | Command::CounterMask(mask) = command {
            if mask.len() != expected_mask_len {
                return Err(Error::inconsistent(format!(
                    "hint mask has {} bytes but {} stems require {}",
                    mask.len(),
                    total_stems,
                    expected_mask_len
                )));
            }
        }
    }

    let mut out = Vec::new();
    let mut width = (glyph.width != private.default_width_x)
        .then(|| fixed_sub(glyph.width, private.nominal_width_x));
    let has_masks = glyph.has_masks();
    let first_is_mask = matches!(
        glyph.commands.first(),
        Some(Command::HintMask(_) | Command::CounterMask(_))
    );

    if !glyph.hstems.is_empty() {
        let op = if has_masks { ops::HSTEMHM } else { ops::HSTEM };
        emit_stems(&mut out, &glyph.hstems, &mut width, op, false);
    }
    if !glyph.vstems.is_empty() {
        // Stem args directly before a mask operator are an implied vstem,
        // which saves the explicit operator byte.
        let op = if has_masks { ops::VSTEMHM } else { ops::VSTEM };
        emit_stems(&mut out, &glyph.vstems, &mut width, op, first_is_mask);
    }

    let mut cur = (Fixed::ZERO, Fixed::ZERO);
    let mut moved = false;
    let mut i = 0;
    while i < glyph.commands.len() {
        match &glyph.commands[i] {
            Command::HintMask(mask) => {
                take_width(&mut out, &mut width);
                out.push(ops::HINTMASK);
                out.extend_from_slice(mask);
                i += 1;
            }
            Command::CounterMask(mask) => {
                take_width(&mut out, &mut width);
                out.push(ops::CNTRMASK);
                out.extend_from_slice(mask);
                i += 1;
            }
            Command::MoveTo(x, y) => {
                let delta = (fixed_sub(*x, cur.0), fixed_sub(*y, cur.1));
                emit_move(&mut out, &mut width, delta);
                cur = (*x, *y);
                moved = true;
                i += 1;
            }
            Command::LineTo(..) | Command::CurveTo(..) => {
                if !moved {
                    // A leading path command without a move opens the
                    // subpath at the current point.
                    emit_move(&mut out, &mut width, (Fixed::ZERO, Fixed::ZERO));
                    moved = true;
                }
                let mut segs = Vec::new();
                while i < glyph.commands.len() {
                    match &glyph.commands[i] {
                        Command::LineTo(x, y) => {
                            segs.push(Seg::Line {
                                d: (fixed_sub(*x, cur.0), fixed_sub(*y, cur.1)),
                            });
                            cur = (*x, *y);
                        }
                        Command::CurveTo(x0, y0, x1, y1, x, y) => {
                            segs.push(Seg::Curve {
                                d1: (fixed_sub(*x0, cur.0), fixed_sub(*y0, cur.1)),
                                d2: (fixed_sub(*x1, *x0), fixed_sub(*y1, *y0)),
                                d3: (fixed_sub(*x, *x1), fixed_sub(*y, *y1)),
                            });
                            cur = (*x, *y);
                        }
                        _ => break,
                    }
                    i += 1;
                }
                optimize_run(&mut out, &segs)?;
            }
        }
    }
    take_width(&mut out, &mut width);
    out.push(ops::ENDCHAR);
    Ok(out)
}

fn take_width(out: &mut Vec<u8>, width: &mut Option<Fixed>) {
    if let Some(value) = width.take() {
        encode_type2_number(out, value);
    }
}

/// Emits stem hints as delta pairs followed by the given operator,
/// splitting into several operators when the operand budget requires it.
///
/// With `fold_last`, the final chunk's operator byte is omitted because a
/// mask operator follows directly in the output.
fn emit_stems(
    out: &mut Vec<u8>,
    stems: &[(Fixed, Fixed)],
    width: &mut Option<Fixed>,
    op: u8,
    fold_last: bool,
) {
    let mut prev = Fixed::ZERO;
    let mut args = Vec::with_capacity(stems.len() * 2);
    for (a, b) in stems {
        args.push(fixed_sub(*a, prev));
        args.push(fixed_sub(*b, *a));
        prev = *b;
    }
    let mut remaining = args.as_slice();
    let mut first = true;
    while !remaining.is_empty() {
        let budget = if first && width.is_some() {
            MAX_OPERANDS - 1
        } else {
            MAX_OPERANDS
        };
        // Keep the pairs together.
        let take = remaining.len().min(budget & !1);
        if first {
            take_width(out, width);
            first = false;
        }
        for value in &remaining[..take] {
            encode_type2_number(out, *value);
        }
        remaining = &remaining[take..];
        if !(remaining.is_empty() && fold_last) {
            out.push(op);
        }
    }
}

fn emit_move(out: &mut Vec<u8>, width: &mut Option<Fixed>, (dx, dy): (Fixed, Fixed)) {
    take_width(out, width);
    if dx == Fixed::ZERO && dy != Fixed::ZERO {
        encode_type2_number(out, dy);
        out.push(ops::VMOVETO);
    } else if dy == Fixed::ZERO {
        encode_type2_number(out, dx);
        out.push(ops::HMOVETO);
    } else {
        encode_type2_number(out, dx);
        encode_type2_number(out, dy);
        out.push(ops::RMOVETO);
    }
}

/// A path segment in relative form.
#[derive(Clone, Copy, Debug)]
enum Seg {
    Line {
        d: (Fixed, Fixed),
    },
    Curve {
        d1: (Fixed, Fixed),
        d2: (Fixed, Fixed),
        d3: (Fixed, Fixed),
    },
}

impl Seg {
    fn is_line(&self) -> bool {
        matches!(self, Seg::Line { .. })
    }
}

/// One candidate operator application, covering `count` segments starting
/// at some node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum EdgeOp {
    RLineTo,
    AxisLineTo { horizontal: bool },
    RLineCurve,
    RRCurveTo,
    RCurveLine,
    HHCurveTo,
    VVCurveTo,
    AltCurveTo { horizontal: bool },
    HFlex,
    HFlex1,
    Flex1,
}

#[derive(Clone, Copy, Debug)]
struct Edge {
    op: EdgeOp,
    count: usize,
}

/// Finds the cheapest operator cover of the run and appends its encoding.
///
/// Nodes are positions between segments; every candidate edge advances by
/// the number of segments its operator would consume and costs its exact
/// encoded size. Ties are broken by candidate generation order, which
/// follows the order the variants are listed in [`EdgeOp`].
fn optimize_run(out: &mut Vec<u8>, segs: &[Seg]) -> Result<(), Error> {
    let n = segs.len();
    let mut dist = vec![usize::MAX; n + 1];
    let mut pred: Vec<Option<(usize, Edge)>> = vec![None; n + 1];
    dist[0] = 0;
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0usize, 0usize)));
    while let Some(Reverse((cost, node))) = heap.pop() {
        if cost > dist[node] {
            continue;
        }
        if node == n {
            break;
        }
        for edge in candidate_edges(segs, node) {
            let (args, op_bytes) = edge_encoding(segs, node, edge);
            if args.len() > MAX_OPERANDS {
                continue;
            }
            let edge_cost: usize = args.iter().map(|a| type2_number_len(*a)).sum::<usize>()
                + op_bytes.len();
            let next = node + edge.count;
            let next_cost = cost + edge_cost;
            if next_cost < dist[next] {
                dist[next] = next_cost;
                pred[next] = Some((node, edge));
                heap.push(Reverse((next_cost, next)));
            }
        }
    }
    if dist[n] == usize::MAX {
        // Every segment has at least the rlineto/rrcurveto edge, so an
        // uncovered node means a logic error rather than bad input.
        return Err(Error::inconsistent("charstring run has no operator cover"));
    }
    let mut chosen = Vec::new();
    let mut node = n;
    while node > 0 {
        let Some((prev, edge)) = pred[node] else {
            return Err(Error::inconsistent("charstring run has no operator cover"));
        };
        chosen.push((prev, edge));
        node = prev;
    }
    for (start, edge) in chosen.into_iter().rev() {
        let (args, op_bytes) = edge_encoding(segs, start, edge);
        for arg in args {
            encode_type2_number(out, arg);
        }
        out.extend_from_slice(op_bytes);
    }
    Ok(())
}

/// Generates the candidate edges leaving a node, in tie-breaking order.
fn candidate_edges(segs: &[Seg], start: usize) -> Vec<Edge> {
    let mut edges = Vec::new();
    let rest = &segs[start..];
    match rest[0] {
        Seg::Line { .. } => {
            let line_run = rest.iter().take_while(|s| s.is_line()).count();
            for count in 1..=line_run.min(MAX_OPERANDS / 2) {
                edges.push(Edge {
                    op: EdgeOp::RLineTo,
                    count,
                });
            }
            for horizontal in [true, false] {
                let axis_run = axis_line_run(rest, horizontal);
                for count in 1..=axis_run.min(MAX_OPERANDS) {
                    edges.push(Edge {
                        op: EdgeOp::AxisLineTo { horizontal },
                        count,
                    });
                }
            }
            // Lines followed by exactly one curve.
            for count in 1..=line_run.min((MAX_OPERANDS - 6) / 2) {
                if matches!(rest.get(count), Some(Seg::Curve { .. })) {
                    edges.push(Edge {
                        op: EdgeOp::RLineCurve,
                        count: count + 1,
                    });
                }
            }
        }
        Seg::Curve { .. } => {
            let curve_run = rest.iter().take_while(|s| !s.is_line()).count();
            for count in 1..=curve_run.min(MAX_OPERANDS / 6) {
                edges.push(Edge {
                    op: EdgeOp::RRCurveTo,
                    count,
                });
            }
            for count in 1..=curve_run.min((MAX_OPERANDS - 2) / 6) {
                if matches!(rest.get(count), Some(Seg::Line { .. })) {
                    edges.push(Edge {
                        op: EdgeOp::RCurveLine,
                        count: count + 1,
                    });
                }
            }
            for count in 1..=tangent_run(rest, false) {
                edges.push(Edge {
                    op: EdgeOp::HHCurveTo,
                    count,
                });
            }
            for count in 1..=tangent_run(rest, true) {
                edges.push(Edge {
                    op: EdgeOp::VVCurveTo,
                    count,
                });
            }
            for horizontal in [true, false] {
                for count in alternating_counts(rest, horizontal) {
                    edges.push(Edge {
                        op: EdgeOp::AltCurveTo { horizontal },
                        count,
                    });
                }
            }
            if let (Some(&Seg::Curve { d1, d2, d3 }), Some(&Seg::Curve { d1: e1, d2: e2, d3: e3 })) =
                (rest.first(), rest.get(1))
            {
                let zero = Fixed::ZERO;
                if d1.1 == zero && d3.1 == zero && e1.1 == zero && e3.1 == zero
                    && fixed_add(d2.1, e2.1) == zero
                {
                    edges.push(Edge {
                        op: EdgeOp::HFlex,
                        count: 2,
                    });
                }
                if d3.1 == zero
                    && e1.1 == zero
                    && fixed_add(fixed_add(d1.1, d2.1), fixed_add(e2.1, e3.1)) == zero
                {
                    edges.push(Edge {
                        op: EdgeOp::HFlex1,
                        count: 2,
                    });
                }
                let dx = [d1.0, d2.0, d3.0, e1.0, e2.0]
                    .iter()
                    .fold(zero, |acc, v| fixed_add(acc, *v));
                let dy = [d1.1, d2.1, d3.1, e1.1, e2.1]
                    .iter()
                    .fold(zero, |acc, v| fixed_add(acc, *v));
                let sum_x = fixed_add(dx, e3.0);
                let sum_y = fixed_add(dy, e3.1);
                let valid = if dx.abs() > dy.abs() {
                    sum_y == zero
                } else {
                    sum_x == zero
                };
                if valid {
                    edges.push(Edge {
                        op: EdgeOp::Flex1,
                        count: 2,
                    });
                }
            }
        }
    }
    edges
}

/// Length of the maximal axis-aligned alternating line run starting with
/// the given orientation.
fn axis_line_run(segs: &[Seg], mut horizontal: bool) -> usize {
    let mut len = 0;
    for seg in segs {
        let Seg::Line { d } = seg else { break };
        let on_axis = if horizontal {
            d.1 == Fixed::ZERO
        } else {
            d.0 == Fixed::ZERO
        };
        if !on_axis {
            break;
        }
        len += 1;
        horizontal = !horizontal;
    }
    len
}

/// Length of the maximal run encodable by hhcurveto (`vertical == false`)
/// or vvcurveto (`vertical == true`).
///
/// Every curve must end with an on-axis tangent; every curve but the first
/// must also start with one.
fn tangent_run(segs: &[Seg], vertical: bool) -> usize {
    let mut len = 0;
    for (i, seg) in segs.iter().enumerate() {
        let Seg::Curve { d1, d3, .. } = seg else {
            break;
        };
        let (start_off_axis, end_off_axis) = if vertical {
            (d1.0, d3.0)
        } else {
            (d1.1, d3.1)
        };
        if end_off_axis != Fixed::ZERO || (i > 0 && start_off_axis != Fixed::ZERO) {
            break;
        }
        len += 1;
        // 4 operands per curve plus a possible lead; the exact budget is
        // enforced where edges are costed.
        if len == MAX_OPERANDS / 4 {
            break;
        }
    }
    len
}

/// Valid segment counts for hvcurveto/vhcurveto starting with the given
/// tangent orientation.
fn alternating_counts(segs: &[Seg], first_horizontal: bool) -> Vec<usize> {
    let mut counts = Vec::new();
    for (i, seg) in segs.iter().enumerate() {
        let Seg::Curve { d1, d3, .. } = seg else {
            break;
        };
        let horizontal = first_horizontal == (i % 2 == 0);
        let (start_off_axis, end_off_axis) = if horizontal {
            (d1.1, d3.0)
        } else {
            (d1.0, d3.1)
        };
        if start_off_axis != Fixed::ZERO {
            break;
        }
        // This curve can terminate the run; the off-axis end becomes the
        // optional trailing operand.
        let args = (i + 1) * 4 + (end_off_axis != Fixed::ZERO) as usize;
        if args <= MAX_OPERANDS {
            counts.push(i + 1);
        }
        // Continuing requires the end tangent to stay on axis.
        if end_off_axis != Fixed::ZERO || (i + 2) * 4 > MAX_OPERANDS {
            break;
        }
    }
    counts
}

/// Returns the operand list and operator bytes for an edge.
fn edge_encoding(segs: &[Seg], start: usize, edge: Edge) -> (Vec<Fixed>, &'static [u8]) {
    let run = &segs[start..start + edge.count];
    let mut args = Vec::new();
    let op_bytes: &'static [u8] = match edge.op {
        EdgeOp::RLineTo => {
            for seg in run {
                let Seg::Line { d } = seg else { unreachable!() };
                args.push(d.0);
                args.push(d.1);
            }
            &[ops::RLINETO]
        }
        EdgeOp::AxisLineTo { horizontal } => {
            let mut is_x = horizontal;
            for seg in run {
                let Seg::Line { d } = seg else { unreachable!() };
                args.push(if is_x { d.0 } else { d.1 });
                is_x = !is_x;
            }
            if horizontal {
                &[ops::HLINETO]
            } else {
                &[ops::VLINETO]
            }
        }
        EdgeOp::RLineCurve => {
            for seg in run {
                match seg {
                    Seg::Line { d } => {
                        args.push(d.0);
                        args.push(d.1);
                    }
                    Seg::Curve { d1, d2, d3 } => {
                        for d in [d1, d2, d3] {
                            args.push(d.0);
                            args.push(d.1);
                        }
                    }
                }
            }
            &[ops::RLINECURVE]
        }
        EdgeOp::RRCurveTo | EdgeOp::RCurveLine => {
            for seg in run {
                match seg {
                    Seg::Curve { d1, d2, d3 } => {
                        for d in [d1, d2, d3] {
                            args.push(d.0);
                            args.push(d.1);
                        }
                    }
                    Seg::Line { d } => {
                        args.push(d.0);
                        args.push(d.1);
                    }
                }
            }
            if edge.op == EdgeOp::RRCurveTo {
                &[ops::RRCURVETO]
            } else {
                &[ops::RCURVELINE]
            }
        }
        EdgeOp::HHCurveTo | EdgeOp::VVCurveTo => {
            let vertical = edge.op == EdgeOp::VVCurveTo;
            let Seg::Curve { d1, .. } = run[0] else {
                unreachable!()
            };
            let lead = if vertical { d1.0 } else { d1.1 };
            if lead != Fixed::ZERO {
                args.push(lead);
            }
            for seg in run {
                let Seg::Curve { d1, d2, d3 } = seg else {
                    unreachable!()
                };
                if vertical {
                    args.push(d1.1);
                    args.push(d2.0);
                    args.push(d2.1);
                    args.push(d3.1);
                } else {
                    args.push(d1.0);
                    args.push(d2.0);
                    args.push(d2.1);
                    args.push(d3.0);
                }
            }
            if vertical {
                &[ops::VVCURVETO]
            } else {
                &[ops::HHCURVETO]
            }
        }
        EdgeOp::AltCurveTo { horizontal } => {
            let mut is_h = horizontal;
            for (i, seg) in run.iter().enumerate() {
                let Seg::Curve { d1, d2, d3 } = seg else {
                    unreachable!()
                };
                if is_h {
                    args.push(d1.0);
                    args.push(d2.0);
                    args.push(d2.1);
                    args.push(d3.1);
                    if i + 1 == run.len() && d3.0 != Fixed::ZERO {
                        args.push(d3.0);
                    }
                } else {
                    args.push(d1.1);
                    args.push(d2.0);
                    args.push(d2.1);
                    args.push(d3.0);
                    if i + 1 == run.len() && d3.1 != Fixed::ZERO {
                        args.push(d3.1);
                    }
                }
                is_h = !is_h;
            }
            if horizontal {
                &[ops::HVCURVETO]
            } else {
                &[ops::VHCURVETO]
            }
        }
        EdgeOp::HFlex => {
            let [Seg::Curve { d1, d2, d3 }, Seg::Curve { d1: e1, d2: e2, d3: e3 }] = run else {
                unreachable!()
            };
            args.extend_from_slice(&[d1.0, d2.0, d2.1, d3.0, e1.0, e2.0, e3.0]);
            &[ops::ESCAPE, ops::HFLEX]
        }
        EdgeOp::HFlex1 => {
            let [Seg::Curve { d1, d2, d3 }, Seg::Curve { d1: e1, d2: e2, d3: e3 }] = run else {
                unreachable!()
            };
            args.extend_from_slice(&[d1.0, d1.1, d2.0, d2.1, d3.0, e1.0, e2.0, e2.1, e3.0]);
            &[ops::ESCAPE, ops::HFLEX1]
        }
        EdgeOp::Flex1 => {
            let [Seg::Curve { d1, d2, d3 }, Seg::Curve { d1: e1, d2: e2, d3: e3 }] = run else {
                unreachable!()
            };
            args.extend_from_slice(&[d1.0, d1.1, d2.0, d2.1, d3.0, d3.1, e1.0, e1.1, e2.0, e2.1]);
            let dx = [d1.0, d2.0, d3.0, e1.0, e2.0]
                .iter()
                .fold(Fixed::ZERO, |acc, v| fixed_add(acc, *v));
            let dy = [d1.1, d2.1, d3.1, e1.1, e2.1]
                .iter()
                .fold(Fixed::ZERO, |acc, v| fixed_add(acc, *v));
            args.push(if dx.abs() > dy.abs() { e3.0 } else { e3.1 });
            &[ops::ESCAPE, ops::FLEX1]
        }
    };
    (args, op_bytes)
}

fn fixed_add(a: Fixed, b: Fixed) -> Fixed {
    a.wrapping_add(b)
}

fn fixed_sub(a: Fixed, b: Fixed) -> Fixed {
    Fixed::from_bits(a.to_bits().wrapping_sub(b.to_bits()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cff_test_data::charstrings;

    fn fix(value: i32) -> Fixed {
        Fixed::from_i32(value)
    }

    fn decode(data: &[u8], private: &PrivateDict) -> Glyph {
        let empty = Index::default();
        decode_charstring(data, private, &empty, None).unwrap()
    }

    fn assert_round_trip(original: &[u8], private: &PrivateDict) -> Glyph {
        let glyph = decode(original, private);
        let encoded = encode_charstring(&glyph, private).unwrap();
        assert!(
            encoded.len() <= original.len(),
            "re-encoding grew from {} to {} bytes",
            original.len(),
            encoded.len()
        );
        let decoded = decode(&encoded, private);
        assert_eq!(decoded, glyph);
        glyph
    }

    #[test]
    fn nested_squares_round_trip() {
        let private = PrivateDict {
            nominal_width_x: fix(500),
            ..Default::default()
        };
        let glyph = assert_round_trip(&charstrings::nested_squares(), &private);
        assert_eq!(glyph.width, fix(1000));
        assert_eq!(glyph.commands.len(), 8);
    }

    #[test]
    fn square_becomes_axis_lines() {
        let glyph = Glyph {
            commands: vec![
                Command::MoveTo(fix(50), fix(50)),
                Command::LineTo(fix(950), fix(50)),
                Command::LineTo(fix(950), fix(950)),
                Command::LineTo(fix(50), fix(950)),
            ],
            ..Default::default()
        };
        let private = PrivateDict::default();
        let encoded = encode_charstring(&glyph, &private).unwrap();
        // 50 50 rmoveto (3) + 900 900 -900 hlineto (7) + endchar (1)
        assert_eq!(encoded.len(), 11);
        assert_eq!(decode(&encoded, &private), glyph);
    }

    #[test]
    fn horizontal_curves_use_hhcurveto() {
        let mut commands = vec![Command::MoveTo(fix(0), fix(0))];
        // two curves whose start and end tangents are all horizontal
        let mut cur = (0, 0);
        for (d1, d2, d3) in [
            ((10, 0), (20, 5), (30, 0)),
            ((15, 0), (10, -5), (25, 0)),
        ] {
            let c0 = (cur.0 + d1.0, cur.1 + d1.1);
            let c1 = (c0.0 + d2.0, c0.1 + d2.1);
            cur = (c1.0 + d3.0, c1.1 + d3.1);
            commands.push(Command::CurveTo(
                fix(c0.0),
                fix(c0.1),
                fix(c1.0),
                fix(c1.1),
                fix(cur.0),
                fix(cur.1),
            ));
        }
        let glyph = Glyph {
            commands,
            ..Default::default()
        };
        let private = PrivateDict::default();
        let encoded = encode_charstring(&glyph, &private).unwrap();
        // 0 hmoveto (2) + 8 one-byte deltas and hhcurveto (9) + endchar
        assert_eq!(encoded.len(), 12);
        assert!(encoded.contains(&ops::HHCURVETO));
        assert_eq!(decode(&encoded, &private), glyph);
    }

    #[test]
    fn alternating_curves_use_hvcurveto() {
        let glyph = Glyph {
            commands: vec![
                Command::MoveTo(fix(100), fix(0)),
                // horizontal start, vertical end
                Command::CurveTo(fix(150), fix(0), fix(180), fix(20), fix(180), fix(60)),
                // vertical start, horizontal end
                Command::CurveTo(fix(180), fix(100), fix(150), fix(120), fix(100), fix(120)),
            ],
            ..Default::default()
        };
        let private = PrivateDict::default();
        let encoded = encode_charstring(&glyph, &private).unwrap();
        assert!(encoded.contains(&ops::HVCURVETO));
        assert_eq!(decode(&encoded, &private), glyph);
    }

    #[test]
    fn hflex_pattern_wins_over_generic_curves() {
        // Two curves matching the hflex shape. The shared vertical offset
        // is fractional, and hflex encodes it once where hhcurveto would
        // pay for it twice.
        let dy = Fixed::from_f64(30.5);
        let glyph = Glyph {
            commands: vec![
                Command::MoveTo(fix(0), fix(0)),
                Command::CurveTo(fix(400), fix(0), fix(500), dy, fix(600), dy),
                Command::CurveTo(fix(700), dy, fix(800), fix(0), fix(1200), fix(0)),
            ],
            ..Default::default()
        };
        let private = PrivateDict::default();
        let encoded = encode_charstring(&glyph, &private).unwrap();
        let hflex_at = encoded
            .windows(2)
            .position(|w| w == [ops::ESCAPE, ops::HFLEX]);
        assert!(hflex_at.is_some(), "encoding: {encoded:?}");
        assert_eq!(decode(&encoded, &private), glyph);
    }

    #[test]
    fn hints_and_masks_round_trip() {
        let private = PrivateDict::default();
        let original = charstrings::hinted_bar();
        let glyph = assert_round_trip(&original, &private);
        assert_eq!(glyph.hstems.len(), 2);
        assert_eq!(glyph.vstems.len(), 1);
        assert_eq!(glyph.commands[0], Command::HintMask(vec![0b1110_0000]));
    }

    #[test]
    fn mixed_lines_and_curves_round_trip() {
        let private = PrivateDict::default();
        assert_round_trip(&charstrings::lines_and_curves(), &private);
    }

    #[test]
    fn default_width_is_omitted() {
        let private = PrivateDict {
            default_width_x: fix(250),
            ..Default::default()
        };
        let glyph = Glyph {
            width: fix(250),
            ..Default::default()
        };
        let encoded = encode_charstring(&glyph, &private).unwrap();
        assert_eq!(encoded, vec![ops::ENDCHAR]);
        assert_eq!(decode(&encoded, &private).width, fix(250));
    }

    #[test]
    fn wrong_mask_length_rejected() {
        let glyph = Glyph {
            hstems: vec![(fix(0), fix(10))],
            commands: vec![Command::HintMask(vec![0xff, 0xff])],
            ..Default::default()
        };
        assert!(encode_charstring(&glyph, &PrivateDict::default()).is_err());
    }

    #[test]
    fn random_walk_round_trips() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(0x617c_9f21);
        let private = PrivateDict {
            default_width_x: fix(400),
            nominal_width_x: fix(420),
            ..Default::default()
        };
        for _ in 0..100 {
            let mut commands = Vec::new();
            let mut cur = (0i32, 0i32);
            let mut step = |rng: &mut StdRng, cur: &mut (i32, i32)| {
                cur.0 += rng.gen_range(-300..300);
                cur.1 += rng.gen_range(-300..300);
                *cur
            };
            for _ in 0..rng.gen_range(1..6) {
                let (x, y) = step(&mut rng, &mut cur);
                commands.push(Command::MoveTo(fix(x), fix(y)));
                for _ in 0..rng.gen_range(0..12) {
                    if rng.gen_bool(0.5) {
                        // axis-aligned lines often enough to exercise the
                        // alternating operators
                        match rng.gen_range(0..3) {
                            0 => cur.0 += rng.gen_range(-200..200),
                            1 => cur.1 += rng.gen_range(-200..200),
                            _ => {
                                cur.0 += rng.gen_range(-200..200);
                                cur.1 += rng.gen_range(-200..200);
                            }
                        }
                        commands.push(Command::LineTo(fix(cur.0), fix(cur.1)));
                    } else {
                        let (x0, y0) = step(&mut rng, &mut cur);
                        let (x1, y1) = step(&mut rng, &mut cur);
                        let (x, y) = step(&mut rng, &mut cur);
                        commands.push(Command::CurveTo(
                            fix(x0),
                            fix(y0),
                            fix(x1),
                            fix(y1),
                            fix(x),
                            fix(y),
                        ));
                    }
                }
            }
            let glyph = Glyph {
                width: fix(rng.gen_range(0..1000)),
                commands,
                ..Default::default()
            };
            let encoded = encode_charstring(&glyph, &private).unwrap();
            let decoded = decode(&encoded, &private);
            assert_eq!(decoded, glyph);
        }
    }
}
