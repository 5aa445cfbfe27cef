//! Evaluation of Type 2 charstrings.

use font_types::Fixed;

use crate::data::{Cursor, FontData};
use crate::error::Error;
use crate::index::Index;
use crate::stack::{Number, Stack};

/// Maximum nesting depth for subroutine calls.
///
/// See "Appendix B Type 2 Charstring Implementation Limits" in Adobe
/// Technical Note #5177.
pub const NESTING_DEPTH_LIMIT: usize = 10;

/// Number of slots in the transient array backing the `put` and `get`
/// operators.
pub const TRANSIENT_ARRAY_SIZE: usize = 32;

/// Value produced by the `random` operator.
///
/// Returning a genuinely random number would make output bytes depend on
/// interpreter state, so every evaluation observes this constant.
pub const RANDOM_VALUE: f64 = 0.618;

/// Trait for processing commands resulting from charstring evaluation.
///
/// Stem hints are reported with absolute edge coordinates (the wire format
/// accumulates successive position/width pairs). Path commands are reported
/// with absolute coordinates.
#[allow(unused_variables)]
pub trait CommandSink {
    /// Glyph advance width, as stored: the nominal width must be added by
    /// the caller. Reported at most once, before any other command.
    fn width(&mut self, width: Fixed) {}
    /// Horizontal stem hint with absolute edges `y` and `y1`.
    fn hstem(&mut self, y: Fixed, y1: Fixed) {}
    /// Vertical stem hint with absolute edges `x` and `x1`.
    fn vstem(&mut self, x: Fixed, x1: Fixed) {}
    /// Bitmask defining the hints that should be made active for the
    /// commands that follow.
    fn hint_mask(&mut self, mask: &[u8]) {}
    /// Bitmask defining the counter hints that should be made active for
    /// the commands that follow.
    fn counter_mask(&mut self, mask: &[u8]) {}
    fn move_to(&mut self, x: Fixed, y: Fixed);
    fn line_to(&mut self, x: Fixed, y: Fixed);
    fn curve_to(&mut self, cx0: Fixed, cy0: Fixed, cx1: Fixed, cy1: Fixed, x: Fixed, y: Fixed);
    fn close(&mut self);
}

/// Evaluates the given charstring and emits the resulting commands to the
/// specified sink.
pub fn evaluate(
    charstring_data: &[u8],
    global_subrs: &Index,
    local_subrs: Option<&Index>,
    sink: &mut impl CommandSink,
) -> Result<(), Error> {
    Evaluator::new(global_subrs, local_subrs).evaluate(charstring_data, sink)
}

struct Evaluator<'a, 'b> {
    global_subrs: &'b Index<'a>,
    local_subrs: Option<&'b Index<'a>>,
    is_open: bool,
    have_read_width: bool,
    stem_count: usize,
    stack: Stack,
    transient: [Fixed; TRANSIENT_ARRAY_SIZE],
    x: Fixed,
    y: Fixed,
}

impl<'a, 'b> Evaluator<'a, 'b> {
    fn new(global_subrs: &'b Index<'a>, local_subrs: Option<&'b Index<'a>>) -> Self {
        Self {
            global_subrs,
            local_subrs,
            is_open: false,
            have_read_width: false,
            stem_count: 0,
            stack: Stack::new(),
            transient: [Fixed::ZERO; TRANSIENT_ARRAY_SIZE],
            x: Fixed::ZERO,
            y: Fixed::ZERO,
        }
    }

    fn evaluate(&mut self, charstring_data: &'a [u8], sink: &mut impl CommandSink) -> Result<(), Error> {
        // Subroutine calls push the resumption point here rather than
        // recursing, so the machine call stack stays flat.
        let mut pending: Vec<Cursor<'a>> = Vec::new();
        let mut cursor = FontData::new(charstring_data).cursor();
        loop {
            if cursor.remaining_bytes() == 0 {
                match pending.pop() {
                    Some(frame) => {
                        cursor = frame;
                        continue;
                    }
                    None => break,
                }
            }
            let op = cursor.read::<u8>()?;
            match op {
                ops::ESCAPE => {
                    let two_byte_op = cursor.read::<u8>()?;
                    self.escaped_operator(two_byte_op, sink)?;
                }
                // Push an integer to the stack
                28 | 32..=254 => {
                    self.stack
                        .push(super::dict::parse_int(&mut cursor, op)?)?;
                }
                // Push a 16.16 fixed point value to the stack
                255 => {
                    let num = Fixed::from_bits(cursor.read::<i32>()?);
                    self.stack.push(num)?;
                }
                ops::RETURN => match pending.pop() {
                    Some(frame) => cursor = frame,
                    None => break,
                },
                ops::ENDCHAR => {
                    // The only odd operand counts here are a lone width or
                    // a width followed by the four accent composition
                    // arguments.
                    if self.stack.len_is_odd() && !self.have_read_width {
                        self.have_read_width = true;
                        sink.width(self.stack.get_fixed(0)?);
                    }
                    if self.is_open {
                        self.is_open = false;
                        sink.close();
                    }
                    self.stack.clear();
                    break;
                }
                ops::CALLSUBR | ops::CALLGSUBR => {
                    let subrs = if op == ops::CALLSUBR {
                        self.local_subrs.ok_or(Error::MissingSubroutines)?
                    } else {
                        self.global_subrs
                    };
                    let biased = self.stack.pop_i32()?;
                    let index = usize::try_from(biased + subrs.subr_bias())
                        .map_err(|_| Error::InvalidSubroutineIndex(biased))?;
                    let subr_data = subrs
                        .get(index)
                        .map_err(|_| Error::InvalidSubroutineIndex(biased))?;
                    if pending.len() == NESTING_DEPTH_LIMIT {
                        return Err(Error::CharstringNestingDepthLimitExceeded);
                    }
                    pending.push(cursor);
                    cursor = FontData::new(subr_data).cursor();
                }
                ops::HSTEM | ops::VSTEM | ops::HSTEMHM | ops::VSTEMHM => {
                    let is_horizontal = op == ops::HSTEM || op == ops::HSTEMHM;
                    self.emit_stems(is_horizontal, sink)?;
                    self.stack.clear();
                }
                // If there are arguments on the stack, a mask operator is
                // also an implied series of VSTEMHM operators.
                ops::HINTMASK | ops::CNTRMASK => {
                    self.emit_stems(false, sink)?;
                    let count = self.stem_count.div_ceil(8);
                    let mask = cursor.read_bytes(count)?;
                    if op == ops::HINTMASK {
                        sink.hint_mask(mask);
                    } else {
                        sink.counter_mask(mask);
                    }
                    self.stack.clear();
                }
                ops::RMOVETO => {
                    let mut i = 0;
                    if self.stack.len() == 3 && !self.have_read_width {
                        self.have_read_width = true;
                        i = 1;
                        sink.width(self.stack.get_fixed(0)?);
                    }
                    self.start_subpath(sink);
                    self.x += self.stack.get_fixed(i)?;
                    self.y += self.stack.get_fixed(i + 1)?;
                    sink.move_to(self.x, self.y);
                    self.stack.clear();
                }
                ops::HMOVETO | ops::VMOVETO => {
                    let mut i = 0;
                    if self.stack.len() == 2 && !self.have_read_width {
                        self.have_read_width = true;
                        i = 1;
                        sink.width(self.stack.get_fixed(0)?);
                    }
                    self.start_subpath(sink);
                    if op == ops::HMOVETO {
                        self.x += self.stack.get_fixed(i)?;
                    } else {
                        self.y += self.stack.get_fixed(i)?;
                    }
                    sink.move_to(self.x, self.y);
                    self.stack.clear();
                }
                ops::RLINETO => {
                    let mut i = 0;
                    while i < self.stack.len() {
                        self.x += self.stack.get_fixed(i)?;
                        self.y += self.stack.get_fixed(i + 1)?;
                        sink.line_to(self.x, self.y);
                        i += 2;
                    }
                    self.stack.clear();
                }
                ops::HLINETO | ops::VLINETO => {
                    let mut is_x = op == ops::HLINETO;
                    for i in 0..self.stack.len() {
                        let value = self.stack.get_fixed(i)?;
                        if is_x {
                            self.x += value;
                        } else {
                            self.y += value;
                        }
                        is_x = !is_x;
                        sink.line_to(self.x, self.y);
                    }
                    self.stack.clear();
                }
                ops::RRCURVETO | ops::RCURVELINE => {
                    let count = self.stack.len();
                    let mut i = 0;
                    while i + 6 <= count {
                        self.emit_relative_curve(i, sink)?;
                        i += 6;
                    }
                    if op == ops::RCURVELINE {
                        self.x += self.stack.get_fixed(i)?;
                        self.y += self.stack.get_fixed(i + 1)?;
                        sink.line_to(self.x, self.y);
                    }
                    self.stack.clear();
                }
                ops::RLINECURVE => {
                    let count = self.stack.len();
                    if count < 6 {
                        return Err(Error::StackUnderflow);
                    }
                    let mut i = 0;
                    while i < count - 6 {
                        self.x += self.stack.get_fixed(i)?;
                        self.y += self.stack.get_fixed(i + 1)?;
                        sink.line_to(self.x, self.y);
                        i += 2;
                    }
                    self.emit_relative_curve(i, sink)?;
                    self.stack.clear();
                }
                // Curves that start and end vertical, unless the stack
                // count is odd, in which case the first curve may start
                // with a horizontal tangent
                ops::VVCURVETO => {
                    let mut i = 0;
                    if self.stack.len_is_odd() {
                        self.x += self.stack.get_fixed(0)?;
                        i += 1;
                    }
                    while i < self.stack.len() {
                        let x1 = self.x;
                        let y1 = self.y + self.stack.get_fixed(i)?;
                        let x2 = x1 + self.stack.get_fixed(i + 1)?;
                        let y2 = y1 + self.stack.get_fixed(i + 2)?;
                        self.x = x2;
                        self.y = y2 + self.stack.get_fixed(i + 3)?;
                        sink.curve_to(x1, y1, x2, y2, self.x, self.y);
                        i += 4;
                    }
                    self.stack.clear();
                }
                ops::HHCURVETO => {
                    let mut i = 0;
                    if self.stack.len_is_odd() {
                        self.y += self.stack.get_fixed(0)?;
                        i += 1;
                    }
                    while i < self.stack.len() {
                        let x1 = self.x + self.stack.get_fixed(i)?;
                        let y1 = self.y;
                        let x2 = x1 + self.stack.get_fixed(i + 1)?;
                        let y2 = y1 + self.stack.get_fixed(i + 2)?;
                        self.x = x2 + self.stack.get_fixed(i + 3)?;
                        self.y = y2;
                        sink.curve_to(x1, y1, x2, y2, self.x, self.y);
                        i += 4;
                    }
                    self.stack.clear();
                }
                // Alternates between curves with horizontal and vertical
                // tangents
                ops::HVCURVETO | ops::VHCURVETO => {
                    let count = self.stack.len();
                    if count < 4 {
                        return Err(Error::StackUnderflow);
                    }
                    let mut i = 0;
                    let mut horizontal = op == ops::HVCURVETO;
                    while i + 4 <= count {
                        let (x1, y1, x2, y2, x3, y3);
                        let last = count - i < 8;
                        if horizontal {
                            x1 = self.x + self.stack.get_fixed(i)?;
                            y1 = self.y;
                            x2 = x1 + self.stack.get_fixed(i + 1)?;
                            y2 = y1 + self.stack.get_fixed(i + 2)?;
                            y3 = y2 + self.stack.get_fixed(i + 3)?;
                            x3 = if last && count - i == 5 {
                                x2 + self.stack.get_fixed(i + 4)?
                            } else {
                                x2
                            };
                        } else {
                            x1 = self.x;
                            y1 = self.y + self.stack.get_fixed(i)?;
                            x2 = x1 + self.stack.get_fixed(i + 1)?;
                            y2 = y1 + self.stack.get_fixed(i + 2)?;
                            x3 = x2 + self.stack.get_fixed(i + 3)?;
                            y3 = if last && count - i == 5 {
                                y2 + self.stack.get_fixed(i + 4)?
                            } else {
                                y2
                            };
                        }
                        sink.curve_to(x1, y1, x2, y2, x3, y3);
                        self.x = x3;
                        self.y = y3;
                        horizontal = !horizontal;
                        i += 4;
                    }
                    self.stack.clear();
                }
                _ => return Err(Error::InvalidCharstringOperator(op)),
            }
        }
        Ok(())
    }

    fn escaped_operator(&mut self, op: u8, sink: &mut impl CommandSink) -> Result<(), Error> {
        use ops::*;
        match op {
            // Deprecated; takes no action.
            DOTSECTION => {}
            // The "flex" operators emit either two curves or a straight
            // line depending on a flex depth parameter and the distance of
            // the joining point from the chord connecting the two end
            // points. In practice everyone emits the two curves, so we do
            // too.
            HFLEX => {
                let y0 = self.y;
                let x1 = self.x + self.stack.get_fixed(0)?;
                let y1 = y0;
                let x2 = x1 + self.stack.get_fixed(1)?;
                let y2 = y1 + self.stack.get_fixed(2)?;
                let x3 = x2 + self.stack.get_fixed(3)?;
                let y3 = y2;
                let x4 = x3 + self.stack.get_fixed(4)?;
                let y4 = y2;
                let x5 = x4 + self.stack.get_fixed(5)?;
                let y5 = y0;
                self.x = x5 + self.stack.get_fixed(6)?;
                sink.curve_to(x1, y1, x2, y2, x3, y3);
                sink.curve_to(x4, y4, x5, y5, self.x, self.y);
                self.stack.clear();
            }
            FLEX => {
                let x1 = self.x + self.stack.get_fixed(0)?;
                let y1 = self.y + self.stack.get_fixed(1)?;
                let x2 = x1 + self.stack.get_fixed(2)?;
                let y2 = y1 + self.stack.get_fixed(3)?;
                let x3 = x2 + self.stack.get_fixed(4)?;
                let y3 = y2 + self.stack.get_fixed(5)?;
                let x4 = x3 + self.stack.get_fixed(6)?;
                let y4 = y3 + self.stack.get_fixed(7)?;
                let x5 = x4 + self.stack.get_fixed(8)?;
                let y5 = y4 + self.stack.get_fixed(9)?;
                self.x = x5 + self.stack.get_fixed(10)?;
                self.y = y5 + self.stack.get_fixed(11)?;
                sink.curve_to(x1, y1, x2, y2, x3, y3);
                sink.curve_to(x4, y4, x5, y5, self.x, self.y);
                self.stack.clear();
            }
            HFLEX1 => {
                let y0 = self.y;
                let x1 = self.x + self.stack.get_fixed(0)?;
                let y1 = self.y + self.stack.get_fixed(1)?;
                let x2 = x1 + self.stack.get_fixed(2)?;
                let y2 = y1 + self.stack.get_fixed(3)?;
                let x3 = x2 + self.stack.get_fixed(4)?;
                let y3 = y2;
                let x4 = x3 + self.stack.get_fixed(5)?;
                let y4 = y2;
                let x5 = x4 + self.stack.get_fixed(6)?;
                let y5 = y4 + self.stack.get_fixed(7)?;
                self.x = x5 + self.stack.get_fixed(8)?;
                self.y = y0;
                sink.curve_to(x1, y1, x2, y2, x3, y3);
                sink.curve_to(x4, y4, x5, y5, self.x, self.y);
                self.stack.clear();
            }
            FLEX1 => {
                let x1 = self.x + self.stack.get_fixed(0)?;
                let y1 = self.y + self.stack.get_fixed(1)?;
                let x2 = x1 + self.stack.get_fixed(2)?;
                let y2 = y1 + self.stack.get_fixed(3)?;
                let x3 = x2 + self.stack.get_fixed(4)?;
                let y3 = y2 + self.stack.get_fixed(5)?;
                let x4 = x3 + self.stack.get_fixed(6)?;
                let y4 = y3 + self.stack.get_fixed(7)?;
                let x5 = x4 + self.stack.get_fixed(8)?;
                let y5 = y4 + self.stack.get_fixed(9)?;
                if (x5 - self.x).abs() > (y5 - self.y).abs() {
                    self.x = x5 + self.stack.get_fixed(10)?;
                } else {
                    self.y = y5 + self.stack.get_fixed(10)?;
                }
                sink.curve_to(x1, y1, x2, y2, x3, y3);
                sink.curve_to(x4, y4, x5, y5, self.x, self.y);
                self.stack.clear();
            }
            ABS => {
                let value = self.stack.pop_fixed()?;
                self.stack.push(value.abs())?;
            }
            ADD => {
                let (a, b) = self.pop_binary()?;
                self.stack.push(fixed_add(a, b))?;
            }
            SUB => {
                let (a, b) = self.pop_binary()?;
                self.stack.push(fixed_sub(a, b))?;
            }
            DIV => {
                let (a, b) = self.pop_binary()?;
                if b == Fixed::ZERO {
                    return Err(Error::DivisionByZero);
                }
                self.stack.push(a / b)?;
            }
            MUL => {
                let (a, b) = self.pop_binary()?;
                self.stack.push(a * b)?;
            }
            NEG => {
                let value = self.stack.pop_fixed()?;
                self.stack.push(fixed_sub(Fixed::ZERO, value))?;
            }
            SQRT => {
                let value = self.stack.pop_fixed()?.to_f64();
                if value < 0.0 {
                    return Err(Error::InvalidNumber);
                }
                self.stack.push(Fixed::from_f64(value.sqrt()))?;
            }
            RANDOM => {
                self.stack.push(Fixed::from_f64(RANDOM_VALUE))?;
            }
            DROP => {
                self.stack.pop_number()?;
            }
            EXCH => self.stack.exch()?,
            INDEX => {
                let depth = self.pop_count()?;
                self.stack.copy_from_depth(depth)?;
            }
            ROLL => {
                let shift = self.pop_count()?;
                let count = self.pop_count()?;
                self.stack.roll(count, shift)?;
            }
            DUP => self.stack.dup()?,
            PUT => {
                let index = self.pop_count()?;
                let value = self.stack.pop_fixed()?;
                *self
                    .transient
                    .get_mut(usize::try_from(index).unwrap_or(usize::MAX))
                    .ok_or(Error::InvalidTransientAccess(index))? = value;
            }
            GET => {
                let index = self.pop_count()?;
                let value = *self
                    .transient
                    .get(usize::try_from(index).unwrap_or(usize::MAX))
                    .ok_or(Error::InvalidTransientAccess(index))?;
                self.stack.push(value)?;
            }
            AND => {
                let (a, b) = self.pop_binary()?;
                self.push_bool(a != Fixed::ZERO && b != Fixed::ZERO)?;
            }
            OR => {
                let (a, b) = self.pop_binary()?;
                self.push_bool(a != Fixed::ZERO || b != Fixed::ZERO)?;
            }
            NOT => {
                let value = self.stack.pop_fixed()?;
                self.push_bool(value == Fixed::ZERO)?;
            }
            EQ => {
                let (a, b) = self.pop_binary()?;
                self.push_bool(a == b)?;
            }
            IFELSE => {
                let v2 = self.stack.pop_fixed()?;
                let v1 = self.stack.pop_fixed()?;
                let s2 = self.stack.pop_number()?;
                let s1 = self.stack.pop_number()?;
                self.stack.push(if v1 <= v2 { s1 } else { s2 })?;
            }
            _ => return Err(Error::InvalidCharstringOperator(op)),
        }
        Ok(())
    }

    /// Consumes an optional leading width and emits the stem hints
    /// currently on the stack.
    fn emit_stems(&mut self, is_horizontal: bool, sink: &mut impl CommandSink) -> Result<(), Error> {
        let mut i = 0;
        let len = if self.stack.len_is_odd() && !self.have_read_width {
            self.have_read_width = true;
            i = 1;
            sink.width(self.stack.get_fixed(0)?);
            self.stack.len() - 1
        } else {
            self.stack.len()
        };
        let mut u = Fixed::ZERO;
        while i + 1 < self.stack.len() {
            u = fixed_add(u, self.stack.get_fixed(i)?);
            let w = self.stack.get_fixed(i + 1)?;
            let v = u.wrapping_add(w);
            if is_horizontal {
                sink.hstem(u, v);
            } else {
                sink.vstem(u, v);
            }
            u = v;
            i += 2;
        }
        self.stem_count += len / 2;
        Ok(())
    }

    fn start_subpath(&mut self, sink: &mut impl CommandSink) {
        if !self.is_open {
            self.is_open = true;
        } else {
            sink.close();
        }
    }

    fn emit_relative_curve(&mut self, i: usize, sink: &mut impl CommandSink) -> Result<(), Error> {
        let x1 = self.x + self.stack.get_fixed(i)?;
        let y1 = self.y + self.stack.get_fixed(i + 1)?;
        let x2 = x1 + self.stack.get_fixed(i + 2)?;
        let y2 = y1 + self.stack.get_fixed(i + 3)?;
        self.x = x2 + self.stack.get_fixed(i + 4)?;
        self.y = y2 + self.stack.get_fixed(i + 5)?;
        sink.curve_to(x1, y1, x2, y2, self.x, self.y);
        Ok(())
    }

    fn pop_binary(&mut self) -> Result<(Fixed, Fixed), Error> {
        let b = self.stack.pop_fixed()?;
        let a = self.stack.pop_fixed()?;
        Ok((a, b))
    }

    fn push_bool(&mut self, value: bool) -> Result<(), Error> {
        self.stack.push(value as i32)
    }

    /// Pops a small count or index, tolerating fixed point representations.
    fn pop_count(&mut self) -> Result<i32, Error> {
        Ok(match self.stack.pop_number()? {
            Number::I32(value) => value,
            Number::Fixed(value) => value.to_f64() as i32,
        })
    }
}

fn fixed_add(a: Fixed, b: Fixed) -> Fixed {
    a.wrapping_add(b)
}

fn fixed_sub(a: Fixed, b: Fixed) -> Fixed {
    Fixed::from_bits(a.to_bits().wrapping_sub(b.to_bits()))
}

/// Charstring operators.
///
/// See "Appendix A Type 2 Charstring Command Codes" in Adobe Technical
/// Note #5177.
pub mod ops {
    // One byte operators
    pub const HSTEM: u8 = 1;
    pub const VSTEM: u8 = 3;
    pub const VMOVETO: u8 = 4;
    pub const RLINETO: u8 = 5;
    pub const HLINETO: u8 = 6;
    pub const VLINETO: u8 = 7;
    pub const RRCURVETO: u8 = 8;
    pub const CALLSUBR: u8 = 10;
    pub const RETURN: u8 = 11;
    pub const ENDCHAR: u8 = 14;
    pub const HSTEMHM: u8 = 18;
    pub const HINTMASK: u8 = 19;
    pub const CNTRMASK: u8 = 20;
    pub const RMOVETO: u8 = 21;
    pub const HMOVETO: u8 = 22;
    pub const VSTEMHM: u8 = 23;
    pub const RCURVELINE: u8 = 24;
    pub const RLINECURVE: u8 = 25;
    pub const VVCURVETO: u8 = 26;
    pub const HHCURVETO: u8 = 27;
    pub const CALLGSUBR: u8 = 29;
    pub const VHCURVETO: u8 = 30;
    pub const HVCURVETO: u8 = 31;

    // Escape code to trigger processing of a two byte operator
    pub const ESCAPE: u8 = 12;

    // Two byte operators
    pub const DOTSECTION: u8 = 0;
    pub const AND: u8 = 3;
    pub const OR: u8 = 4;
    pub const NOT: u8 = 5;
    pub const ABS: u8 = 9;
    pub const ADD: u8 = 10;
    pub const SUB: u8 = 11;
    pub const DIV: u8 = 12;
    pub const NEG: u8 = 14;
    pub const EQ: u8 = 15;
    pub const DROP: u8 = 18;
    pub const PUT: u8 = 20;
    pub const GET: u8 = 21;
    pub const IFELSE: u8 = 22;
    pub const RANDOM: u8 = 23;
    pub const MUL: u8 = 24;
    pub const SQRT: u8 = 26;
    pub const DUP: u8 = 27;
    pub const EXCH: u8 = 28;
    pub const INDEX: u8 = 29;
    pub const ROLL: u8 = 30;
    pub const HFLEX: u8 = 34;
    pub const FLEX: u8 = 35;
    pub const HFLEX1: u8 = 36;
    pub const FLEX1: u8 = 37;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FontData;
    use cff_test_data::charstrings;

    #[derive(Copy, Clone, PartialEq, Debug)]
    enum Command {
        Width(Fixed),
        HStem(Fixed, Fixed),
        VStem(Fixed, Fixed),
        MoveTo(Fixed, Fixed),
        LineTo(Fixed, Fixed),
        CurveTo(Fixed, Fixed, Fixed, Fixed, Fixed, Fixed),
        Close,
    }

    #[derive(PartialEq, Default, Debug)]
    struct CaptureCommandSink {
        commands: Vec<Command>,
        masks: Vec<Vec<u8>>,
    }

    impl CommandSink for CaptureCommandSink {
        fn width(&mut self, width: Fixed) {
            self.commands.push(Command::Width(width))
        }

        fn hstem(&mut self, y: Fixed, y1: Fixed) {
            self.commands.push(Command::HStem(y, y1))
        }

        fn vstem(&mut self, x: Fixed, x1: Fixed) {
            self.commands.push(Command::VStem(x, x1))
        }

        fn hint_mask(&mut self, mask: &[u8]) {
            self.masks.push(mask.to_vec());
        }

        fn move_to(&mut self, x: Fixed, y: Fixed) {
            self.commands.push(Command::MoveTo(x, y))
        }

        fn line_to(&mut self, x: Fixed, y: Fixed) {
            self.commands.push(Command::LineTo(x, y))
        }

        fn curve_to(&mut self, cx0: Fixed, cy0: Fixed, cx1: Fixed, cy1: Fixed, x: Fixed, y: Fixed) {
            self.commands
                .push(Command::CurveTo(cx0, cy0, cx1, cy1, x, y))
        }

        fn close(&mut self) {
            self.commands.push(Command::Close)
        }
    }

    fn run(charstring: &[u8]) -> CaptureCommandSink {
        let empty = Index::default();
        let mut sink = CaptureCommandSink::default();
        evaluate(charstring, &empty, None, &mut sink).unwrap();
        sink
    }

    fn fix(value: i32) -> Fixed {
        Fixed::from_i32(value)
    }

    #[test]
    fn nested_squares_commands() {
        use Command::*;
        let sink = run(&charstrings::nested_squares());
        let expected = [
            Width(fix(500)),
            MoveTo(fix(50), fix(50)),
            LineTo(fix(950), fix(50)),
            LineTo(fix(950), fix(950)),
            LineTo(fix(50), fix(950)),
            Close,
            MoveTo(fix(100), fix(100)),
            LineTo(fix(900), fix(100)),
            LineTo(fix(900), fix(900)),
            LineTo(fix(100), fix(900)),
            Close,
        ];
        assert_eq!(sink.commands, expected);
    }

    #[test]
    fn alternating_lines_and_curves() {
        use Command::*;
        let sink = run(&charstrings::lines_and_curves());
        let expected = [
            MoveTo(fix(25), fix(0)),
            LineTo(fix(125), fix(0)),
            LineTo(fix(125), fix(200)),
            LineTo(fix(75), fix(200)),
            CurveTo(
                fix(85),
                fix(220),
                fix(115),
                fix(260),
                fix(165),
                fix(320),
            ),
            Close,
        ];
        assert_eq!(sink.commands, expected);
    }

    #[test]
    fn stem_hints_and_mask() {
        use Command::*;
        let sink = run(&charstrings::hinted_bar());
        let expected = [
            HStem(fix(100), fix(150)),
            HStem(fix(450), fix(500)),
            VStem(fix(40), fix(100)),
            MoveTo(fix(40), fix(100)),
            LineTo(fix(100), fix(100)),
            LineTo(fix(100), fix(350)),
            LineTo(fix(40), fix(350)),
            Close,
        ];
        assert_eq!(sink.commands, expected);
        assert_eq!(sink.masks, vec![vec![0b1110_0000]]);
    }

    #[test]
    fn subroutine_call_and_return() {
        // A subr that draws a 10x10 box edge, called from a charstring.
        let mut subr = Vec::new();
        charstrings::push_int(&mut subr, 10);
        charstrings::push_int(&mut subr, 10);
        subr.extend_from_slice(&[5, 11]); // rlineto, return
                                          // INDEX with the single subr; bias is 107.
        let mut index_data = vec![0u8, 1, 1, 1];
        index_data.push(1 + subr.len() as u8);
        index_data.extend_from_slice(&subr);
        let gsubrs = Index::read(FontData::new(&index_data)).unwrap();

        let mut cs = Vec::new();
        charstrings::push_int(&mut cs, 0);
        charstrings::push_int(&mut cs, 0);
        cs.push(super::ops::RMOVETO);
        charstrings::push_int(&mut cs, -107); // biased index of subr 0
        cs.push(super::ops::CALLGSUBR);
        cs.push(super::ops::ENDCHAR);

        let mut sink = CaptureCommandSink::default();
        evaluate(&cs, &gsubrs, None, &mut sink).unwrap();
        use Command::*;
        assert_eq!(
            sink.commands,
            vec![
                MoveTo(fix(0), fix(0)),
                LineTo(fix(10), fix(10)),
                Close,
            ]
        );
    }

    #[test]
    fn arithmetic_operators() {
        // 3 4 add 2 mul 14 sub => 0, then 0 20 rmoveto consumes it as x.
        let mut cs = Vec::new();
        charstrings::push_int(&mut cs, 3);
        charstrings::push_int(&mut cs, 4);
        cs.extend_from_slice(&[12, 10]); // add
        charstrings::push_int(&mut cs, 2);
        cs.extend_from_slice(&[12, 24]); // mul
        charstrings::push_int(&mut cs, 14);
        cs.extend_from_slice(&[12, 11]); // sub
        charstrings::push_int(&mut cs, 20);
        cs.push(super::ops::RMOVETO);
        cs.push(super::ops::ENDCHAR);
        let empty = Index::default();
        let mut sink = CaptureCommandSink::default();
        evaluate(&cs, &empty, None, &mut sink).unwrap();
        assert_eq!(
            sink.commands,
            vec![Command::MoveTo(fix(0), fix(20)), Command::Close]
        );
    }

    #[test]
    fn transient_array() {
        // 42 0 put ... 0 get retrieves it back.
        let mut cs = Vec::new();
        charstrings::push_int(&mut cs, 42);
        charstrings::push_int(&mut cs, 0);
        cs.extend_from_slice(&[12, 20]); // put
        charstrings::push_int(&mut cs, 0);
        cs.extend_from_slice(&[12, 21]); // get
        charstrings::push_int(&mut cs, 0);
        cs.push(super::ops::RMOVETO);
        cs.push(super::ops::ENDCHAR);
        let empty = Index::default();
        let mut sink = CaptureCommandSink::default();
        evaluate(&cs, &empty, None, &mut sink).unwrap();
        assert_eq!(
            sink.commands,
            vec![Command::MoveTo(fix(42), fix(0)), Command::Close]
        );
    }

    #[test]
    fn nesting_limit() {
        // A subr that calls itself forever.
        let subr = [139u8 - 107, 10]; // push -107, callsubr -> index 0
        let mut index_data = vec![0u8, 1, 1, 1];
        index_data.push(1 + subr.len() as u8);
        index_data.extend_from_slice(&subr);
        let subrs = Index::read(FontData::new(&index_data)).unwrap();
        let cs = [139u8 - 107, 10]; // call subr 0
        let empty = Index::default();
        let mut sink = CaptureCommandSink::default();
        let result = evaluate(&cs, &empty, Some(&subrs), &mut sink);
        assert!(matches!(
            result,
            Err(Error::CharstringNestingDepthLimitExceeded)
        ));
    }

    #[test]
    fn unknown_operator() {
        let cs = [2u8];
        let empty = Index::default();
        let mut sink = CaptureCommandSink::default();
        assert!(matches!(
            evaluate(&cs, &empty, None, &mut sink),
            Err(Error::InvalidCharstringOperator(2))
        ));
    }

    #[test]
    fn division_by_zero() {
        let mut cs = Vec::new();
        charstrings::push_int(&mut cs, 1);
        charstrings::push_int(&mut cs, 0);
        cs.extend_from_slice(&[12, 12]); // div
        let empty = Index::default();
        let mut sink = CaptureCommandSink::default();
        assert!(matches!(
            evaluate(&cs, &empty, None, &mut sink),
            Err(Error::DivisionByZero)
        ));
    }
}
