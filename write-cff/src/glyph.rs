//! The owned glyph model.

use font_types::{BoundingBox, Fixed};

/// A single path or hinting command of a glyph.
///
/// Coordinates are absolute; the relative encoding of the wire format is
/// applied when the glyph is serialized.
#[derive(Clone, PartialEq, Debug)]
pub enum Command {
    MoveTo(Fixed, Fixed),
    LineTo(Fixed, Fixed),
    /// A cubic Bézier with two control points and the end point.
    CurveTo(Fixed, Fixed, Fixed, Fixed, Fixed, Fixed),
    /// Activates the stem hints selected by the mask bytes.
    HintMask(Vec<u8>),
    /// Declares the counter whitespace controlled by the masked stems.
    CounterMask(Vec<u8>),
}

/// A glyph: an advance width, stem hints, and a command list.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Glyph {
    /// Glyph name; present exactly when the font is simple.
    pub name: Option<String>,
    /// Horizontal advance width in font design units.
    pub width: Fixed,
    pub commands: Vec<Command>,
    /// Horizontal stem hints as absolute (bottom, top) edge pairs.
    pub hstems: Vec<(Fixed, Fixed)>,
    /// Vertical stem hints as absolute (left, right) edge pairs.
    pub vstems: Vec<(Fixed, Fixed)>,
}

impl Glyph {
    /// Creates an empty glyph with the given width.
    pub fn new(name: Option<String>, width: Fixed) -> Self {
        Self {
            name,
            width,
            ..Default::default()
        }
    }

    /// `true` if the glyph has masks, which changes how its stem hints are
    /// declared on the wire.
    pub(crate) fn has_masks(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, Command::HintMask(_) | Command::CounterMask(_)))
    }

    /// Returns the control box of the glyph: the bounding box of all path
    /// points, with curves bounded by their control points.
    ///
    /// Returns `None` for a glyph with no path commands.
    pub fn bounds(&self) -> Option<BoundingBox<Fixed>> {
        let mut bounds: Option<BoundingBox<Fixed>> = None;
        let mut add = |x: Fixed, y: Fixed| {
            bounds = Some(match bounds {
                None => BoundingBox {
                    x_min: x,
                    y_min: y,
                    x_max: x,
                    y_max: y,
                },
                Some(b) => BoundingBox {
                    x_min: b.x_min.min(x),
                    y_min: b.y_min.min(y),
                    x_max: b.x_max.max(x),
                    y_max: b.y_max.max(y),
                },
            });
        };
        for command in &self.commands {
            match command {
                Command::MoveTo(x, y) | Command::LineTo(x, y) => add(*x, *y),
                Command::CurveTo(x0, y0, x1, y1, x, y) => {
                    add(*x0, *y0);
                    add(*x1, *y1);
                    add(*x, *y);
                }
                Command::HintMask(_) | Command::CounterMask(_) => {}
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(v: i32) -> Fixed {
        Fixed::from_i32(v)
    }

    #[test]
    fn bounds_cover_control_points() {
        let glyph = Glyph {
            commands: vec![
                Command::MoveTo(fix(10), fix(20)),
                Command::LineTo(fix(100), fix(20)),
                Command::CurveTo(fix(120), fix(-5), fix(130), fix(80), fix(90), fix(60)),
            ],
            ..Default::default()
        };
        let bounds = glyph.bounds().unwrap();
        assert_eq!(bounds.x_min, fix(10));
        assert_eq!(bounds.y_min, fix(-5));
        assert_eq!(bounds.x_max, fix(130));
        assert_eq!(bounds.y_max, fix(80));
    }

    #[test]
    fn empty_glyph_has_no_bounds() {
        assert!(Glyph::default().bounds().is_none());
    }
}
