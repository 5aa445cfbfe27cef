//! The owned font model.

use font_types::Fixed;
use read_cff::dict::Operator;

use crate::dict::{Dict, Operand};
use crate::encoding::Encoding;
use crate::error::Error;
use crate::glyph::Glyph;

/// Identifying metadata shared by both font flavors.
#[derive(Clone, PartialEq, Debug)]
pub struct FontInfo {
    pub version: Option<String>,
    pub notice: Option<String>,
    pub copyright: Option<String>,
    pub full_name: Option<String>,
    pub family_name: Option<String>,
    pub weight: Option<String>,
    pub is_fixed_pitch: bool,
    pub italic_angle: f64,
    pub underline_position: f64,
    pub underline_thickness: f64,
    pub paint_type: i32,
    pub stroke_width: f64,
    pub font_matrix: [f64; 6],
    pub font_bbox: Option<[f64; 4]>,
    pub unique_id: Option<i32>,
    pub xuid: Vec<i32>,
    pub postscript: Option<String>,
    pub base_font_name: Option<String>,
    pub synthetic_base: Option<i32>,
}

/// The identity font matrix in CFF terms: 1000 units per em.
pub const DEFAULT_FONT_MATRIX: [f64; 6] = [0.001, 0.0, 0.0, 0.001, 0.0, 0.0];

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            version: None,
            notice: None,
            copyright: None,
            full_name: None,
            family_name: None,
            weight: None,
            is_fixed_pitch: false,
            italic_angle: 0.0,
            underline_position: -100.0,
            underline_thickness: 50.0,
            paint_type: 0,
            stroke_width: 0.0,
            font_matrix: DEFAULT_FONT_MATRIX,
            font_bbox: None,
            unique_id: None,
            xuid: Vec::new(),
            postscript: None,
            base_font_name: None,
            synthetic_base: None,
        }
    }
}

/// Type 2 interpreter parameters and hinting zones for a group of glyphs.
#[derive(Clone, PartialEq, Debug)]
pub struct PrivateDict {
    pub blue_values: Vec<i32>,
    pub other_blues: Vec<i32>,
    pub family_blues: Vec<i32>,
    pub family_other_blues: Vec<i32>,
    pub blue_scale: f64,
    pub blue_shift: f64,
    pub blue_fuzz: f64,
    pub std_hw: Option<f64>,
    pub std_vw: Option<f64>,
    pub stem_snap_h: Vec<f64>,
    pub stem_snap_v: Vec<f64>,
    pub force_bold: bool,
    pub language_group: i32,
    pub expansion_factor: f64,
    pub initial_random_seed: i32,
    pub default_width_x: Fixed,
    pub nominal_width_x: Fixed,
    /// Local subroutines, carried through unchanged for reading; newly
    /// written charstrings never reference them.
    pub local_subrs: Vec<Vec<u8>>,
}

pub(crate) const DEFAULT_BLUE_SCALE: f64 = 0.039625;
pub(crate) const DEFAULT_BLUE_SHIFT: f64 = 7.0;
pub(crate) const DEFAULT_BLUE_FUZZ: f64 = 1.0;
pub(crate) const DEFAULT_EXPANSION_FACTOR: f64 = 0.06;

impl Default for PrivateDict {
    fn default() -> Self {
        Self {
            blue_values: Vec::new(),
            other_blues: Vec::new(),
            family_blues: Vec::new(),
            family_other_blues: Vec::new(),
            blue_scale: DEFAULT_BLUE_SCALE,
            blue_shift: DEFAULT_BLUE_SHIFT,
            blue_fuzz: DEFAULT_BLUE_FUZZ,
            std_hw: None,
            std_vw: None,
            stem_snap_h: Vec::new(),
            stem_snap_v: Vec::new(),
            force_bold: false,
            language_group: 0,
            expansion_factor: DEFAULT_EXPANSION_FACTOR,
            initial_random_seed: 0,
            default_width_x: Fixed::ZERO,
            nominal_width_x: Fixed::ZERO,
            local_subrs: Vec::new(),
        }
    }
}

impl PrivateDict {
    /// Interprets a decoded DICT, accumulating the delta-encoded lists and
    /// applying defaults and clamps.
    pub fn from_dict(dict: &Dict) -> Self {
        let mut private = Self::default();
        if let Some(values) = dict.floats(Operator::BlueValues) {
            private.blue_values = accumulate_ints(&values);
        }
        if let Some(values) = dict.floats(Operator::OtherBlues) {
            private.other_blues = accumulate_ints(&values);
        }
        if let Some(values) = dict.floats(Operator::FamilyBlues) {
            private.family_blues = accumulate_ints(&values);
        }
        if let Some(values) = dict.floats(Operator::FamilyOtherBlues) {
            private.family_other_blues = accumulate_ints(&values);
        }
        if let Some(value) = dict.float(Operator::BlueScale) {
            private.blue_scale = value.clamp(0.0, 1.0);
        }
        if let Some(value) = dict.float(Operator::BlueShift) {
            private.blue_shift = value;
        }
        if let Some(value) = dict.float(Operator::BlueFuzz) {
            private.blue_fuzz = value;
        }
        private.std_hw = dict.float(Operator::StdHw).map(|v| v.clamp(0.0, 10000.0));
        private.std_vw = dict.float(Operator::StdVw).map(|v| v.clamp(0.0, 10000.0));
        if let Some(values) = dict.floats(Operator::StemSnapH) {
            private.stem_snap_h = accumulate(&values);
        }
        if let Some(values) = dict.floats(Operator::StemSnapV) {
            private.stem_snap_v = accumulate(&values);
        }
        private.force_bold = dict.float(Operator::ForceBold).unwrap_or(0.0) != 0.0;
        if let Some(value) = dict.int(Operator::LanguageGroup) {
            private.language_group = value;
        }
        if let Some(value) = dict.float(Operator::ExpansionFactor) {
            private.expansion_factor = value;
        }
        if let Some(value) = dict.int(Operator::InitialRandomSeed) {
            private.initial_random_seed = value;
        }
        if let Some(value) = dict.float(Operator::DefaultWidthX) {
            private.default_width_x = Fixed::from_f64(value);
        }
        if let Some(value) = dict.float(Operator::NominalWidthX) {
            private.nominal_width_x = Fixed::from_f64(value);
        }
        private
    }

    /// Produces the DICT for serialization, delta-encoding the list
    /// operators and omitting entries that hold their default value.
    ///
    /// `subrs_offset` is the offset from the start of this DICT's data to
    /// the local subroutine INDEX, when one follows.
    pub fn to_dict(&self, subrs_offset: Option<i32>) -> Dict {
        let mut dict = Dict::new();
        set_int_deltas(&mut dict, Operator::BlueValues, &self.blue_values);
        set_int_deltas(&mut dict, Operator::OtherBlues, &self.other_blues);
        set_int_deltas(&mut dict, Operator::FamilyBlues, &self.family_blues);
        set_int_deltas(&mut dict, Operator::FamilyOtherBlues, &self.family_other_blues);
        if self.blue_scale != DEFAULT_BLUE_SCALE {
            dict.set_real(Operator::BlueScale, self.blue_scale);
        }
        if self.blue_shift != DEFAULT_BLUE_SHIFT {
            dict.set(Operator::BlueShift, vec![number_operand(self.blue_shift)]);
        }
        if self.blue_fuzz != DEFAULT_BLUE_FUZZ {
            dict.set(Operator::BlueFuzz, vec![number_operand(self.blue_fuzz)]);
        }
        if let Some(value) = self.std_hw {
            dict.set(Operator::StdHw, vec![number_operand(value)]);
        }
        if let Some(value) = self.std_vw {
            dict.set(Operator::StdVw, vec![number_operand(value)]);
        }
        set_deltas(&mut dict, Operator::StemSnapH, &self.stem_snap_h);
        set_deltas(&mut dict, Operator::StemSnapV, &self.stem_snap_v);
        if self.force_bold {
            dict.set_int(Operator::ForceBold, 1);
        }
        if self.language_group != 0 {
            dict.set_int(Operator::LanguageGroup, self.language_group);
        }
        if self.expansion_factor != DEFAULT_EXPANSION_FACTOR {
            dict.set_real(Operator::ExpansionFactor, self.expansion_factor);
        }
        if self.initial_random_seed != 0 {
            dict.set_int(Operator::InitialRandomSeed, self.initial_random_seed);
        }
        if self.default_width_x != Fixed::ZERO {
            dict.set(
                Operator::DefaultWidthX,
                vec![number_operand(self.default_width_x.to_f64())],
            );
        }
        if self.nominal_width_x != Fixed::ZERO {
            dict.set(
                Operator::NominalWidthX,
                vec![number_operand(self.nominal_width_x.to_f64())],
            );
        }
        if let Some(offset) = subrs_offset {
            dict.set_int(Operator::Subrs, offset);
        }
        dict
    }
}

/// Chooses the integer representation when the value is exactly integral.
pub(crate) fn number_operand(value: f64) -> Operand {
    if value.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(&value) {
        Operand::Int(value as i32)
    } else {
        Operand::Real(value)
    }
}

fn accumulate(deltas: &[f64]) -> Vec<f64> {
    deltas
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

fn accumulate_ints(deltas: &[f64]) -> Vec<i32> {
    accumulate(deltas)
        .into_iter()
        .map(|v| v.round() as i32)
        .collect()
}

fn set_int_deltas(dict: &mut Dict, op: Operator, values: &[i32]) {
    if values.is_empty() {
        return;
    }
    let mut prev = 0;
    let operands = values
        .iter()
        .map(|v| {
            let delta = v - prev;
            prev = *v;
            Operand::Int(delta)
        })
        .collect();
    dict.set(op, operands);
}

fn set_deltas(dict: &mut Dict, op: Operator, values: &[f64]) {
    if values.is_empty() {
        return;
    }
    let mut prev = 0.0;
    let operands = values
        .iter()
        .map(|v| {
            let delta = v - prev;
            prev = *v;
            number_operand(delta)
        })
        .collect();
    dict.set(op, operands);
}

/// Outline data specific to a simple (non-CID) font.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SimpleOutlines {
    pub private: PrivateDict,
    pub encoding: Encoding,
}

/// One entry of a CID-keyed font's FD array.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SubFont {
    pub font_name: Option<String>,
    /// Per-subfont matrix; replaces the top-level matrix for glyphs
    /// selected into this subfont.
    pub font_matrix: Option<[f64; 6]>,
    pub private: PrivateDict,
}

/// Outline data specific to a CID-keyed font.
#[derive(Clone, PartialEq, Debug)]
pub struct CidOutlines {
    pub registry: String,
    pub ordering: String,
    pub supplement: i32,
    pub cid_font_version: f64,
    pub cid_font_revision: f64,
    pub cid_font_type: i32,
    pub uid_base: Option<i32>,
    pub cid_count: u32,
    /// Per-glyph character identifiers; index 0 must map to CID 0.
    pub cids: Vec<u16>,
    pub sub_fonts: Vec<SubFont>,
    /// Per-glyph subfont selector.
    pub fd_select: Vec<u8>,
}

impl Default for CidOutlines {
    fn default() -> Self {
        Self {
            registry: "Adobe".to_owned(),
            ordering: "Identity".to_owned(),
            supplement: 0,
            cid_font_version: 0.0,
            cid_font_revision: 0.0,
            cid_font_type: 0,
            uid_base: None,
            cid_count: 8720,
            cids: Vec::new(),
            sub_fonts: Vec::new(),
            fd_select: Vec::new(),
        }
    }
}

/// The two top-level font flavors.
#[derive(Clone, PartialEq, Debug)]
pub enum Outlines {
    Simple(SimpleOutlines),
    Cid(CidOutlines),
}

/// An owned CFF font.
///
/// Constructed by [`Font::read`] or field by field; transformed with
/// [`Font::subset`]; serialized with [`Font::write`]. Glyph index 0 is the
/// `.notdef` glyph and must always be present.
#[derive(Clone, PartialEq, Debug)]
pub struct Font {
    /// The PostScript font name stored in the name INDEX.
    pub name: String,
    pub info: FontInfo,
    pub glyphs: Vec<Glyph>,
    /// Global subroutines, carried through unchanged for reading; newly
    /// written charstrings never reference them.
    pub global_subrs: Vec<Vec<u8>>,
    pub outlines: Outlines,
}

impl Font {
    /// Creates an empty simple font with a lone `.notdef` glyph.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            info: FontInfo::default(),
            glyphs: vec![Glyph::new(Some(".notdef".to_owned()), Fixed::ZERO)],
            global_subrs: Vec::new(),
            outlines: Outlines::Simple(SimpleOutlines::default()),
        }
    }

    pub fn is_cid_keyed(&self) -> bool {
        matches!(self.outlines, Outlines::Cid(_))
    }

    /// Checks the structural invariants that the serializer relies on.
    pub fn validate(&self) -> Result<(), Error> {
        if self.glyphs.is_empty() {
            return Err(Error::inconsistent("font has no glyphs (missing .notdef)"));
        }
        if self.glyphs.len() > u16::MAX as usize {
            return Err(Error::Overflow("glyph count"));
        }
        match &self.outlines {
            Outlines::Simple(simple) => {
                for (gid, glyph) in self.glyphs.iter().enumerate() {
                    if glyph.name.is_none() {
                        return Err(Error::inconsistent(format!(
                            "glyph {gid} of a simple font has no name"
                        )));
                    }
                }
                for (_, gid) in simple.encoding.mappings() {
                    if gid as usize >= self.glyphs.len() {
                        return Err(Error::inconsistent(format!(
                            "encoding references missing glyph {gid}"
                        )));
                    }
                }
            }
            Outlines::Cid(cid) => {
                if let Some(gid) = self.glyphs.iter().position(|g| g.name.is_some()) {
                    return Err(Error::inconsistent(format!(
                        "glyph {gid} of a CID-keyed font has a name"
                    )));
                }
                if cid.cids.len() != self.glyphs.len() {
                    return Err(Error::inconsistent(
                        "CID array length does not match the glyph count",
                    ));
                }
                if cid.cids.first() != Some(&0) {
                    return Err(Error::inconsistent("glyph 0 must map to CID 0"));
                }
                if cid.sub_fonts.is_empty() {
                    return Err(Error::inconsistent("CID-keyed font has no subfonts"));
                }
                if cid.fd_select.len() != self.glyphs.len() {
                    return Err(Error::inconsistent(
                        "FDSelect length does not match the glyph count",
                    ));
                }
                if let Some(fd) = cid
                    .fd_select
                    .iter()
                    .find(|fd| **fd as usize >= cid.sub_fonts.len())
                {
                    return Err(Error::inconsistent(format!(
                        "FDSelect references missing subfont {fd}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the private DICT that governs the given glyph.
    pub fn private_for_glyph(&self, gid: usize) -> Option<&PrivateDict> {
        match &self.outlines {
            Outlines::Simple(simple) => Some(&simple.private),
            Outlines::Cid(cid) => {
                let fd = *cid.fd_select.get(gid)? as usize;
                Some(&cid.sub_fonts.get(fd)?.private)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::StringTable;

    #[test]
    fn private_dict_round_trip() {
        let private = PrivateDict {
            blue_values: vec![-15, 0, 443, 453, 657, 667],
            other_blues: vec![-250, -240],
            blue_scale: 0.04,
            std_hw: Some(55.0),
            std_vw: Some(85.0),
            stem_snap_h: vec![40.0, 55.0],
            stem_snap_v: vec![85.0, 95.0],
            force_bold: true,
            default_width_x: Fixed::from_i32(500),
            nominal_width_x: Fixed::from_i32(657),
            ..Default::default()
        };
        let dict = private.to_dict(None);
        let mut strings = StringTable::new();
        let bytes = dict.encode(&mut strings).unwrap();
        let decoded = Dict::from_bytes(&bytes, &strings).unwrap();
        let mut round_tripped = PrivateDict::from_dict(&decoded);
        round_tripped.local_subrs = private.local_subrs.clone();
        assert_eq!(round_tripped, private);
    }

    #[test]
    fn private_dict_defaults_are_omitted() {
        let dict = PrivateDict::default().to_dict(None);
        assert!(dict.is_empty());
    }

    #[test]
    fn clamps_applied_on_read() {
        let mut dict = Dict::new();
        dict.set_real(Operator::BlueScale, 7.5);
        dict.set_real(Operator::StdHw, -3.0);
        let private = PrivateDict::from_dict(&dict);
        assert_eq!(private.blue_scale, 1.0);
        assert_eq!(private.std_hw, Some(0.0));
    }

    #[test]
    fn validate_rejects_flavor_mixtures() {
        let mut font = Font::new("Test");
        font.glyphs[0].name = None;
        assert!(font.validate().is_err());

        let mut font = Font::new("Test");
        font.outlines = Outlines::Cid(CidOutlines {
            cids: vec![0],
            sub_fonts: vec![SubFont::default()],
            fd_select: vec![0],
            ..Default::default()
        });
        // glyph still carries a name
        assert!(font.validate().is_err());
        font.glyphs[0].name = None;
        assert!(font.validate().is_ok());
    }

    #[test]
    fn validate_requires_notdef() {
        let mut font = Font::new("Test");
        font.glyphs.clear();
        assert!(font.validate().is_err());
    }
}
