//! The owned DICT model and its serializer.
//!
//! A [`Dict`] maps operators to argument lists. Arguments are kept exactly
//! as they appear on the wire (delta lists stay delta encoded; interpreting
//! them is the job of the typed layers), with one exception: string SIDs
//! are resolved to their text here, so callers never see raw identifiers.

use indexmap::IndexMap;
use read_cff::dict::{self, Number, Operator};
use read_cff::{ReadError, StringId};

use crate::error::Error;
use crate::number;
use crate::strings::StringTable;

/// A single DICT argument.
#[derive(Clone, PartialEq, Debug)]
pub enum Operand {
    Int(i32),
    Real(f64),
    Str(String),
}

impl Operand {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Real(value) => Some(*value),
            Self::Str(_) => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// An owned DICT: an operator to argument-list mapping.
///
/// Iteration follows insertion order; serialization always uses the
/// canonical operator order, so the same logical DICT produces the same
/// bytes regardless of how it was assembled.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Dict {
    entries: IndexMap<Operator, Vec<Operand>>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes DICT data, resolving string identifiers through the given
    /// table.
    pub fn from_bytes(data: &[u8], strings: &StringTable) -> Result<Self, read_cff::Error> {
        let mut entries = IndexMap::new();
        for entry in dict::entries(data) {
            let (op, numbers) = entry?;
            let mut operands = Vec::with_capacity(numbers.len());
            for (i, value) in numbers.iter().enumerate() {
                let is_sid = op.is_string_valued() || (op == Operator::Ros && i < 2);
                operands.push(if is_sid {
                    let sid = value
                        .as_i32()
                        .ok_or(ReadError::MalformedData("string operand must be an integer"))?;
                    let sid = u16::try_from(sid)
                        .map_err(|_| ReadError::MalformedData("string identifier out of range"))?;
                    let text = strings
                        .get(StringId::new(sid))
                        .ok_or(ReadError::MalformedData("string identifier out of range"))?;
                    Operand::Str(text.to_owned())
                } else {
                    match value {
                        Number::Int(v) => Operand::Int(*v),
                        Number::Real(v) => Operand::Real(*v),
                    }
                });
            }
            entries.insert(op, operands);
        }
        Ok(Self { entries })
    }

    pub fn set(&mut self, op: Operator, operands: Vec<Operand>) {
        self.entries.insert(op, operands);
    }

    pub fn set_int(&mut self, op: Operator, value: i32) {
        self.set(op, vec![Operand::Int(value)]);
    }

    pub fn set_real(&mut self, op: Operator, value: f64) {
        self.set(op, vec![Operand::Real(value)]);
    }

    pub fn set_str(&mut self, op: Operator, value: &str) {
        self.set(op, vec![Operand::Str(value.to_owned())]);
    }

    pub fn remove(&mut self, op: Operator) -> Option<Vec<Operand>> {
        self.entries.shift_remove(&op)
    }

    pub fn contains(&self, op: Operator) -> bool {
        self.entries.contains_key(&op)
    }

    pub fn get(&self, op: Operator) -> Option<&[Operand]> {
        self.entries.get(&op).map(|v| v.as_slice())
    }

    /// Returns the sole integer argument of an operator, if present.
    pub fn int(&self, op: Operator) -> Option<i32> {
        match self.get(op)? {
            [operand] => operand.as_i32(),
            _ => None,
        }
    }

    /// Returns the sole numeric argument of an operator, if present.
    pub fn float(&self, op: Operator) -> Option<f64> {
        match self.get(op)? {
            [operand] => operand.as_f64(),
            _ => None,
        }
    }

    /// Returns the sole string argument of an operator, if present.
    pub fn string(&self, op: Operator) -> Option<&str> {
        match self.get(op)? {
            [operand] => operand.as_str(),
            _ => None,
        }
    }

    /// Returns all arguments of an operator as floats.
    pub fn floats(&self, op: Operator) -> Option<Vec<f64>> {
        self.get(op)?.iter().map(Operand::as_f64).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Operator, &[Operand])> {
        self.entries.iter().map(|(op, args)| (*op, args.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the DICT, allocating string identifiers as needed.
    ///
    /// Operators are emitted in ascending identifier order, except that the
    /// registry/ordering/supplement triple and the synthetic-base operator
    /// always precede everything else. Decoders treat those two as
    /// structural preamble, so the order is load bearing.
    pub fn encode(&self, strings: &mut StringTable) -> Result<Vec<u8>, Error> {
        let mut ops: Vec<Operator> = self.entries.keys().copied().collect();
        ops.sort_by_key(|op| canonical_position(*op));
        let mut out = Vec::new();
        for op in ops {
            for operand in &self.entries[&op] {
                match operand {
                    Operand::Int(value) => number::encode_int(&mut out, *value),
                    Operand::Real(value) => number::encode_real(&mut out, *value),
                    Operand::Str(value) => {
                        let sid = strings.lookup(value)?;
                        number::encode_int(&mut out, sid.to_u16() as i32);
                    }
                }
            }
            let id = op.id();
            if id >= 0x0c00 {
                out.push(0x0c);
                out.push((id & 0xff) as u8);
            } else {
                out.push(id as u8);
            }
        }
        Ok(out)
    }
}

fn canonical_position(op: Operator) -> (u8, u16) {
    match op {
        Operator::Ros => (0, 0),
        Operator::SyntheticBase => (1, 0),
        _ => (2, op.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(dict: &Dict) -> Dict {
        let mut strings = StringTable::new();
        let bytes = dict.encode(&mut strings).unwrap();
        Dict::from_bytes(&bytes, &strings).unwrap()
    }

    #[test]
    fn mixed_operand_types() {
        let mut dict = Dict::new();
        dict.set_int(Operator::Charstrings, 12345);
        dict.set_real(Operator::ItalicAngle, -12.5);
        dict.set(
            Operator::FontMatrix,
            vec![
                Operand::Real(0.001),
                Operand::Real(0.0),
                Operand::Real(0.0),
                Operand::Real(0.001),
                Operand::Real(0.0),
                Operand::Real(0.0),
            ],
        );
        assert_eq!(round_trip(&dict), dict);
    }

    #[test]
    fn string_operands_resolve() {
        let mut dict = Dict::new();
        dict.set_str(Operator::Version, "001.001");
        dict.set_str(Operator::Weight, "Bold");
        let mut strings = StringTable::new();
        let bytes = dict.encode(&mut strings).unwrap();
        // "001.001" is not a standard string, "Bold" is
        assert_eq!(strings.custom_len(), 1);
        let decoded = Dict::from_bytes(&bytes, &strings).unwrap();
        assert_eq!(decoded.string(Operator::Version), Some("001.001"));
        assert_eq!(decoded.string(Operator::Weight), Some("Bold"));
    }

    #[test]
    fn ros_leads_the_encoding() {
        let mut dict = Dict::new();
        dict.set_int(Operator::CidCount, 500);
        dict.set(
            Operator::Ros,
            vec![
                Operand::Str("Adobe".into()),
                Operand::Str("Identity".into()),
                Operand::Int(0),
            ],
        );
        dict.set_str(Operator::Version, "1.0");
        let mut strings = StringTable::new();
        let bytes = dict.encode(&mut strings).unwrap();
        // The trailing two bytes of the first entry must be the two byte
        // ROS operator.
        let ros_args_len = {
            let mut probe = Vec::new();
            number::encode_int(&mut probe, 391);
            number::encode_int(&mut probe, 392);
            number::encode_int(&mut probe, 0);
            probe.len()
        };
        assert_eq!(&bytes[ros_args_len..ros_args_len + 2], &[0x0c, 0x1e]);
        let decoded = Dict::from_bytes(&bytes, &strings).unwrap();
        assert_eq!(decoded, dict);
    }

    #[test]
    fn delta_lists_stay_verbatim() {
        let mut dict = Dict::new();
        dict.set(
            Operator::BlueValues,
            vec![
                Operand::Int(-15),
                Operand::Int(15),
                Operand::Int(443),
                Operand::Int(15),
            ],
        );
        let decoded = round_trip(&dict);
        assert_eq!(
            decoded.get(Operator::BlueValues).unwrap(),
            dict.get(Operator::BlueValues).unwrap()
        );
    }

    #[test]
    fn empty_dict_is_empty_bytes() {
        let dict = Dict::new();
        let mut strings = StringTable::new();
        assert!(dict.encode(&mut strings).unwrap().is_empty());
        assert!(Dict::from_bytes(&[], &StringTable::new())
            .unwrap()
            .is_empty());
    }
}
