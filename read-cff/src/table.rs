//! The top-level CFF table.

use crate::data::FontData;
use crate::error::Error;
use crate::index::Index;
use crate::string::{Latin1String, StringId};

/// The fixed-size header at the start of a CFF table.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Header {
    pub major: u8,
    pub minor: u8,
    pub header_size: u8,
    pub offset_size: u8,
}

/// A CFF version 1 table.
///
/// Holds the header and the four structures at fixed positions: the name,
/// top DICT, string, and global subroutine INDEXes. Structures located by
/// top DICT offsets (charsets, encodings, charstrings, private DICTs) are
/// resolved against [`offset_data`](Self::offset_data) by the caller.
#[derive(Clone)]
pub struct Cff<'a> {
    data: FontData<'a>,
    header: Header,
    names: Index<'a>,
    top_dicts: Index<'a>,
    strings: Index<'a>,
    global_subrs: Index<'a>,
}

impl<'a> Cff<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, Error> {
        let data = FontData::new(bytes);
        let mut cursor = data.cursor();
        let header = Header {
            major: cursor.read::<u8>()?,
            minor: cursor.read::<u8>()?,
            header_size: cursor.read::<u8>()?,
            offset_size: cursor.read::<u8>()?,
        };
        if header.major != 1 {
            return Err(Error::UnsupportedVersion(header.major));
        }
        if header.header_size < 4 || !(1..=4).contains(&header.offset_size) {
            return Err(Error::InvalidHeader);
        }
        let mut rest = data
            .split_off(header.header_size as usize)
            .ok_or(Error::InvalidHeader)?;
        let names = Index::read(rest)?;
        if names.count() != 1 {
            return Err(Error::MultipleFonts(names.count() as u16));
        }
        rest = rest
            .split_off(names.size_in_bytes())
            .ok_or(Error::InvalidHeader)?;
        let top_dicts = Index::read(rest)?;
        if top_dicts.count() != 1 {
            return Err(Error::MultipleFonts(top_dicts.count() as u16));
        }
        rest = rest
            .split_off(top_dicts.size_in_bytes())
            .ok_or(Error::InvalidHeader)?;
        let strings = Index::read(rest)?;
        rest = rest
            .split_off(strings.size_in_bytes())
            .ok_or(Error::InvalidHeader)?;
        let global_subrs = Index::read(rest)?;
        Ok(Self {
            data,
            header,
            names,
            top_dicts,
            strings,
            global_subrs,
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Returns the data for the whole table.
    ///
    /// Offsets in the top DICT are relative to the start of this data.
    pub fn offset_data(&self) -> FontData<'a> {
        self.data
    }

    /// Returns the PostScript name of the font.
    pub fn name(&self) -> Result<Latin1String<'a>, Error> {
        Ok(Latin1String::new(self.names.get(0)?))
    }

    /// Returns the data of the single top DICT.
    pub fn top_dict_data(&self) -> Result<&'a [u8], Error> {
        self.top_dicts.get(0)
    }

    pub fn strings(&self) -> &Index<'a> {
        &self.strings
    }

    pub fn global_subrs(&self) -> &Index<'a> {
        &self.global_subrs
    }

    /// Resolves a string identifier against the standard strings and this
    /// font's string INDEX.
    pub fn string(&self, id: StringId) -> Option<Latin1String<'a>> {
        match id.standard_string() {
            Ok(string) => Some(string),
            Err(index) => self.strings.get(index).ok().map(Latin1String::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cff_test_data::BeBuffer;

    fn minimal_table() -> BeBuffer {
        BeBuffer::new()
            // header
            .extend([1u8, 0, 4, 1])
            // name INDEX with a single name
            .push(1u16)
            .push(1u8)
            .extend([1u8, 5])
            .extend(*b"Tiny")
            // top DICT INDEX with a single empty DICT
            .push(1u16)
            .push(1u8)
            .extend([1u8, 1])
            // string INDEX with one custom string
            .push(1u16)
            .push(1u8)
            .extend([1u8, 6])
            .extend(*b"Extra")
            // empty global subr INDEX
            .push(0u16)
    }

    #[test]
    fn reads_fixed_structures() {
        let buf = minimal_table();
        let cff = Cff::new(&buf).unwrap();
        assert_eq!(cff.header().major, 1);
        assert_eq!(cff.name().unwrap(), "Tiny");
        assert_eq!(cff.top_dict_data().unwrap(), &[]);
        assert_eq!(cff.global_subrs().count(), 0);
        assert_eq!(cff.string(StringId::new(0)).unwrap(), ".notdef");
        assert_eq!(cff.string(StringId::new(391)).unwrap(), "Extra");
        assert_eq!(cff.string(StringId::new(392)), None);
    }

    #[test]
    fn rejects_bad_major() {
        let mut bytes = minimal_table().to_vec();
        bytes[0] = 2;
        assert!(matches!(
            Cff::new(&bytes),
            Err(Error::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn rejects_multi_font_name_index() {
        let buf = BeBuffer::new()
            .extend([1u8, 0, 4, 1])
            .push(2u16)
            .push(1u8)
            .extend([1u8, 2, 3])
            .extend(*b"AB");
        assert!(matches!(
            Cff::new(&buf),
            Err(Error::MultipleFonts(2))
        ));
    }

    #[test]
    fn rejects_bad_header_fields() {
        let mut bytes = minimal_table().to_vec();
        bytes[2] = 3; // header size below 4
        assert!(matches!(Cff::new(&bytes), Err(Error::InvalidHeader)));
        let mut bytes = minimal_table().to_vec();
        bytes[3] = 5; // offset size out of range
        assert!(matches!(Cff::new(&bytes), Err(Error::InvalidHeader)));
    }
}
