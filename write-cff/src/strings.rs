//! The mutable string table used while building a font.

use std::collections::HashMap;

use read_cff::{Index, StringId, STANDARD_STRINGS};

use crate::error::Error;

/// Base of the per-font SID range.
const CUSTOM_SID_BASE: usize = STANDARD_STRINGS.len();

/// Maps between strings and SIDs, assigning per-font SIDs on first use.
///
/// The 391 standard strings are embedded and never serialized; reverse
/// lookups consult them before coining a new per-font SID, so a standard
/// string can never be assigned a duplicate identifier.
#[derive(Clone, Debug)]
pub struct StringTable {
    custom: Vec<String>,
    reverse: HashMap<String, u16>,
}

impl StringTable {
    pub fn new() -> Self {
        // Seeding the reverse map with the standard strings keeps lookups
        // cheap and guarantees they always resolve to their standard SID.
        let reverse = STANDARD_STRINGS
            .iter()
            .enumerate()
            .map(|(i, s)| (s.to_string(), i as u16))
            .collect();
        Self {
            custom: Vec::new(),
            reverse,
        }
    }

    /// Builds a table from a parsed string INDEX.
    ///
    /// String data is Latin-1; each byte becomes the code point of the same
    /// value.
    pub fn from_index(index: &Index) -> Result<Self, Error> {
        let mut table = Self::new();
        for i in 0..index.count() {
            let data = index
                .get(i)
                .map_err(|e| Error::reading("string INDEX", e))?;
            let string: String = data.iter().map(|b| *b as char).collect();
            table.push(string);
        }
        Ok(table)
    }

    /// Returns the string for the given identifier.
    pub fn get(&self, sid: StringId) -> Option<&str> {
        let ix = sid.to_u16() as usize;
        match STANDARD_STRINGS.get(ix) {
            Some(standard) => Some(standard),
            None => self
                .custom
                .get(ix - CUSTOM_SID_BASE)
                .map(|s| s.as_str()),
        }
    }

    /// Returns the identifier for the given string, assigning the next
    /// per-font identifier if it has not been seen before.
    pub fn lookup(&mut self, string: &str) -> Result<StringId, Error> {
        if let Some(sid) = self.reverse.get(string) {
            return Ok(StringId::new(*sid));
        }
        if string.chars().any(|c| c as u32 > 0xff) {
            return Err(Error::inconsistent(format!(
                "string {string:?} cannot be encoded as Latin-1"
            )));
        }
        let sid = u16::try_from(CUSTOM_SID_BASE + self.custom.len())
            .map_err(|_| Error::Overflow("string identifier"))?;
        self.custom.push(string.to_owned());
        self.reverse.insert(string.to_owned(), sid);
        Ok(StringId::new(sid))
    }

    /// Returns the per-font strings in identifier order, as Latin-1 bytes.
    pub fn custom_bytes(&self) -> Vec<Vec<u8>> {
        self.custom
            .iter()
            .map(|s| s.chars().map(|c| c as u8).collect())
            .collect()
    }

    /// Number of per-font strings.
    pub fn custom_len(&self) -> usize {
        self.custom.len()
    }

    fn push(&mut self, string: String) {
        let sid = (CUSTOM_SID_BASE + self.custom.len()) as u16;
        self.reverse.entry(string.clone()).or_insert(sid);
        self.custom.push(string);
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}
