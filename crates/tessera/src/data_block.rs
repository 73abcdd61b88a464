//! # TOML Data Blocks
//!
//! Scene files store entity references as serial ids inside TOML tables.

use tessera_core::DataBlock;

use crate::error::EngineResult;

/// A [`DataBlock`] backed by a `toml::Table`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TomlDataBlock {
    table: toml::Table,
}

impl TomlDataBlock {
    /// An empty block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a block from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`](crate::EngineError::Config) on malformed input.
    pub fn parse(text: &str) -> EngineResult<Self> {
        Ok(Self {
            table: toml::from_str(text)?,
        })
    }

    /// The underlying table.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &toml::Table {
        &self.table
    }

    /// Consumes the block and returns its table.
    #[must_use]
    pub fn into_table(self) -> toml::Table {
        self.table
    }
}

impl From<toml::Table> for TomlDataBlock {
    fn from(table: toml::Table) -> Self {
        Self { table }
    }
}

impl DataBlock for TomlDataBlock {
    fn set_u32(&mut self, key: &str, value: u32) {
        self.table
            .insert(key.to_owned(), toml::Value::Integer(i64::from(value)));
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.table
            .get(key)
            .and_then(toml::Value::as_integer)
            .and_then(|value| u32::try_from(value).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut block = TomlDataBlock::new();
        block.set_u32("parent", 7);
        assert_eq!(block.get_u32("parent"), Some(7));
        assert_eq!(block.get_u32("missing"), None);
    }

    #[test]
    fn test_non_integer_values_are_ignored() {
        let block = TomlDataBlock::parse("name = \"crate\"\nneg = -1\nok = 3\n").unwrap();
        assert_eq!(block.get_u32("name"), None);
        assert_eq!(block.get_u32("neg"), None);
        assert_eq!(block.get_u32("ok"), Some(3));
        assert_eq!(block.table().len(), 3);
    }
}
