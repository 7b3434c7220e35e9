use crate::domain::product::Product;
use crate::error::{Result, StoreError};
use std::io::Read;

/// Reads a product catalog from a CSV source with `identifier, price, currency` columns.
///
/// Whitespace is trimmed and a missing or empty currency means the product has no currency
/// code.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes products, one `Result` per row, so a bad row does not end the
    /// stream.
    pub fn products(self) -> impl Iterator<Item = Result<Product>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(StoreError::from))
    }
}
