//! Catalog seed file.
//!
//! Listings are owned by the listing service; for a standalone server they
//! are loaded from a JSON file at startup:
//!
//! ```json
//! {
//!   "books": [{ "id": "...", "title": "Dune", "seller": "seller-1", "price": 300 }],
//!   "lendBooks": [{ "id": "...", "title": "Emma", "lender": "lender-1", "rentPricePerWeek": 50 }]
//! }
//! ```

use super::Catalog;
use crate::aggregates::listing::{Book, LendBook};
use crate::error::{MarketError, MarketResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Listings to load into the catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogSeed {
    /// Books for sale
    pub books: Vec<Book>,
    /// Books for rent
    pub lend_books: Vec<LendBook>,
}

impl CatalogSeed {
    /// Parse a seed document.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`] if the document is not a JSON object or
    /// does not match the seed shape.
    pub fn from_json(json: &str) -> MarketResult<Self> {
        let invalid = |e: serde_json::Error| MarketError::Validation(format!("invalid catalog seed: {e}"));

        // Derived struct visitors also accept sequences; a seed is a map.
        let document: serde_json::Value = serde_json::from_str(json).map_err(invalid)?;
        if !document.is_object() {
            return Err(MarketError::Validation(
                "invalid catalog seed: expected a JSON object".to_string(),
            ));
        }
        serde_json::from_value(document).map_err(invalid)
    }

    /// Read and parse a seed file.
    ///
    /// # Errors
    ///
    /// [`MarketError::Storage`] if the file cannot be read, or the parse error.
    pub async fn from_path(path: &Path) -> MarketResult<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MarketError::Storage(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Number of listings in the seed
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len() + self.lend_books.len()
    }

    /// Whether the seed has no listings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add every listing to `catalog`.
    ///
    /// # Errors
    ///
    /// Propagates the first catalog write error.
    pub async fn install(self, catalog: &dyn Catalog) -> MarketResult<usize> {
        let count = self.len();
        for book in self.books {
            catalog.add_book(book).await?;
        }
        for book in self.lend_books {
            catalog.add_lend_book(book).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::{BookId, LendBookId, Money};

    #[tokio::test]
    async fn test_seed_installs_listings() {
        let book_id = BookId::new();
        let lend_id = LendBookId::new();
        let json = format!(
            r#"{{
                "books": [{{"id": "{book_id}", "title": "Dune", "seller": "s1", "price": 300}}],
                "lendBooks": [{{"id": "{lend_id}", "title": "Emma", "lender": "l1", "rentPricePerWeek": 49.5}}]
            }}"#
        );

        let seed = CatalogSeed::from_json(&json).unwrap();
        assert_eq!(seed.len(), 2);

        let store = InMemoryStore::new();
        assert_eq!(seed.install(&store).await.unwrap(), 2);
        assert_eq!(store.book(book_id).await.unwrap().unwrap().title, "Dune");
        assert_eq!(
            store.lend_book(lend_id).await.unwrap().unwrap().rent_price_per_week,
            Money::from_paise(4_950)
        );
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        assert!(CatalogSeed::from_json("{}").unwrap().is_empty());
        assert!(CatalogSeed::from_json(r#"{"books": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_non_object_documents_are_rejected() {
        for json in ["[]", "[[],[]]", "null", "42", "\"books\""] {
            assert!(
                matches!(CatalogSeed::from_json(json), Err(MarketError::Validation(_))),
                "{json} accepted"
            );
        }
        assert!(CatalogSeed::from_json("{not json").is_err());
    }
}
