use serde::{Deserialize, Serialize};

/// A single post parsed from a feed page.
///
/// Items are never mutated after parsing; ownership moves from the poller
/// through the ingestion channel into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub author: String,
    pub title: String,
    pub score: i64,
}

impl Item {
    pub fn new(author: impl Into<String>, title: impl Into<String>, score: i64) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
            score,
        }
    }
}

/// An item as persisted by a store, tagged with the store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: u64,
    #[serde(flatten)]
    pub item: Item,
}
