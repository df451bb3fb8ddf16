use feed_core::Item;
use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed listing at line {line} column {column}: {message}")]
    Listing {
        line: usize,
        column: usize,
        message: String,
    },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Listing {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: Item,
}

/// Decode a `{ data: { children: [ { data: Item } ] } }` page into items, in page order.
///
/// Any malformed child fails the whole page so nothing is partially dispatched.
pub fn decode_listing(body: &[u8]) -> Result<Vec<Item>, DecodeError> {
    let listing: Listing = serde_json::from_slice(body)?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .collect())
}
