use std::collections::BTreeMap;

use serde::Serialize;

use crate::StoredItem;

/// Wire shape of the "all posts" read: `{ "posts": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostsPage {
    pub posts: Vec<StoredItem>,
}

impl PostsPage {
    pub fn new(posts: Vec<StoredItem>) -> Self {
        Self { posts }
    }
}

/// Aggregates computed fresh from the full stored set on every read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FeedStats {
    pub most_upvoted_post: Option<StoredItem>,
    pub user_post_counts: BTreeMap<String, u64>,
}

impl FeedStats {
    /// Folds over stored items. Ties on score keep the earliest item.
    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a StoredItem>,
    {
        items.into_iter().fold(Self::default(), |mut stats, stored| {
            *stats
                .user_post_counts
                .entry(stored.item.author.clone())
                .or_insert(0) += 1;
            let replace = stats
                .most_upvoted_post
                .as_ref()
                .map_or(true, |best| stored.item.score > best.item.score);
            if replace {
                stats.most_upvoted_post = Some(stored.clone());
            }
            stats
        })
    }
}
