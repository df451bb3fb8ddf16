use feed_core::{FeedStats, Item, PostsPage, StoredItem};
use pretty_assertions::assert_eq;
use serde_json::json;

fn stored(id: u64, author: &str, score: i64) -> StoredItem {
    StoredItem {
        id,
        item: Item::new(author, format!("post {id}"), score),
    }
}

#[test]
fn empty_store_has_no_most_upvoted() {
    let stats = FeedStats::from_items(&Vec::<StoredItem>::new());
    assert_eq!(stats, FeedStats::default());
    assert_eq!(
        serde_json::to_value(&stats).unwrap(),
        json!({ "most_upvoted_post": null, "user_post_counts": {} })
    );
}

#[test]
fn counts_per_author_and_picks_highest_score() {
    let items = vec![
        stored(1, "gopher", 10),
        stored(2, "ferris", 55),
        stored(3, "gopher", 3),
        stored(4, "ferris", 55),
    ];
    let stats = FeedStats::from_items(&items);

    assert_eq!(stats.user_post_counts.get("gopher"), Some(&2));
    assert_eq!(stats.user_post_counts.get("ferris"), Some(&2));
    // Tie keeps the first one seen.
    assert_eq!(stats.most_upvoted_post, Some(stored(2, "ferris", 55)));
}

#[test]
fn repeated_reads_do_not_accumulate() {
    let items = vec![stored(1, "gopher", 1)];
    let first = FeedStats::from_items(&items);
    let second = FeedStats::from_items(&items);
    assert_eq!(first, second);
    assert_eq!(second.user_post_counts.get("gopher"), Some(&1));
}

#[test]
fn posts_page_wraps_items_with_ids() {
    let page = PostsPage::new(vec![stored(9, "ferris", 4)]);
    assert_eq!(
        serde_json::to_value(&page).unwrap(),
        json!({ "posts": [ { "id": 9, "author": "ferris", "title": "post 9", "score": 4 } ] })
    );
}
