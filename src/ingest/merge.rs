// src/ingest/merge.rs
use crate::ingest::types::FeedCollection;

pub const MERGED_TITLE: &str = "Combined Earthquakes";

/// Concatenate collections in input order. No cross-source deduplication;
/// the merged count is recomputed from the concatenated features.
pub fn merge<I>(collections: I) -> FeedCollection
where
    I: IntoIterator<Item = FeedCollection>,
{
    let features = collections
        .into_iter()
        .flat_map(FeedCollection::into_features)
        .collect();
    FeedCollection::new(MERGED_TITLE, features)
}
