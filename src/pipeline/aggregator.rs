//! Reduction of flat message lists into per-chain-pair counts.

use std::collections::HashMap;

use crate::domain::{ChainDirectory, ChainPairCount, TeleporterMessage};

/// Groups messages by resolved (source, destination) chain names.
///
/// Unresolved chain identifiers fall back to the directory's placeholder
/// label, so every message is counted. The result is sorted strictly
/// descending by count; the relative order of equal counts is unspecified.
#[must_use]
pub fn aggregate(
    messages: &[TeleporterMessage],
    directory: &ChainDirectory,
) -> Vec<ChainPairCount> {
    let mut counts: HashMap<(String, String), u64> = HashMap::new();
    for message in messages {
        let key = (
            directory.resolve(&message.source_chain_id),
            directory.resolve(&message.destination_chain_id),
        );
        *counts.entry(key).or_insert(0) += 1;
    }
    into_sorted(counts)
}

/// Merges several pair-count lists into one, summing per pair.
///
/// Used by the weekly finalization to combine per-day partial results;
/// equivalent to aggregating the concatenated message lists since
/// aggregation is a pure group-count. Sum-preserving.
#[must_use]
pub fn merge_counts<I>(lists: I) -> Vec<ChainPairCount>
where
    I: IntoIterator<Item = Vec<ChainPairCount>>,
{
    let mut counts: HashMap<(String, String), u64> = HashMap::new();
    for list in lists {
        for pair in list {
            let key = (pair.source_chain_name, pair.destination_chain_name);
            *counts.entry(key).or_insert(0) += pair.message_count;
        }
    }
    into_sorted(counts)
}

fn into_sorted(counts: HashMap<(String, String), u64>) -> Vec<ChainPairCount> {
    let mut out: Vec<ChainPairCount> = counts
        .into_iter()
        .map(
            |((source_chain_name, destination_chain_name), message_count)| ChainPairCount {
                source_chain_name,
                destination_chain_name,
                message_count,
            },
        )
        .collect();
    out.sort_unstable_by(|a, b| b.message_count.cmp(&a.message_count));
    out
}
