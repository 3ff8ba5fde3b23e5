//! Source deduplication and the citation aside.

use std::collections::HashSet;

use chat_api::Source;

use crate::render::sink::{SourceEntry, SourceList, SOURCE_FALLBACK_TITLE};

/// First occurrence of each key wins. Sources without any key share one key, so
/// only the first of them is kept.
pub fn dedup_sources(sources: &[Source]) -> Vec<&Source> {
    let mut seen: HashSet<Option<&str>> = HashSet::new();
    sources
        .iter()
        .filter(|source| seen.insert(source.dedup_key()))
        .collect()
}

pub fn has_low_confidence(sources: &[Source]) -> bool {
    sources.iter().any(|source| source.low_confidence)
}

pub fn source_entry(source: &Source) -> SourceEntry {
    let title = source.title.as_deref().filter(|title| !title.is_empty());
    let url = source
        .url
        .as_deref()
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    SourceEntry {
        label: title
            .map(str::to_string)
            .or_else(|| url.clone())
            .unwrap_or_else(|| SOURCE_FALLBACK_TITLE.to_string()),
        url,
        badge: source
            .source_type
            .as_deref()
            .filter(|badge| !badge.is_empty())
            .map(str::to_string),
    }
}

/// `None` when there is nothing to list.
pub fn build_source_list(sources: &[Source]) -> Option<SourceList> {
    let entries: Vec<SourceEntry> = dedup_sources(sources)
        .into_iter()
        .map(source_entry)
        .collect();
    if entries.is_empty() {
        return None;
    }
    Some(SourceList::new(entries))
}
