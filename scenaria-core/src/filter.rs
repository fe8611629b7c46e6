// Link validity filtering: temporal noise removal and hub exclusion

use crate::model::LinkSet;
use once_cell::sync::Lazy;
use regex::RegexSet;
use tracing::info;

/// Nodes with more valid links than this contribute no links at all.
pub const HUB_THRESHOLD: usize = 300;

/// Temporal metadata pages (years, eras, dates) that link to everything and
/// carry no topical signal.
static TEMPORAL_NOISE: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        // bare year / era numeral, optionally "year" or "fiscal year"
        r"^(?:[0-9]{4}|昭和|平成|令和)[0-9]{0,2}(?:年|年度)?$",
        // month-day
        r"^[0-9]{1,2}月[0-9]{1,2}日$",
        // year-month[...]
        r"^[0-9]{4}年[0-9]{1,2}月",
        // era / year decade
        r"^(?:[0-9]{3,4}|昭和|平成|令和)[0-9]{0,2}年代$",
        // bare month
        r"^[0-9]{1,2}月$",
        // embedded 4-digit year anywhere
        r"[0-9]{4}年",
    ])
    .expect("temporal noise patterns are valid")
});

/// Returns false for link names that look like temporal metadata.
pub fn is_valid_link(link: &str) -> bool {
    !TEMPORAL_NOISE.is_match(link)
}

/// Apply the validity rules to a provider's raw output for `node`.
///
/// Returns an empty set when the node is a hub (more than [`HUB_THRESHOLD`]
/// valid links after filtering).
pub fn filter_links<I>(node: &str, raw: I) -> LinkSet
where
    I: IntoIterator<Item = String>,
{
    let mut total = 0usize;
    let filtered: LinkSet = raw
        .into_iter()
        .inspect(|_| total += 1)
        .filter(|link| is_valid_link(link))
        .collect();

    if filtered.len() > HUB_THRESHOLD {
        info!(
            "Excluding '{}' as a hub node ({} valid links)",
            node,
            filtered.len()
        );
        return LinkSet::new();
    }

    info!(
        "Fetched {} valid links for '{}' ({} raw)",
        filtered.len(),
        node,
        total
    );
    filtered
}
