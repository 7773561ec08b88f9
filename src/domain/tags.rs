//! Normalisation of free-text tag input.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How repeated tags are treated during normalisation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPolicy {
    /// Keep the first occurrence of each exact tag and drop later repeats.
    #[default]
    Dedup,
    /// Keep every non-empty segment, repeats included.
    KeepDuplicates,
}

impl TagPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            TagPolicy::Dedup => "dedup",
            TagPolicy::KeepDuplicates => "keep_duplicates",
        }
    }
}

impl FromStr for TagPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dedup" => Ok(TagPolicy::Dedup),
            "keep_duplicates" | "keep-duplicates" => Ok(TagPolicy::KeepDuplicates),
            other => Err(format!("unknown tag policy `{other}`")),
        }
    }
}

/// Split comma-delimited text into trimmed, non-empty tags in input order.
///
/// Duplicate handling follows `policy`; comparison is exact (case-sensitive)
/// after trimming.
pub fn normalize_tags(raw: &str, policy: TagPolicy) -> Vec<String> {
    let segments = raw
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty());

    match policy {
        TagPolicy::KeepDuplicates => segments.map(str::to_string).collect(),
        TagPolicy::Dedup => {
            let mut seen = HashSet::new();
            segments
                .filter(|segment| seen.insert(*segment))
                .map(str::to_string)
                .collect()
        }
    }
}
