//! The in-progress post and its submit-time finalisation.

use time::Date;

use crate::domain::document::RichDocument;
use crate::domain::entities::PostRecord;
use crate::domain::slug::derive_slug;
use crate::domain::tags::{TagPolicy, normalize_tags};

/// Editable state of a post before it is committed.
///
/// `tags` holds entries as the user typed them, in input order; they are only
/// normalised when the draft is finalised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub body: RichDocument,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

/// Record handed to persistence once slug and tags are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedPost {
    pub slug: String,
    pub title: String,
    pub body: RichDocument,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

impl Draft {
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            title: record.title.clone(),
            body: record.body.clone(),
            tags: record.tags.clone(),
            category: record.category.clone(),
        }
    }

    /// Raw tag text as shown in a single comma-separated input.
    pub fn tags_text(&self) -> String {
        self.tags.join(", ")
    }

    pub fn finalize(&self, date: Date, policy: TagPolicy) -> FinalizedPost {
        FinalizedPost {
            slug: derive_slug(&self.title, date),
            title: self.title.clone(),
            body: self.body.clone(),
            tags: normalize_tags(&self.tags.join(","), policy),
            category: self.category.clone(),
        }
    }
}
