//! Rich-text document model used as the post body.
//!
//! The tree mirrors the editor's JSON shape (`{"type": "doc", "content": [...]}`)
//! so stored bodies round-trip without translation. Image nodes carry two
//! provisional attributes, `tempId` and `loading`, while their upload is in
//! flight. Every lookup of a provisional node is a structural scan by `tempId`;
//! positions are never held across an upload.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Transient identifier correlating an upload with its image node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(Uuid);

impl TempId {
    /// Generate a fresh, unique identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TempId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum DocType {
    #[default]
    Doc,
}

/// Structured post body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichDocument {
    #[serde(rename = "type", default)]
    kind: DocType,
    #[serde(default)]
    content: Vec<Block>,
}

/// Attributes the model does not interpret, kept verbatim for the round trip.
pub type ExtraAttrs = Map<String, Value>;

/// Block-level node.
///
/// Node types the editor knows but this model does not land in `Other` and
/// are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Paragraph {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Inline>,
    },
    Heading {
        attrs: HeadingAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Inline>,
    },
    CodeBlock {
        #[serde(default)]
        attrs: CodeBlockAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Inline>,
    },
    Blockquote {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default)]
        content: Vec<Block>,
    },
    BulletList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default)]
        content: Vec<Block>,
    },
    OrderedList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default)]
        content: Vec<Block>,
    },
    ListItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default)]
        content: Vec<Block>,
    },
    HorizontalRule,
    Image {
        attrs: ImageAttrs,
    },
    #[serde(untagged)]
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    pub level: u8,
    #[serde(flatten)]
    pub extra: ExtraAttrs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockAttrs {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraAttrs,
}

/// Inline node inside paragraphs, headings and code blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    HardBreak,
    #[serde(untagged)]
    Other(Value),
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    Link { attrs: LinkAttrs },
    #[serde(untagged)]
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
    #[serde(flatten)]
    pub extra: ExtraAttrs,
}

/// Attributes of an embedded image.
///
/// `temp_id` is set only while the upload is outstanding (or after it failed
/// and the node was kept for retry). `loading` implies `temp_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttrs {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<TempId>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraAttrs,
}

impl ImageAttrs {
    /// Attributes for an image whose `src` is already final.
    pub fn settled(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    pub fn is_settled(&self) -> bool {
        self.temp_id.is_none()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            attrs: None,
            content: vec![Inline::text(text)],
        }
    }

    pub fn image(attrs: ImageAttrs) -> Self {
        Block::Image { attrs }
    }

    fn children(&self) -> Option<&[Block]> {
        match self {
            Block::Blockquote { content, .. }
            | Block::BulletList { content, .. }
            | Block::OrderedList { content, .. }
            | Block::ListItem { content, .. } => Some(content),
            _ => None,
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Block::Blockquote { content, .. }
            | Block::BulletList { content, .. }
            | Block::OrderedList { content, .. }
            | Block::ListItem { content, .. } => Some(content),
            _ => None,
        }
    }

    fn is_image_with(&self, temp_id: TempId) -> bool {
        matches!(self, Block::Image { attrs } if attrs.temp_id == Some(temp_id))
    }
}

impl RichDocument {
    pub fn new(content: Vec<Block>) -> Self {
        Self {
            kind: DocType::Doc,
            content,
        }
    }

    /// Build a document of paragraphs from text separated by blank lines.
    ///
    /// Single line breaks inside a paragraph become hard breaks.
    pub fn from_plain_text(text: &str) -> Self {
        let mut content = Vec::new();
        let mut lines: Vec<&str> = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                flush_paragraph(&mut content, &mut lines);
            } else {
                lines.push(line.trim_end());
            }
        }
        flush_paragraph(&mut content, &mut lines);

        Self::new(content)
    }

    pub fn content(&self) -> &[Block] {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn push(&mut self, block: Block) {
        self.content.push(block);
    }

    /// Insert a top-level block, clamping `index` to the end of the document.
    pub fn insert_block(&mut self, index: usize, block: Block) {
        let index = index.min(self.content.len());
        self.content.insert(index, block);
    }

    pub fn remove_block(&mut self, index: usize) -> Option<Block> {
        (index < self.content.len()).then(|| self.content.remove(index))
    }

    /// Insert a provisional image at `index` and return its fresh identifier.
    pub fn insert_image_placeholder(
        &mut self,
        index: usize,
        placeholder_src: impl Into<String>,
        alt: Option<String>,
    ) -> TempId {
        let temp_id = TempId::new();
        let attrs = ImageAttrs {
            src: placeholder_src.into(),
            alt,
            temp_id: Some(temp_id),
            loading: true,
            ..ImageAttrs::default()
        };
        self.insert_block(index, Block::image(attrs));
        temp_id
    }

    pub fn find_image(&self, temp_id: TempId) -> Option<&ImageAttrs> {
        find_image(&self.content, temp_id)
    }

    pub fn find_image_mut(&mut self, temp_id: TempId) -> Option<&mut ImageAttrs> {
        find_image_mut(&mut self.content, temp_id)
    }

    /// Settle the image tagged `temp_id` with its final URL.
    ///
    /// Returns `false` without touching the document when no node carries the
    /// identifier (for example because the user deleted it).
    pub fn resolve_image(&mut self, temp_id: TempId, url: impl Into<String>) -> bool {
        match self.find_image_mut(temp_id) {
            Some(attrs) => {
                attrs.src = url.into();
                attrs.temp_id = None;
                attrs.loading = false;
                attrs.error = None;
                true
            }
            None => false,
        }
    }

    /// Stop the spinner on a failed upload and record why, keeping `temp_id`
    /// so a retry can find the node again.
    pub fn mark_image_failed(&mut self, temp_id: TempId, message: impl Into<String>) -> bool {
        match self.find_image_mut(temp_id) {
            Some(attrs) => {
                attrs.loading = false;
                attrs.error = Some(message.into());
                true
            }
            None => false,
        }
    }

    /// Put a failed node back into the loading state for another attempt.
    pub fn mark_image_retrying(&mut self, temp_id: TempId) -> bool {
        match self.find_image_mut(temp_id) {
            Some(attrs) => {
                attrs.loading = true;
                attrs.error = None;
                true
            }
            None => false,
        }
    }

    /// Remove the image tagged `temp_id` wherever it sits in the tree.
    pub fn remove_image(&mut self, temp_id: TempId) -> bool {
        remove_image(&mut self.content, temp_id)
    }

    /// All image nodes in document order.
    pub fn images(&self) -> Vec<&ImageAttrs> {
        let mut images = Vec::new();
        collect_images(&self.content, &mut images);
        images
    }

    /// Identifiers of images whose upload is still in flight.
    pub fn pending_uploads(&self) -> Vec<TempId> {
        self.images()
            .into_iter()
            .filter(|attrs| attrs.loading)
            .filter_map(|attrs| attrs.temp_id)
            .collect()
    }

    /// Check the image attribute invariants across the whole tree.
    pub fn validate(&self) -> Result<(), DomainError> {
        for attrs in self.images() {
            if attrs.loading && attrs.temp_id.is_none() {
                return Err(DomainError::invariant(format!(
                    "image `{}` is loading without a temporary id",
                    attrs.src
                )));
            }
            if attrs.is_settled() && attrs.src.trim().is_empty() {
                return Err(DomainError::invariant("settled image has an empty src"));
            }
        }
        Ok(())
    }
}

fn flush_paragraph(content: &mut Vec<Block>, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }

    let mut inlines = Vec::with_capacity(lines.len() * 2);
    for (index, line) in lines.drain(..).enumerate() {
        if index > 0 {
            inlines.push(Inline::HardBreak);
        }
        inlines.push(Inline::text(line));
    }
    content.push(Block::Paragraph {
        attrs: None,
        content: inlines,
    });
}

fn find_image(blocks: &[Block], temp_id: TempId) -> Option<&ImageAttrs> {
    for block in blocks {
        if let Block::Image { attrs } = block {
            if attrs.temp_id == Some(temp_id) {
                return Some(attrs);
            }
            continue;
        }
        if let Some(found) = block
            .children()
            .and_then(|children| find_image(children, temp_id))
        {
            return Some(found);
        }
    }
    None
}

fn find_image_mut(blocks: &mut [Block], temp_id: TempId) -> Option<&mut ImageAttrs> {
    for block in blocks.iter_mut() {
        if let Block::Image { attrs } = block {
            if attrs.temp_id == Some(temp_id) {
                return Some(attrs);
            }
            continue;
        }
        if let Some(children) = block.children_mut() {
            if let Some(found) = find_image_mut(children, temp_id) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_image(blocks: &mut Vec<Block>, temp_id: TempId) -> bool {
    if let Some(index) = blocks.iter().position(|block| block.is_image_with(temp_id)) {
        blocks.remove(index);
        return true;
    }
    blocks
        .iter_mut()
        .filter_map(Block::children_mut)
        .any(|children| remove_image(children, temp_id))
}

fn collect_images<'a>(blocks: &'a [Block], out: &mut Vec<&'a ImageAttrs>) {
    for block in blocks {
        match block {
            Block::Image { attrs } => out.push(attrs),
            other => {
                if let Some(children) = other.children() {
                    collect_images(children, out);
                }
            }
        }
    }
}
