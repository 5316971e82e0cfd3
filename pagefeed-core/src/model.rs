//! Page and image records.
//!
//! These are the decoded, domain-side shapes. The snake_case wire DTOs live in
//! `pagefeed-client`; everything above the client boundary only sees these.

use serde::{Deserialize, Serialize};

// ============================================================================
// IMAGE RECORDS
// ============================================================================

/// Photo author as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    /// Account handle.
    pub username: String,
    /// Display name.
    pub fullname: String,
    pub userpic_url: String,
    pub cover_url: Option<String>,
}

impl Author {
    /// Name to show in listings: the display name, or the handle when the
    /// display name is blank.
    pub fn display_name(&self) -> &str {
        if self.fullname.trim().is_empty() {
            &self.username
        } else {
            &self.fullname
        }
    }
}

/// One rendition of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    /// Encoding format (e.g. "jpeg").
    pub format: String,
    /// Pixel size class as defined by the feed.
    pub size: u32,
    pub url: String,
    pub https_url: String,
}

/// Metadata for one photo. Immutable once constructed; its only identity is
/// its position inside a [`PageRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageRecord {
    pub title: String,
    pub author: Author,
    /// Creation timestamp exactly as delivered by the feed.
    pub created_at: String,
    pub description: String,
    pub times_viewed: i64,
    pub votes_count: i64,
    pub positive_votes_count: i64,
    pub comments_count: i64,
    pub variants: Vec<ImageVariant>,
}

impl ImageRecord {
    /// The variant with the largest size class, if any.
    pub fn best_variant(&self) -> Option<&ImageVariant> {
        self.variants.iter().max_by_key(|variant| variant.size)
    }
}

// ============================================================================
// PAGE RECORDS
// ============================================================================

/// One page of feed results.
///
/// `page_index` is zero-based; the wire protocol is one-based and the client
/// converts on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_index: usize,
    pub total_pages: usize,
    pub total_items: u64,
    pub feature: String,
    /// Photos in feed order. May be empty.
    pub items: Vec<ImageRecord>,
}

impl PageRecord {
    /// The record a stream carries before its first fetch lands.
    pub fn placeholder() -> Self {
        Self {
            page_index: 0,
            total_pages: 1,
            total_items: 0,
            feature: String::new(),
            items: Vec::new(),
        }
    }

    /// True for the value produced by [`PageRecord::placeholder`].
    ///
    /// A fetched page always carries its feature name, so an empty feature
    /// identifies the placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.feature.is_empty() && self.items.is_empty() && self.total_items == 0
    }

    /// One-based page number as used on the wire.
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }

    pub fn is_last(&self) -> bool {
        self.page_index + 1 >= self.total_pages
    }
}

impl Default for PageRecord {
    fn default() -> Self {
        Self::placeholder()
    }
}
