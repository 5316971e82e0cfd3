//! Wire format of the photos endpoint.
//!
//! The feed speaks snake_case JSON with one-based page numbers. These DTOs
//! mirror it loosely (unknown keys are ignored) and convert into the
//! domain records from `pagefeed-core`.

use pagefeed_core::{Author, FeedError, FeedResult, ImageRecord, ImageVariant, PageRecord};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WirePage {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: u64,
    pub feature: String,
    #[serde(default)]
    pub photos: Vec<WirePhoto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePhoto {
    #[serde(default)]
    pub name: Option<String>,
    pub user: WireUser,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub votes_count: i64,
    #[serde(default)]
    pub positive_votes_count: i64,
    #[serde(default)]
    pub times_viewed: i64,
    #[serde(default)]
    pub images: Vec<WireImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub userpic_url: String,
    #[serde(default)]
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireImage {
    pub format: String,
    pub size: u32,
    pub url: String,
    #[serde(default)]
    pub https_url: String,
}

impl TryFrom<WirePage> for PageRecord {
    type Error = FeedError;

    fn try_from(page: WirePage) -> Result<Self, Self::Error> {
        if page.current_page == 0 {
            return Err(FeedError::decode("current_page must be >= 1"));
        }
        if page.total_pages == 0 {
            return Err(FeedError::decode("total_pages must be >= 1"));
        }
        if page.current_page > page.total_pages {
            return Err(FeedError::decode(format!(
                "current_page {} exceeds total_pages {}",
                page.current_page, page.total_pages
            )));
        }

        Ok(PageRecord {
            page_index: page.current_page - 1,
            total_pages: page.total_pages,
            total_items: page.total_items,
            feature: page.feature,
            items: page.photos.into_iter().map(ImageRecord::from).collect(),
        })
    }
}

impl From<WirePhoto> for ImageRecord {
    fn from(photo: WirePhoto) -> Self {
        Self {
            title: photo.name.unwrap_or_default(),
            author: Author {
                username: photo.user.username,
                fullname: photo.user.fullname,
                userpic_url: photo.user.userpic_url,
                cover_url: photo.user.cover_url,
            },
            created_at: photo.created_at,
            description: photo.description.unwrap_or_default(),
            times_viewed: photo.times_viewed,
            votes_count: photo.votes_count,
            positive_votes_count: photo.positive_votes_count,
            comments_count: photo.comments_count,
            variants: photo
                .images
                .into_iter()
                .map(|image| ImageVariant {
                    format: image.format,
                    size: image.size,
                    url: image.url,
                    https_url: image.https_url,
                })
                .collect(),
        }
    }
}

/// Decode a response body into a page.
pub fn decode_page(body: &[u8]) -> FeedResult<PageRecord> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FeedError::empty_body());
    }
    let page: WirePage =
        serde_json::from_slice(body).map_err(|err| FeedError::decode(err.to_string()))?;
    PageRecord::try_from(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagefeed_core::FeedErrorKind;

    const SAMPLE: &str = r#"{
        "current_page": 1,
        "total_pages": 5,
        "total_items": 100,
        "feature": "popular",
        "filters": {"category": false},
        "photos": [
            {
                "name": "Harbour at dawn",
                "description": null,
                "created_at": "2020-07-18T10:11:12-04:00",
                "comments_count": 12,
                "votes_count": 340,
                "positive_votes_count": 338,
                "times_viewed": 6990,
                "user": {
                    "username": "ada",
                    "fullname": "Ada Lens",
                    "userpic_url": "https://pics/ada.jpg"
                },
                "images": [
                    {"format": "jpeg", "size": 2, "url": "http://img/2", "https_url": "https://img/2"},
                    {"format": "jpeg", "size": 30, "url": "http://img/30", "https_url": "https://img/30"}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_decode_sample_page() {
        let page = decode_page(SAMPLE.as_bytes()).unwrap();
        assert_eq!(page.page_index, 0);
        assert_eq!(page.total_pages, 5);
        assert_eq!(page.total_items, 100);
        assert_eq!(page.feature, "popular");
        assert_eq!(page.items.len(), 1);

        let image = &page.items[0];
        assert_eq!(image.title, "Harbour at dawn");
        assert_eq!(image.description, "");
        assert_eq!(image.author.fullname, "Ada Lens");
        assert_eq!(image.author.cover_url, None);
        assert_eq!(image.times_viewed, 6990);
        assert_eq!(image.best_variant().map(|v| v.size), Some(30));
    }

    #[test]
    fn test_page_without_photos_is_allowed() {
        let body = r#"{"current_page": 3, "total_pages": 3, "total_items": 40, "feature": "fresh"}"#;
        let page = decode_page(body.as_bytes()).unwrap();
        assert_eq!(page.page_index, 2);
        assert!(page.items.is_empty());
        assert!(page.is_last());
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(decode_page(b"").unwrap_err().kind, FeedErrorKind::EmptyBody);
        assert_eq!(decode_page(b" \n").unwrap_err().kind, FeedErrorKind::EmptyBody);
    }

    #[test]
    fn test_malformed_json_is_decode_failure() {
        let err = decode_page(b"{\"current_page\": ").unwrap_err();
        assert_eq!(err.kind, FeedErrorKind::DecodeFailure);

        let err = decode_page(b"[]").unwrap_err();
        assert_eq!(err.kind, FeedErrorKind::DecodeFailure);
    }

    #[test]
    fn test_page_numbers_are_validated() {
        let zero = r#"{"current_page": 0, "total_pages": 3, "total_items": 0, "feature": "x"}"#;
        assert_eq!(
            decode_page(zero.as_bytes()).unwrap_err().kind,
            FeedErrorKind::DecodeFailure
        );

        let past_end = r#"{"current_page": 4, "total_pages": 3, "total_items": 0, "feature": "x"}"#;
        assert_eq!(
            decode_page(past_end.as_bytes()).unwrap_err().kind,
            FeedErrorKind::DecodeFailure
        );

        let no_pages = r#"{"current_page": 1, "total_pages": 0, "total_items": 0, "feature": "x"}"#;
        assert_eq!(
            decode_page(no_pages.as_bytes()).unwrap_err().kind,
            FeedErrorKind::DecodeFailure
        );
    }
}
