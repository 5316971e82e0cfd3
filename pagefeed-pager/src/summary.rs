//! Plain-text page summaries for the `pagefeed` binary.

use pagefeed_core::{short_form, ImageRecord, PageRecord};

/// Header line plus one line per image.
pub fn page_summary(page: &PageRecord) -> Vec<String> {
    if page.is_placeholder() {
        return vec!["Loading...".to_string()];
    }

    let mut lines = Vec::with_capacity(page.items.len() + 1);
    lines.push(format!(
        "[{}] page {}/{} ({} photos)",
        page.feature,
        page.page_number(),
        page.total_pages,
        short_form(i64::try_from(page.total_items).unwrap_or(i64::MAX)),
    ));
    lines.extend(page.items.iter().map(image_line));
    lines
}

fn image_line(image: &ImageRecord) -> String {
    let title = if image.title.is_empty() {
        "Untitled"
    } else {
        image.title.as_str()
    };
    format!(
        "  {} by {} | {} views, {} votes, {} comments",
        title,
        image.author.display_name(),
        short_form(image.times_viewed),
        short_form(image.votes_count),
        short_form(image.comments_count),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagefeed_core::Author;

    #[test]
    fn test_placeholder_summary() {
        assert_eq!(page_summary(&PageRecord::placeholder()), vec!["Loading..."]);
    }

    #[test]
    fn test_summary_uses_short_form_counters() {
        let page = PageRecord {
            page_index: 1,
            total_pages: 5,
            total_items: 100,
            feature: "popular".to_string(),
            items: vec![ImageRecord {
                title: "Harbour".to_string(),
                author: Author {
                    username: "ada".to_string(),
                    fullname: "Ada Lens".to_string(),
                    ..Default::default()
                },
                times_viewed: 6990,
                votes_count: 1_250_000,
                comments_count: 12,
                ..Default::default()
            }],
        };

        let lines = page_summary(&page);
        assert_eq!(lines[0], "[popular] page 2/5 (100 photos)");
        assert_eq!(lines[1], "  Harbour by Ada Lens | 6.99k views, 1.25m votes, 12 comments");
    }

    #[test]
    fn test_untitled_image() {
        let image = ImageRecord::default();
        assert!(image_line(&image).starts_with("  Untitled by "));
    }
}
