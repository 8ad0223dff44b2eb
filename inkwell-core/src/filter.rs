//! Category filtering and article ordering for the blog grid.
//!
//! Filtering only toggles the hidden flag on cards. It never touches image
//! attributes, so cards that come back into view are not reloaded.

use std::fmt;
use std::str::FromStr;

use inkwell_model::{Article, ElementId};

use crate::dom::{DomError, Page, SelectorError, SelectorList};

/// Category value that shows every card.
pub const ALL_TOPICS: &str = "all topics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterSummary {
    pub shown: usize,
    pub hidden: usize,
}

#[derive(Debug, Clone)]
pub struct CategoryFilter {
    items: SelectorList,
    category: SelectorList,
}

impl CategoryFilter {
    pub fn new() -> Result<Self, SelectorError> {
        Ok(Self {
            items: SelectorList::parse(".post-card, .article-card")?,
            category: SelectorList::parse(".post-category, .article-category")?,
        })
    }

    /// Show the cards under `scope` whose category text equals `category`
    /// (case-insensitive) and hide the rest.
    pub fn apply(
        &self,
        page: &mut Page,
        scope: ElementId,
        category: &str,
    ) -> Result<FilterSummary, DomError> {
        let wanted = normalize(category);
        let show_all = wanted.is_empty() || wanted == ALL_TOPICS;

        let mut summary = FilterSummary::default();
        for item in page.query_within(scope, &self.items) {
            let visible = show_all || self.category_of(page, item) == wanted;
            page.set_hidden(item, !visible)?;
            if visible {
                summary.shown += 1;
            } else {
                summary.hidden += 1;
            }
        }
        log::debug!(
            "Category filter '{}': {} shown, {} hidden",
            category,
            summary.shown,
            summary.hidden
        );
        Ok(summary)
    }

    fn category_of(&self, page: &Page, item: ElementId) -> String {
        page.query_within(item, &self.category)
            .first()
            .map(|badge| normalize(&page.text_content(*badge)))
            .unwrap_or_default()
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    MostRecent,
    MostPopular,
    Trending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::MostRecent => "most recent",
            SortOrder::MostPopular => "most popular",
            SortOrder::Trending => "trending",
        }
    }

    /// Sort descending: by publish date, views, or likes.
    pub fn sort(&self, articles: &mut [Article]) {
        match self {
            SortOrder::MostRecent => {
                articles.sort_by(|a, b| b.published_at.cmp(&a.published_at))
            }
            SortOrder::MostPopular => {
                articles.sort_by(|a, b| b.views.cmp(&a.views))
            }
            SortOrder::Trending => {
                articles.sort_by(|a, b| b.likes.cmp(&a.likes))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort order `{0}`")]
pub struct UnknownSortOrder(pub String);

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).replace(['-', '_'], " ").as_str() {
            "most recent" | "recent" => Ok(SortOrder::MostRecent),
            "most popular" | "popular" => Ok(SortOrder::MostPopular),
            "trending" => Ok(SortOrder::Trending),
            _ => Err(UnknownSortOrder(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
