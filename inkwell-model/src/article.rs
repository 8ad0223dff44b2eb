//! Published article records rendered into the blog grid.

use chrono::NaiveDate;

use crate::content_type::ContentType;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArticleTag {
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArticleAuthor {
    pub name: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
}

/// A published article as stored by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub excerpt: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub content_type: ContentType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Vec<ArticleTag>,
    pub reading_time: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub views: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub likes: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub comments: u64,
    pub published_at: NaiveDate,
    #[cfg_attr(feature = "serde", serde(default))]
    pub author: Option<ArticleAuthor>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cover_image: Option<String>,
}

impl Article {
    /// Label shown on the card badge: first tag name, else the type.
    pub fn category_label(&self) -> &str {
        self.tags
            .first()
            .map(|tag| tag.name.as_str())
            .unwrap_or_else(|| self.content_type.as_str())
    }

    pub fn category_icon(&self) -> &str {
        self.tags
            .first()
            .map(|tag| tag.icon.as_str())
            .unwrap_or("fas fa-newspaper")
    }
}

#[allow(clippy::too_many_arguments)]
fn seed(
    id: u64,
    title: &str,
    excerpt: &str,
    content_type: ContentType,
    tag: (&str, &str),
    counters: (u32, u64, u64, u64),
    published_at: (i32, u32, u32),
    author: (&str, &str, &str),
    cover_image: &str,
) -> Article {
    let (reading_time, views, likes, comments) = counters;
    let (year, month, day) = published_at;
    Article {
        id,
        title: title.to_string(),
        excerpt: excerpt.to_string(),
        content_type,
        tags: vec![ArticleTag {
            name: tag.0.to_string(),
            icon: tag.1.to_string(),
        }],
        reading_time,
        views,
        likes,
        comments,
        published_at: NaiveDate::from_ymd_opt(year, month, day)
            .unwrap_or_default(),
        author: Some(ArticleAuthor {
            name: Some(author.0.to_string()),
            role: Some(author.1.to_string()),
            avatar: Some(author.2.to_string()),
        }),
        cover_image: Some(cover_image.to_string()),
    }
}

/// Articles shown before anything has been published locally.
pub fn default_articles() -> Vec<Article> {
    vec![
        seed(
            1,
            "Advanced TypeScript Patterns for Enterprise Applications",
            "Explore advanced TypeScript patterns and best practices for building scalable enterprise applications...",
            ContentType::Developer,
            ("Technology", "fas fa-laptop-code"),
            (5, 1200, 248, 42),
            (2024, 3, 15),
            (
                "Alex Mitchell",
                "Tech Lead",
                "https://images.pexels.com/photos/220453/pexels-photo-220453.jpeg",
            ),
            "https://images.pexels.com/photos/574071/pexels-photo-574071.jpeg",
        ),
        seed(
            2,
            "Modern Web Development Best Practices",
            "Learn the latest techniques and patterns for building modern web applications...",
            ContentType::Technology,
            ("Development", "fas fa-code"),
            (7, 956, 192, 34),
            (2024, 3, 14),
            (
                "Mark Wilson",
                "Senior Developer",
                "https://images.pexels.com/photos/2379005/pexels-photo-2379005.jpeg",
            ),
            "https://images.pexels.com/photos/1181298/pexels-photo-1181298.jpeg",
        ),
        seed(
            3,
            "UI Design Trends for 2024",
            "Explore the latest trends in user interface design and how to implement them...",
            ContentType::Design,
            ("Design", "fas fa-paint-brush"),
            (4, 784, 167, 28),
            (2024, 3, 13),
            (
                "Sarah Chen",
                "UX Designer",
                "https://images.pexels.com/photos/415829/pexels-photo-415829.jpeg",
            ),
            "https://images.pexels.com/photos/3182773/pexels-photo-3182773.jpeg",
        ),
    ]
}
