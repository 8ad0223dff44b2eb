use std::collections::HashMap;

use crate::content_type::ContentType;

/// Avatar image used by article cards whose author has none.
pub const DEFAULT_PORTRAIT_URL: &str =
    "https://images.pexels.com/photos/220453/pexels-photo-220453.jpeg";

const DEFAULT_FALLBACKS: [(ContentType, &str); 6] = [
    (
        ContentType::Technology,
        "https://images.pexels.com/photos/546819/pexels-photo-546819.jpeg",
    ),
    (
        ContentType::Design,
        "https://images.pexels.com/photos/196644/pexels-photo-196644.jpeg",
    ),
    (
        ContentType::Ai,
        "https://images.pexels.com/photos/8386440/pexels-photo-8386440.jpeg",
    ),
    (
        ContentType::Mobile,
        "https://images.pexels.com/photos/1440727/pexels-photo-1440727.jpeg",
    ),
    (
        ContentType::Developer,
        "https://images.pexels.com/photos/574071/pexels-photo-574071.jpeg",
    ),
    (
        ContentType::Workspace,
        "https://images.pexels.com/photos/1181677/pexels-photo-1181677.jpeg",
    ),
];

/// Outcome of a catalog lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackLookup<'a> {
    Available(&'a str),
    Missing,
}

/// Content type to default image URL mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackCatalog {
    entries: HashMap<ContentType, String>,
}

impl Default for FallbackCatalog {
    fn default() -> Self {
        Self::default_entries()
            .map(|(kind, url)| (kind, url.to_string()))
            .collect()
    }
}

impl FromIterator<(ContentType, String)> for FallbackCatalog {
    fn from_iter<I: IntoIterator<Item = (ContentType, String)>>(
        iter: I,
    ) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FallbackCatalog {
    /// The built-in content type to URL table.
    pub fn default_entries()
    -> impl Iterator<Item = (ContentType, &'static str)> {
        DEFAULT_FALLBACKS.into_iter()
    }

    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_entry(
        mut self,
        kind: ContentType,
        url: impl Into<String>,
    ) -> Self {
        self.insert(kind, url);
        self
    }

    pub fn insert(&mut self, kind: ContentType, url: impl Into<String>) {
        self.entries.insert(kind, url.into());
    }

    pub fn lookup(&self, kind: &ContentType) -> FallbackLookup<'_> {
        match self.entries.get(kind) {
            Some(url) => FallbackLookup::Available(url),
            None => FallbackLookup::Missing,
        }
    }

    /// Convenience accessor returning the URL when present.
    pub fn url_for(&self, kind: &ContentType) -> Option<&str> {
        self.entries.get(kind).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
