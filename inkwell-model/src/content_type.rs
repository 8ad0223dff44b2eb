use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Content-type tag carried by image elements in `data-type`.
///
/// The tag selects a fallback image when the requested source cannot be
/// loaded. Tags outside the known set are kept verbatim in [`Other`] so the
/// catalog can report them as missing instead of silently coercing them.
///
/// [`Other`]: ContentType::Other
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ContentType {
    #[default]
    Technology,
    Design,
    Ai,
    Mobile,
    Developer,
    Workspace,
    Portrait,
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Technology => "technology",
            ContentType::Design => "design",
            ContentType::Ai => "ai",
            ContentType::Mobile => "mobile",
            ContentType::Developer => "developer",
            ContentType::Workspace => "workspace",
            ContentType::Portrait => "portrait",
            ContentType::Other(tag) => tag,
        }
    }

    /// Resolve an optional `data-type` value, defaulting to `technology`.
    /// Tags are matched exactly, so `Design` is an unknown tag.
    pub fn from_attribute(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(Self::from_tag)
            .unwrap_or_default()
    }

    fn from_tag(tag: &str) -> Self {
        match tag {
            "technology" => ContentType::Technology,
            "design" => ContentType::Design,
            "ai" => ContentType::Ai,
            "mobile" => ContentType::Mobile,
            "developer" => ContentType::Developer,
            "workspace" => ContentType::Workspace,
            "portrait" => ContentType::Portrait,
            _ => ContentType::Other(tag.to_string()),
        }
    }
}

impl FromStr for ContentType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err(ModelError::EmptyContentType);
        }
        Ok(Self::from_tag(tag))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ContentType {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ContentType {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
