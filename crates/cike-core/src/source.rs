//! Source tags.
//!
//! Every event carries the tag of the site it was scraped from. The set is
//! closed: any spelling outside it parses to [`SourceTag::Other`], so key
//! and id computations never depend on how a scraper spelled its tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The site an event was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceTag {
    /// Košice IT Valley event listing.
    ItValley,
    /// American Chamber of Commerce in Slovakia.
    AmCham,
    /// Slovak Chamber of Commerce and Industry.
    Sopk,
    /// ICKK education listing.
    Ickk,
    /// Anything unrecognized.
    Other,
}

impl SourceTag {
    /// All tags, `Other` last.
    pub const ALL: [SourceTag; 5] = [
        Self::ItValley,
        Self::AmCham,
        Self::Sopk,
        Self::Ickk,
        Self::Other,
    ];

    /// The order in which sources are scraped.
    ///
    /// When two sources publish the same event, the one earlier in this list
    /// wins deduplication, so its location and description are kept. Changing
    /// this order changes which copy of a shared event is published.
    pub const INVOCATION_ORDER: [SourceTag; 4] =
        [Self::ItValley, Self::AmCham, Self::Sopk, Self::Ickk];

    /// Returns the canonical upper-case tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ItValley => "ITVALLEY",
            Self::AmCham => "AMCHAM",
            Self::Sopk => "SOPK",
            Self::Ickk => "ICKK",
            Self::Other => "OTHER",
        }
    }

    /// Parses a tag, collapsing unknown spellings to `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "ITVALLEY" => Self::ItValley,
            "AMCHAM" => Self::AmCham,
            "SOPK" => Self::Sopk,
            "ICKK" => Self::Ickk,
            _ => Self::Other,
        }
    }

    /// Glyph used when decorating exported titles.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::ItValley => "💻",
            Self::AmCham => "🤝",
            Self::Sopk => "🏭",
            Self::Ickk => "🎓",
            Self::Other => "📅",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl From<String> for SourceTag {
    fn from(s: String) -> Self {
        Self::from_tag(&s)
    }
}

impl From<SourceTag> for String {
    fn from(tag: SourceTag) -> Self {
        tag.as_str().to_string()
    }
}
