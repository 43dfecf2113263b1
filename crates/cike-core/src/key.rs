//! Canonical keys, stable identifiers and title decoration.
//!
//! Deduplication compares [`CanonicalKey`]s built from the undecorated,
//! whitespace-collapsed, lower-cased title and the start. Exported entries
//! are identified by a [`StableId`], a SHA-256 over the same parts plus the
//! source tag, so re-running on the same input yields the same ids.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::record::NormalizedEvent;
use crate::source::SourceTag;

/// Domain suffix of exported UIDs.
pub const UID_DOMAIN: &str = "cike-calendar";

/// Leading decorations: an optional pictograph followed by a bracketed
/// known tag, repeated.
static DECORATION: LazyLock<Regex> = LazyLock::new(|| {
    let tags = SourceTag::ALL
        .iter()
        .map(SourceTag::as_str)
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r"(?i)^(?:\s*(?:\p{{Extended_Pictographic}}[\x{{FE0F}}\x{{200D}}\p{{Extended_Pictographic}}]*\s*)?\[(?:{tags})\](?:\s+|$))+"
    );
    Regex::new(&pattern).expect("Invalid decoration regex")
});

/// Removes leading `<glyph> [<TAG>]` decorations from a title.
///
/// Only known tags are stripped, so a title that merely starts with
/// brackets keeps them. Stripping twice equals stripping once.
pub fn strip_decoration(title: &str) -> &str {
    match DECORATION.find(title) {
        Some(m) => title[m.end()..].trim_start(),
        None => title,
    }
}

/// Title form used for comparison: undecorated, whitespace collapsed,
/// lower-cased.
pub fn normalize_title(title: &str) -> String {
    strip_decoration(title)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Date part of an event's key: `YYYY-MM-DD` for all-day events,
/// `YYYY-MM-DDTHH:MM` for timed ones.
pub fn date_component(event: &NormalizedEvent) -> String {
    event.start().key_component()
}

/// Presentation title: `<glyph> [<TAG>] <title>`.
///
/// Existing decorations are removed first so titles never stack prefixes.
pub fn decorate_title(source: SourceTag, title: &str) -> String {
    format!(
        "{} [{}] {}",
        source.glyph(),
        source.as_str(),
        strip_decoration(title).trim()
    )
}

/// Identity of an event for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanonicalKey {
    title: String,
    when: String,
}

impl CanonicalKey {
    /// Builds a key from a title and an already formatted start component.
    pub fn new(title: &str, when: impl Into<String>) -> Self {
        Self {
            title: normalize_title(title),
            when: when.into(),
        }
    }

    /// Key of a normalized event.
    pub fn for_event(event: &NormalizedEvent) -> Self {
        Self::new(event.title(), date_component(event))
    }

    /// Normalized title part.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Start part, `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM`.
    pub fn when(&self) -> &str {
        &self.when
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.title, self.when)
    }
}

/// Deterministic external identifier of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    /// Hashes a key together with its source tag.
    pub fn new(key: &CanonicalKey, source: SourceTag) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.title.as_bytes());
        hasher.update(b"|");
        hasher.update(key.when.as_bytes());
        hasher.update(b"|");
        hasher.update(source.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Identifier of a normalized event.
    pub fn for_event(event: &NormalizedEvent) -> Self {
        Self::new(&event.canonical_key(), event.source())
    }

    /// Full hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// iCalendar UID: shortened digest at [`UID_DOMAIN`].
    pub fn uid(&self) -> String {
        format!("{}@{}", &self.0[..32], UID_DOMAIN)
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawEventRecord, normalize_record};
    use crate::time::EventTime;
    use chrono::NaiveDate;

    fn event(title: &str, source: SourceTag) -> NormalizedEvent {
        let start = EventTime::from_date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        normalize_record(RawEventRecord::new(title, start, source)).unwrap()
    }

    mod decoration {
        use super::*;

        #[test]
        fn strips_glyph_and_tag() {
            assert_eq!(strip_decoration("💻 [ITVALLEY] Hackathon"), "Hackathon");
            assert_eq!(strip_decoration("[SOPK] Veľtrh"), "Veľtrh");
            assert_eq!(strip_decoration("  🤝 [amcham]   Breakfast"), "Breakfast");
        }

        #[test]
        fn strips_stacked_decorations() {
            assert_eq!(
                strip_decoration("🏭 [SOPK] 💻 [ITVALLEY] Double"),
                "Double"
            );
        }

        #[test]
        fn keeps_unknown_brackets() {
            assert_eq!(strip_decoration("[ONLINE] Webinar"), "[ONLINE] Webinar");
            assert_eq!(strip_decoration("Webinar [SOPK]"), "Webinar [SOPK]");
        }

        #[test]
        fn stripping_is_idempotent() {
            for title in [
                "💻 [ITVALLEY] Hackathon",
                "🏭 [SOPK] 🏭 [SOPK] Fair",
                "[OTHER]",
                "Plain title",
                "",
            ] {
                let once = strip_decoration(title);
                assert_eq!(strip_decoration(once), once, "{title:?}");
            }
        }

        #[test]
        fn decorate_does_not_stack() {
            let decorated = decorate_title(SourceTag::Sopk, "Veľtrh");
            assert_eq!(decorated, "🏭 [SOPK] Veľtrh");
            assert_eq!(decorate_title(SourceTag::Sopk, &decorated), decorated);
        }

        #[test]
        fn decorate_then_strip_recovers_title() {
            for tag in SourceTag::ALL {
                assert_eq!(strip_decoration(&decorate_title(tag, "Demo Day")), "Demo Day");
            }
        }
    }

    mod keys {
        use super::*;

        #[test]
        fn normalized_title_collapses_whitespace_and_case() {
            assert_eq!(normalize_title("  AI   Summit\n2025 "), "ai summit 2025");
            assert_eq!(normalize_title("💻 [ITVALLEY] AI Summit"), "ai summit");
        }

        #[test]
        fn decorated_and_plain_titles_share_a_key() {
            let plain = event("AI Summit", SourceTag::ItValley);
            let decorated = event("💻 [ITVALLEY]  ai summit", SourceTag::ItValley);
            assert_eq!(plain.canonical_key(), decorated.canonical_key());
        }

        #[test]
        fn key_display() {
            let key = event("AI Summit", SourceTag::Sopk).canonical_key();
            assert_eq!(key.to_string(), "ai summit|2025-03-10");
            assert_eq!(key.when(), "2025-03-10");
        }
    }

    mod ids {
        use super::*;

        #[test]
        fn stable_across_calls() {
            let a = event("AI Summit", SourceTag::Sopk).stable_id();
            let b = event("  ai   SUMMIT ", SourceTag::Sopk).stable_id();
            assert_eq!(a, b);
            assert_eq!(a.as_str().len(), 64);
        }

        #[test]
        fn source_changes_id() {
            let a = event("AI Summit", SourceTag::Sopk).stable_id();
            let b = event("AI Summit", SourceTag::Ickk).stable_id();
            assert_ne!(a, b);
        }

        #[test]
        fn uid_shape() {
            let uid = event("AI Summit", SourceTag::Sopk).stable_id().uid();
            let (digest, domain) = uid.split_once('@').unwrap();
            assert_eq!(digest.len(), 32);
            assert_eq!(domain, UID_DOMAIN);
            assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
