//! Language tags and sets of them
//!
//! [`LanguageTag`] accepts the common BCP 47 shape
//! `language[-script][-region][-variant...]` and normalizes case, so `EN_us` and
//! `en-US` are the same tag. Extensions and private-use subtags are not supported.
//!
//! [`LanguageSet`] is a sorted set of tags with fallback matching: a set holding
//! `en` matches a request for `en-GB`.

use crate::error::{CommonError, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Normalized language tag such as `en`, `pt-BR` or `zh-Hant-TW`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguageTag {
    text: String,
}

/// Subtags of a parsed tag, borrowed from its normalized text
struct Parts<'a> {
    script: Option<&'a str>,
    region: Option<&'a str>,
}

impl LanguageTag {
    /// Parse and normalize a tag; `-` and `_` are both accepted as separators
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || CommonError::InvalidLanguageTag(input.to_string());
        // POSIX locales use '_' (en_US)
        let mut subtags = input.trim().split(['-', '_']).peekable();

        let language = subtags.next().filter(|s| is_language(s)).ok_or_else(invalid)?;
        let mut normalized = vec![language.to_ascii_lowercase()];

        if let Some(script) = subtags.next_if(|s| is_script(s)) {
            normalized.push(title_case(script));
        }
        if let Some(region) = subtags.next_if(|s| is_region(s)) {
            normalized.push(region.to_ascii_uppercase());
        }
        // Anything left must be a variant; extensions and private use end up here too
        for variant in subtags {
            if !is_variant(variant) {
                return Err(invalid());
            }
            normalized.push(variant.to_ascii_lowercase());
        }

        Ok(Self {
            text: normalized.join("-"),
        })
    }

    /// Normalized text of the tag
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Primary language subtag (`zh` for `zh-Hant-TW`)
    pub fn primary(&self) -> &str {
        self.text.split('-').next().unwrap_or(&self.text)
    }

    /// Script subtag (`Hant` for `zh-Hant-TW`)
    pub fn script(&self) -> Option<&str> {
        self.parts().script
    }

    /// Region subtag (`TW` for `zh-Hant-TW`)
    pub fn region(&self) -> Option<&str> {
        self.parts().region
    }

    /// Tag with the last subtag removed; `None` for a bare language
    pub fn parent(&self) -> Option<Self> {
        self.text.rfind('-').map(|cut| Self {
            text: self.text[..cut].to_string(),
        })
    }

    /// This tag followed by each of its ancestors, most specific first
    pub fn fallback_chain(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self.clone()), Self::parent)
    }

    fn parts(&self) -> Parts<'_> {
        let mut rest = self.text.split('-').skip(1).peekable();
        let script = rest.next_if(|s| is_script(s));
        let region = rest.next_if(|s| is_region(s));
        Parts { script, region }
    }
}

fn is_language(s: &str) -> bool {
    matches!(s.len(), 2 | 3 | 5..=8) && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_script(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_region(s: &str) -> bool {
    (s.len() == 2 && s.bytes().all(|b| b.is_ascii_alphabetic()))
        || (s.len() == 3 && s.bytes().all(|b| b.is_ascii_digit()))
}

fn is_variant(s: &str) -> bool {
    let alphanumeric = s.bytes().all(|b| b.is_ascii_alphanumeric());
    match s.len() {
        5..=8 => alphanumeric,
        4 => alphanumeric && s.as_bytes()[0].is_ascii_digit(),
        _ => false,
    }
}

fn title_case(s: &str) -> String {
    let mut out = s.to_ascii_lowercase();
    out[..1].make_ascii_uppercase();
    out
}

impl FromStr for LanguageTag {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for LanguageTag {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Sorted set of language tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageSet {
    tags: BTreeSet<LanguageTag>,
}

impl LanguageSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list such as `"en-US, de; fr"`
    ///
    /// Items are separated by commas, semicolons or whitespace; empty items are
    /// skipped. Any malformed item fails the whole parse.
    pub fn parse(list: &str) -> Result<Self> {
        list.split([',', ';'])
            .flat_map(str::split_whitespace)
            .map(LanguageTag::parse)
            .collect()
    }

    /// Add `tag`; returns `false` if it was already present
    pub fn insert(&mut self, tag: LanguageTag) -> bool {
        self.tags.insert(tag)
    }

    /// Remove `tag`; returns `false` if it was absent
    pub fn remove(&mut self, tag: &LanguageTag) -> bool {
        self.tags.remove(tag)
    }

    /// Whether exactly `tag` is in the set
    pub fn contains(&self, tag: &LanguageTag) -> bool {
        self.tags.contains(tag)
    }

    /// Whether `tag` or one of its ancestors is in the set
    pub fn matches(&self, tag: &LanguageTag) -> bool {
        tag.fallback_chain().any(|candidate| self.contains(&candidate))
    }

    /// Pick the candidate this set serves best
    ///
    /// The first candidate contained exactly wins; failing that, the first
    /// candidate matched through an ancestor.
    pub fn best_match<'a, I>(&self, candidates: I) -> Option<&'a LanguageTag>
    where
        I: IntoIterator<Item = &'a LanguageTag>,
        I::IntoIter: Clone,
    {
        let candidates = candidates.into_iter();
        candidates
            .clone()
            .find(|tag| self.contains(tag))
            // Second pass only when no candidate is contained exactly
            .or_else(|| candidates.clone().find(|tag| self.matches(tag)))
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags in sorted order
    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, LanguageTag> {
        self.tags.iter()
    }
}

impl FromStr for LanguageSet {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(tag, f)?;
        }
        Ok(())
    }
}

impl Extend<LanguageTag> for LanguageSet {
    fn extend<I: IntoIterator<Item = LanguageTag>>(&mut self, iter: I) {
        self.tags.extend(iter);
    }
}

impl FromIterator<LanguageTag> for LanguageSet {
    fn from_iter<I: IntoIterator<Item = LanguageTag>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LanguageSet {
    type Item = &'a LanguageTag;
    type IntoIter = std::collections::btree_set::Iter<'a, LanguageTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Both types travel as their display string
#[cfg(feature = "serde")]
mod serde_impl {
    use super::{LanguageSet, LanguageTag};
    use serde::de::{Deserialize, Deserializer, Error};
    use serde::ser::{Serialize, Serializer};
    use std::borrow::Cow;

    impl Serialize for LanguageTag {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(self.as_str())
        }
    }

    impl<'de> Deserialize<'de> for LanguageTag {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let text = Cow::<str>::deserialize(deserializer)?;
            Self::parse(&text).map_err(D::Error::custom)
        }
    }

    impl Serialize for LanguageSet {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for LanguageSet {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let text = Cow::<str>::deserialize(deserializer)?;
            Self::parse(&text).map_err(D::Error::custom)
        }
    }
}
