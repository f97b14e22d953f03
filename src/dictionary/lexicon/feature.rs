//! Per-entry feature strings, carried verbatim from the dictionary source.
use rkyv::{Archive, Deserialize, Serialize};

/// Feature string storage for one lexicon.
///
/// A feature string is never parsed or rewritten by this crate beyond
/// splitting it into `pos`/`pos1`/`base`/`pronunciation` views on read;
/// storage keeps the original text so `feature()` returns it byte-for-byte.
#[derive(Archive, Serialize, Deserialize, Default)]
pub struct WordFeatures {
    features: Vec<Box<str>>,
}

/// Splits a feature string into its first four comma-separated fields,
/// defaulting missing trailing fields to `"*"` (the MeCab "no value" marker).
pub(crate) fn split4(feature: &str) -> [&str; 4] {
    let mut parts = feature.splitn(4, ',');
    [
        parts.next().unwrap_or("*"),
        parts.next().unwrap_or("*"),
        parts.next().unwrap_or("*"),
        parts.next().unwrap_or("*"),
    ]
}

impl WordFeatures {
    pub fn new<I>(features: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            features: features.into_iter().map(String::into_boxed_str).collect(),
        }
    }

    #[inline(always)]
    pub fn get(&self, word_id: usize) -> &str {
        &self.features[word_id]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn pos(&self, word_id: usize) -> &str {
        split4(self.get(word_id))[0]
    }

    pub fn pos1(&self, word_id: usize) -> &str {
        split4(self.get(word_id))[1]
    }

    pub fn base(&self, word_id: usize) -> &str {
        split4(self.get(word_id))[2]
    }

    pub fn pronunciation(&self, word_id: usize) -> &str {
        split4(self.get(word_id))[3]
    }
}

impl ArchivedWordFeatures {
    #[inline(always)]
    pub fn get(&self, word_id: usize) -> &str {
        &self.features[word_id]
    }

    pub fn pos(&self, word_id: usize) -> &str {
        split4(self.get(word_id))[0]
    }

    pub fn pos1(&self, word_id: usize) -> &str {
        split4(self.get(word_id))[1]
    }

    pub fn base(&self, word_id: usize) -> &str {
        split4(self.get(word_id))[2]
    }

    pub fn pronunciation(&self, word_id: usize) -> &str {
        split4(self.get(word_id))[3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_up_to_four_fields() {
        let f = WordFeatures::new(vec!["名詞,固有名詞,地名,キョウト,extra".to_string()]);
        assert_eq!(f.pos(0), "名詞");
        assert_eq!(f.pos1(0), "固有名詞");
        assert_eq!(f.base(0), "地名");
        assert_eq!(f.pronunciation(0), "キョウト,extra");
        assert_eq!(f.get(0), "名詞,固有名詞,地名,キョウト,extra");
    }

    #[test]
    fn defaults_missing_fields_to_star() {
        let f = WordFeatures::new(vec!["sizen".to_string()]);
        assert_eq!(f.pos(0), "sizen");
        assert_eq!(f.pos1(0), "*");
        assert_eq!(f.base(0), "*");
        assert_eq!(f.pronunciation(0), "*");
    }
}
