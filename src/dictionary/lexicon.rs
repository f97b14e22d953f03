//! The known-word vocabulary: a double-array trie paired with a surface
//! index, word parameters, and feature strings.
pub(crate) mod double_array;
pub(crate) mod feature;
pub(crate) mod param;

use rkyv::{Archive, Deserialize, Serialize};

pub use crate::dictionary::lexicon::double_array::DoubleArray;
pub use crate::dictionary::lexicon::feature::WordFeatures;
pub use crate::dictionary::lexicon::param::{WordParam, WordParams};
use crate::dictionary::word_idx::WordIdx;
use crate::dictionary::LexType;
use crate::errors::{Result, ComugiError};

/// One matched entry from a common-prefix lookup.
#[derive(Debug, Clone, Copy)]
pub struct TrieMatch {
    /// The number of characters (from the query's start) the match spans.
    pub end_char: usize,
    pub word_idx: WordIdx,
    pub word_param: WordParam,
}

/// Maps surface text to the (possibly several, homograph) entry ids sharing
/// it. Kept as a key-sorted vector rather than a hash map so both the owned
/// and the zero-copy archived representation can do the same binary search.
fn lookup<'a>(index: &'a [(Box<str>, Vec<u32>)], key: &str) -> &'a [u32] {
    match index.binary_search_by(|entry| entry.0.as_ref().cmp(key)) {
        Ok(i) => &index[i].1,
        Err(_) => &[],
    }
}

/// A vocabulary of known words.
#[derive(Archive, Serialize, Deserialize)]
pub struct Lexicon {
    trie: DoubleArray,
    surface_index: Vec<(Box<str>, Vec<u32>)>,
    params: WordParams,
    features: WordFeatures,
    lex_type: LexType,
}

impl Lexicon {
    /// Builds a lexicon from entries `(surface, WordParam, feature)`.
    ///
    /// Entries sharing the same surface become distinct homograph ids under
    /// one trie key.
    pub fn new<I>(entries: I, lex_type: LexType) -> Result<Self>
    where
        I: IntoIterator<Item = (String, WordParam, String)>,
    {
        let mut grouped: hashbrown::HashMap<String, Vec<u32>> = hashbrown::HashMap::new();
        let mut params = Vec::new();
        let mut features = Vec::new();

        for (surface, param, feature) in entries {
            if surface.is_empty() {
                return Err(ComugiError::invalid_argument(
                    "entries",
                    "a lexicon entry's surface must not be empty",
                ));
            }
            let word_id = params.len() as u32;
            params.push(param);
            features.push(feature);
            grouped.entry(surface).or_default().push(word_id);
        }

        let mut surface_index: Vec<(Box<str>, Vec<u32>)> = grouped
            .into_iter()
            .map(|(k, v)| (k.into_boxed_str(), v))
            .collect();
        surface_index.sort_by(|a, b| a.0.cmp(&b.0));

        let mut trie = DoubleArray::new();
        trie.build(surface_index.iter().map(|(s, _)| s.as_bytes()));

        Ok(Self {
            trie,
            surface_index,
            params: WordParams::new(params),
            features: WordFeatures::new(features),
            lex_type,
        })
    }

    /// Number of distinct entries (not distinct surfaces) in the lexicon.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every entry whose surface is a prefix of `chars`.
    pub fn common_prefix_iterator<'a>(
        &'a self,
        chars: &'a [char],
    ) -> impl Iterator<Item = TrieMatch> + 'a {
        let suffix: String = chars.iter().collect();
        let hits = self.trie.search(suffix.as_bytes());
        let lex_type = self.lex_type;
        hits.into_iter().flat_map(move |surface| {
            let end_char = surface.chars().count();
            lookup(&self.surface_index, &surface)
                .iter()
                .map(move |&id| TrieMatch {
                    end_char,
                    word_idx: WordIdx::new(lex_type, id),
                    word_param: self.params.get(id as usize),
                })
                .collect::<Vec<_>>()
                .into_iter()
        })
    }

    pub fn word_param(&self, word_idx: WordIdx) -> WordParam {
        self.params.get(word_idx.word_id as usize)
    }

    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        self.features.get(word_idx.word_id as usize)
    }

    pub fn pos(&self, word_idx: WordIdx) -> &str {
        self.features.pos(word_idx.word_id as usize)
    }

    pub fn pos1(&self, word_idx: WordIdx) -> &str {
        self.features.pos1(word_idx.word_id as usize)
    }

    pub fn base(&self, word_idx: WordIdx) -> &str {
        self.features.base(word_idx.word_id as usize)
    }

    pub fn pronunciation(&self, word_idx: WordIdx) -> &str {
        self.features.pronunciation(word_idx.word_id as usize)
    }
}

impl ArchivedLexicon {
    pub fn common_prefix_iterator<'a>(
        &'a self,
        chars: &'a [char],
    ) -> impl Iterator<Item = TrieMatch> + 'a {
        let suffix: String = chars.iter().collect();
        let hits = self.trie.search(suffix.as_bytes());
        let lex_type = self.lex_type.to_native();
        hits.into_iter().flat_map(move |surface| {
            let end_char = surface.chars().count();
            let ids: Vec<u32> = match self.surface_index.binary_search_by(|entry| {
                let s: &str = &entry.0;
                s.cmp(surface.as_str())
            }) {
                Ok(i) => self.surface_index[i].1.iter().map(|id| id.to_native()).collect(),
                Err(_) => Vec::new(),
            };
            ids.into_iter()
                .map(move |id| TrieMatch {
                    end_char,
                    word_idx: WordIdx::new(lex_type, id),
                    word_param: self.params.get(id as usize),
                })
                .collect::<Vec<_>>()
                .into_iter()
        })
    }

    pub fn word_param(&self, word_idx: WordIdx) -> WordParam {
        self.params.get(word_idx.word_id as usize)
    }

    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        self.features.get(word_idx.word_id as usize)
    }

    pub fn pos(&self, word_idx: WordIdx) -> &str {
        self.features.pos(word_idx.word_id as usize)
    }

    pub fn pos1(&self, word_idx: WordIdx) -> &str {
        self.features.pos1(word_idx.word_id as usize)
    }

    pub fn base(&self, word_idx: WordIdx) -> &str {
        self.features.base(word_idx.word_id as usize)
    }

    pub fn pronunciation(&self, word_idx: WordIdx) -> &str {
        self.features.pronunciation(word_idx.word_id as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Lexicon {
        Lexicon::new(
            vec![
                ("自然".to_string(), WordParam::new(0, 0, 1), "sizen".to_string()),
                ("言語".to_string(), WordParam::new(0, 0, 4), "gengo".to_string()),
                ("自然言語".to_string(), WordParam::new(0, 0, 6), "sizengengo".to_string()),
            ],
            LexType::System,
        )
        .unwrap()
    }

    #[test]
    fn common_prefix_matches_increasing_length() {
        let lex = sample();
        let chars: Vec<char> = "自然言語処理".chars().collect();
        let mut ends: Vec<usize> = lex.common_prefix_iterator(&chars).map(|m| m.end_char).collect();
        ends.sort_unstable();
        assert_eq!(ends, vec![2, 4]);
    }

    #[test]
    fn homographs_share_a_surface() {
        let lex = Lexicon::new(
            vec![
                ("橋".to_string(), WordParam::new(0, 0, 1), "bridge".to_string()),
                ("橋".to_string(), WordParam::new(1, 1, 2), "chopsticks".to_string()),
            ],
            LexType::System,
        )
        .unwrap();
        let chars: Vec<char> = "橋".chars().collect();
        let matches: Vec<_> = lex.common_prefix_iterator(&chars).collect();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn empty_surface_is_rejected() {
        let err = Lexicon::new(
            vec![(String::new(), WordParam::default(), String::new())],
            LexType::System,
        );
        assert!(err.is_err());
    }
}
