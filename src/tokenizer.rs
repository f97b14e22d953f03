//! Viterbi/A* tokenizer built on top of a [`crate::Dictionary`].
pub(crate) mod lattice;
pub(crate) mod nbest_generator;
pub mod worker;

use std::sync::Arc;

use crate::Dictionary;
use crate::dictionary::connector::ConnectorCost;
use crate::dictionary::{ArchivedDictionaryInner, ConnectorKindRef, DictionaryInner, DictionaryInnerRef};
use crate::errors::{Result, ComugiError};
use crate::sentence::Sentence;
use crate::tokenizer::lattice::LatticeBuilder;
use crate::tokenizer::worker::Worker;

/// Tokenizer.
///
/// Cheap to clone: the dictionary is held behind an `Arc`, so cloning just
/// bumps a reference count. Each [`Worker`] created from a tokenizer owns its
/// own lattice/sentence scratch space and can run on its own thread.
#[derive(Clone)]
pub struct Tokenizer {
    dict: Arc<Dictionary>,
    // MeCab compatibility knobs.
    space_cateset: Option<u32>,
    max_grouping_len: Option<usize>,
}

impl Tokenizer {
    /// Creates a new tokenizer, taking ownership of the dictionary.
    ///
    /// Use [`Tokenizer::from_shared_dictionary`] to share one dictionary
    /// across several tokenizers without reloading it.
    pub fn new(dict: Dictionary) -> Self {
        Self {
            dict: Arc::new(dict),
            space_cateset: None,
            max_grouping_len: None,
        }
    }

    /// Creates a new tokenizer directly from a [`DictionaryInner`].
    pub fn from_inner(dict: DictionaryInner) -> Self {
        Self::new(Dictionary::from_inner(dict))
    }

    /// Creates a new tokenizer from a shared, already-wrapped dictionary.
    pub fn from_shared_dictionary(dict: Arc<Dictionary>) -> Self {
        Self {
            dict,
            space_cateset: None,
            max_grouping_len: None,
        }
    }

    /// Ignores spaces from tokens, for compatibility with MeCab.
    ///
    /// # Errors
    ///
    /// Returns an error if category `SPACE` is not defined in `char.def`.
    pub fn ignore_space(mut self, yes: bool) -> Result<Self> {
        if yes {
            let cate_id = match &*self.dict {
                Dictionary::Archived { data, .. } => data.char_prop().cate_id("SPACE"),
                Dictionary::Owned(dict) => dict.char_prop().cate_id("SPACE"),
            }
            .ok_or_else(|| {
                ComugiError::invalid_argument(
                    "dict",
                    "SPACE is not defined in the input dictionary (i.e., char.def).",
                )
            })?;

            self.space_cateset = Some(1 << cate_id);
        } else {
            self.space_cateset = None;
        }
        Ok(self)
    }

    /// Specifies the maximum grouping length for unknown words.
    ///
    /// This option is for compatibility with MeCab. Pass `24` to obtain the
    /// same results as MeCab. `0` means unbounded (the default).
    pub const fn max_grouping_len(mut self, max_grouping_len: usize) -> Self {
        if max_grouping_len != 0 {
            self.max_grouping_len = Some(max_grouping_len);
        } else {
            self.max_grouping_len = None;
        }
        self
    }

    /// Gets the reference to the dictionary.
    pub(crate) fn dictionary<'a>(&'a self) -> DictionaryInnerRef<'a> {
        match &*self.dict {
            Dictionary::Archived { data, .. } => DictionaryInnerRef::Archived(data),
            Dictionary::Owned(dict) => DictionaryInnerRef::Owned(dict),
        }
    }

    /// Creates a new worker.
    pub fn new_worker(&self) -> Worker {
        Worker::new(self.clone())
    }

    pub(crate) fn build_lattice<L>(&self, sent: &Sentence, lattice: &mut L)
    where
        L: LatticeBuilder,
    {
        match self.dictionary().connector() {
            ConnectorKindRef::Owned(c) => self.build_lattice_inner(sent, lattice, c),
            ConnectorKindRef::Archived(c) => self.build_lattice_inner(sent, lattice, c),
        }
    }

    fn build_lattice_inner<L, C>(&self, sent: &Sentence, lattice: &mut L, connector: &C)
    where
        L: LatticeBuilder,
        C: ConnectorCost,
    {
        // `start_node`/`start_word` both track the starting character position
        // of words currently stored in the lattice. Without `ignore_space()`
        // they always agree and `start_node` is effectively unused. With it,
        // `start_node` tracks the position including a leading space run and
        // `start_word` the position after skipping it, so that a word starting
        // right after spaces still connects back to the node before them.
        let mut start_node = 0;
        let mut start_word = 0;

        while start_word < sent.len_char() {
            if !lattice.has_previous_node(start_node) {
                start_word += 1;
                start_node = start_word;
                continue;
            }

            if let Some(space_cateset) = self.space_cateset {
                let is_space = (sent.char_info(start_node).cate_idset() & space_cateset) != 0;
                if is_space {
                    start_word += sent.groupable(start_node);
                }
            }

            // Does the input end with spaces?
            if start_word == sent.len_char() {
                break;
            }

            self.add_lattice_edges(sent, lattice, start_node, start_word, connector);

            start_word += 1;
            start_node = start_word;
        }

        lattice.insert_eos(start_node, connector);
    }

    fn add_lattice_edges<L, C>(
        &self,
        sent: &Sentence,
        lattice: &mut L,
        start_node: usize,
        start_word: usize,
        connector: &C,
    ) where
        L: LatticeBuilder,
        C: ConnectorCost,
    {
        let suffix = &sent.chars()[start_word..];
        let mut has_matched = false;

        match self.dictionary() {
            DictionaryInnerRef::Archived(dict) => {
                for m in dict.lexicon().common_prefix_iterator(suffix) {
                    debug_assert!(start_word + m.end_char <= sent.len_char());
                    lattice.insert_node(
                        start_node,
                        start_word,
                        start_word + m.end_char,
                        m.word_idx,
                        m.word_param,
                        connector,
                    );
                    has_matched = true;
                }
                dict.unk_handler().gen_unk_words(
                    sent,
                    start_word,
                    has_matched,
                    self.max_grouping_len,
                    |w| {
                        lattice.insert_node(
                            start_node,
                            w.start_char(),
                            w.end_char(),
                            w.word_idx(),
                            w.word_param(),
                            connector,
                        );
                    },
                );
            }
            DictionaryInnerRef::Owned(dict) => {
                for m in dict.lexicon().common_prefix_iterator(suffix) {
                    debug_assert!(start_word + m.end_char <= sent.len_char());
                    lattice.insert_node(
                        start_node,
                        start_word,
                        start_word + m.end_char,
                        m.word_idx,
                        m.word_param,
                        connector,
                    );
                    has_matched = true;
                }
                dict.unk_handler().gen_unk_words(
                    sent,
                    start_word,
                    has_matched,
                    self.max_grouping_len,
                    |w| {
                        lattice.insert_node(
                            start_node,
                            w.start_char(),
                            w.end_char(),
                            w.word_idx(),
                            w.word_param(),
                            connector,
                        );
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dictionary::SystemDictionaryBuilder;

    #[track_caller]
    fn build_test_dictionary(
        lexicon_csv: &[u8],
        matrix_def: &[u8],
        char_def: &[u8],
        unk_def: &[u8],
    ) -> Dictionary {
        let dict_inner =
            SystemDictionaryBuilder::from_readers(lexicon_csv, matrix_def, char_def, unk_def).unwrap();

        Dictionary::from_inner(dict_inner)
    }

    #[test]
    fn test_tokenize_1() {
        let lexicon_csv = "自然,0,0,1,sizen
言語,0,0,4,gengo
処理,0,0,3,shori
自然言語,0,0,6,sizengengo
言語処理,0,0,5,gengoshori";
        let matrix_def = "1 1\n0 0 0";
        let char_def = "DEFAULT 0 1 0";
        let unk_def = "DEFAULT,0,0,100,*";

        let dict = build_test_dictionary(
            lexicon_csv.as_bytes(),
            matrix_def.as_bytes(),
            char_def.as_bytes(),
            unk_def.as_bytes(),
        );

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("自然言語処理");
        worker.tokenize();
        assert_eq!(worker.num_tokens(), 2);

        {
            let t = worker.token(0);
            assert_eq!(t.surface(), "自然");
            assert_eq!(t.range_char(), 0..2);
            assert_eq!(t.range_byte(), 0..6);
            assert_eq!(t.feature(), "sizen");
            assert_eq!(t.total_cost(), 1);
        }
        {
            let t = worker.token(1);
            assert_eq!(t.surface(), "言語処理");
            assert_eq!(t.range_char(), 2..6);
            assert_eq!(t.range_byte(), 6..18);
            assert_eq!(t.feature(), "gengoshori");
            assert_eq!(t.total_cost(), 6);
        }
    }

    #[test]
    fn test_tokenize_2() {
        let lexicon_csv = "自然,0,0,1,sizen
言語,0,0,4,gengo
処理,0,0,3,shori
自然言語,0,0,6,sizengengo
言語処理,0,0,5,gengoshori";
        let matrix_def = "1 1\n0 0 0";
        let char_def = "DEFAULT 0 1 0";
        let unk_def = "DEFAULT,0,0,100,*";

        let dict = build_test_dictionary(
            lexicon_csv.as_bytes(),
            matrix_def.as_bytes(),
            char_def.as_bytes(),
            unk_def.as_bytes(),
        );

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("自然日本語処理");
        worker.tokenize();
        assert_eq!(worker.num_tokens(), 2);

        {
            let t = worker.token(0);
            assert_eq!(t.surface(), "自然");
            assert_eq!(t.range_char(), 0..2);
            assert_eq!(t.range_byte(), 0..6);
            assert_eq!(t.feature(), "sizen");
            assert_eq!(t.total_cost(), 1);
        }
        {
            let t = worker.token(1);
            assert_eq!(t.surface(), "日本語処理");
            assert_eq!(t.range_char(), 2..7);
            assert_eq!(t.range_byte(), 6..21);
            assert_eq!(t.feature(), "*");
            assert_eq!(t.total_cost(), 101);
        }
    }

    #[test]
    fn test_tokenize_3() {
        let lexicon_csv = "自然,0,0,1,sizen
言語,0,0,4,gengo
処理,0,0,3,shori
自然言語,0,0,6,sizengengo
言語処理,0,0,5,gengoshori";
        let matrix_def = "1 1\n0 0 0";
        let char_def = "DEFAULT 0 0 3";
        let unk_def = "DEFAULT,0,0,100,*";

        let dict = build_test_dictionary(
            lexicon_csv.as_bytes(),
            matrix_def.as_bytes(),
            char_def.as_bytes(),
            unk_def.as_bytes(),
        );

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("不自然言語処理");
        worker.tokenize();
        assert_eq!(worker.num_tokens(), 2);

        {
            let t = worker.token(0);
            assert_eq!(t.surface(), "不自然");
            assert_eq!(t.range_char(), 0..3);
            assert_eq!(t.range_byte(), 0..9);
            assert_eq!(t.feature(), "*");
            assert_eq!(t.total_cost(), 100);
        }
        {
            let t = worker.token(1);
            assert_eq!(t.surface(), "言語処理");
            assert_eq!(t.range_char(), 3..7);
            assert_eq!(t.range_byte(), 9..21);
            assert_eq!(t.feature(), "gengoshori");
            assert_eq!(t.total_cost(), 105);
        }
    }

    #[test]
    fn test_tokenize_empty() {
        let lexicon_csv = "自然,0,0,1,sizen
言語,0,0,4,gengo
処理,0,0,3,shori
自然言語,0,0,6,sizengengo
言語処理,0,0,5,gengoshori";
        let matrix_def = "1 1\n0 0 0";
        let char_def = "DEFAULT 0 0 3";
        let unk_def = "DEFAULT,0,0,100,*";

        let dict = build_test_dictionary(
            lexicon_csv.as_bytes(),
            matrix_def.as_bytes(),
            char_def.as_bytes(),
            unk_def.as_bytes(),
        );

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("");
        worker.tokenize();
        assert_eq!(worker.num_tokens(), 0);
    }
}
