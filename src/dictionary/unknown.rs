//! Synthesis of candidate words for text the lexicon has no entry for.
use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::lexicon::feature::split4;
use crate::dictionary::lexicon::WordParam;
use crate::dictionary::word_idx::WordIdx;
use crate::dictionary::LexType;
use crate::sentence::Sentence;

/// One unknown-word template attached to a character category.
#[derive(Archive, Serialize, Deserialize, Clone)]
pub struct UnkEntry {
    left_id: u16,
    right_id: u16,
    word_cost: i16,
    feature: Box<str>,
}

impl UnkEntry {
    pub fn new(left_id: u16, right_id: u16, word_cost: i16, feature: String) -> Self {
        Self {
            left_id,
            right_id,
            word_cost,
            feature: feature.into_boxed_str(),
        }
    }
}

/// A freshly synthesized unknown-word candidate.
///
/// Built new per call, never sharing a mutable template with other
/// candidates: the same category can be the source of many candidates in
/// the same lattice-build pass, at different spans.
pub struct UnkWord {
    start_char: usize,
    end_char: usize,
    word_idx: WordIdx,
    word_param: WordParam,
}

impl UnkWord {
    #[inline(always)]
    pub fn start_char(&self) -> usize {
        self.start_char
    }

    #[inline(always)]
    pub fn end_char(&self) -> usize {
        self.end_char
    }

    #[inline(always)]
    pub fn word_idx(&self) -> WordIdx {
        self.word_idx
    }

    #[inline(always)]
    pub fn word_param(&self) -> WordParam {
        self.word_param
    }
}

/// Per-category unknown-word templates, indexed by category id via
/// `offsets[cate_id]..offsets[cate_id + 1]`.
#[derive(Archive, Serialize, Deserialize, Default)]
pub struct UnkHandler {
    offsets: Vec<usize>,
    entries: Vec<UnkEntry>,
}

impl UnkHandler {
    pub fn new(offsets: Vec<usize>, entries: Vec<UnkEntry>) -> Self {
        Self { offsets, entries }
    }

    fn category_range(&self, cate_id: usize) -> (usize, usize) {
        let lo = self.offsets.get(cate_id).copied().unwrap_or(0);
        let hi = self.offsets.get(cate_id + 1).copied().unwrap_or(lo);
        (lo, hi)
    }

    /// Generates unknown-word candidates starting at `start_word`.
    ///
    /// Candidates are only generated when the lexicon found nothing starting
    /// here (`!has_matched`), or when the character's category is marked
    /// `invoke` (meaning unknown words are always considered alongside
    /// dictionary hits, e.g. for numerals). `max_grouping_len` caps a
    /// `group`-policy category's run length (MeCab compatibility knob).
    pub fn gen_unk_words<F>(
        &self,
        sent: &Sentence,
        start_word: usize,
        has_matched: bool,
        max_grouping_len: Option<usize>,
        mut f: F,
    ) where
        F: FnMut(UnkWord),
    {
        let info = sent.char_info(start_word);
        if has_matched && !info.invoke() {
            return;
        }

        let cate_id = info.base_id() as usize;
        let (lo, hi) = self.category_range(cate_id);
        if lo == hi {
            return;
        }

        let len_char = sent.len_char();
        let mut end_positions = Vec::new();

        if info.group() {
            let mut run = sent.groupable(start_word).max(1);
            if let Some(max_len) = max_grouping_len {
                run = run.min(max_len);
            }
            end_positions.push((start_word + run).min(len_char));
        } else {
            let length = info.length().max(1) as usize;
            for l in 1..=length {
                let end = start_word + l;
                if end > len_char {
                    break;
                }
                end_positions.push(end);
            }
        }

        for end_char in end_positions {
            for i in lo..hi {
                let entry = &self.entries[i];
                f(UnkWord {
                    start_char: start_word,
                    end_char,
                    word_idx: WordIdx::new(LexType::Unknown, i as u32),
                    word_param: WordParam::new(entry.left_id, entry.right_id, entry.word_cost),
                });
            }
        }
    }

    pub fn word_param(&self, word_idx: WordIdx) -> WordParam {
        let e = &self.entries[word_idx.word_id as usize];
        WordParam::new(e.left_id, e.right_id, e.word_cost)
    }

    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        &self.entries[word_idx.word_id as usize].feature
    }

    pub fn pos(&self, word_idx: WordIdx) -> &str {
        split4(self.word_feature(word_idx))[0]
    }

    pub fn pos1(&self, word_idx: WordIdx) -> &str {
        split4(self.word_feature(word_idx))[1]
    }

    pub fn base(&self, word_idx: WordIdx) -> &str {
        split4(self.word_feature(word_idx))[2]
    }

    pub fn pronunciation(&self, word_idx: WordIdx) -> &str {
        split4(self.word_feature(word_idx))[3]
    }

    /// Total number of unknown-word template entries across all categories.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }
}

impl ArchivedUnkHandler {
    fn category_range(&self, cate_id: usize) -> (usize, usize) {
        let lo = self.offsets.get(cate_id).map(|v| v.to_native() as usize).unwrap_or(0);
        let hi = self
            .offsets
            .get(cate_id + 1)
            .map(|v| v.to_native() as usize)
            .unwrap_or(lo);
        (lo, hi)
    }

    pub fn gen_unk_words<F>(
        &self,
        sent: &Sentence,
        start_word: usize,
        has_matched: bool,
        max_grouping_len: Option<usize>,
        mut f: F,
    ) where
        F: FnMut(UnkWord),
    {
        let info = sent.char_info(start_word);
        if has_matched && !info.invoke() {
            return;
        }

        let cate_id = info.base_id() as usize;
        let (lo, hi) = self.category_range(cate_id);
        if lo == hi {
            return;
        }

        let len_char = sent.len_char();
        let mut end_positions = Vec::new();

        if info.group() {
            let mut run = sent.groupable(start_word).max(1);
            if let Some(max_len) = max_grouping_len {
                run = run.min(max_len);
            }
            end_positions.push((start_word + run).min(len_char));
        } else {
            let length = info.length().max(1) as usize;
            for l in 1..=length {
                let end = start_word + l;
                if end > len_char {
                    break;
                }
                end_positions.push(end);
            }
        }

        for end_char in end_positions {
            for i in lo..hi {
                let entry = &self.entries[i];
                f(UnkWord {
                    start_char: start_word,
                    end_char,
                    word_idx: WordIdx::new(LexType::Unknown, i as u32),
                    word_param: WordParam::new(
                        entry.left_id.to_native(),
                        entry.right_id.to_native(),
                        entry.word_cost.to_native(),
                    ),
                });
            }
        }
    }

    pub fn word_param(&self, word_idx: WordIdx) -> WordParam {
        let e = &self.entries[word_idx.word_id as usize];
        WordParam::new(e.left_id.to_native(), e.right_id.to_native(), e.word_cost.to_native())
    }

    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        &self.entries[word_idx.word_id as usize].feature
    }

    pub fn pos(&self, word_idx: WordIdx) -> &str {
        split4(self.word_feature(word_idx))[0]
    }

    pub fn pos1(&self, word_idx: WordIdx) -> &str {
        split4(self.word_feature(word_idx))[1]
    }

    pub fn base(&self, word_idx: WordIdx) -> &str {
        split4(self.word_feature(word_idx))[2]
    }

    pub fn pronunciation(&self, word_idx: WordIdx) -> &str {
        split4(self.word_feature(word_idx))[3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence_of(text: &str, invoke: bool, group: bool, length: u32) -> Sentence {
        use crate::dictionary::character::{CategoryPolicy, CharProperty};

        let prop = CharProperty::new(
            vec!["DEFAULT".to_string()],
            vec![CategoryPolicy { invoke, group, length }],
            vec![],
        );
        let mut sent = Sentence::new();
        sent.set_sentence(text);
        sent.compile(&prop);
        sent
    }

    #[test]
    fn fixed_length_generates_growing_candidates() {
        let handler = UnkHandler::new(
            vec![0, 1],
            vec![UnkEntry::new(0, 0, 100, "*".to_string())],
        );
        let sent = sentence_of("abcd", false, false, 3);
        let mut ends = Vec::new();
        handler.gen_unk_words(&sent, 0, false, None, |w| ends.push(w.end_char()));
        assert_eq!(ends, vec![1, 2, 3]);
    }

    #[test]
    fn group_policy_spans_the_whole_run() {
        let handler = UnkHandler::new(
            vec![0, 1],
            vec![UnkEntry::new(0, 0, 100, "*".to_string())],
        );
        let sent = sentence_of("abcd", false, true, 0);
        let mut ends = Vec::new();
        handler.gen_unk_words(&sent, 0, false, None, |w| ends.push(w.end_char()));
        assert_eq!(ends, vec![4]);
    }

    #[test]
    fn max_grouping_len_caps_the_run() {
        let handler = UnkHandler::new(
            vec![0, 1],
            vec![UnkEntry::new(0, 0, 100, "*".to_string())],
        );
        let sent = sentence_of("abcd", false, true, 0);
        let mut ends = Vec::new();
        handler.gen_unk_words(&sent, 0, false, Some(2), |w| ends.push(w.end_char()));
        assert_eq!(ends, vec![2]);
    }

    #[test]
    fn skips_generation_when_already_matched_and_not_invoke() {
        let handler = UnkHandler::new(
            vec![0, 1],
            vec![UnkEntry::new(0, 0, 100, "*".to_string())],
        );
        let sent = sentence_of("abcd", false, false, 1);
        let mut count = 0;
        handler.gen_unk_words(&sent, 0, true, None, |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn invoke_always_generates_even_when_matched() {
        let handler = UnkHandler::new(
            vec![0, 1],
            vec![UnkEntry::new(0, 0, 100, "*".to_string())],
        );
        let sent = sentence_of("abcd", true, false, 1);
        let mut count = 0;
        handler.gen_unk_words(&sent, 0, true, None, |_| count += 1);
        assert_eq!(count, 1);
    }
}
