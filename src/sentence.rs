//! A compiled input sentence: decoded characters plus, once compiled
//! against a character-category table, per-character classification used
//! during lattice construction.
use crate::dictionary::character::{ArchivedCharProperty, CharInfo, CharProperty};

/// An input sentence prepared for tokenization.
///
/// Positions used throughout tokenization (`start_word`/`end_word`, lattice
/// node boundaries) are character indices, not byte offsets. `byte_position`
/// translates a character index back to a byte offset into `raw()` for
/// reporting surface spans.
#[derive(Default)]
pub struct Sentence {
    raw: String,
    chars: Vec<char>,
    byte_positions: Vec<usize>,
    char_infos: Vec<CharInfo>,
    groupable: Vec<usize>,
}

impl Sentence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.chars.clear();
        self.byte_positions.clear();
        self.char_infos.clear();
        self.groupable.clear();
    }

    /// Sets the raw input text and decodes it into characters and their
    /// byte offsets. Does not classify characters; call `compile` or
    /// `compile_archived` afterwards.
    pub fn set_sentence(&mut self, input: &str) {
        self.raw.clear();
        self.raw.push_str(input);
        self.chars.clear();
        self.byte_positions.clear();

        let mut pos = 0;
        for c in self.raw.chars() {
            self.chars.push(c);
            self.byte_positions.push(pos);
            pos += c.len_utf8();
        }
        self.byte_positions.push(pos);
    }

    /// Classifies every character using an owned character-category table.
    pub fn compile(&mut self, char_prop: &CharProperty) {
        self.char_infos = self.chars.iter().map(|&c| char_prop.char_info(c)).collect();
        self.compute_groupable();
    }

    /// Classifies every character using a zero-copy archived table.
    pub fn compile_archived(&mut self, char_prop: &ArchivedCharProperty) {
        self.char_infos = self.chars.iter().map(|&c| char_prop.char_info(c)).collect();
        self.compute_groupable();
    }

    fn compute_groupable(&mut self) {
        let n = self.chars.len();
        self.groupable = vec![1; n];
        for i in (0..n.saturating_sub(1)).rev() {
            if self.char_infos[i].base_id() == self.char_infos[i + 1].base_id() {
                self.groupable[i] = self.groupable[i + 1] + 1;
            }
        }
    }

    #[inline(always)]
    pub fn len_char(&self) -> usize {
        self.chars.len()
    }

    #[inline(always)]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    #[inline(always)]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Translates a character index (0..=len_char()) to a byte offset.
    #[inline(always)]
    pub fn byte_position(&self, char_idx: usize) -> usize {
        self.byte_positions[char_idx]
    }

    #[inline(always)]
    pub fn char_info(&self, idx: usize) -> CharInfo {
        self.char_infos[idx]
    }

    /// Length of the run of consecutive characters from `idx` sharing the
    /// same base category (used for MeCab-compatible space skipping and
    /// `group`-policy unknown-word synthesis).
    #[inline(always)]
    pub fn groupable(&self, idx: usize) -> usize {
        self.groupable[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::character::CategoryPolicy;

    #[test]
    fn byte_position_tracks_multibyte_chars() {
        let mut sent = Sentence::new();
        sent.set_sentence("自然言語");
        assert_eq!(sent.len_char(), 4);
        assert_eq!(sent.byte_position(0), 0);
        assert_eq!(sent.byte_position(1), 3);
        assert_eq!(sent.byte_position(4), 12);
    }

    #[test]
    fn groupable_run_lengths() {
        let prop = CharProperty::new(
            vec!["DEFAULT".to_string(), "DIGIT".to_string()],
            vec![CategoryPolicy::default(), CategoryPolicy::default()],
            vec![crate::dictionary::character::CodeRange { lo: '0' as u32, hi: '9' as u32, cate_id: 1 }],
        );
        let mut sent = Sentence::new();
        sent.set_sentence("12a3");
        sent.compile(&prop);
        assert_eq!(sent.groupable(0), 2);
        assert_eq!(sent.groupable(1), 1);
        assert_eq!(sent.groupable(2), 1);
        assert_eq!(sent.groupable(3), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut sent = Sentence::new();
        sent.set_sentence("abc");
        sent.clear();
        assert_eq!(sent.len_char(), 0);
        assert_eq!(sent.raw(), "");
    }
}
