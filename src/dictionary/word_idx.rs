//! Identifier of a dictionary entry.
use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::LexType;

/// Identifies a word uniquely within a [`crate::dictionary::Dictionary`].
///
/// `word_id` is local to `lex_type`: the same numeric id can mean a
/// different word in the system lexicon than in the unknown-word handler.
#[derive(
    Clone, Copy, Eq, PartialEq, Debug, Hash, Default,
    Archive, Serialize, Deserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug, Eq, PartialEq, Hash, Clone, Copy))]
pub struct WordIdx {
    /// Which lexicon (`System` or `Unknown`) `word_id` is local to.
    pub lex_type: LexType,
    /// The entry's index within its lexicon.
    pub word_id: u32,
}

impl WordIdx {
    /// Builds a `WordIdx` from a lexicon tag and a per-lexicon entry index.
    #[inline(always)]
    pub const fn new(lex_type: LexType, word_id: u32) -> Self {
        Self { lex_type, word_id }
    }
}

impl ArchivedWordIdx {
    /// Converts the archived representation back to the native struct.
    #[inline(always)]
    pub fn to_native(&self) -> WordIdx {
        WordIdx {
            lex_type: self.lex_type.to_native(),
            word_id: self.word_id.to_native(),
        }
    }
}
