//! Dictionary for tokenization: the lexicon, connection matrix, character
//! categories, and unknown-word handler bundled into one artifact.
pub mod builder;
pub(crate) mod character;
pub(crate) mod connector;
pub(crate) mod lexicon;
pub(crate) mod unknown;
pub(crate) mod word_idx;

use std::io::{Read, Write};
use std::sync::Arc;

use rkyv::{
    access, api::serialize_using, rancor::Error, ser::allocator::Arena, ser::sharing::Share,
    ser::writer::IoWriter, ser::Serializer, util::{with_arena, AlignedVec}, Archive, Deserialize,
    Serialize,
};

use crate::dictionary::character::{ArchivedCharProperty, CharProperty};
use crate::dictionary::connector::{ArchivedMatrixConnector, MatrixConnector};
use crate::dictionary::lexicon::{ArchivedLexicon, Lexicon, WordParam};
use crate::dictionary::unknown::{ArchivedUnkHandler, UnkHandler};
use crate::errors::{Result, ComugiError};

pub use crate::dictionary::builder::SystemDictionaryBuilder;
pub use crate::dictionary::word_idx::WordIdx;

/// Magic bytes identifying a dictionary artifact produced by this crate.
pub const MODEL_MAGIC: &[u8] = b"ComugiRsTokenizer 1\n";

const MODEL_MAGIC_LEN: usize = MODEL_MAGIC.len();

/// Type of a lexicon that contains the word.
#[derive(
    Clone, Copy, Eq, PartialEq, Debug, Hash, Default,
    Archive, Serialize, Deserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug, Eq, PartialEq, Hash, Clone, Copy))]
#[repr(u8)]
pub enum LexType {
    /// System lexicon.
    #[default]
    System,
    /// Synthesized unknown words.
    Unknown,
}

impl ArchivedLexType {
    /// Converts the archived representation back to the native enum.
    pub fn to_native(&self) -> LexType {
        match self {
            ArchivedLexType::System => LexType::System,
            ArchivedLexType::Unknown => LexType::Unknown,
        }
    }
}

/// Inner data of a [`Dictionary`].
#[derive(Archive, Serialize, Deserialize)]
pub struct DictionaryInner {
    lexicon: Lexicon,
    connector: MatrixConnector,
    char_prop: CharProperty,
    unk_handler: UnkHandler,
}

/// A dictionary for tokenization.
///
/// `Owned` holds heap-allocated, directly-constructed data (e.g. fresh out
/// of [`SystemDictionaryBuilder`]); `Archived` holds data read back via
/// [`Dictionary::read`], accessed zero-copy through `rkyv`.
pub enum Dictionary {
    /// Heap-allocated, directly-constructed dictionary data.
    Owned(Arc<DictionaryInner>),
    /// Dictionary data read back via [`Dictionary::read`], accessed
    /// zero-copy through `rkyv`.
    Archived {
        /// The backing byte buffer `data` borrows from; kept alive for as
        /// long as the archived dictionary is in use.
        _bytes: AlignedVec<16>,
        /// Zero-copy view over `_bytes`.
        data: &'static ArchivedDictionaryInner,
    },
}

pub(crate) enum DictionaryInnerRef<'a> {
    Owned(&'a DictionaryInner),
    Archived(&'a ArchivedDictionaryInner),
}

pub(crate) enum ConnectorKindRef<'a> {
    Owned(&'a MatrixConnector),
    Archived(&'a ArchivedMatrixConnector),
}

impl DictionaryInner {
    #[inline(always)]
    pub(crate) const fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    #[inline(always)]
    pub(crate) const fn connector(&self) -> &MatrixConnector {
        &self.connector
    }

    #[inline(always)]
    pub(crate) const fn char_prop(&self) -> &CharProperty {
        &self.char_prop
    }

    #[inline(always)]
    pub(crate) const fn unk_handler(&self) -> &UnkHandler {
        &self.unk_handler
    }

    /// Bundles the four dictionary artifacts into one [`DictionaryInner`].
    pub fn new(
        lexicon: Lexicon,
        connector: MatrixConnector,
        char_prop: CharProperty,
        unk_handler: UnkHandler,
    ) -> Self {
        Self { lexicon, connector, char_prop, unk_handler }
    }

    /// Looks up the raw feature string for `word_idx`.
    #[inline(always)]
    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon.word_feature(word_idx),
            LexType::Unknown => self.unk_handler.word_feature(word_idx),
        }
    }

    /// Part-of-speech, the feature string's first field.
    #[inline(always)]
    pub fn pos(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon.pos(word_idx),
            LexType::Unknown => self.unk_handler.pos(word_idx),
        }
    }

    /// Part-of-speech subcategory, the feature string's second field.
    #[inline(always)]
    pub fn pos1(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon.pos1(word_idx),
            LexType::Unknown => self.unk_handler.pos1(word_idx),
        }
    }

    /// Dictionary base form, the feature string's third field.
    #[inline(always)]
    pub fn base(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon.base(word_idx),
            LexType::Unknown => self.unk_handler.base(word_idx),
        }
    }

    /// Reading/pronunciation, the feature string's fourth field.
    #[inline(always)]
    pub fn pronunciation(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon.pronunciation(word_idx),
            LexType::Unknown => self.unk_handler.pronunciation(word_idx),
        }
    }

    #[inline(always)]
    pub(crate) fn word_param(&self, word_idx: WordIdx) -> WordParam {
        match word_idx.lex_type {
            LexType::System => self.lexicon.word_param(word_idx),
            LexType::Unknown => self.unk_handler.word_param(word_idx),
        }
    }

    /// Serializes the dictionary to a writer using the `rkyv` format
    /// produced/consumed by this crate (see [`Dictionary::read`]).
    pub fn write<W: Write>(&self, mut wtr: W) -> Result<()> {
        wtr.write_all(MODEL_MAGIC)?;

        with_arena(|arena: &mut Arena| {
            let writer = IoWriter::new(&mut wtr);
            let mut serializer = Serializer::new(writer, arena.acquire(), Share::new());
            serialize_using::<_, Error>(self, &mut serializer)
        })
        .map_err(|e| ComugiError::invalid_state("rkyv serialization failed", e.to_string()))?;

        Ok(())
    }
}

impl Dictionary {
    /// Creates a dictionary from an in-memory [`DictionaryInner`].
    pub fn from_inner(dict: DictionaryInner) -> Self {
        Self::Owned(Arc::new(dict))
    }

    /// Serializes the dictionary. Panics if called on an `Archived` value,
    /// which has no owned `DictionaryInner` to serialize.
    pub fn write<W: Write>(&self, wtr: W) -> Result<()> {
        match self {
            Self::Owned(dict) => dict.write(wtr),
            Self::Archived { .. } => unreachable!("an archived dictionary cannot be re-serialized"),
        }
    }

    /// Reads a dictionary previously produced by [`DictionaryInner::write`].
    pub fn read<R: Read>(mut rdr: R) -> Result<Self> {
        let mut magic = [0u8; MODEL_MAGIC_LEN];
        rdr.read_exact(&mut magic)?;
        if magic != *MODEL_MAGIC {
            return Err(ComugiError::invalid_argument(
                "rdr",
                "the magic number of the input model mismatches",
            ));
        }

        let mut buffer = Vec::new();
        rdr.read_to_end(&mut buffer)?;

        let mut aligned = AlignedVec::with_capacity(buffer.len());
        aligned.extend_from_slice(&buffer);

        let archived = access::<ArchivedDictionaryInner, Error>(&aligned).map_err(|e| {
            ComugiError::invalid_state(
                "rkyv validation failed; the dictionary file may be corrupted or incompatible",
                e.to_string(),
            )
        })?;

        // SAFETY: `aligned` is kept alive for as long as the `Archived` value,
        // which owns it; the reference never outlives its backing buffer.
        let data: &'static ArchivedDictionaryInner = unsafe { &*(archived as *const _) };

        Ok(Self::Archived { _bytes: aligned, data })
    }
}

impl<'a> DictionaryInnerRef<'a> {
    #[inline(always)]
    pub fn connector(&self) -> ConnectorKindRef<'a> {
        match self {
            Self::Owned(dict) => ConnectorKindRef::Owned(dict.connector()),
            Self::Archived(dict) => ConnectorKindRef::Archived(dict.connector()),
        }
    }

    #[inline(always)]
    pub(crate) fn word_param(&self, word_idx: WordIdx) -> WordParam {
        match self {
            Self::Owned(dict) => dict.word_param(word_idx),
            Self::Archived(dict) => dict.word_param(word_idx),
        }
    }

    #[inline(always)]
    pub fn word_feature(&self, word_idx: WordIdx) -> &'a str {
        match self {
            Self::Owned(dict) => dict.word_feature(word_idx),
            Self::Archived(dict) => dict.word_feature(word_idx),
        }
    }

    #[inline(always)]
    pub fn pos(&self, word_idx: WordIdx) -> &'a str {
        match self {
            Self::Owned(dict) => dict.pos(word_idx),
            Self::Archived(dict) => dict.pos(word_idx),
        }
    }

    #[inline(always)]
    pub fn pos1(&self, word_idx: WordIdx) -> &'a str {
        match self {
            Self::Owned(dict) => dict.pos1(word_idx),
            Self::Archived(dict) => dict.pos1(word_idx),
        }
    }

    #[inline(always)]
    pub fn base(&self, word_idx: WordIdx) -> &'a str {
        match self {
            Self::Owned(dict) => dict.base(word_idx),
            Self::Archived(dict) => dict.base(word_idx),
        }
    }

    #[inline(always)]
    pub fn pronunciation(&self, word_idx: WordIdx) -> &'a str {
        match self {
            Self::Owned(dict) => dict.pronunciation(word_idx),
            Self::Archived(dict) => dict.pronunciation(word_idx),
        }
    }
}

impl ArchivedDictionaryInner {
    #[inline(always)]
    pub(crate) fn connector(&self) -> &ArchivedMatrixConnector {
        &self.connector
    }
    #[inline(always)]
    pub(crate) fn lexicon(&self) -> &ArchivedLexicon {
        &self.lexicon
    }
    #[inline(always)]
    pub(crate) fn char_prop(&self) -> &ArchivedCharProperty {
        &self.char_prop
    }
    #[inline(always)]
    pub(crate) fn unk_handler(&self) -> &ArchivedUnkHandler {
        &self.unk_handler
    }

    #[inline(always)]
    pub(crate) fn word_param(&self, word_idx: WordIdx) -> WordParam {
        match word_idx.lex_type {
            LexType::System => self.lexicon().word_param(word_idx),
            LexType::Unknown => self.unk_handler().word_param(word_idx),
        }
    }

    /// Looks up the raw feature string for `word_idx`.
    #[inline(always)]
    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon().word_feature(word_idx),
            LexType::Unknown => self.unk_handler().word_feature(word_idx),
        }
    }

    /// Part-of-speech, the feature string's first field.
    #[inline(always)]
    pub fn pos(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon().pos(word_idx),
            LexType::Unknown => self.unk_handler().pos(word_idx),
        }
    }

    /// Part-of-speech subcategory, the feature string's second field.
    #[inline(always)]
    pub fn pos1(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon().pos1(word_idx),
            LexType::Unknown => self.unk_handler().pos1(word_idx),
        }
    }

    /// Dictionary base form, the feature string's third field.
    #[inline(always)]
    pub fn base(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon().base(word_idx),
            LexType::Unknown => self.unk_handler().base(word_idx),
        }
    }

    /// Reading/pronunciation, the feature string's fourth field.
    #[inline(always)]
    pub fn pronunciation(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon().pronunciation(word_idx),
            LexType::Unknown => self.unk_handler().pronunciation(word_idx),
        }
    }
}
