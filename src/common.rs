//! Crate-wide constants shared across the dictionary and tokenizer.

/// Sentinel character position used to mark BOS's `start_node`/`start_word`,
/// distinguishing it from any real position in an input sentence.
pub const MAX_SENTENCE_LENGTH: usize = usize::MAX;

/// The fixed connection id of BOS/EOS.
pub const BOS_EOS_CONNECTION_ID: u16 = 0;
