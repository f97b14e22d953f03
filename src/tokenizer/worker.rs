//! Provider of a routine for tokenization.
use crate::dictionary::connector::ConnectorCost;
use crate::dictionary::{ConnectorKindRef, DictionaryInnerRef};
use crate::errors::{ComugiError, Result};
use crate::sentence::Sentence;
use crate::token::{NbestTokenIter, Token, TokenIter};
use crate::tokenizer::lattice::{LatticeKind, LatticeNBest, Node};
use crate::tokenizer::nbest_generator::NbestGenerator;
use crate::tokenizer::Tokenizer;

/// Provider of a routine for tokenization.
///
/// It holds the internal data structures used in tokenization,
/// which can be reused to avoid unnecessary memory reallocation.
pub struct Worker {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) sent: Sentence,
    pub(crate) lattice_kind: LatticeKind,
    pub(crate) top_nodes: Vec<(usize, Node)>,
    pub(crate) nbest_paths: Vec<(Vec<*const Node>, i32)>,
}

impl Worker {
    /// Creates a new instance.
    pub(crate) fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            sent: Sentence::new(),
            lattice_kind: LatticeKind::For1Best(Default::default()),
            top_nodes: vec![],
            nbest_paths: vec![],
        }
    }

    /// Resets the input sentence to be tokenized.
    pub fn reset_sentence<S>(&mut self, input: S)
    where
        S: AsRef<str>,
    {
        self.sent.clear();
        self.top_nodes.clear();
        self.nbest_paths.clear();
        let input = input.as_ref();
        if !input.is_empty() {
            self.sent.set_sentence(input);
            match self.tokenizer.dictionary() {
                DictionaryInnerRef::Archived(dict) => {
                    self.sent.compile_archived(dict.char_prop());
                }
                DictionaryInnerRef::Owned(dict) => {
                    self.sent.compile(dict.char_prop());
                }
            }
        }
    }

    /// Tokenizes the input sentence set in `state`, returning the 1-best
    /// segmentation through `state`.
    pub fn tokenize(&mut self) {
        self.top_nodes.clear();
        if self.sent.chars().is_empty() {
            return;
        }
        let lattice = self.lattice_kind.prepare_for_1best(self.sent.len_char());
        self.tokenizer.build_lattice(&self.sent, lattice);
        lattice.append_top_nodes(&mut self.top_nodes);
    }

    /// Gets the number of resultant tokens.
    #[inline(always)]
    pub fn num_tokens(&self) -> usize {
        self.top_nodes.len()
    }

    /// Gets the `i`-th resultant token.
    #[inline(always)]
    pub fn token<'w>(&'w self, i: usize) -> Token<'w> {
        let index = self.num_tokens() - i - 1;
        Token::new(self, index)
    }

    /// Creates an iterator of resultant tokens.
    #[inline(always)]
    pub const fn token_iter<'w>(&'w self) -> TokenIter<'w> {
        TokenIter::new(self, 0)
    }

    /// Tokenizes the input sentence set in `state`, searching for up to `n`
    /// distinct segmentations in increasing order of total cost.
    ///
    /// Each path's search frontier is capped at `max_queue_size` partial
    /// paths; a pathological lattice that would otherwise grow the frontier
    /// without bound fails with [`ComugiError::ResourceExhausted`] instead of
    /// exhausting memory.
    pub fn tokenize_nbest(&mut self, n: usize, max_queue_size: usize) -> Result<()> {
        self.nbest_paths.clear();
        if self.sent.chars().is_empty() {
            return Ok(());
        }

        let len_char = self.sent.len_char();
        let lattice = self.lattice_kind.prepare_for_nbest(len_char);
        self.tokenizer.build_lattice(&self.sent, lattice);

        let dict_ref = self.tokenizer.dictionary();
        let (paths, limit_exceeded) = match dict_ref.connector() {
            ConnectorKindRef::Owned(c) => collect_nbest(&*lattice, c, dict_ref, n, max_queue_size),
            ConnectorKindRef::Archived(c) => collect_nbest(&*lattice, c, dict_ref, n, max_queue_size),
        };

        if limit_exceeded {
            log::warn!(
                "n-best search for a {len_char}-character sentence exceeded the queue size cap of {max_queue_size}"
            );
            return Err(ComugiError::resource_exhausted(
                "n-best search frontier exceeded the configured queue size cap",
            ));
        }

        self.nbest_paths = paths;
        Ok(())
    }

    /// Gets the number of distinct segmentations found by the last call to
    /// [`Self::tokenize_nbest`].
    #[inline(always)]
    pub fn num_nbest_paths(&self) -> usize {
        self.nbest_paths.len()
    }

    /// Gets the total cost of the `path_idx`-th N-best segmentation.
    #[inline(always)]
    pub fn nbest_total_cost(&self, path_idx: usize) -> i32 {
        self.nbest_paths[path_idx].1
    }

    /// Creates an iterator of tokens for the `path_idx`-th N-best segmentation.
    #[inline(always)]
    pub fn nbest_token_iter<'w>(&'w self, path_idx: usize) -> NbestTokenIter<'w> {
        NbestTokenIter::new(self, path_idx)
    }
}

fn collect_nbest<'a, C>(
    lattice: &'a LatticeNBest,
    connector: &'a C,
    dictionary: DictionaryInnerRef<'a>,
    n: usize,
    max_queue_size: usize,
) -> (Vec<(Vec<*const Node>, i32)>, bool)
where
    C: ConnectorCost,
{
    let mut generator = NbestGenerator::new(lattice, connector, dictionary).with_queue_limit(max_queue_size);
    let paths: Vec<_> = (&mut generator).take(n).collect();
    (paths, generator.limit_exceeded())
}
