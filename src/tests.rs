//! End-to-end tests exercising the full pipeline together: dictionary
//! construction from text, lattice building, and both search strategies.
use std::collections::HashMap;

use crate::dictionary::connector::ConnectorCost;
use crate::dictionary::{ConnectorKindRef, Dictionary, DictionaryInnerRef, SystemDictionaryBuilder};
use crate::sentence::Sentence;
use crate::tokenizer::Tokenizer;

const LEXICON_CSV: &str = "\
自然,0,0,1,sizen
言語,0,0,4,gengo
処理,0,0,3,shori
自然言語,0,0,6,sizengengo
言語処理,0,0,5,gengoshori
自然言語処理,0,0,9,sizengengoshori
不,0,0,50,not";
const MATRIX_DEF: &str = "1 1\n0 0 0";
const CHAR_DEF: &str = "DEFAULT 0 1 0";
const UNK_DEF: &str = "DEFAULT,0,0,100,*";

fn build_dictionary() -> Dictionary {
    let dict_inner = SystemDictionaryBuilder::from_readers(
        LEXICON_CSV.as_bytes(),
        MATRIX_DEF.as_bytes(),
        CHAR_DEF.as_bytes(),
        UNK_DEF.as_bytes(),
    )
    .unwrap();
    Dictionary::from_inner(dict_inner)
}

/// Recomputes the minimum total cost from BOS to EOS by brute-force
/// recursion over every lexicon/unknown-word candidate at every position,
/// independent of the lattice/Viterbi machinery under test.
fn brute_force_min_cost(tokenizer: &Tokenizer, sentence: &str) -> i32 {
    let dict_ref = tokenizer.dictionary();
    let connector_ref = dict_ref.connector();

    let mut sent = Sentence::new();
    sent.set_sentence(sentence);
    match &dict_ref {
        DictionaryInnerRef::Owned(d) => sent.compile(d.char_prop()),
        DictionaryInnerRef::Archived(d) => sent.compile_archived(d.char_prop()),
    }

    match connector_ref {
        ConnectorKindRef::Owned(c) => best_cost_from(&dict_ref, c, &sent, 0, 0, &mut HashMap::new()),
        ConnectorKindRef::Archived(c) => best_cost_from(&dict_ref, c, &sent, 0, 0, &mut HashMap::new()),
    }
}

/// Minimum cost to go from a state at character position `pos` whose last
/// word ended with right-id `prev_right_id`, through to EOS.
fn best_cost_from<'d, C: ConnectorCost>(
    dict_ref: &DictionaryInnerRef<'d>,
    connector: &C,
    sent: &Sentence,
    pos: usize,
    prev_right_id: u16,
    memo: &mut HashMap<(usize, u16), i32>,
) -> i32 {
    if pos == sent.len_char() {
        return i32::from(connector.cost(prev_right_id, 0));
    }
    if let Some(&cached) = memo.get(&(pos, prev_right_id)) {
        return cached;
    }

    let mut candidates: Vec<(usize, u16, i32)> = Vec::new();
    let suffix = &sent.chars()[pos..];
    let mut has_matched = false;
    match dict_ref {
        DictionaryInnerRef::Owned(d) => {
            for m in d.lexicon().common_prefix_iterator(suffix) {
                candidates.push((pos + m.end_char, m.word_param.left_id, i32::from(m.word_param.word_cost)));
                has_matched = true;
            }
            d.unk_handler().gen_unk_words(sent, pos, has_matched, None, |w| {
                candidates.push((w.end_char(), w.word_param().left_id, i32::from(w.word_param().word_cost)));
            });
        }
        DictionaryInnerRef::Archived(d) => {
            for m in d.lexicon().common_prefix_iterator(suffix) {
                candidates.push((pos + m.end_char, m.word_param.left_id, i32::from(m.word_param.word_cost)));
                has_matched = true;
            }
            d.unk_handler().gen_unk_words(sent, pos, has_matched, None, |w| {
                candidates.push((w.end_char(), w.word_param().left_id, i32::from(w.word_param().word_cost)));
            });
        }
    }

    let best = candidates
        .into_iter()
        .map(|(end_pos, left_id, word_cost)| {
            let conn_cost = connector.cost(prev_right_id, left_id);
            let rest = best_cost_from(dict_ref, connector, sent, end_pos, left_id, memo);
            conn_cost + word_cost + rest
        })
        .min()
        .unwrap_or(i32::MAX);

    memo.insert((pos, prev_right_id), best);
    best
}

#[test]
fn viterbi_matches_brute_force_minimum() {
    let dict = build_dictionary();
    let tokenizer = Tokenizer::new(dict);

    for sentence in ["自然言語処理", "自然日本語処理", "不自然言語処理", "言語"] {
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence(sentence);
        worker.tokenize();

        let total_cost: i32 = worker.token_iter().last().map(|t| t.total_cost()).unwrap_or(0);
        let expected = brute_force_min_cost(&tokenizer, sentence);
        assert_eq!(total_cost, expected, "mismatch for {sentence:?}");
    }
}

#[test]
fn nbest_paths_are_nondecreasing_and_distinct() {
    let dict = build_dictionary();
    let tokenizer = Tokenizer::new(dict);
    let mut worker = tokenizer.new_worker();
    worker.reset_sentence("自然言語処理");
    worker.tokenize_nbest(5, 10_000).unwrap();

    assert!(worker.num_nbest_paths() >= 2);

    let costs: Vec<i32> = (0..worker.num_nbest_paths()).map(|i| worker.nbest_total_cost(i)).collect();
    for pair in costs.windows(2) {
        assert!(pair[0] <= pair[1], "n-best costs should be nondecreasing: {costs:?}");
    }

    let surfaces: Vec<Vec<&str>> = (0..worker.num_nbest_paths())
        .map(|i| worker.nbest_token_iter(i).map(|t| t.surface()).collect())
        .collect();
    let mut deduped = surfaces.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), surfaces.len(), "n-best segmentations should be distinct: {surfaces:?}");
}

#[test]
fn nbest_1best_matches_viterbi_1best() {
    let dict = build_dictionary();
    let tokenizer = Tokenizer::new(dict);

    let mut worker = tokenizer.new_worker();
    worker.reset_sentence("不自然言語処理");
    worker.tokenize();
    let viterbi_surfaces: Vec<String> = worker.token_iter().map(|t| t.surface().to_string()).collect();

    worker.tokenize_nbest(1, 10_000).unwrap();
    let nbest_surfaces: Vec<String> = worker.nbest_token_iter(0).map(|t| t.surface().to_string()).collect();

    assert_eq!(viterbi_surfaces, nbest_surfaces);
}

#[test]
fn nbest_queue_limit_reports_resource_exhausted() {
    let dict = build_dictionary();
    let tokenizer = Tokenizer::new(dict);
    let mut worker = tokenizer.new_worker();
    worker.reset_sentence("自然言語処理");

    let err = worker.tokenize_nbest(1000, 1).unwrap_err();
    assert!(matches!(err, crate::errors::ComugiError::ResourceExhausted(_)));
}

#[test]
fn dictionary_round_trip_preserves_tokenization() {
    let dict = build_dictionary();

    let mut buffer = Vec::new();
    dict.write(&mut buffer).unwrap();
    let reloaded = Dictionary::read(buffer.as_slice()).unwrap();

    let tokenizer = Tokenizer::new(reloaded);
    let mut worker = tokenizer.new_worker();
    worker.reset_sentence("自然言語処理");
    worker.tokenize();

    assert_eq!(worker.num_tokens(), 2);
    assert_eq!(worker.token(0).surface(), "自然");
    assert_eq!(worker.token(1).surface(), "言語処理");
}

#[test]
fn unknown_word_candidates_are_freshly_synthesized_per_position() {
    let dict = build_dictionary();
    let tokenizer = Tokenizer::new(dict);

    // Two disjoint unknown-word runs in the same sentence must not share
    // any synthesized candidate's span.
    let mut worker = tokenizer.new_worker();
    worker.reset_sentence("犬猫自然言語処理鳥魚");
    worker.tokenize();

    let mut seen_ranges = std::collections::HashSet::new();
    for t in worker.token_iter() {
        let r = t.range_char();
        assert!(seen_ranges.insert((r.start, r.end)), "duplicate span {r:?}");
    }
}
