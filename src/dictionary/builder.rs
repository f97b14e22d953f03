//! Dictionary-text loader: builds a [`DictionaryInner`] from MeCab-style
//! dictionary text files (`lex.csv`, `matrix.def`, `char.def`, `unk.def`).
//!
//! Parsing dictionary text is an external collaborator of the core
//! tokenizer (see the crate's top-level design notes): this module exists
//! so tests and the crate-level doctest can construct a dictionary
//! in-process instead of shipping a prebuilt binary blob.
use std::io::Read;

use crate::dictionary::character::{CategoryPolicy, CharProperty, CodeRange, MAX_CATEGORIES};
use crate::dictionary::connector::{ConnectorView, MatrixConnector};
use crate::dictionary::lexicon::{Lexicon, WordParam};
use crate::dictionary::unknown::{UnkEntry, UnkHandler};
use crate::dictionary::word_idx::WordIdx;
use crate::dictionary::{DictionaryInner, LexType};
use crate::errors::{ComugiError, Result};

/// Builds a [`DictionaryInner`] from readers over MeCab-style dictionary text.
pub struct SystemDictionaryBuilder;

impl SystemDictionaryBuilder {
    /// Parses the four dictionary text files and assembles a validated
    /// [`DictionaryInner`].
    ///
    /// - `lexicon_rdr`: `surface,lid,rid,cost,<feature...>` lines (one per
    ///   entry; homograph surfaces may repeat across lines).
    /// - `matrix_rdr`: `matrix.def` — a header line `num_right num_left`
    ///   followed by sparse `right_id left_id cost` triples.
    /// - `char_rdr`: `char.def` — category policy lines (`NAME invoke group
    ///   length`) and code-range lines (`0xLO..0xHI NAME` or `0xCP NAME`).
    /// - `unk_rdr`: `unk.def` — same CSV shape as the lexicon, keyed by
    ///   category name instead of surface text.
    ///
    /// # Errors
    ///
    /// Returns [`ComugiError`] if any file is malformed, or if a lexicon or
    /// unknown-word entry references a connection id outside the bounds
    /// declared by `matrix.def`.
    pub fn from_readers<S, M, C, U>(
        mut lexicon_rdr: S,
        mut matrix_rdr: M,
        mut char_rdr: C,
        mut unk_rdr: U,
    ) -> Result<DictionaryInner>
    where
        S: Read,
        M: Read,
        C: Read,
        U: Read,
    {
        let mut lexicon_buf = String::new();
        lexicon_rdr.read_to_string(&mut lexicon_buf)?;
        let mut matrix_buf = String::new();
        matrix_rdr.read_to_string(&mut matrix_buf)?;
        let mut char_buf = String::new();
        char_rdr.read_to_string(&mut char_buf)?;
        let mut unk_buf = String::new();
        unk_rdr.read_to_string(&mut unk_buf)?;

        let connector = parse_matrix(&matrix_buf)?;
        let char_prop = parse_char_def(&char_buf)?;
        let lexicon_entries = parse_entry_csv(&lexicon_buf, "lex.csv")?;
        let lexicon = Lexicon::new(lexicon_entries, LexType::System)?;
        let unk_handler = parse_unk_def(&unk_buf, &char_prop)?;

        verify_lexicon_ids(&lexicon, &connector)?;
        verify_unk_ids(&unk_handler, &connector)?;

        log::debug!(
            "built dictionary: {} lexicon entries, {} unknown-word templates, {} categories",
            lexicon.len(),
            unk_handler.num_entries(),
            char_prop.num_categories(),
        );

        Ok(DictionaryInner::new(lexicon, connector, char_prop, unk_handler))
    }
}

/// Parses a CSV entry line shared by `lex.csv` and `unk.def`: the first
/// four comma-separated fields are `key,lid,rid,cost`; everything after the
/// fourth comma is carried verbatim as the feature string.
fn parse_entry_line<'a>(line: &'a str, source: &'static str) -> Result<(&'a str, WordParam, String)> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 4 {
        return Err(ComugiError::invalid_format(
            source,
            format!("expected at least 4 comma-separated fields, got {line:?}"),
        ));
    }
    let key = fields[0];
    let lid: u16 = fields[1]
        .parse()
        .map_err(|_| ComugiError::invalid_format(source, format!("bad lid in {line:?}")))?;
    let rid: u16 = fields[2]
        .parse()
        .map_err(|_| ComugiError::invalid_format(source, format!("bad rid in {line:?}")))?;
    let cost: i16 = fields[3]
        .parse()
        .map_err(|_| ComugiError::invalid_format(source, format!("bad cost in {line:?}")))?;
    let feature = fields[4..].join(",");
    Ok((key, WordParam::new(lid, rid, cost), feature))
}

fn parse_entry_csv(text: &str, source: &'static str) -> Result<Vec<(String, WordParam, String)>> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (surface, param, feature) = parse_entry_line(line, source)?;
        entries.push((surface.to_string(), param, feature));
    }
    Ok(entries)
}

/// Parses `unk.def`: identical CSV shape to the lexicon, but keyed by
/// category name. Entries must be grouped by category id in the resultant
/// `UnkHandler`, since its lookup is an offset range per category.
fn parse_unk_def(text: &str, char_prop: &CharProperty) -> Result<UnkHandler> {
    let num_categories = char_prop.num_categories();
    let mut buckets: Vec<Vec<UnkEntry>> = (0..num_categories).map(|_| Vec::new()).collect();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (category, param, feature) = parse_entry_line(line, "unk.def")?;
        let cate_id = char_prop.cate_id(category).ok_or_else(|| {
            ComugiError::invalid_format("unk.def", format!("undefined category {category:?}"))
        })?;
        buckets[cate_id as usize].push(UnkEntry::new(param.left_id, param.right_id, param.word_cost, feature));
    }

    let mut offsets = Vec::with_capacity(num_categories + 1);
    let mut entries = Vec::new();
    for bucket in buckets {
        offsets.push(entries.len());
        entries.extend(bucket);
    }
    offsets.push(entries.len());
    Ok(UnkHandler::new(offsets, entries))
}

/// Parses `matrix.def`: a `num_right num_left` header, then sparse
/// `right_id left_id cost` triples (unset pairs default to cost 0).
fn parse_matrix(text: &str) -> Result<MatrixConnector> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| ComugiError::invalid_format("matrix.def", "missing header line"))?;
    let mut header_fields = header.split_whitespace();
    let num_right: usize = header_fields
        .next()
        .ok_or_else(|| ComugiError::invalid_format("matrix.def", "missing num_right"))?
        .parse()
        .map_err(|_| ComugiError::invalid_format("matrix.def", "bad num_right"))?;
    let num_left: usize = header_fields
        .next()
        .ok_or_else(|| ComugiError::invalid_format("matrix.def", "missing num_left"))?
        .parse()
        .map_err(|_| ComugiError::invalid_format("matrix.def", "bad num_left"))?;

    let mut data = vec![0i16; num_right * num_left];
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let r: usize = fields
            .next()
            .ok_or_else(|| ComugiError::invalid_format("matrix.def", format!("short line {line:?}")))?
            .parse()
            .map_err(|_| ComugiError::invalid_format("matrix.def", format!("bad right_id in {line:?}")))?;
        let c: usize = fields
            .next()
            .ok_or_else(|| ComugiError::invalid_format("matrix.def", format!("short line {line:?}")))?
            .parse()
            .map_err(|_| ComugiError::invalid_format("matrix.def", format!("bad left_id in {line:?}")))?;
        let cost: i16 = fields
            .next()
            .ok_or_else(|| ComugiError::invalid_format("matrix.def", format!("short line {line:?}")))?
            .parse()
            .map_err(|_| ComugiError::invalid_format("matrix.def", format!("bad cost in {line:?}")))?;
        if r >= num_right || c >= num_left {
            return Err(ComugiError::invalid_format(
                "matrix.def",
                format!("id out of declared bounds: {r} {c}"),
            ));
        }
        data[r * num_left + c] = cost;
    }
    MatrixConnector::new(data, num_right, num_left)
}

fn parse_hex(field: &str) -> Result<u32> {
    let field = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")).unwrap_or(field);
    u32::from_str_radix(field, 16)
        .map_err(|_| ComugiError::invalid_format("char.def", format!("bad code point {field:?}")))
}

fn intern_category(name: &str, categories: &mut Vec<String>, policies: &mut Vec<CategoryPolicy>) -> usize {
    match categories.iter().position(|c| c == name) {
        Some(i) => i,
        None => {
            categories.push(name.to_string());
            policies.push(CategoryPolicy::default());
            categories.len() - 1
        }
    }
}

/// Parses `char.def`: category-policy lines (`NAME invoke group length`,
/// 4 whitespace-separated fields) and code-range lines (`LO..HI NAME` or
/// `CP NAME`, 2 fields); `#` starts a comment, inline or whole-line.
fn parse_char_def(text: &str) -> Result<CharProperty> {
    let mut categories: Vec<String> = Vec::new();
    let mut policies: Vec<CategoryPolicy> = Vec::new();
    let mut ranges: Vec<CodeRange> = Vec::new();

    for raw_line in text.lines() {
        let elems: Vec<&str> = raw_line
            .split_whitespace()
            .take_while(|tok| !tok.starts_with('#'))
            .collect();
        if elems.is_empty() {
            continue;
        }
        match elems.len() {
            4 => {
                let invoke: u8 = elems[1]
                    .parse()
                    .map_err(|_| ComugiError::invalid_format("char.def", format!("bad invoke in {raw_line:?}")))?;
                let group: u8 = elems[2]
                    .parse()
                    .map_err(|_| ComugiError::invalid_format("char.def", format!("bad group in {raw_line:?}")))?;
                let length: u32 = elems[3]
                    .parse()
                    .map_err(|_| ComugiError::invalid_format("char.def", format!("bad length in {raw_line:?}")))?;
                let id = intern_category(elems[0], &mut categories, &mut policies);
                policies[id] = CategoryPolicy { invoke: invoke != 0, group: group != 0, length };
            }
            2 => {
                let (lo, hi) = match elems[0].split_once("..") {
                    Some((a, b)) => (parse_hex(a)?, parse_hex(b)?),
                    None => {
                        let cp = parse_hex(elems[0])?;
                        (cp, cp)
                    }
                };
                let id = intern_category(elems[1], &mut categories, &mut policies) as u8;
                ranges.push(CodeRange { lo, hi, cate_id: id });
            }
            _ => {
                return Err(ComugiError::invalid_format(
                    "char.def",
                    format!("expected 2 or 4 fields, got {raw_line:?}"),
                ))
            }
        }
    }

    if !categories.iter().any(|c| c == "DEFAULT") {
        intern_category("DEFAULT", &mut categories, &mut policies);
    }
    if categories.len() > MAX_CATEGORIES {
        return Err(ComugiError::invalid_format(
            "char.def",
            format!("too many categories ({}), max is {MAX_CATEGORIES}", categories.len()),
        ));
    }

    Ok(CharProperty::new(categories, policies, ranges))
}

fn verify_lexicon_ids(lexicon: &Lexicon, connector: &MatrixConnector) -> Result<()> {
    for word_id in 0..lexicon.len() as u32 {
        let p = lexicon.word_param(WordIdx::new(LexType::System, word_id));
        if p.left_id as usize >= connector.num_left() || p.right_id as usize >= connector.num_right() {
            return Err(ComugiError::invalid_argument(
                "lexicon_rdr",
                "lex.csv includes an out-of-range connection id",
            ));
        }
    }
    Ok(())
}

fn verify_unk_ids(unk_handler: &UnkHandler, connector: &MatrixConnector) -> Result<()> {
    for word_id in 0..unk_handler.num_entries() as u32 {
        let p = unk_handler.word_param(WordIdx::new(LexType::Unknown, word_id));
        if p.left_id as usize >= connector.num_left() || p.right_id as usize >= connector.num_right() {
            return Err(ComugiError::invalid_argument(
                "unk_rdr",
                "unk.def includes an out-of-range connection id",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEXICON_CSV: &str = "自然,0,0,1,sizen\n言語,0,0,4,gengo\n処理,0,0,3,shori";
    const MATRIX_DEF: &str = "1 1\n0 0 0";
    const CHAR_DEF: &str = "DEFAULT 0 1 0";
    const UNK_DEF: &str = "DEFAULT,0,0,100,*";

    #[test]
    fn builds_from_well_formed_text() {
        let dict = SystemDictionaryBuilder::from_readers(
            LEXICON_CSV.as_bytes(),
            MATRIX_DEF.as_bytes(),
            CHAR_DEF.as_bytes(),
            UNK_DEF.as_bytes(),
        )
        .unwrap();
        assert_eq!(dict.word_feature(WordIdx::new(LexType::System, 0)), "sizen");
    }

    #[test]
    fn rejects_lexicon_entry_with_out_of_range_connection_id() {
        let lexicon_csv = "自然,1,1,0,sizen";
        let result = SystemDictionaryBuilder::from_readers(
            lexicon_csv.as_bytes(),
            MATRIX_DEF.as_bytes(),
            CHAR_DEF.as_bytes(),
            UNK_DEF.as_bytes(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unk_entry_with_out_of_range_connection_id() {
        let unk_def = "DEFAULT,1,1,100,*";
        let result = SystemDictionaryBuilder::from_readers(
            LEXICON_CSV.as_bytes(),
            MATRIX_DEF.as_bytes(),
            CHAR_DEF.as_bytes(),
            unk_def.as_bytes(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unk_def_referencing_undefined_category() {
        let unk_def = "KATAKANA,0,0,100,*";
        let result = SystemDictionaryBuilder::from_readers(
            LEXICON_CSV.as_bytes(),
            MATRIX_DEF.as_bytes(),
            CHAR_DEF.as_bytes(),
            unk_def.as_bytes(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn char_def_with_ranges_and_comments() {
        let char_def = "# kanji range\n0x4E00..0x9FFF KANJI # trailing comment\nKANJI 1 0 2\nDEFAULT 0 1 0\n";
        let prop = parse_char_def(char_def).unwrap();
        let info = prop.char_info('京');
        assert!(info.invoke());
        assert_eq!(info.length(), 2);
    }

    #[test]
    fn matrix_header_out_of_bounds_entry_is_rejected() {
        let bad_matrix = "1 1\n0 5 -1";
        let result = SystemDictionaryBuilder::from_readers(
            LEXICON_CSV.as_bytes(),
            bad_matrix.as_bytes(),
            CHAR_DEF.as_bytes(),
            UNK_DEF.as_bytes(),
        );
        assert!(result.is_err());
    }
}
