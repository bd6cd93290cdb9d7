// File: src/core/dictionary.rs
use crate::core::types::{CriterionKind, SymbolId};
use crate::error::{EvalError, EvalResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Symbol emitted by CTC models for "no label at this frame".
pub const BLANK_TOKEN: &str = "#";

/// A bidirectional symbol <-> index mapping. Indices are handed out densely
/// in insertion order and never reused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    symbols: Vec<String>,
    index: HashMap<String, SymbolId>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::new();
        for symbol in symbols {
            dict.add(symbol.as_ref());
        }
        dict
    }

    /// Gets or creates the index for `symbol`.
    pub fn add(&mut self, symbol: &str) -> SymbolId {
        if let Some(&id) = self.index.get(symbol) {
            id
        } else {
            let id = self.symbols.len();
            self.symbols.push(symbol.to_string());
            self.index.insert(symbol.to_string(), id);
            id
        }
    }

    pub fn index_of(&self, symbol: &str) -> EvalResult<SymbolId> {
        self.index
            .get(symbol)
            .copied()
            .ok_or_else(|| EvalError::Lookup(format!("symbol '{symbol}' not in dictionary")))
    }

    pub fn symbol_of(&self, index: SymbolId) -> EvalResult<&str> {
        self.symbols.get(index).map(String::as_str).ok_or_else(|| {
            EvalError::Lookup(format!(
                "index {index} out of range for dictionary of size {}",
                self.symbols.len()
            ))
        })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

/// Word -> pronunciations, in the order words first appear in the lexicon file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexiconMap {
    words: Vec<String>,
    spellings: HashMap<String, Vec<Vec<String>>>,
}

impl LexiconMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: &str, spelling: Vec<String>) {
        match self.spellings.get_mut(word) {
            Some(existing) => existing.push(spelling),
            None => {
                self.words.push(word.to_string());
                self.spellings.insert(word.to_string(), vec![spelling]);
            }
        }
    }

    pub fn spellings(&self, word: &str) -> Option<&[Vec<String>]> {
        self.spellings.get(word).map(Vec::as_slice)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Builds the token dictionary the model's output classes are aligned with.
///
/// File tokens come first in line order, then replabel symbols `"1"..="R"`,
/// then the blank for CTC models.
pub fn create_token_dict(
    path: &Path,
    replabel: usize,
    criterion: CriterionKind,
) -> EvalResult<Dictionary> {
    let content = fs::read_to_string(path)?;
    let mut dict = Dictionary::new();
    for line in content.lines() {
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        if dict.contains(token) {
            return Err(EvalError::Config(format!(
                "duplicate token '{token}' in {}",
                path.display()
            )));
        }
        dict.add(token);
    }
    for r in 1..=replabel {
        dict.add(&r.to_string());
    }
    if criterion == CriterionKind::Ctc {
        dict.add(BLANK_TOKEN);
    }
    info!("loaded {} tokens from {}", dict.size(), path.display());
    Ok(dict)
}

/// Reads a `word tok1 tok2 ...` lexicon, keeping at most `max_words` distinct words.
pub fn load_lexicon(path: &Path, max_words: Option<usize>) -> EvalResult<LexiconMap> {
    let content = fs::read_to_string(path)?;
    let mut lexicon = LexiconMap::new();
    for (lineno, line) in content.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(word) = fields.next() else {
            continue;
        };
        let spelling: Vec<String> = fields.map(String::from).collect();
        if spelling.is_empty() {
            return Err(EvalError::Config(format!(
                "{}:{}: word '{word}' has no spelling",
                path.display(),
                lineno + 1
            )));
        }
        let is_new = lexicon.spellings(word).is_none();
        if is_new && max_words.is_some_and(|max| lexicon.len() >= max) {
            debug!("lexicon word cap of {} reached", lexicon.len());
            break;
        }
        lexicon.insert(word, spelling);
    }
    info!("loaded {} lexicon words from {}", lexicon.len(), path.display());
    Ok(lexicon)
}

pub fn create_word_dict(lexicon: &LexiconMap) -> Dictionary {
    Dictionary::from_symbols(lexicon.words())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn add_is_idempotent() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.add("a"), 0);
        assert_eq!(dict.add("b"), 1);
        assert_eq!(dict.add("a"), 0);
        assert_eq!(dict.size(), 2);
    }

    #[test]
    fn lookups_fail_with_lookup_error() {
        let dict = Dictionary::from_symbols(["a", "b"]);
        assert!(matches!(dict.index_of("z"), Err(EvalError::Lookup(_))));
        assert!(matches!(dict.symbol_of(2), Err(EvalError::Lookup(s)) if s.contains("index 2")));
    }

    #[test]
    fn token_dict_follows_file_order_and_appends_specials() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.txt");
        std::fs::write(&path, "|\na\n\nb\n").unwrap();

        let dict = create_token_dict(&path, 2, CriterionKind::Ctc).unwrap();
        let symbols: Vec<&str> = dict.symbols().collect();
        assert_eq!(symbols, vec!["|", "a", "b", "1", "2", BLANK_TOKEN]);

        let asg = create_token_dict(&path, 0, CriterionKind::Asg).unwrap();
        assert_eq!(asg.size(), 3);
    }

    #[test]
    fn token_dict_rejects_duplicate_tokens() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.txt");
        std::fs::write(&path, "a\nb\na\n").unwrap();
        assert!(matches!(
            create_token_dict(&path, 0, CriterionKind::Asg),
            Err(EvalError::Config(_))
        ));
    }

    #[test]
    fn lexicon_collapses_duplicate_words_in_insertion_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lexicon.txt");
        std::fs::write(&path, "the t h e |\nhi h i |\nthe t h |\ncat c a t |\n").unwrap();

        let lexicon = load_lexicon(&path, None).unwrap();
        assert_eq!(lexicon.len(), 3);
        assert_eq!(lexicon.spellings("the").unwrap().len(), 2);

        let words = create_word_dict(&lexicon);
        assert_eq!(words.index_of("the").unwrap(), 0);
        assert_eq!(words.index_of("hi").unwrap(), 1);
        assert_eq!(words.index_of("cat").unwrap(), 2);
    }

    #[test]
    fn lexicon_word_cap() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lexicon.txt");
        std::fs::write(&path, "a a\nb b\na a a\nc c\n").unwrap();

        let lexicon = load_lexicon(&path, Some(2)).unwrap();
        let words: Vec<&str> = lexicon.words().collect();
        assert_eq!(words, vec!["a", "b"]);
    }

    #[test]
    fn lexicon_word_without_spelling_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lexicon.txt");
        std::fs::write(&path, "a a\nlonely\n").unwrap();
        assert!(matches!(load_lexicon(&path, None), Err(EvalError::Config(s)) if s.contains(":2:")));
    }

    proptest! {
        #[test]
        fn round_trip_and_dense_indices(symbols in proptest::collection::vec("[a-z]{1,4}", 0..40)) {
            let dict = Dictionary::from_symbols(&symbols);
            for s in &symbols {
                let idx = dict.index_of(s).unwrap();
                prop_assert_eq!(dict.symbol_of(idx).unwrap(), s.as_str());
                prop_assert!(idx < dict.size());
            }
            for idx in 0..dict.size() {
                let symbol = dict.symbol_of(idx).unwrap().to_string();
                prop_assert_eq!(dict.index_of(&symbol).unwrap(), idx);
            }
        }
    }
}
