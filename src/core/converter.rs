// File: src/core/converter.rs
use crate::core::dictionary::{Dictionary, BLANK_TOKEN};
use crate::core::types::{CriterionKind, SymbolId};
use crate::error::EvalResult;

/// Maps every index to its symbol.
pub fn indices_to_tokens(indices: &[SymbolId], dict: &Dictionary) -> EvalResult<Vec<String>> {
    indices
        .iter()
        .map(|&idx| dict.symbol_of(idx).map(str::to_string))
        .collect()
}

/// CTC collapsing: runs of the same index become one occurrence, then lookup.
pub fn tokens_to_letters(indices: &[SymbolId], dict: &Dictionary) -> EvalResult<Vec<String>> {
    let mut collapsed = indices.to_vec();
    collapsed.dedup();
    indices_to_tokens(&collapsed, dict)
}

/// Splits letters into words on `separator`. Empty words are never produced.
pub fn letters_to_words<S: AsRef<str>>(letters: &[S], separator: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for letter in letters {
        let letter = letter.as_ref();
        if letter == separator {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(letter);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Maps word indices straight to words of a lexicon-derived dictionary.
pub fn indices_to_words(indices: &[SymbolId], word_dict: &Dictionary) -> EvalResult<Vec<String>> {
    indices_to_tokens(indices, word_dict)
}

/// Turns raw label sequences into letters, words and display strings for one
/// criterion family.
#[derive(Debug, Clone)]
pub struct SequenceConverter {
    criterion: CriterionKind,
    word_separator: String,
    replabel: usize,
}

impl SequenceConverter {
    pub fn new(criterion: CriterionKind, word_separator: &str, replabel: usize) -> Self {
        Self {
            criterion,
            word_separator: word_separator.to_string(),
            replabel,
        }
    }

    pub fn word_separator(&self) -> &str {
        &self.word_separator
    }

    /// Letters of a best-path decode. Frame-synchronous paths are collapsed.
    pub fn prediction_letters(
        &self,
        path: &[SymbolId],
        dict: &Dictionary,
    ) -> EvalResult<Vec<String>> {
        let tokens = if self.criterion.is_frame_synchronous() {
            tokens_to_letters(path, dict)?
        } else {
            indices_to_tokens(path, dict)?
        };
        Ok(self.normalize(tokens))
    }

    /// Letters of a reference token sequence. Targets are never collapsed.
    pub fn target_letters(&self, target: &[SymbolId], dict: &Dictionary) -> EvalResult<Vec<String>> {
        Ok(self.normalize(indices_to_tokens(target, dict)?))
    }

    pub fn words(&self, letters: &[String]) -> Vec<String> {
        letters_to_words(letters, &self.word_separator)
    }

    /// Letters joined, with word separators rendered as spaces.
    pub fn display(&self, letters: &[String]) -> String {
        letters
            .iter()
            .map(|l| if *l == self.word_separator { " " } else { l.as_str() })
            .collect()
    }

    /// Drops blanks, expands replabels and trims separators at both ends.
    fn normalize(&self, tokens: Vec<String>) -> Vec<String> {
        let mut letters: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if self.criterion == CriterionKind::Ctc && token == BLANK_TOKEN {
                continue;
            }
            match self.replabel_count(&token) {
                Some(repeats) => {
                    if let Some(prev) = letters.last().cloned() {
                        letters.extend(std::iter::repeat(prev).take(repeats));
                    }
                }
                None => letters.push(token),
            }
        }

        let start = letters
            .iter()
            .position(|l| *l != self.word_separator)
            .unwrap_or(letters.len());
        let end = letters
            .iter()
            .rposition(|l| *l != self.word_separator)
            .map_or(start, |i| i + 1);
        letters.truncate(end);
        letters.drain(..start);
        letters
    }

    fn replabel_count(&self, token: &str) -> Option<usize> {
        if self.replabel == 0 {
            return None;
        }
        token
            .parse::<usize>()
            .ok()
            .filter(|&n| (1..=self.replabel).contains(&n))
    }
}
