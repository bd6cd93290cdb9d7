// File: src/core/emission.rs
use crate::core::types::{Emission, SymbolId};
use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};

/// Everything kept about one processed utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionRecord {
    pub sample_id: String,
    pub emission: Emission,
    pub token_target: Vec<SymbolId>,
    pub word_target: Vec<String>,
}

/// Borrowed view of one utterance inside an [`EmissionSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionView<'a> {
    pub sample_id: &'a str,
    pub emission: &'a [f32],
    pub frames: usize,
    pub token_target: &'a [SymbolId],
    pub word_target: &'a [String],
}

/// Per-utterance model outputs and targets of a test run, in dataset order,
/// plus what a downstream decoder needs to interpret them.
///
/// The parallel vectors always have the same length and every emission has
/// `num_classes * frames` values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionSet {
    emissions: Vec<Vec<f32>>,
    token_targets: Vec<Vec<SymbolId>>,
    word_targets: Vec<Vec<String>>,
    sample_ids: Vec<String>,
    frames: Vec<usize>,
    num_classes: Option<usize>,
    transition: Option<Vec<f32>>,
    config: String,
}

impl EmissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set whose class count is known before the first record arrives.
    pub fn with_num_classes(num_classes: usize) -> Self {
        Self {
            num_classes: Some(num_classes),
            ..Self::default()
        }
    }

    /// Appends one utterance. The first record fixes the class count.
    pub fn append(&mut self, record: EmissionRecord) -> EvalResult<()> {
        let n = record.emission.num_classes();
        match self.num_classes {
            Some(expected) if expected != n => {
                return Err(EvalError::Config(format!(
                    "sample '{}' has {n} classes, emission set has {expected}",
                    record.sample_id
                )));
            }
            _ => self.num_classes = Some(n),
        }

        self.frames.push(record.emission.frames());
        self.emissions.push(record.emission.into_data());
        self.token_targets.push(record.token_target);
        self.word_targets.push(record.word_target);
        self.sample_ids.push(record.sample_id);
        Ok(())
    }

    /// Attaches the learned `N x N` transition scores of an ASG model.
    pub fn set_transition(&mut self, transition: Vec<f32>) -> EvalResult<()> {
        let Some(n) = self.num_classes else {
            return Err(EvalError::Config(
                "transition attached before the class count is known".into(),
            ));
        };
        if n.checked_mul(n) != Some(transition.len()) {
            return Err(EvalError::Config(format!(
                "transition has {} values, expected {n} x {n}",
                transition.len()
            )));
        }
        self.transition = Some(transition);
        Ok(())
    }

    pub fn set_config(&mut self, config: String) {
        self.config = config;
    }

    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    pub fn num_classes(&self) -> Option<usize> {
        self.num_classes
    }

    pub fn transition(&self) -> Option<&[f32]> {
        self.transition.as_deref()
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn frames(&self) -> &[usize] {
        &self.frames
    }

    pub fn get(&self, idx: usize) -> Option<EmissionView<'_>> {
        Some(EmissionView {
            sample_id: self.sample_ids.get(idx)?,
            emission: self.emissions.get(idx)?,
            frames: *self.frames.get(idx)?,
            token_target: self.token_targets.get(idx)?,
            word_target: self.word_targets.get(idx)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = EmissionView<'_>> {
        (0..self.len()).filter_map(move |idx| self.get(idx))
    }

    /// Re-checks the set invariants, for data that did not come through `append`.
    pub fn validate(&self) -> EvalResult<()> {
        let len = self.sample_ids.len();
        let lengths = [
            ("emissions", self.emissions.len()),
            ("token targets", self.token_targets.len()),
            ("word targets", self.word_targets.len()),
            ("frame counts", self.frames.len()),
        ];
        for (name, other) in lengths {
            if other != len {
                return Err(EvalError::Format(format!(
                    "{other} {name} for {len} sample ids"
                )));
            }
        }

        let Some(n) = self.num_classes else {
            if len > 0 || self.transition.is_some() {
                return Err(EvalError::Format("class count missing".into()));
            }
            return Ok(());
        };
        for (idx, (emission, &t)) in self.emissions.iter().zip(&self.frames).enumerate() {
            let expected = n.checked_mul(t).ok_or_else(|| {
                EvalError::Format(format!("emission {idx}: {n} x {t} values overflow"))
            })?;
            if emission.len() != expected {
                return Err(EvalError::Format(format!(
                    "emission {idx} has {} values, expected {n} x {t}",
                    emission.len()
                )));
            }
        }
        if let Some(transition) = &self.transition {
            let expected = n.checked_mul(n).ok_or_else(|| {
                EvalError::Format(format!("transition: {n} x {n} values overflow"))
            })?;
            if transition.len() != expected {
                return Err(EvalError::Format(format!(
                    "transition has {} values, expected {n} x {n}",
                    transition.len()
                )));
            }
        }
        Ok(())
    }
}
