// File: src/core/types.rs
use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Index of a symbol inside a [`Dictionary`](crate::core::dictionary::Dictionary).
pub type SymbolId = usize;

/// The criterion family a model was trained with. It decides how predictions
/// are collapsed, which special symbols the token dictionary carries and
/// whether a transition matrix is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionKind {
    Ctc,
    Asg,
    Seq2Seq,
}

impl CriterionKind {
    /// Frame-synchronous outputs repeat labels across frames and must be collapsed.
    pub fn is_frame_synchronous(self) -> bool {
        matches!(self, CriterionKind::Ctc | CriterionKind::Asg)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CriterionKind::Ctc => "ctc",
            CriterionKind::Asg => "asg",
            CriterionKind::Seq2Seq => "seq2seq",
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CriterionKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ctc" => Ok(CriterionKind::Ctc),
            "asg" => Ok(CriterionKind::Asg),
            "seq2seq" => Ok(CriterionKind::Seq2Seq),
            other => Err(EvalError::Config(format!("unknown criterion '{other}'"))),
        }
    }
}

/// Raw per-frame, per-class model output for one utterance.
///
/// Stored frame-major: `data[t * num_classes + n]` is the score of class `n`
/// at frame `t`, which is a classes x time tensor flattened column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    num_classes: usize,
    frames: usize,
    data: Vec<f32>,
}

impl Emission {
    pub fn new(num_classes: usize, frames: usize, data: Vec<f32>) -> EvalResult<Self> {
        if num_classes == 0 {
            return Err(EvalError::Model("emission has zero classes".into()));
        }
        if num_classes.checked_mul(frames) != Some(data.len()) {
            return Err(EvalError::Model(format!(
                "emission data has {} values, expected {num_classes} x {frames}",
                data.len()
            )));
        }
        Ok(Self { num_classes, frames, data })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Scores of every class at frame `t`.
    pub fn frame(&self, t: usize) -> &[f32] {
        &self.data[t * self.num_classes..(t + 1) * self.num_classes]
    }
}

/// Input features for one utterance, `frames` rows of `dim` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub dim: usize,
    pub frames: usize,
    pub data: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_kind_parses_case_insensitively() {
        assert_eq!("CTC".parse::<CriterionKind>().unwrap(), CriterionKind::Ctc);
        assert_eq!("seq2seq".parse::<CriterionKind>().unwrap(), CriterionKind::Seq2Seq);
        assert!(matches!(
            "rnnt".parse::<CriterionKind>(),
            Err(EvalError::Config(s)) if s.contains("rnnt")
        ));
    }

    #[test]
    fn frame_synchronous_families() {
        assert!(CriterionKind::Ctc.is_frame_synchronous());
        assert!(CriterionKind::Asg.is_frame_synchronous());
        assert!(!CriterionKind::Seq2Seq.is_frame_synchronous());
    }

    #[test]
    fn emission_rejects_wrong_shape() {
        assert!(Emission::new(3, 2, vec![0.0; 5]).is_err());
        assert!(Emission::new(0, 0, vec![]).is_err());
        // the product wraps to 0 on 64-bit targets
        assert!(Emission::new(usize::MAX / 2 + 1, 2, vec![]).is_err());
    }

    #[test]
    fn emission_frame_slices_are_frame_major() {
        let e = Emission::new(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(e.frame(0), &[0.0, 1.0]);
        assert_eq!(e.frame(2), &[4.0, 5.0]);
        assert_eq!(e.frames(), 3);
    }
}
