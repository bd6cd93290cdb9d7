// File: src/model.rs
// Seams to the acoustic model and its criterion, plus the implementations
// this crate ships: a frame-wise argmax decoder, an ASG Viterbi decoder and
// an identity model for replaying stored emissions.

use crate::core::types::{CriterionKind, Emission, Features, SymbolId};
use crate::error::{EvalError, EvalResult};
use std::collections::HashMap;
use std::path::Path;

pub trait AcousticModel {
    /// Switches to inference mode.
    fn eval(&mut self);
    fn forward(&mut self, input: &Features) -> EvalResult<Emission>;
    fn pretty_string(&self) -> String;
    fn num_params(&self) -> usize;
}

pub trait Criterion {
    fn kind(&self) -> CriterionKind;
    fn eval(&mut self);
    /// Best label path, one index per frame for frame-synchronous families.
    fn viterbi_path(&self, emission: &Emission) -> EvalResult<Vec<SymbolId>>;
    /// Learned `N x N` transition scores, `trans[next * N + prev]`. Only the
    /// ASG family has them.
    fn transitions(&self) -> Option<Vec<f32>> {
        None
    }
    fn pretty_string(&self) -> String;
}

/// What a [`ModelLoader`] hands back: the stored config mapping, the network
/// and its criterion.
pub struct LoadedModel {
    pub config: HashMap<String, String>,
    pub model: Box<dyn AcousticModel>,
    pub criterion: Box<dyn Criterion>,
}

pub trait ModelLoader {
    fn load(&self, path: &Path) -> EvalResult<LoadedModel>;
}

/// Picks the decoder implementation for a criterion family.
pub fn criterion_for(
    kind: CriterionKind,
    transitions: Option<Vec<f32>>,
) -> EvalResult<Box<dyn Criterion>> {
    match (kind, transitions) {
        (CriterionKind::Asg, Some(trans)) => Ok(Box::new(AsgViterbi::new(trans)?)),
        (CriterionKind::Asg, None) => Err(EvalError::Config(
            "asg criterion needs a transition matrix".into(),
        )),
        (kind, _) => Ok(Box::new(FramewiseArgmax::new(kind))),
    }
}

fn argmax(scores: &[f32]) -> EvalResult<SymbolId> {
    let mut best = 0;
    for (n, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(EvalError::Model(format!("non-finite score {score} for class {n}")));
        }
        if score > scores[best] {
            best = n;
        }
    }
    Ok(best)
}

/// Highest-scoring class at every frame. Best path for CTC, and the greedy
/// token sequence for models that emit one token per output step.
#[derive(Debug, Clone)]
pub struct FramewiseArgmax {
    kind: CriterionKind,
}

impl FramewiseArgmax {
    pub fn new(kind: CriterionKind) -> Self {
        Self { kind }
    }
}

impl Criterion for FramewiseArgmax {
    fn kind(&self) -> CriterionKind {
        self.kind
    }

    fn eval(&mut self) {}

    fn viterbi_path(&self, emission: &Emission) -> EvalResult<Vec<SymbolId>> {
        (0..emission.frames())
            .map(|t| argmax(emission.frame(t)))
            .collect()
    }

    fn pretty_string(&self) -> String {
        format!("FramewiseArgmax ({})", self.kind)
    }
}

/// Viterbi decode over emissions plus learned label transitions.
#[derive(Debug, Clone)]
pub struct AsgViterbi {
    num_classes: usize,
    transitions: Vec<f32>,
}

impl AsgViterbi {
    pub fn new(transitions: Vec<f32>) -> EvalResult<Self> {
        let num_classes = (transitions.len() as f64).sqrt() as usize;
        if num_classes == 0 || num_classes * num_classes != transitions.len() {
            return Err(EvalError::Config(format!(
                "transition matrix of {} values is not square",
                transitions.len()
            )));
        }
        Ok(Self { num_classes, transitions })
    }

    fn transition(&self, prev: usize, next: usize) -> f32 {
        self.transitions[next * self.num_classes + prev]
    }
}

impl Criterion for AsgViterbi {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Asg
    }

    fn eval(&mut self) {}

    fn viterbi_path(&self, emission: &Emission) -> EvalResult<Vec<SymbolId>> {
        let n = self.num_classes;
        if emission.num_classes() != n {
            return Err(EvalError::Model(format!(
                "emission has {} classes, transitions have {n}",
                emission.num_classes()
            )));
        }
        let frames = emission.frames();
        if frames == 0 {
            return Ok(Vec::new());
        }

        let mut alpha = emission.frame(0).to_vec();
        let mut next_alpha = vec![0.0f32; n];
        let mut backptr = vec![0usize; frames * n];

        for t in 1..frames {
            let scores = emission.frame(t);
            for next in 0..n {
                let mut best_prev = 0;
                let mut best = f32::NEG_INFINITY;
                for (prev, &a) in alpha.iter().enumerate() {
                    let s = a + self.transition(prev, next);
                    if s > best {
                        best = s;
                        best_prev = prev;
                    }
                }
                next_alpha[next] = best + scores[next];
                backptr[t * n + next] = best_prev;
            }
            std::mem::swap(&mut alpha, &mut next_alpha);
        }

        let mut state = argmax(&alpha)?;
        let mut path = vec![0; frames];
        for t in (0..frames).rev() {
            path[t] = state;
            state = backptr[t * n + state];
        }
        Ok(path)
    }

    fn transitions(&self) -> Option<Vec<f32>> {
        Some(self.transitions.clone())
    }

    fn pretty_string(&self) -> String {
        format!("AsgViterbi ({} classes)", self.num_classes)
    }
}

/// A "network" whose input features already are its emissions.
#[derive(Debug, Clone)]
pub struct ReplayModel {
    training: bool,
}

impl Default for ReplayModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayModel {
    pub fn new() -> Self {
        Self { training: true }
    }

    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl AcousticModel for ReplayModel {
    fn eval(&mut self) {
        self.training = false;
    }

    fn forward(&mut self, input: &Features) -> EvalResult<Emission> {
        Emission::new(input.dim, input.frames, input.data.clone())
    }

    fn pretty_string(&self) -> String {
        "ReplayModel (identity)".into()
    }

    fn num_params(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emission(classes: usize, rows: &[&[f32]]) -> Emission {
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Emission::new(classes, rows.len(), data).unwrap()
    }

    #[test]
    fn argmax_picks_best_class_per_frame() {
        let e = emission(3, &[&[0.1, 0.7, 0.2], &[0.9, 0.0, 0.1], &[0.0, 0.2, 0.8]]);
        let path = FramewiseArgmax::new(CriterionKind::Ctc).viterbi_path(&e).unwrap();
        assert_eq!(path, vec![1, 0, 2]);
    }

    #[test]
    fn argmax_rejects_nan() {
        let e = emission(2, &[&[0.1, f32::NAN]]);
        let err = FramewiseArgmax::new(CriterionKind::Ctc).viterbi_path(&e).unwrap_err();
        assert!(matches!(err, EvalError::Model(_)));
    }

    #[test]
    fn asg_with_zero_transitions_matches_argmax() {
        let e = emission(2, &[&[1.0, 0.0], &[0.0, 1.0], &[0.0, 1.0]]);
        let asg = AsgViterbi::new(vec![0.0; 4]).unwrap();
        assert_eq!(asg.viterbi_path(&e).unwrap(), vec![0, 1, 1]);
    }

    #[test]
    fn asg_transitions_can_override_local_best() {
        // Frame 1 slightly prefers class 1, but leaving class 0 is expensive.
        let e = emission(2, &[&[1.0, 0.0], &[0.4, 0.5], &[1.0, 0.0]]);
        let trans = vec![
            0.0, -5.0, // into 0: from 0, from 1
            -5.0, 0.0, // into 1: from 0, from 1
        ];
        let asg = AsgViterbi::new(trans).unwrap();
        assert_eq!(asg.viterbi_path(&e).unwrap(), vec![0, 0, 0]);
        assert_eq!(asg.transitions().unwrap().len(), 4);
    }

    #[test]
    fn asg_rejects_bad_shapes() {
        assert!(AsgViterbi::new(vec![0.0; 3]).is_err());
        let asg = AsgViterbi::new(vec![0.0; 9]).unwrap();
        let e = emission(2, &[&[1.0, 0.0]]);
        assert!(matches!(asg.viterbi_path(&e), Err(EvalError::Model(_))));
    }

    #[test]
    fn criterion_selection() {
        assert_eq!(criterion_for(CriterionKind::Ctc, None).unwrap().kind(), CriterionKind::Ctc);
        assert_eq!(
            criterion_for(CriterionKind::Seq2Seq, None).unwrap().kind(),
            CriterionKind::Seq2Seq
        );
        assert!(criterion_for(CriterionKind::Asg, None).is_err());
        let asg = criterion_for(CriterionKind::Asg, Some(vec![0.0; 4])).unwrap();
        assert!(asg.transitions().is_some());
    }

    #[test]
    fn replay_model_is_identity() {
        let mut model = ReplayModel::new();
        model.eval();
        assert!(!model.is_training());
        let input = Features { dim: 2, frames: 2, data: vec![0.0, 1.0, 2.0, 3.0] };
        let out = model.forward(&input).unwrap();
        assert_eq!(out.data(), input.data.as_slice());
        assert_eq!(out.num_classes(), 2);
    }
}
