// File: src/core/engine.rs
use crate::config::{ConfigOverrides, RunConfig};
use crate::core::converter::{indices_to_words, SequenceConverter};
use crate::core::dictionary::{
    create_token_dict, create_word_dict, load_lexicon, Dictionary, LexiconMap,
};
use crate::core::emission::{EmissionRecord, EmissionSet};
use crate::core::meters::TestMeters;
use crate::core::types::CriterionKind;
use crate::dataset::Dataset;
use crate::error::{EvalError, EvalResult};
use crate::model::{AcousticModel, Criterion, LoadedModel};
use crate::persistence::{artifact_path, save_to_disk};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Where reference words come from. Predictions are always letter-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordTargetPolicy {
    /// Split the target letters on the word separator.
    LetterDerived,
    /// Look the sample's word indices up in the lexicon word dictionary.
    WordIndices,
}

impl WordTargetPolicy {
    pub fn select(has_lexicon: bool, criterion: CriterionKind) -> Self {
        match (has_lexicon, criterion) {
            (false, _) => WordTargetPolicy::LetterDerived,
            (true, CriterionKind::Ctc | CriterionKind::Asg) => WordTargetPolicy::WordIndices,
            (true, CriterionKind::Seq2Seq) => WordTargetPolicy::LetterDerived,
        }
    }
}

/// Token and word dictionaries of one run.
#[derive(Debug, Clone, Default)]
pub struct Dictionaries {
    pub tokens: Dictionary,
    pub words: Dictionary,
    pub lexicon: LexiconMap,
}

impl Dictionaries {
    pub fn build(config: &RunConfig) -> EvalResult<Self> {
        let tokens = create_token_dict(&config.tokens_path(), config.replabel, config.criterion)?;
        info!("number of classes (network): {}", tokens.size());

        let (lexicon, words) = match &config.lexicon {
            Some(path) => {
                let lexicon = load_lexicon(path, config.max_word)?;
                let words = create_word_dict(&lexicon);
                info!("number of words: {}", words.size());
                (lexicon, words)
            }
            None => (LexiconMap::new(), Dictionary::new()),
        };
        Ok(Self { tokens, words, lexicon })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DictReady,
    Iterate,
    Finalize,
    Done,
}

/// Progress of one scored utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    pub position: usize,
    pub total: usize,
    pub sample_id: String,
    pub target: String,
    pub prediction: String,
    pub wer: f64,
    pub ler: f64,
    pub total_wer: f64,
    pub total_ler: f64,
}

impl SampleReport {
    /// Percentage of the run completed after this sample.
    pub fn progress(&self) -> f64 {
        100.0 * self.position as f64 / self.total as f64
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub wer: f64,
    pub ler: f64,
    pub elapsed: Duration,
    pub artifact: PathBuf,
    pub emissions: EmissionSet,
}

/// Drives one test run: model and dictionaries are ready after [`init`],
/// [`run`] iterates the dataset, scores every utterance and writes the
/// emission artifact.
///
/// [`init`]: Evaluator::init
/// [`run`]: Evaluator::run
pub struct Evaluator {
    config: RunConfig,
    model: Box<dyn AcousticModel>,
    criterion: Box<dyn Criterion>,
    dicts: Dictionaries,
    converter: SequenceConverter,
    policy: WordTargetPolicy,
    stage: Stage,
}

impl Evaluator {
    pub fn init(loaded: LoadedModel, overrides: ConfigOverrides) -> EvalResult<Self> {
        let LoadedModel {
            config: model_config,
            mut model,
            mut criterion,
        } = loaded;
        model.eval();
        criterion.eval();
        info!("[network] {}", model.pretty_string());
        info!("[criterion] {}", criterion.pretty_string());
        info!("[network] number of params: {}", model.num_params());

        let config = RunConfig::resolve(&model_config, overrides)?;
        info!("[network] acoustic model: {}", config.am.display());
        if criterion.kind() != config.criterion {
            return Err(EvalError::Config(format!(
                "model was loaded with a {} criterion, config says {}",
                criterion.kind(),
                config.criterion
            )));
        }

        let dicts = Dictionaries::build(&config)?;
        let policy = WordTargetPolicy::select(config.lexicon.is_some(), config.criterion);
        if policy == WordTargetPolicy::WordIndices && dicts.words.is_empty() {
            return Err(EvalError::Config(
                "word targets come from the lexicon, but it has no words".into(),
            ));
        }
        debug!("word target policy: {policy:?}");

        let converter =
            SequenceConverter::new(config.criterion, &config.word_separator, config.replabel);
        Ok(Self {
            config,
            model,
            criterion,
            dicts,
            converter,
            policy,
            stage: Stage::DictReady,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn dictionaries(&self) -> &Dictionaries {
        &self.dicts
    }

    pub fn policy(&self) -> WordTargetPolicy {
        self.policy
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Evaluates every sample of `dataset` (up to `max_load`) in order and
    /// saves the emission artifact. `on_sample` sees each sample's report
    /// when `show` is enabled. The first failing sample aborts the run.
    pub fn run<F>(&mut self, dataset: &mut dyn Dataset, mut on_sample: F) -> EvalResult<EvalReport>
    where
        F: FnMut(&SampleReport),
    {
        if self.stage != Stage::DictReady {
            return Err(EvalError::Config("evaluator has already run".into()));
        }
        self.stage = Stage::Iterate;

        if let Some(seed) = self.config.shuffle_seed {
            dataset.shuffle(seed);
        }
        let total = match self.config.max_load {
            Some(max) => dataset.size().min(max),
            None => dataset.size(),
        };
        info!("[dataset] evaluating {total} of {} samples", dataset.size());

        let num_classes = self.dicts.tokens.size();
        let mut meters = TestMeters::new();
        let mut emissions = EmissionSet::with_num_classes(num_classes);

        meters.timer.resume();
        for position in 1..=total {
            let sample = dataset.get(position - 1)?;
            let emission = self.model.forward(&sample.input)?;
            if emission.num_classes() != num_classes {
                return Err(EvalError::Config(format!(
                    "sample '{}': network emits {} classes, token dictionary has {num_classes}",
                    sample.sample_id,
                    emission.num_classes()
                )));
            }

            let letter_target = self
                .converter
                .target_letters(&sample.token_target, &self.dicts.tokens)?;
            let word_target = match self.policy {
                WordTargetPolicy::WordIndices => {
                    indices_to_words(&sample.word_target, &self.dicts.words)?
                }
                WordTargetPolicy::LetterDerived => self.converter.words(&letter_target),
            };

            let path = self.criterion.viterbi_path(&emission)?;
            let letter_prediction = self.converter.prediction_letters(&path, &self.dicts.tokens)?;
            let word_prediction = self.converter.words(&letter_prediction);

            meters.score(&letter_prediction, &letter_target, &word_prediction, &word_target);

            if self.config.show {
                on_sample(&SampleReport {
                    position,
                    total,
                    sample_id: sample.sample_id.clone(),
                    target: self.converter.display(&letter_target),
                    prediction: self.converter.display(&letter_prediction),
                    wer: meters.wer.value(),
                    ler: meters.ler.value(),
                    total_wer: meters.wer_slice.value(),
                    total_ler: meters.ler_slice.value(),
                });
            }

            emissions.append(EmissionRecord {
                sample_id: sample.sample_id,
                emission,
                token_target: sample.token_target,
                word_target,
            })?;
        }
        meters.timer.stop();

        self.stage = Stage::Finalize;
        if self.config.criterion == CriterionKind::Asg {
            let transition = self.criterion.transitions().ok_or_else(|| {
                EvalError::Config("asg criterion exposes no transition matrix".into())
            })?;
            emissions.set_transition(transition)?;
        }
        emissions.set_config(self.config.snapshot()?);

        let artifact = artifact_path(&self.config.emission_dir, &self.config.test);
        info!("[serialization] saving into file: {}", artifact.display());
        save_to_disk(&emissions, &artifact)?;
        self.stage = Stage::Done;

        let report = EvalReport {
            wer: meters.wer_slice.value(),
            ler: meters.ler_slice.value(),
            elapsed: meters.timer.elapsed(),
            artifact,
            emissions,
        };
        info!(
            "total WER: {:.2}%, total LER: {:.2}%, time: {:.3}s",
            report.wer,
            report.ler,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}
