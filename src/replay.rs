// File: src/replay.rs
// Re-scoring of saved emission artifacts: the artifact stands in for the
// acoustic model and its utterances become the test set.

use crate::config::RunConfig;
use crate::core::emission::EmissionSet;
use crate::core::engine::{Dictionaries, WordTargetPolicy};
use crate::core::types::Features;
use crate::dataset::{InMemoryDataset, Sample};
use crate::error::EvalResult;
use crate::model::{criterion_for, LoadedModel, ModelLoader, ReplayModel};
use crate::persistence::load_from_disk;
use crate::config::RUN_CONFIG_KEY;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Loads an emission artifact as a [`ReplayModel`] plus the decoder of the
/// criterion family recorded in its config snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactLoader;

impl ArtifactLoader {
    pub fn load_with_emissions(&self, path: &Path) -> EvalResult<(LoadedModel, EmissionSet)> {
        let set = load_from_disk(path)?;
        let config = HashMap::from([(RUN_CONFIG_KEY.to_string(), set.config().to_string())]);
        let stored = RunConfig::from_model_config(&config)?;
        let criterion = criterion_for(stored.criterion, set.transition().map(<[f32]>::to_vec))?;
        info!(
            "[replay] {} utterances, {} criterion, from {}",
            set.len(),
            stored.criterion,
            path.display()
        );

        let loaded = LoadedModel {
            config,
            model: Box::new(ReplayModel::new()),
            criterion,
        };
        Ok((loaded, set))
    }
}

impl ModelLoader for ArtifactLoader {
    fn load(&self, path: &Path) -> EvalResult<LoadedModel> {
        self.load_with_emissions(path).map(|(loaded, _)| loaded)
    }
}

/// Turns the stored utterances back into samples, in stored order. Word
/// targets are re-indexed against `dicts.words` only under
/// [`WordTargetPolicy::WordIndices`]; otherwise they are rebuilt from letters.
pub fn replay_dataset(
    set: &EmissionSet,
    dicts: &Dictionaries,
    policy: WordTargetPolicy,
) -> EvalResult<InMemoryDataset> {
    let num_classes = set.num_classes().unwrap_or_default();
    let samples = set
        .iter()
        .map(|view| {
            let word_target = match policy {
                WordTargetPolicy::WordIndices => view
                    .word_target
                    .iter()
                    .map(|w| dicts.words.index_of(w))
                    .collect::<EvalResult<Vec<_>>>()?,
                WordTargetPolicy::LetterDerived => Vec::new(),
            };
            Ok(Sample {
                sample_id: view.sample_id.to_string(),
                input: Features {
                    dim: num_classes,
                    frames: view.frames,
                    data: view.emission.to_vec(),
                },
                token_target: view.token_target.to_vec(),
                word_target,
            })
        })
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(InMemoryDataset::new(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::core::dictionary::Dictionary;
    use crate::core::engine::Evaluator;
    use crate::core::emission::EmissionRecord;
    use crate::core::types::{CriterionKind, Emission};
    use crate::dataset::Dataset;
    use crate::error::EvalError;
    use crate::persistence::save_to_disk;

    fn saved_set(dir: &Path, criterion: CriterionKind) -> std::path::PathBuf {
        let config = RunConfig { criterion, test: "dev".into(), ..RunConfig::default() };
        let mut set = EmissionSet::with_num_classes(2);
        set.append(EmissionRecord {
            sample_id: "u1".into(),
            emission: Emission::new(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap(),
            token_target: vec![0, 1],
            word_target: vec!["hello".into()],
        })
        .unwrap();
        if criterion == CriterionKind::Asg {
            set.set_transition(vec![0.0; 4]).unwrap();
        }
        set.set_config(config.snapshot().unwrap());
        let path = dir.join("dev.bin");
        save_to_disk(&set, &path).unwrap();
        path
    }

    #[test]
    fn loader_restores_criterion_family() {
        let tmp = tempfile::tempdir().unwrap();
        let path = saved_set(tmp.path(), CriterionKind::Asg);
        let loaded = ArtifactLoader.load(&path).unwrap();
        assert_eq!(loaded.criterion.kind(), CriterionKind::Asg);
        assert!(loaded.criterion.transitions().is_some());
        assert_eq!(
            RunConfig::from_model_config(&loaded.config).unwrap().criterion,
            CriterionKind::Asg
        );
    }

    #[test]
    fn artifact_without_config_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bare.bin");
        save_to_disk(&EmissionSet::with_num_classes(2), &path).unwrap();
        assert!(matches!(ArtifactLoader.load(&path), Err(EvalError::Config(_))));
    }

    #[test]
    fn replay_dataset_reindexes_words() {
        let tmp = tempfile::tempdir().unwrap();
        let path = saved_set(tmp.path(), CriterionKind::Ctc);
        let (_, set) = ArtifactLoader.load_with_emissions(&path).unwrap();

        let dicts = Dictionaries {
            words: Dictionary::from_symbols(["world", "hello"]),
            ..Dictionaries::default()
        };
        let ds = replay_dataset(&set, &dicts, WordTargetPolicy::WordIndices).unwrap();
        let sample = ds.get(0).unwrap();
        assert_eq!(sample.word_target, vec![1]);
        assert_eq!(sample.input.dim, 2);
        assert_eq!(sample.input.frames, 2);

        let no_lexicon =
            replay_dataset(&set, &Dictionaries::default(), WordTargetPolicy::LetterDerived).unwrap();
        assert!(no_lexicon.get(0).unwrap().word_target.is_empty());

        let missing = Dictionaries {
            words: Dictionary::from_symbols(["world"]),
            ..Dictionaries::default()
        };
        assert!(matches!(
            replay_dataset(&set, &missing, WordTargetPolicy::WordIndices),
            Err(EvalError::Lookup(_))
        ));
    }

    #[test]
    fn criterion_override_must_match_stored_family() {
        let tmp = tempfile::tempdir().unwrap();
        let path = saved_set(tmp.path(), CriterionKind::Asg);
        let overrides = ConfigOverrides {
            criterion: Some(CriterionKind::Ctc),
            ..ConfigOverrides::default()
        };
        let loaded = ArtifactLoader.load(&path).unwrap();
        assert!(matches!(
            Evaluator::init(loaded, overrides),
            Err(EvalError::Config(s)) if s.contains("criterion")
        ));
    }

    #[test]
    fn seq2seq_with_lexicon_ignores_unknown_stored_words() {
        let tmp = tempfile::tempdir().unwrap();
        let path = saved_set(tmp.path(), CriterionKind::Seq2Seq);
        let (_, set) = ArtifactLoader.load_with_emissions(&path).unwrap();

        let policy = WordTargetPolicy::select(true, CriterionKind::Seq2Seq);
        assert_eq!(policy, WordTargetPolicy::LetterDerived);
        // "hello" is stored, the lexicon does not know it
        let dicts = Dictionaries {
            words: Dictionary::from_symbols(["world"]),
            ..Dictionaries::default()
        };
        let ds = replay_dataset(&set, &dicts, policy).unwrap();
        assert_eq!(ds.size(), 1);
        assert!(ds.get(0).unwrap().word_target.is_empty());
    }
}
