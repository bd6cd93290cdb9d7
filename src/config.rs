// File: src/config.rs
use crate::core::types::CriterionKind;
use crate::error::{EvalError, EvalResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Key under which a model's config mapping stores its [`RunConfig`] as JSON.
pub const RUN_CONFIG_KEY: &str = "run_config";

/// Everything a test run needs to know, resolved once and passed down
/// explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Acoustic model to evaluate.
    pub am: PathBuf,
    /// Test set identifier. Also names the emission artifact.
    pub test: String,
    pub tokens_dir: PathBuf,
    pub tokens: String,
    pub lexicon: Option<PathBuf>,
    pub max_word: Option<usize>,
    pub criterion: CriterionKind,
    pub word_separator: String,
    pub replabel: usize,
    pub emission_dir: PathBuf,
    pub show: bool,
    pub max_load: Option<usize>,
    pub shuffle_seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            am: PathBuf::new(),
            test: String::new(),
            tokens_dir: PathBuf::new(),
            tokens: "tokens.txt".into(),
            lexicon: None,
            max_word: None,
            criterion: CriterionKind::Ctc,
            word_separator: "|".into(),
            replabel: 0,
            emission_dir: PathBuf::from("."),
            show: false,
            max_load: None,
            shuffle_seed: None,
        }
    }
}

/// Partial config. Every `Some` field replaces the corresponding [`RunConfig`]
/// field; read from an overrides file or built from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub am: Option<PathBuf>,
    pub test: Option<String>,
    pub tokens_dir: Option<PathBuf>,
    pub tokens: Option<String>,
    pub lexicon: Option<PathBuf>,
    pub max_word: Option<usize>,
    /// Only a consistency check: the loaded criterion fixes the family, and
    /// a different value fails init.
    pub criterion: Option<CriterionKind>,
    pub word_separator: Option<String>,
    pub replabel: Option<usize>,
    pub emission_dir: Option<PathBuf>,
    pub show: Option<bool>,
    pub max_load: Option<usize>,
    pub shuffle_seed: Option<u64>,
}

impl ConfigOverrides {
    pub fn from_file(path: &Path) -> EvalResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).config(&format!("overrides file {}", path.display()))
    }

    /// `other` wins wherever it sets a field.
    pub fn merged_with(self, other: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            am: other.am.or(self.am),
            test: other.test.or(self.test),
            tokens_dir: other.tokens_dir.or(self.tokens_dir),
            tokens: other.tokens.or(self.tokens),
            lexicon: other.lexicon.or(self.lexicon),
            max_word: other.max_word.or(self.max_word),
            criterion: other.criterion.or(self.criterion),
            word_separator: other.word_separator.or(self.word_separator),
            replabel: other.replabel.or(self.replabel),
            emission_dir: other.emission_dir.or(self.emission_dir),
            show: other.show.or(self.show),
            max_load: other.max_load.or(self.max_load),
            shuffle_seed: other.shuffle_seed.or(self.shuffle_seed),
        }
    }
}

impl RunConfig {
    /// Reads the config a model was trained/exported with.
    pub fn from_model_config(model_config: &HashMap<String, String>) -> EvalResult<Self> {
        let raw = model_config.get(RUN_CONFIG_KEY).ok_or_else(|| {
            EvalError::Config(format!("model config has no '{RUN_CONFIG_KEY}' entry"))
        })?;
        serde_json::from_str(raw).config("stored run config")
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            am,
            test,
            tokens_dir,
            tokens,
            lexicon,
            max_word,
            criterion,
            word_separator,
            replabel,
            emission_dir,
            show,
            max_load,
            shuffle_seed,
        } = overrides;

        if let Some(v) = am {
            self.am = v;
        }
        if let Some(v) = test {
            self.test = v;
        }
        if let Some(v) = tokens_dir {
            self.tokens_dir = v;
        }
        if let Some(v) = tokens {
            self.tokens = v;
        }
        if lexicon.is_some() {
            self.lexicon = lexicon;
        }
        if max_word.is_some() {
            self.max_word = max_word;
        }
        if let Some(v) = criterion {
            self.criterion = v;
        }
        if let Some(v) = word_separator {
            self.word_separator = v;
        }
        if let Some(v) = replabel {
            self.replabel = v;
        }
        if let Some(v) = emission_dir {
            self.emission_dir = v;
        }
        if let Some(v) = show {
            self.show = v;
        }
        if max_load.is_some() {
            self.max_load = max_load;
        }
        if shuffle_seed.is_some() {
            self.shuffle_seed = shuffle_seed;
        }
    }

    /// Stored config, then `overrides` on top. The result is validated.
    pub fn resolve(
        model_config: &HashMap<String, String>,
        overrides: ConfigOverrides,
    ) -> EvalResult<Self> {
        let mut config = Self::from_model_config(model_config)?;
        config.apply(overrides);
        config.validate()?;
        info!("resolved run config:\n{}", config.snapshot()?);
        Ok(config)
    }

    pub fn validate(&self) -> EvalResult<()> {
        if self.word_separator.is_empty() {
            return Err(EvalError::Config("word separator must not be empty".into()));
        }
        if self.test.is_empty() {
            return Err(EvalError::Config("no test set given".into()));
        }
        if self.max_load == Some(0) {
            return Err(EvalError::Config("max_load must be positive".into()));
        }
        Ok(())
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.tokens_dir.join(&self.tokens)
    }

    /// Pretty JSON, stored in the emission artifact.
    pub fn snapshot(&self) -> EvalResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The config mapping a model exporter stores alongside the weights.
    pub fn to_model_config(&self) -> EvalResult<HashMap<String, String>> {
        Ok(HashMap::from([(RUN_CONFIG_KEY.to_string(), serde_json::to_string(self)?)]))
    }
}
