// File: src/error.rs
use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

/// Everything that can abort an evaluation run. None of these are retried:
/// a skipped utterance would corrupt the error-rate denominator.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Missing or invalid run configuration, or an inconsistent model run.
    #[error("config error: {0}")]
    Config(String),

    /// A symbol or index is absent from a dictionary.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// An emission artifact does not match the expected schema.
    #[error("format error: {0}")]
    Format(String),

    /// Forward pass or best-path decode failed for a sample.
    #[error("model error: {0}")]
    Model(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extension trait to reduce `.map_err()` boilerplate when wrapping errors into `EvalError`.
pub trait ResultExt<T> {
    /// Wrap the error as [`EvalError::Config`] with `context` prefix.
    fn config(self, context: &str) -> EvalResult<T>;
    /// Wrap the error as [`EvalError::Format`] with `context` prefix.
    fn format(self, context: &str) -> EvalResult<T>;
    /// Wrap the error as [`EvalError::Model`] with `context` prefix.
    fn model(self, context: &str) -> EvalResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn config(self, context: &str) -> EvalResult<T> {
        self.map_err(|e| EvalError::Config(format!("{context}: {e}")))
    }
    fn format(self, context: &str) -> EvalResult<T> {
        self.map_err(|e| EvalError::Format(format!("{context}: {e}")))
    }
    fn model(self, context: &str) -> EvalResult<T> {
        self.map_err(|e| EvalError::Model(format!("{context}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_message() {
        let e = EvalError::Lookup("index 42 out of range".into());
        assert!(e.to_string().contains("index 42"));

        let e = EvalError::Format("bad magic".into());
        assert_eq!(e.to_string(), "format error: bad magic");
    }

    #[test]
    fn result_ext_config_context() {
        let err: Result<(), &str> = Err("not a number");
        let mapped = err.config("max_load");
        assert!(matches!(mapped, Err(EvalError::Config(s)) if s == "max_load: not a number"));
    }

    #[test]
    fn result_ext_format_context() {
        let err: Result<(), &str> = Err("unexpected end of file");
        let mapped = err.format("decode artifact");
        assert!(
            matches!(mapped, Err(EvalError::Format(s)) if s == "decode artifact: unexpected end of file")
        );
    }

    #[test]
    fn result_ext_model_context() {
        let err: Result<(), &str> = Err("nan in output");
        let mapped = err.model("forward");
        assert!(matches!(mapped, Err(EvalError::Model(s)) if s == "forward: nan in output"));
    }

    #[test]
    fn result_ext_ok_passthrough() {
        let ok: Result<i32, &str> = Ok(7);
        assert_eq!(ok.config("ctx").unwrap(), 7);
    }

    #[test]
    fn io_error_converts() {
        fn open() -> EvalResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(EvalError::Io(_))));
    }
}
