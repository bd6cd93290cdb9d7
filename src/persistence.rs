// File: src/persistence.rs
use crate::core::emission::EmissionSet;
use crate::error::{EvalError, EvalResult, ResultExt};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Leading bytes of every emission artifact.
pub const ARTIFACT_MAGIC: [u8; 8] = *b"W2LEMSET";
/// Bumped whenever the layout of [`EmissionSet`] changes.
pub const ARTIFACT_VERSION: u32 = 1;

/// The on-disk envelope. Field order is the wire order.
#[derive(Serialize, Deserialize)]
struct SerializableArtifact {
    magic: [u8; 8],
    version: u32,
    set: EmissionSet,
}

#[derive(Serialize)]
struct SerializableArtifactRef<'a> {
    magic: [u8; 8],
    version: u32,
    set: &'a EmissionSet,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    magic: [u8; 8],
    version: u32,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Writes `set` to `path`. Readers see either the previous file or the complete
/// new one, never a partial write.
pub fn save_to_disk(set: &EmissionSet, path: &Path) -> EvalResult<()> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let artifact = SerializableArtifactRef {
        magic: ARTIFACT_MAGIC,
        version: ARTIFACT_VERSION,
        set,
    };

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        codec()
            .serialize_into(&mut writer, &artifact)
            .map_err(|e| EvalError::Io(std::io::Error::other(e)))?;
        writer.flush()?;
    }
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| EvalError::Io(e.error))?;

    info!("saved {} emissions to {}", set.len(), path.display());
    Ok(())
}

pub fn load_from_disk(path: &Path) -> EvalResult<EmissionSet> {
    let bytes = fs::read(path)?;
    debug!("read {} bytes from {}", bytes.len(), path.display());

    // The header is checked first so that a foreign or newer file reports
    // what it is instead of a generic decode failure.
    let header: ArtifactHeader = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .deserialize(&bytes)
        .format("artifact header")?;
    if header.magic != ARTIFACT_MAGIC {
        return Err(EvalError::Format(format!(
            "{} is not an emission artifact",
            path.display()
        )));
    }
    if header.version != ARTIFACT_VERSION {
        return Err(EvalError::Format(format!(
            "unsupported artifact version {} (expected {ARTIFACT_VERSION})",
            header.version
        )));
    }

    let artifact: SerializableArtifact = codec().deserialize(&bytes).format("artifact body")?;
    artifact.set.validate()?;
    Ok(artifact.set)
}

/// `emission_dir/<test>.bin`, with path separators in the test set name
/// replaced so that every test set maps to one flat file name.
pub fn artifact_path(emission_dir: &Path, test_set: &str) -> PathBuf {
    let cleaned: String = test_set
        .chars()
        .map(|c| if c == '/' || c == '\\' { '#' } else { c })
        .collect();
    emission_dir.join(format!("{cleaned}.bin"))
}
