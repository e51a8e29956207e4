//! Model table: which network files back each selectable model.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Default install location of the model files.
pub const DEFAULT_MODEL_DIR: &str = "/usr/share/realesrgan-ncnn-vulkan/models";

/// Selectable network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// `realesr-animevideov3-x{2,3,4}`: one file pair per scale.
    #[default]
    AnimeVideoV3,
    /// `realesrgan-x4plus-anime`, 4x only.
    X4PlusAnime,
    /// `realesrgan-x4plus`, 4x only.
    X4Plus,
}

impl ModelKind {
    /// Map the numeric model id used by host plugins (0, 1, 2).
    pub fn from_id(id: i64) -> Result<Self> {
        match id {
            0 => Ok(ModelKind::AnimeVideoV3),
            1 => Ok(ModelKind::X4PlusAnime),
            2 => Ok(ModelKind::X4Plus),
            other => Err(Error::config(
                "model",
                format!("invalid model type {other}. Try 0, 1, 2"),
            )),
        }
    }

    pub fn id(self) -> i64 {
        match self {
            ModelKind::AnimeVideoV3 => 0,
            ModelKind::X4PlusAnime => 1,
            ModelKind::X4Plus => 2,
        }
    }

    /// Scales this network was trained for.
    pub fn supported_scales(self) -> &'static [u32] {
        match self {
            ModelKind::AnimeVideoV3 => &[2, 3, 4],
            ModelKind::X4PlusAnime | ModelKind::X4Plus => &[4],
        }
    }

    /// File stem shared by the structure and weights files.
    pub fn file_stem(self, scale: u32) -> String {
        match self {
            ModelKind::AnimeVideoV3 => format!("realesr-animevideov3-x{scale}"),
            ModelKind::X4PlusAnime => "realesrgan-x4plus-anime".to_string(),
            ModelKind::X4Plus => "realesrgan-x4plus".to_string(),
        }
    }

    pub fn files(self, dir: &Path, scale: u32) -> ModelFiles {
        let stem = self.file_stem(scale);
        ModelFiles {
            kind: self,
            structure: dir.join(format!("{stem}.param")),
            weights: dir.join(format!("{stem}.bin")),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::AnimeVideoV3 => write!(f, "realesr-animevideov3"),
            ModelKind::X4PlusAnime => write!(f, "realesrgan-x4plus-anime"),
            ModelKind::X4Plus => write!(f, "realesrgan-x4plus"),
        }
    }
}

/// Structure-definition + weights file pair for one model at one scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub kind: ModelKind,
    pub structure: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Check both files can be opened for reading.
    pub fn check_readable(&self) -> Result<()> {
        for path in [&self.structure, &self.weights] {
            File::open(path).map_err(|source| Error::ModelFile {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_model_ids_roundtrip() {
        for id in 0..3 {
            assert_eq!(ModelKind::from_id(id).unwrap().id(), id);
        }
        let err = ModelKind::from_id(7).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("Try 0, 1, 2"));
    }

    #[test]
    fn test_file_names_follow_scale() {
        let files = ModelKind::AnimeVideoV3.files(Path::new("/models"), 3);
        assert_eq!(
            files.structure,
            PathBuf::from("/models/realesr-animevideov3-x3.param")
        );
        assert_eq!(files.weights, PathBuf::from("/models/realesr-animevideov3-x3.bin"));

        let files = ModelKind::X4Plus.files(Path::new("/models"), 4);
        assert_eq!(files.weights, PathBuf::from("/models/realesrgan-x4plus.bin"));
    }

    #[test]
    fn test_check_readable() {
        let dir = tempfile::tempdir().unwrap();
        let files = ModelKind::X4PlusAnime.files(dir.path(), 4);
        let err = files.check_readable().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);

        std::fs::write(&files.structure, b"7767517\n").unwrap();
        assert!(files.check_readable().is_err());

        std::fs::write(&files.weights, [0u8; 16]).unwrap();
        assert!(files.check_readable().is_ok());
    }
}
