//! Response artifacts.
//!
//! The latest answer is kept on disk as `response.txt` and `response.mp3`.
//! Both files are overwritten on every answered question.

use std::path::{Path, PathBuf};

use common::errors::{AppError, AppResult};

/// File name of the text artifact.
pub const TEXT_FILE: &str = "response.txt";
/// File name of the audio artifact.
pub const AUDIO_FILE: &str = "response.mp3";

/// Owns the artifact files of one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the output directory if missing.
    pub async fn ensure_dir(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn text_path(&self) -> PathBuf {
        self.dir.join(TEXT_FILE)
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(AUDIO_FILE)
    }

    /// Overwrites both artifacts. Both files are staged as temporary siblings
    /// before either is renamed into place, so a failed write leaves the
    /// previous pair untouched.
    pub async fn save(&self, text: &str, audio: &[u8]) -> AppResult<()> {
        self.ensure_dir().await?;
        let text_path = self.text_path();
        let audio_path = self.audio_path();
        let text_tmp = staging_path(&text_path);
        let audio_tmp = staging_path(&audio_path);

        let staged = async {
            tokio::fs::write(&text_tmp, text.as_bytes()).await?;
            tokio::fs::write(&audio_tmp, audio).await
        }
        .await;
        if let Err(e) = staged {
            discard(&text_tmp).await;
            discard(&audio_tmp).await;
            return Err(e.into());
        }

        tokio::fs::rename(&text_tmp, &text_path).await?;
        tokio::fs::rename(&audio_tmp, &audio_path).await?;

        tracing::debug!(
            dir = %self.dir.display(),
            text_bytes = text.len(),
            audio_bytes = audio.len(),
            "Artifacts written"
        );
        Ok(())
    }

    /// Latest answer text.
    pub async fn read_text(&self) -> AppResult<String> {
        let bytes = read_artifact(&self.text_path()).await?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Latest answer audio.
    pub async fn read_audio(&self) -> AppResult<Vec<u8>> {
        read_artifact(&self.audio_path()).await
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Staged artifact not removed");
        }
    }
}

async fn read_artifact(path: &Path) -> AppResult<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Err(AppError::NotFound(format!("{} has not been generated yet", name)))
        }
        Err(e) => Err(e.into()),
    }
}
