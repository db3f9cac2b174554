//! Streaming manifests: quality levels, audio renditions and loading.

pub mod playlist;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub use playlist::parse_master_playlist;

/// One discrete rendition advertised by the manifest.
///
/// Immutable once the manifest is parsed. `index` is the position of the
/// variant in the manifest, which is also the level index the streaming
/// engine understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    pub index: usize,
    pub vertical_resolution: u32,
    pub label: String,
    /// Peak bandwidth in bits per second, if advertised
    pub bandwidth: Option<u64>,
}

impl QualityLevel {
    /// Creates a level with a label derived from its resolution.
    pub fn new(index: usize, vertical_resolution: u32) -> Self {
        Self {
            index,
            vertical_resolution,
            label: quality_label(vertical_resolution),
            bandwidth: None,
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Derives the conventional display label for a vertical resolution.
pub fn quality_label(vertical_resolution: u32) -> String {
    if vertical_resolution >= 2160 {
        "4K".to_string()
    } else {
        format!("{vertical_resolution}p")
    }
}

/// Alternative audio rendition advertised by the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRendition {
    pub index: usize,
    pub name: String,
    pub language: Option<String>,
    pub is_default: bool,
}

/// Parsed streaming manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub levels: Vec<QualityLevel>,
    pub audio_renditions: Vec<AudioRendition>,
}

impl Manifest {
    /// Creates a manifest advertising the given vertical resolutions.
    pub fn with_resolutions(resolutions: &[u32]) -> Self {
        Self {
            levels: resolutions
                .iter()
                .enumerate()
                .map(|(index, &height)| QualityLevel::new(index, height))
                .collect(),
            audio_renditions: Vec::new(),
        }
    }

    /// Returns the rendition flagged default, else the first one.
    pub fn default_audio(&self) -> Option<&AudioRendition> {
        self.audio_renditions
            .iter()
            .find(|rendition| rendition.is_default)
            .or_else(|| self.audio_renditions.first())
    }
}

/// Errors raised while acquiring a manifest.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ManifestError {
    #[error("Manifest fetch failed: {reason}")]
    Network { reason: String },

    #[error("Invalid manifest: {reason}")]
    Invalid { reason: String },
}

impl ManifestError {
    /// Checks if retrying the fetch could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ManifestError::Network { .. })
    }
}

/// Source of manifests for the controller.
#[async_trait]
pub trait ManifestLoader: Send + Sync {
    /// Fetches and parses the manifest behind `source`.
    ///
    /// # Errors
    ///
    /// - `ManifestError::Network` - Transport failure, worth retrying
    /// - `ManifestError::Invalid` - Content is not a usable manifest
    async fn load(&self, source: &Url) -> Result<Manifest, ManifestError>;
}

/// Loads HLS master playlists over HTTP(S), or from disk for `file` URLs.
#[derive(Debug, Clone, Default)]
pub struct HttpManifestLoader {
    client: reqwest::Client,
}

impl HttpManifestLoader {
    /// Creates a loader with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader reusing an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_text(&self, source: &Url) -> Result<String, ManifestError> {
        if source.scheme() == "file" {
            let path = source
                .to_file_path()
                .map_err(|_| ManifestError::Invalid {
                    reason: format!("not a local path: {source}"),
                })?;
            return tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ManifestError::Network {
                    reason: format!("{}: {e}", path.display()),
                });
        }

        let response = self
            .client
            .get(source.clone())
            .send()
            .await
            .map_err(|e| ManifestError::Network {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ManifestError::Network {
                reason: format!("server responded {status}"),
            });
        }
        if !status.is_success() {
            return Err(ManifestError::Invalid {
                reason: format!("server responded {status}"),
            });
        }

        response.text().await.map_err(|e| ManifestError::Network {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ManifestLoader for HttpManifestLoader {
    async fn load(&self, source: &Url) -> Result<Manifest, ManifestError> {
        let body = self.fetch_text(source).await?;
        let manifest = parse_master_playlist(&body)?;
        tracing::debug!(
            source = %source,
            levels = manifest.levels.len(),
            audio = manifest.audio_renditions.len(),
            "Manifest parsed"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_quality_labels() {
        assert_eq!(quality_label(480), "480p");
        assert_eq!(quality_label(1080), "1080p");
        assert_eq!(quality_label(2160), "4K");
    }

    #[test]
    fn test_default_audio_falls_back_to_first() {
        let mut manifest = Manifest::with_resolutions(&[720]);
        assert!(manifest.default_audio().is_none());

        manifest.audio_renditions = vec![
            AudioRendition {
                index: 0,
                name: "English".to_string(),
                language: Some("en".to_string()),
                is_default: false,
            },
            AudioRendition {
                index: 1,
                name: "Deutsch".to_string(),
                language: Some("de".to_string()),
                is_default: false,
            },
        ];
        assert_eq!(manifest.default_audio().unwrap().name, "English");

        manifest.audio_renditions[1].is_default = true;
        assert_eq!(manifest.default_audio().unwrap().name, "Deutsch");
    }

    #[test]
    fn test_manifest_error_retryability() {
        assert!(
            ManifestError::Network {
                reason: "reset".to_string()
            }
            .is_retryable()
        );
        assert!(
            !ManifestError::Invalid {
                reason: "empty".to_string()
            }
            .is_retryable()
        );
    }

    #[tokio::test]
    async fn test_loads_local_playlist() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=854x480\nlow.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720\nmid.m3u8"
        )
        .unwrap();

        let url = Url::from_file_path(file.path()).unwrap();
        let manifest = HttpManifestLoader::new().load(&url).await.unwrap();

        let heights: Vec<u32> = manifest
            .levels
            .iter()
            .map(|level| level.vertical_resolution)
            .collect();
        assert_eq!(heights, vec![480, 720]);
    }

    #[tokio::test]
    async fn test_missing_local_playlist_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("missing.m3u8")).unwrap();

        let result = HttpManifestLoader::new().load(&url).await;
        assert!(matches!(result, Err(ManifestError::Network { .. })));
    }
}
