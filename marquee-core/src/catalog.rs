//! Catalog descriptors for playable media items.
//!
//! The catalog service hands the player an opaque description of a media
//! item. This module only gives that description a shape and turns it into
//! what the controller consumes.

use serde::{Deserialize, Serialize};

use crate::manifest::quality_label;
use crate::persistence::MediaId;
use crate::player::{InitialState, OpenRequest, Track};

/// Quality preferred when a descriptor advertises it.
pub const PREFERRED_QUALITY: u32 = 1080;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleDescriptor {
    pub src: String,
    pub label: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityDescriptor {
    #[serde(default)]
    pub src: Option<String>,
    /// Display label such as `720p` or `4K`
    pub quality: String,
}

/// Everything the catalog knows about one playable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub media_id: MediaId,
    pub source_url: String,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub subtitles: Vec<SubtitleDescriptor>,
    #[serde(default)]
    pub qualities: Vec<QualityDescriptor>,
}

impl MediaDescriptor {
    /// Parses a descriptor from catalog JSON.
    ///
    /// # Errors
    ///
    /// - `serde_json::Error` - Malformed JSON or missing required fields
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Subtitle tracks in catalog order, the first one flagged default.
    pub fn tracks(&self) -> Vec<Track> {
        self.subtitles
            .iter()
            .enumerate()
            .map(|(position, subtitle)| Track {
                source_url: subtitle.src.clone(),
                label: subtitle.label.clone(),
                language_code: subtitle.language.clone(),
                is_default: position == 0,
            })
            .collect()
    }

    /// Advertised vertical resolutions, skipping labels that do not parse.
    pub fn quality_options(&self) -> Vec<u32> {
        self.qualities
            .iter()
            .filter_map(|descriptor| parse_quality_label(&descriptor.quality))
            .collect()
    }

    /// Resolution to request first: 1080p if advertised, else the first option.
    pub fn preferred_quality(&self) -> Option<u32> {
        let options = self.quality_options();
        if options.contains(&PREFERRED_QUALITY) {
            Some(PREFERRED_QUALITY)
        } else {
            options.first().copied()
        }
    }

    /// Builds the request that opens this item with resume persistence.
    ///
    /// A quality already set in `initial_state` wins over the preferred one.
    pub fn open_request(&self, initial_state: Option<InitialState>) -> OpenRequest {
        let mut initial_state = initial_state.unwrap_or_default();
        if initial_state.quality.is_none() {
            initial_state.quality = self.preferred_quality();
        }

        OpenRequest::new(&self.source_url)
            .with_media_id(self.media_id.clone())
            .with_initial_state(initial_state)
    }
}

/// Parses a quality label (`720p`, `1080P`, `4K`) into a vertical resolution.
pub fn parse_quality_label(label: &str) -> Option<u32> {
    let label = label.trim();
    if label.eq_ignore_ascii_case("4k") {
        return Some(2160);
    }

    let digits = label
        .strip_suffix('p')
        .or_else(|| label.strip_suffix('P'))
        .unwrap_or(label);
    let height = digits.parse::<u32>().ok()?;
    (height > 0).then_some(height)
}

/// Display labels for the advertised qualities, normalized.
pub fn quality_labels(descriptor: &MediaDescriptor) -> Vec<String> {
    descriptor
        .quality_options()
        .into_iter()
        .map(quality_label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"{
        "media_id": "tt0111161",
        "source_url": "https://cdn.test/shawshank/master.m3u8",
        "poster_url": "https://img.test/shawshank.jpg",
        "subtitles": [
            {"src": "https://cdn.test/shawshank/en.vtt", "label": "English", "language": "en"},
            {"src": "https://cdn.test/shawshank/es.vtt", "label": "Español", "language": "es"}
        ],
        "qualities": [
            {"src": "https://cdn.test/shawshank/720.m3u8", "quality": "720p"},
            {"quality": "1080p"},
            {"quality": "4K"},
            {"quality": "HD"}
        ]
    }"#;

    #[test]
    fn test_descriptor_parses_and_converts() {
        let descriptor = MediaDescriptor::from_json(DESCRIPTOR).unwrap();

        let tracks = descriptor.tracks();
        assert_eq!(tracks.len(), 2);
        assert!(tracks[0].is_default);
        assert!(!tracks[1].is_default);
        assert_eq!(tracks[1].language_code, "es");

        assert_eq!(descriptor.quality_options(), vec![720, 1080, 2160]);
        assert_eq!(descriptor.preferred_quality(), Some(1080));

        let request = descriptor.open_request(None);
        assert_eq!(request.source_url, "https://cdn.test/shawshank/master.m3u8");
        assert_eq!(request.media_id, Some(MediaId::new("tt0111161")));
        assert_eq!(request.initial_state.unwrap().quality, Some(1080));
    }

    #[test]
    fn test_minimal_descriptor() {
        let descriptor = MediaDescriptor::from_json(
            r#"{"media_id": "m1", "source_url": "https://cdn.test/m1.mp4"}"#,
        )
        .unwrap();

        assert!(descriptor.tracks().is_empty());
        assert_eq!(descriptor.preferred_quality(), None);

        let request = descriptor.open_request(Some(InitialState {
            current_time: Some(15.0),
            ..InitialState::default()
        }));
        let initial = request.initial_state.unwrap();
        assert_eq!(initial.current_time, Some(15.0));
        assert_eq!(initial.quality, None);
    }

    #[test]
    fn test_parse_quality_label() {
        assert_eq!(parse_quality_label("480p"), Some(480));
        assert_eq!(parse_quality_label("720P"), Some(720));
        assert_eq!(parse_quality_label("4k"), Some(2160));
        assert_eq!(parse_quality_label("1440"), Some(1440));
        assert_eq!(parse_quality_label("HD"), None);
    }
}
