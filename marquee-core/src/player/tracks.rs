//! Subtitle track synchronization.

use serde::{Deserialize, Serialize};

use crate::media::MediaEngine;

/// Subtitle/caption track attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub source_url: String,
    pub label: String,
    pub language_code: String,
    pub is_default: bool,
}

impl Track {
    pub fn new(
        source_url: impl Into<String>,
        label: impl Into<String>,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            label: label.into(),
            language_code: language_code.into(),
            is_default: false,
        }
    }

    /// Marks this track as the default one.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Forces exactly one default track.
///
/// A set with exactly one default flag is kept as is. Otherwise the first
/// track becomes the default and every other flag is cleared.
pub fn normalize_tracks(mut tracks: Vec<Track>) -> Vec<Track> {
    let defaults = tracks.iter().filter(|track| track.is_default).count();
    if defaults != 1 {
        for (position, track) in tracks.iter_mut().enumerate() {
            track.is_default = position == 0;
        }
    }
    tracks
}

/// Keeps the engine's attached subtitle tracks in step with the requested set.
#[derive(Debug, Default)]
pub struct TrackSynchronizer {
    attached: Vec<Track>,
}

impl TrackSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the attached set.
    ///
    /// Detaches every previously attached track before attaching the new set,
    /// so the engine never holds a mix of both. Returns false without touching
    /// the engine when the normalized set equals the attached one.
    pub fn replace(&mut self, tracks: Vec<Track>, engine: &mut dyn MediaEngine) -> bool {
        let tracks = normalize_tracks(tracks);
        if tracks == self.attached {
            return false;
        }

        for track in self.attached.drain(..) {
            engine.detach_track(&track);
        }
        for track in &tracks {
            engine.attach_track(track);
        }
        engine.show_text_track(tracks.iter().position(|track| track.is_default));

        self.attached = tracks;
        true
    }

    /// Shows the track with `language`, or hides subtitles for `None`.
    ///
    /// Returns the language now shown, or None if no attached track matches.
    pub fn show(&self, language: Option<&str>, engine: &mut dyn MediaEngine) -> Option<Option<String>> {
        match language {
            None => {
                engine.show_text_track(None);
                Some(None)
            }
            Some(language) => {
                let index = self
                    .attached
                    .iter()
                    .position(|track| track.language_code == language)?;
                engine.show_text_track(Some(index));
                Some(Some(language.to_string()))
            }
        }
    }

    /// Currently attached tracks in display order.
    pub fn attached(&self) -> &[Track] {
        &self.attached
    }

    pub fn default_track(&self) -> Option<&Track> {
        self.attached.iter().find(|track| track.is_default)
    }

    /// Forgets the attached set without touching an engine.
    ///
    /// Used when the engine holding the tracks has been released; returns the
    /// set so it can be re-attached to a fresh engine.
    pub fn take(&mut self) -> Vec<Track> {
        std::mem::take(&mut self.attached)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::player::test_mocks::{EngineCall, RecordingMediaEngine};

    fn track(language: &str) -> Track {
        Track::new(format!("https://cdn.test/{language}.vtt"), language.to_uppercase(), language)
    }

    #[test]
    fn test_normalize_keeps_single_default() {
        let tracks = normalize_tracks(vec![track("en"), track("fr").as_default()]);
        assert!(!tracks[0].is_default);
        assert!(tracks[1].is_default);
    }

    #[test]
    fn test_normalize_forces_first_default() {
        let none = normalize_tracks(vec![track("en"), track("fr")]);
        assert!(none[0].is_default && !none[1].is_default);

        let many = normalize_tracks(vec![track("en"), track("fr").as_default(), track("de").as_default()]);
        assert!(many[0].is_default);
        assert!(!many[1].is_default && !many[2].is_default);
    }

    #[test]
    fn test_replace_detaches_before_attaching() {
        let mut engine = RecordingMediaEngine::default();
        let mut sync = TrackSynchronizer::new();

        assert!(sync.replace(vec![track("en")], &mut engine));
        engine.calls.clear();
        assert!(sync.replace(vec![track("fr"), track("de")], &mut engine));

        let first_attach = engine
            .calls
            .iter()
            .position(|call| matches!(call, EngineCall::AttachTrack(_)))
            .unwrap();
        let last_detach = engine
            .calls
            .iter()
            .rposition(|call| matches!(call, EngineCall::DetachTrack(_)))
            .unwrap();
        assert!(last_detach < first_attach);
        assert_eq!(sync.default_track().unwrap().language_code, "fr");
    }

    #[test]
    fn test_replace_with_equal_set_is_noop() {
        let mut engine = RecordingMediaEngine::default();
        let mut sync = TrackSynchronizer::new();

        sync.replace(vec![track("en"), track("fr")], &mut engine);
        engine.calls.clear();

        assert!(!sync.replace(vec![track("en"), track("fr")], &mut engine));
        assert!(engine.calls.is_empty());
    }

    #[test]
    fn test_replace_with_empty_set_clears() {
        let mut engine = RecordingMediaEngine::default();
        let mut sync = TrackSynchronizer::new();

        sync.replace(vec![track("en")], &mut engine);
        assert!(sync.replace(Vec::new(), &mut engine));
        assert!(sync.attached().is_empty());
        assert!(sync.default_track().is_none());
    }

    #[test]
    fn test_show_unknown_language() {
        let mut engine = RecordingMediaEngine::default();
        let mut sync = TrackSynchronizer::new();
        sync.replace(vec![track("en"), track("fr")], &mut engine);

        assert_eq!(sync.show(Some("fr"), &mut engine), Some(Some("fr".to_string())));
        assert_eq!(sync.show(Some("ja"), &mut engine), None);
        assert_eq!(sync.show(None, &mut engine), Some(None));
        assert_eq!(engine.calls.last(), Some(&EngineCall::ShowTextTrack(None)));
    }

    proptest! {
        #[test]
        fn prop_exactly_one_default(flags in proptest::collection::vec(any::<bool>(), 1..8)) {
            let tracks: Vec<Track> = flags
                .iter()
                .enumerate()
                .map(|(i, &is_default)| Track { is_default, ..track(&format!("l{i}")) })
                .collect();
            let single_default = flags.iter().filter(|&&flag| flag).count() == 1;

            let normalized = normalize_tracks(tracks.clone());

            prop_assert_eq!(normalized.iter().filter(|t| t.is_default).count(), 1);
            if !single_default {
                prop_assert!(normalized[0].is_default);
            } else {
                prop_assert_eq!(normalized, tracks);
            }
        }
    }
}
