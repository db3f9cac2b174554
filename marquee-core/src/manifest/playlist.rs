//! HLS master playlist parsing.
//!
//! Only the parts the controller needs are understood: variant streams
//! (`#EXT-X-STREAM-INF`) and audio renditions (`#EXT-X-MEDIA:TYPE=AUDIO`).
//! A media playlist without variants parses to a manifest with no levels.

use super::{AudioRendition, Manifest, ManifestError, QualityLevel, quality_label};

const HEADER_TAG: &str = "#EXTM3U";
const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF:";
const MEDIA_TAG: &str = "#EXT-X-MEDIA:";

/// Parses an HLS master playlist.
///
/// Variants keep their position in the playlist as their level index, so
/// indices line up with what the streaming engine uses even when some
/// variants (audio-only ones, for example) carry no resolution and are
/// therefore not selectable by quality.
///
/// # Errors
///
/// - `ManifestError::Invalid` - Missing `#EXTM3U` header or a variant tag
///   without a URI line
pub fn parse_master_playlist(text: &str) -> Result<Manifest, ManifestError> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    if lines.next() != Some(HEADER_TAG) {
        return Err(ManifestError::Invalid {
            reason: "missing #EXTM3U header".to_string(),
        });
    }

    let mut manifest = Manifest::default();
    let mut variant_count = 0usize;
    let mut pending_variant: Option<Vec<(String, String)>> = None;

    for line in lines {
        if let Some(attrs) = line.strip_prefix(STREAM_INF_TAG) {
            if pending_variant.is_some() {
                return Err(ManifestError::Invalid {
                    reason: format!("variant {variant_count} has no URI"),
                });
            }
            pending_variant = Some(parse_attributes(attrs));
            continue;
        }

        if let Some(attrs) = line.strip_prefix(MEDIA_TAG) {
            let attributes = parse_attributes(attrs);
            if attribute(&attributes, "TYPE") == Some("AUDIO") {
                let index = manifest.audio_renditions.len();
                manifest.audio_renditions.push(AudioRendition {
                    index,
                    name: attribute(&attributes, "NAME")
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Audio {}", index + 1)),
                    language: attribute(&attributes, "LANGUAGE").map(str::to_string),
                    is_default: attribute(&attributes, "DEFAULT") == Some("YES"),
                });
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        // URI line closing a variant
        if let Some(attributes) = pending_variant.take() {
            if let Some(height) = attribute(&attributes, "RESOLUTION").and_then(parse_height) {
                manifest.levels.push(QualityLevel {
                    index: variant_count,
                    vertical_resolution: height,
                    label: attribute(&attributes, "NAME")
                        .map(str::to_string)
                        .unwrap_or_else(|| quality_label(height)),
                    bandwidth: attribute(&attributes, "BANDWIDTH")
                        .and_then(|value| value.parse().ok()),
                });
            }
            variant_count += 1;
        }
    }

    if pending_variant.is_some() {
        return Err(ManifestError::Invalid {
            reason: format!("variant {variant_count} has no URI"),
        });
    }

    Ok(manifest)
}

/// Splits an attribute list on commas outside of quoted strings.
fn parse_attributes(list: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in list.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                push_attribute(&mut attributes, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_attribute(&mut attributes, &current);

    attributes
}

fn push_attribute(attributes: &mut Vec<(String, String)>, raw: &str) {
    if let Some((key, value)) = raw.split_once('=') {
        attributes.push((key.trim().to_string(), value.trim().to_string()));
    }
}

fn attribute<'a>(attributes: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Extracts the height from a `WIDTHxHEIGHT` resolution.
fn parse_height(resolution: &str) -> Option<u32> {
    let (_, height) = resolution.split_once('x')?;
    height.parse().ok()
}
