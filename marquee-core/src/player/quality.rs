//! Quality level resolution.
//!
//! Selection is exact-match on vertical resolution. A request that matches
//! no advertised level falls back to the default level: the highest
//! resolution at or below the configured ceiling, else the first level.
//! Bandwidth estimation is left to the streaming engine, which switches
//! automatically until a level is explicitly selected.

use crate::manifest::QualityLevel;

/// Outcome of a quality selection request.
#[derive(Debug, Clone, PartialEq)]
pub enum QualitySelection {
    /// Level pinned on the streaming engine
    Applied(QualityLevel),
    /// Manifest not resolved yet; applied once it is
    Queued,
    /// Session plays without adaptive levels
    Unavailable,
}

/// Resolves requested resolutions against the levels of one manifest.
#[derive(Debug, Clone)]
pub struct QualityResolver {
    ceiling: Option<u32>,
    levels: Vec<QualityLevel>,
    selected: Option<usize>,
}

impl QualityResolver {
    pub fn new(ceiling: Option<u32>) -> Self {
        Self {
            ceiling,
            levels: Vec::new(),
            selected: None,
        }
    }

    /// Stores the levels enumerated by a freshly parsed manifest.
    pub fn resolve_levels(&mut self, levels: Vec<QualityLevel>) {
        self.levels = levels;
        self.selected = None;
    }

    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    /// Looks up a level by its manifest index.
    pub fn level(&self, index: usize) -> Option<&QualityLevel> {
        self.levels.iter().find(|level| level.index == index)
    }

    /// Index of the explicitly selected level, if automatic switching is
    /// overridden.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Drops the explicit override, returning to automatic switching.
    pub fn clear_override(&mut self) {
        self.selected = None;
    }

    /// Level used when a request matches nothing.
    pub fn default_level(&self) -> Option<&QualityLevel> {
        // max_by_key keeps the last of equal elements, so ties go to the higher index
        match self.ceiling {
            Some(ceiling) => self
                .levels
                .iter()
                .filter(|level| level.vertical_resolution <= ceiling)
                .max_by_key(|level| level.vertical_resolution)
                .or_else(|| self.levels.first()),
            None => self
                .levels
                .iter()
                .max_by_key(|level| level.vertical_resolution),
        }
    }

    /// Selects the level for `vertical_resolution` and records it as the
    /// explicit override.
    ///
    /// Returns the chosen level and whether it was an exact match, or None
    /// when no levels are known.
    pub fn select(&mut self, vertical_resolution: u32) -> Option<(QualityLevel, bool)> {
        let (level, exact) = match self
            .levels
            .iter()
            .find(|level| level.vertical_resolution == vertical_resolution)
        {
            Some(level) => (level.clone(), true),
            None => (self.default_level()?.clone(), false),
        };

        self.selected = Some(level.index);
        Some((level, exact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    fn resolver(ceiling: Option<u32>, heights: &[u32]) -> QualityResolver {
        let mut resolver = QualityResolver::new(ceiling);
        resolver.resolve_levels(Manifest::with_resolutions(heights).levels);
        resolver
    }

    #[test]
    fn test_exact_match() {
        let mut resolver = resolver(Some(1080), &[480, 720, 1080]);

        let (level, exact) = resolver.select(720).unwrap();
        assert_eq!(level.label, "720p");
        assert!(exact);
        assert_eq!(resolver.selected(), Some(1));
    }

    #[test]
    fn test_mismatch_falls_back_to_ceiling_default() {
        let mut resolver = resolver(Some(1080), &[480, 720, 1080]);

        let (level, exact) = resolver.select(900).unwrap();
        assert_eq!(level.vertical_resolution, 1080);
        assert!(!exact);
    }

    #[test]
    fn test_default_respects_ceiling() {
        let resolver = resolver(Some(720), &[360, 720, 1080, 2160]);
        assert_eq!(resolver.default_level().unwrap().vertical_resolution, 720);
    }

    #[test]
    fn test_default_falls_back_to_first_level_above_ceiling() {
        let resolver = resolver(Some(480), &[1080, 720]);
        assert_eq!(resolver.default_level().unwrap().vertical_resolution, 1080);
    }

    #[test]
    fn test_default_without_ceiling_is_highest() {
        let resolver = resolver(None, &[720, 2160, 1080]);
        assert_eq!(resolver.default_level().unwrap().label, "4K");
    }

    #[test]
    fn test_no_levels() {
        let mut resolver = QualityResolver::new(Some(1080));
        assert!(resolver.select(720).is_none());
        assert_eq!(resolver.selected(), None);
    }

    #[test]
    fn test_resolve_levels_clears_override() {
        let mut resolver = resolver(Some(1080), &[480, 720]);
        resolver.select(480);
        resolver.resolve_levels(Manifest::with_resolutions(&[480, 720]).levels);
        assert_eq!(resolver.selected(), None);
    }
}
