use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::models::{Coordinate, HardFilter};

pub const RADIUS_MIN_KM: f64 = 0.5;
pub const RADIUS_MAX_KM: f64 = 10.0;
pub const RADIUS_STEP_KM: f64 = 0.5;

/// Upper bound on free-text length, in characters
pub const MAX_FREE_TEXT_CHARS: usize = 2000;

/// Errors raised by criteria mutations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriteriaError {
    #[error("Unknown hard filter: {0}")]
    InvalidFilterKey(String),

    #[error("Coordinate out of range: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// The user's search parameters for one recommendation request
///
/// Mutations are synchronous and perform no I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    location: Coordinate,
    radius_km: f64,
    tags: BTreeSet<String>,
    free_text: String,
    hard_filters: BTreeMap<HardFilter, bool>,
}

impl SearchCriteria {
    pub fn new(location: Coordinate, radius_km: f64) -> Self {
        let mut criteria = Self {
            location,
            radius_km: RADIUS_MIN_KM,
            tags: BTreeSet::new(),
            free_text: String::new(),
            hard_filters: HardFilter::ALL.into_iter().map(|f| (f, false)).collect(),
        };
        criteria.set_radius(radius_km);
        criteria
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn is_filter_active(&self, filter: HardFilter) -> bool {
        self.hard_filters.get(&filter).copied().unwrap_or(false)
    }

    pub fn active_filters(&self) -> impl Iterator<Item = HardFilter> + '_ {
        self.hard_filters
            .iter()
            .filter(|(_, on)| **on)
            .map(|(filter, _)| *filter)
    }

    /// True when a request may be issued: at least one tag or non-blank text
    pub fn is_submittable(&self) -> bool {
        !self.tags.is_empty() || !self.free_text.trim().is_empty()
    }

    /// Replace the location. Returns whether it actually changed.
    pub(crate) fn set_location(&mut self, location: Coordinate) -> bool {
        let changed = self.location != location;
        self.location = location;
        changed
    }

    /// Clamp to [0.5, 10.0] and snap to the 0.5 km step. NaN is ignored.
    ///
    /// Returns whether the stored radius changed.
    pub(crate) fn set_radius(&mut self, km: f64) -> bool {
        if km.is_nan() {
            return false;
        }

        let snapped = ((km / RADIUS_STEP_KM).round() * RADIUS_STEP_KM).clamp(RADIUS_MIN_KM, RADIUS_MAX_KM);
        let changed = snapped != self.radius_km;
        self.radius_km = snapped;
        changed
    }

    /// Add the tag if absent, remove it if present
    pub(crate) fn toggle_tag(&mut self, tag: &str) {
        if !self.tags.remove(tag) {
            self.tags.insert(tag.to_string());
        }
    }

    pub(crate) fn set_free_text(&mut self, text: &str) {
        self.free_text = match text.char_indices().nth(MAX_FREE_TEXT_CHARS) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text.to_string(),
        };
    }

    /// Flip the flag for `key`; unknown keys are rejected
    pub(crate) fn toggle_hard_filter(&mut self, key: &str) -> Result<bool, CriteriaError> {
        let filter: HardFilter = key.parse()?;
        let flag = self.hard_filters.entry(filter).or_insert(false);
        *flag = !*flag;
        Ok(*flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> SearchCriteria {
        SearchCriteria::new(Coordinate::new(37.5665, 126.978).unwrap(), 2.0)
    }

    #[test]
    fn test_defaults() {
        let c = criteria();
        assert_eq!(c.radius_km(), 2.0);
        assert!(c.tags().is_empty());
        assert_eq!(c.free_text(), "");
        assert_eq!(c.active_filters().count(), 0);
        assert!(!c.is_submittable());
    }

    #[test]
    fn test_radius_clamped_and_snapped() {
        let mut c = criteria();

        c.set_radius(0.1);
        assert_eq!(c.radius_km(), 0.5);

        c.set_radius(42.0);
        assert_eq!(c.radius_km(), 10.0);

        c.set_radius(3.3);
        assert_eq!(c.radius_km(), 3.5);

        c.set_radius(f64::INFINITY);
        assert_eq!(c.radius_km(), 10.0);

        assert!(!c.set_radius(f64::NAN));
        assert_eq!(c.radius_km(), 10.0);
    }

    #[test]
    fn test_toggle_tag_round_trip() {
        let mut c = criteria();
        c.toggle_tag("카페");
        let before = c.tags().clone();

        c.toggle_tag("술집");
        assert!(c.tags().contains("술집"));
        c.toggle_tag("술집");

        assert_eq!(c.tags(), &before);
    }

    #[test]
    fn test_blank_text_not_submittable() {
        let mut c = criteria();
        c.set_free_text("   \n\t");
        assert!(!c.is_submittable());

        c.set_free_text("바다가 보이는 곳");
        assert!(c.is_submittable());
    }

    #[test]
    fn test_free_text_truncated() {
        let mut c = criteria();
        let long = "맛".repeat(MAX_FREE_TEXT_CHARS + 10);
        c.set_free_text(&long);
        assert_eq!(c.free_text().chars().count(), MAX_FREE_TEXT_CHARS);
    }

    #[test]
    fn test_toggle_hard_filter() {
        let mut c = criteria();
        assert_eq!(c.toggle_hard_filter("Vegetarian"), Ok(true));
        assert!(c.is_filter_active(HardFilter::Vegetarian));
        assert_eq!(c.toggle_hard_filter("Vegetarian"), Ok(false));

        assert_eq!(
            c.toggle_hard_filter("Alcohol"),
            Err(CriteriaError::InvalidFilterKey("Alcohol".to_string()))
        );
    }
}
