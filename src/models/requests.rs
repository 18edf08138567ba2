use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::core::criteria::SearchCriteria;
use crate::models::domain::HardFilter;

/// Body of `POST /recommend`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(range(min = 0.5, max = 10.0))]
    pub radius_km: f64,
    pub categories: Vec<String>,
    pub user_detail: String,
    /// Every hard filter key, 0 (off) or 1 (on)
    pub filters: BTreeMap<String, u8>,
}

impl From<&SearchCriteria> for RecommendRequest {
    fn from(criteria: &SearchCriteria) -> Self {
        let filters = HardFilter::ALL
            .into_iter()
            .map(|filter| (filter.key().to_string(), u8::from(criteria.is_filter_active(filter))))
            .collect();

        Self {
            lat: criteria.location().latitude(),
            lng: criteria.location().longitude(),
            radius_km: criteria.radius_km(),
            categories: criteria.tags().iter().cloned().collect(),
            user_detail: criteria.free_text().to_string(),
            filters,
        }
    }
}
