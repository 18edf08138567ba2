use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::criteria::CriteriaError;

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside [-90, 90] x [-180, 180]
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CriteriaError> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lng_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);

        if !lat_ok || !lng_ok {
            return Err(CriteriaError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// A recommended store, as returned by the recommendation service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    pub name: String,
    pub location: Coordinate,
}

/// Geospatial bounding box, used to fit the map viewport around the circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Boolean must-have amenity flags understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HardFilter {
    BusinessParking,
    RestaurantsGoodForGroups,
    GoodForKids,
    DineIn,
    Vegetarian,
}

impl HardFilter {
    pub const ALL: [HardFilter; 5] = [
        HardFilter::BusinessParking,
        HardFilter::RestaurantsGoodForGroups,
        HardFilter::GoodForKids,
        HardFilter::DineIn,
        HardFilter::Vegetarian,
    ];

    /// Wire key used in the request `filters` object
    pub fn key(&self) -> &'static str {
        match self {
            HardFilter::BusinessParking => "BusinessParking",
            HardFilter::RestaurantsGoodForGroups => "RestaurantsGoodForGroups",
            HardFilter::GoodForKids => "GoodForKids",
            HardFilter::DineIn => "DineIn",
            HardFilter::Vegetarian => "Vegetarian",
        }
    }
}

impl fmt::Display for HardFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for HardFilter {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HardFilter::ALL
            .into_iter()
            .find(|filter| filter.key() == s)
            .ok_or_else(|| CriteriaError::InvalidFilterKey(s.to_string()))
    }
}
