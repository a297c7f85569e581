//! Geospatial index over responder services
//!
//! Holds static registries of responder services (hospitals, police, ...)
//! and ranks them against an origin point by great-circle distance. Three
//! ranking policies are provided: plain k-nearest, radius cutoff, and
//! type-weighted k-nearest. Registries are read-only after load, so the
//! index is safe to share across tasks without synchronization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{LifelineError, Result};

/// Mean Earth radius in kilometers, used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default weight applied to the prioritized category in weighted ranking
pub const DEFAULT_PRIORITY_WEIGHT: f64 = 0.5;

/// A validated latitude/longitude pair in signed degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in signed degrees, -90..90
    pub latitude: f64,
    /// Longitude in signed degrees, -180..180
    pub longitude: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting out-of-range values at the boundary
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
            || latitude.is_nan()
            || longitude.is_nan()
        {
            return Err(LifelineError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Responder service category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    /// Hospital or medical facility
    Hospital,
    /// Police station
    Police,
    /// Fire station
    Fire,
    /// Ambulance service
    Ambulance,
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceCategory::Hospital => write!(f, "hospital"),
            ServiceCategory::Police => write!(f, "police"),
            ServiceCategory::Fire => write!(f, "fire"),
            ServiceCategory::Ambulance => write!(f, "ambulance"),
        }
    }
}

/// A responder service location, loaded once at startup and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceLocation {
    /// Unique within its category
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Service category
    pub category: ServiceCategory,

    /// Location of the service
    pub coordinates: Coordinates,

    /// Contact phone number
    pub phone: String,

    /// Postal address
    pub address: String,
}

/// A service plus its distance from a query origin, created fresh per query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedService {
    /// The underlying service
    pub service: ServiceLocation,

    /// True great-circle distance from the query origin, in kilometers
    pub distance_km: f64,

    /// Human-readable distance, e.g. "850 m" or "3.4 km"
    pub distance_label: String,
}

/// Great-circle distance between two points via the haversine formula
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Format a distance for display: meters under 1 km, one decimal under
/// 10 km, whole kilometers beyond
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as i64)
    } else if km < 10.0 {
        format!("{:.1} km", km)
    } else {
        format!("{:.0} km", km)
    }
}

/// Static registry of responder services with distance-ranked queries
#[derive(Debug, Clone)]
pub struct GeoIndex {
    /// Registries by category, registry order preserved for tie-breaking
    registries: HashMap<ServiceCategory, Vec<ServiceLocation>>,

    /// Ordering weight applied to the prioritized category (< 1.0)
    priority_weight: f64,
}

impl GeoIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            registries: HashMap::new(),
            priority_weight: DEFAULT_PRIORITY_WEIGHT,
        }
    }

    /// Create an index seeded with the built-in service registry
    pub fn with_default_registry() -> Self {
        let mut index = Self::new();
        index.load(default_hospitals());
        index.load(default_police_stations());
        index
    }

    /// Override the weight applied to the prioritized category
    pub fn with_priority_weight(mut self, weight: f64) -> Self {
        self.priority_weight = weight;
        self
    }

    /// The weight applied to the prioritized category
    pub fn priority_weight(&self) -> f64 {
        self.priority_weight
    }

    /// Load services into their category registries, preserving order
    pub fn load(&mut self, services: Vec<ServiceLocation>) {
        for service in services {
            self.registries
                .entry(service.category)
                .or_default()
                .push(service);
        }
    }

    /// Number of registered services in a category
    pub fn registry_len(&self, category: ServiceCategory) -> usize {
        self.registries.get(&category).map_or(0, Vec::len)
    }

    /// The `k` nearest services of a category, ascending by distance.
    ///
    /// Ties are broken by registry order (the sort is stable). Returns
    /// fewer than `k` entries when the registry is smaller; `k == 0`
    /// returns an empty vector.
    pub fn nearest(
        &self,
        origin: Coordinates,
        category: ServiceCategory,
        k: usize,
    ) -> Vec<RankedService> {
        self.ranked(origin, category, None)
            .into_iter()
            .take(k)
            .collect()
    }

    /// All services of a category within `radius_km`, ascending by distance
    pub fn within_radius(
        &self,
        origin: Coordinates,
        category: ServiceCategory,
        radius_km: f64,
    ) -> Vec<RankedService> {
        self.ranked(origin, category, None)
            .into_iter()
            .filter(|ranked| ranked.distance_km <= radius_km)
            .collect()
    }

    /// Like [`nearest`](Self::nearest), but candidates of the prioritized
    /// category sort by `distance * priority_weight`.
    ///
    /// The weight adjusts ordering only; `distance_km` in the result always
    /// reports the true haversine distance, never the weighted score.
    pub fn weighted_nearest(
        &self,
        origin: Coordinates,
        category: ServiceCategory,
        k: usize,
        priority_category: Option<ServiceCategory>,
    ) -> Vec<RankedService> {
        self.ranked(origin, category, priority_category)
            .into_iter()
            .take(k)
            .collect()
    }

    /// Rank every service of a category by (optionally weighted) distance
    fn ranked(
        &self,
        origin: Coordinates,
        category: ServiceCategory,
        priority_category: Option<ServiceCategory>,
    ) -> Vec<RankedService> {
        let Some(registry) = self.registries.get(&category) else {
            return Vec::new();
        };

        let mut candidates: Vec<(f64, RankedService)> = registry
            .iter()
            .map(|service| {
                let distance_km = haversine_km(origin, service.coordinates);
                let weight = match priority_category {
                    Some(priority) if service.category == priority => self.priority_weight,
                    _ => 1.0,
                };
                (
                    distance_km * weight,
                    RankedService {
                        service: service.clone(),
                        distance_km,
                        distance_label: format_distance(distance_km),
                    },
                )
            })
            .collect();

        // Stable sort keeps registry order for equal distances
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        candidates.into_iter().map(|(_, ranked)| ranked).collect()
    }
}

impl Default for GeoIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn service(
    id: &str,
    name: &str,
    category: ServiceCategory,
    latitude: f64,
    longitude: f64,
    phone: &str,
    address: &str,
) -> ServiceLocation {
    ServiceLocation {
        id: id.to_string(),
        name: name.to_string(),
        category,
        coordinates: Coordinates {
            latitude,
            longitude,
        },
        phone: phone.to_string(),
        address: address.to_string(),
    }
}

/// Built-in hospital registry for the Guntur pilot region
pub fn default_hospitals() -> Vec<ServiceLocation> {
    use ServiceCategory::Hospital;
    vec![
        service(
            "h1",
            "NRI General Hospital",
            Hospital,
            16.4537,
            80.5286,
            "+91-8645-230101",
            "Chinakakani, Mangalagiri, Guntur, Andhra Pradesh 522503",
        ),
        service(
            "h2",
            "Ramesh Hospitals",
            Hospital,
            16.3067,
            80.4365,
            "+91-863-2466666",
            "Ring Road, Near ITC, Guntur, Andhra Pradesh 522007",
        ),
        service(
            "h3",
            "Manipal Super Specialty Hospital",
            Hospital,
            16.3146,
            80.4319,
            "+91-863-2233445",
            "Brodipet, Guntur, Andhra Pradesh 522002",
        ),
        service(
            "h4",
            "Government General Hospital",
            Hospital,
            16.2997,
            80.4428,
            "+91-863-2222222",
            "Kothapet, Guntur, Andhra Pradesh 522001",
        ),
        service(
            "h5",
            "Sravani Hospital",
            Hospital,
            16.3201,
            80.4362,
            "+91-863-2233446",
            "Arundelpet, Guntur, Andhra Pradesh 522002",
        ),
    ]
}

/// Built-in police station registry for the Guntur pilot region
pub fn default_police_stations() -> Vec<ServiceLocation> {
    use ServiceCategory::Police;
    vec![
        service(
            "p1",
            "Mangalagiri Police Station",
            Police,
            16.4302,
            80.5687,
            "+91-863-2344000",
            "Mangalagiri, Guntur, Andhra Pradesh 522503",
        ),
        service(
            "p2",
            "Tadepalli Police Station",
            Police,
            16.4822,
            80.6072,
            "+91-863-2222333",
            "Tadepalli, Guntur, Andhra Pradesh 522501",
        ),
        service(
            "p3",
            "Namburu Police Station",
            Police,
            16.3731,
            80.5372,
            "+91-863-2233447",
            "Namburu, Guntur, Andhra Pradesh 522508",
        ),
        service(
            "p4",
            "Pedakakani Police Station",
            Police,
            16.3211,
            80.4972,
            "+91-863-2233448",
            "Pedakakani, Guntur, Andhra Pradesh 522509",
        ),
        service(
            "p5",
            "Guntur Urban Police Station",
            Police,
            16.3067,
            80.4365,
            "+91-863-2233449",
            "Guntur, Andhra Pradesh 522007",
        ),
    ]
}
