//! Check-in location compliance.
//!
//! Never blocks a check-in: an out-of-radius or unverifiable location only
//! raises `warn`, so GPS noise cannot cost anyone an attendance record.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::WorkProfile;
use crate::model::site::Site;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    #[schema(example = 48.8584)]
    pub latitude: f64,
    #[schema(example = 2.2945)]
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both parts or nothing; a half-filled or out-of-range pair counts as missing.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon))
                if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) =>
            {
                Some(Self::new(lat, lon))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceReason {
    MobileProfile,
    LocationMissing,
    NoAssignedSite,
    SiteUnlocated,
    WithinRadius,
    OutsideRadius,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeofenceVerdict {
    pub compliant: bool,
    /// Meters, rounded; only set when both ends were known.
    pub distance_m: Option<u32>,
    pub warn: bool,
    pub reason: GeofenceReason,
}

impl GeofenceVerdict {
    fn pass(reason: GeofenceReason, warn: bool) -> Self {
        Self {
            compliant: true,
            distance_m: None,
            warn,
            reason,
        }
    }

    /// Sentence to append to a check-in reply, if the verdict deserves one.
    pub fn warning_text(&self) -> Option<String> {
        if !self.warn {
            return None;
        }
        Some(match self.reason {
            GeofenceReason::LocationMissing => {
                "Location missing: check-in recorded provisionally.".to_string()
            }
            GeofenceReason::NoAssignedSite => {
                "No site is assigned to you: location could not be verified.".to_string()
            }
            GeofenceReason::OutsideRadius => format!(
                "You are {} m away from your site: check-in flagged.",
                self.distance_m.unwrap_or_default()
            ),
            _ => "Check-in flagged.".to_string(),
        })
    }
}

/// Great-circle distance in meters, rounded to the nearest meter.
pub fn haversine_distance(from: Coordinate, to: Coordinate) -> u32 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    (EARTH_RADIUS_M * c).round() as u32
}

pub fn evaluate(
    profile: WorkProfile,
    user: Option<Coordinate>,
    site: Option<&Site>,
) -> GeofenceVerdict {
    if profile == WorkProfile::Mobile {
        return GeofenceVerdict::pass(GeofenceReason::MobileProfile, false);
    }
    let Some(user) = user else {
        return GeofenceVerdict::pass(GeofenceReason::LocationMissing, true);
    };
    let Some(site) = site else {
        return GeofenceVerdict::pass(GeofenceReason::NoAssignedSite, true);
    };
    let Some(site_coord) = Coordinate::from_parts(site.latitude, site.longitude) else {
        return GeofenceVerdict::pass(GeofenceReason::SiteUnlocated, false);
    };

    let distance = haversine_distance(user, site_coord);
    let outside = distance > site.effective_radius();
    GeofenceVerdict {
        compliant: true,
        distance_m: Some(distance),
        warn: outside,
        reason: if outside {
            GeofenceReason::OutsideRadius
        } else {
            GeofenceReason::WithinRadius
        },
    }
}
