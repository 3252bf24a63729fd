//! Address geocoding unit-of-work processor

use serde_json::Value;
use tracing::{debug, warn};

use crate::services::geocoding::Geocoder;
use crate::types::{AddressRecord, FieldUpdate, ADDRESS_LAT_FIELD, ADDRESS_LNG_FIELD};

/// Geocode one free-text address into the residency coordinate fields.
///
/// A lookup miss (or a per-unit provider error) writes the literal (0, 0)
/// rather than omitting the fields, so the record counts as handled either
/// way.
pub async fn process_address(geocoder: &dyn Geocoder, record: AddressRecord) -> FieldUpdate {
    let (lat, lng): (Value, Value) = match geocoder.geocode(&record.address).await {
        Ok(Some(result)) => {
            debug!(
                "geocoded Id={} to ({}, {}): {}",
                record.id, result.coordinates.lat, result.coordinates.lng, result.formatted_address
            );
            (result.coordinates.lat.into(), result.coordinates.lng.into())
        }
        Ok(None) => {
            warn!("unable to geocode address for Id={}: {}", record.id, record.address);
            (0.into(), 0.into())
        }
        Err(e) => {
            warn!("geocoding failed for Id={}: {}", record.id, e);
            (0.into(), 0.into())
        }
    };

    let mut update = FieldUpdate::new(record.id);
    update.set(ADDRESS_LAT_FIELD, lat);
    update.set(ADDRESS_LNG_FIELD, lng);
    update
}
