//! Work set types
//!
//! One record from the CRM query becomes one unit of enrichment work: either
//! a survey with up to three attached images, or a single free-text address.

use serde_json::{Map, Value};

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Render both axes to exactly six fractional digits, the precision the
    /// coordinate fields are written with.
    pub fn to_fixed(&self) -> (String, String) {
        (format!("{:.6}", self.lat), format!("{:.6}", self.lng))
    }
}

/// One named image role on a survey and the record fields tied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSlot {
    pub name: &'static str,
    /// Field holding the image resource locator
    pub url_field: &'static str,
    pub lat_field: &'static str,
    pub lng_field: &'static str,
}

/// The three image slots a survey carries.
pub const IMAGE_SLOTS: [ImageSlot; 3] = [
    ImageSlot {
        name: "House",
        url_field: "Image_House__c",
        lat_field: "Image_House_GPS_Coordinates__Latitude__s",
        lng_field: "Image_House_GPS_Coordinates__Longitude__s",
    },
    ImageSlot {
        name: "Token",
        url_field: "Image_Token__c",
        lat_field: "Image_Token_GPS_Coordinates__Latitude__s",
        lng_field: "Image_Token_GPS_Coordinates__Longitude__s",
    },
    ImageSlot {
        name: "Recipient",
        url_field: "Image_Recipient__c",
        lat_field: "Image_Recipient_GPS_Coordinates__Latitude__s",
        lng_field: "Image_Recipient_GPS_Coordinates__Longitude__s",
    },
];

/// Survey object and its address-variant counterpart
pub const SURVEY_OBJECT: &str = "Survey_Attempt__c";
pub const ADDRESS_OBJECT: &str = "US_Disaster_Project_Specific_Data__c";

/// Address source field and its coordinate output fields
pub const ADDRESS_FIELD: &str = "Full_Residency_Address__c";
pub const ADDRESS_LAT_FIELD: &str = "Residency_Addr_GPS_Coordinates__Latitude__s";
pub const ADDRESS_LNG_FIELD: &str = "Residency_Addr_GPS_Coordinates__Longitude__s";

/// One survey needing coordinate extraction: the record id plus the locator
/// (if any) for each image slot, in `IMAGE_SLOTS` order.
#[derive(Debug, Clone)]
pub struct SurveyRecord {
    pub id: String,
    pub images: Vec<(ImageSlot, Option<String>)>,
}

impl SurveyRecord {
    /// Materialize a work item from one query row. Returns `None` when the
    /// row has no `Id` (malformed query result).
    pub fn from_row(row: &Map<String, Value>) -> Option<Self> {
        let id = row.get("Id")?.as_str()?.to_string();
        let images = IMAGE_SLOTS
            .iter()
            .map(|slot| {
                let url = row
                    .get(slot.url_field)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                (*slot, url)
            })
            .collect();
        Some(Self { id, images })
    }
}

/// One record needing address geocoding.
#[derive(Debug, Clone)]
pub struct AddressRecord {
    pub id: String,
    pub address: String,
}

impl AddressRecord {
    /// Materialize a work item from one query row. Rows without an `Id` or
    /// with a null/empty address field yield `None` and are filtered out by
    /// the caller.
    pub fn from_row(row: &Map<String, Value>) -> Option<Self> {
        let id = row.get("Id")?.as_str()?.to_string();
        let address = row
            .get(ADDRESS_FIELD)?
            .as_str()
            .filter(|s| !s.is_empty())?
            .to_string();
        Some(Self { id, address })
    }
}
