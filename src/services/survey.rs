//! Survey image unit-of-work processor
//!
//! One invocation handles one survey: fetch each populated image slot (or
//! reuse an already-downloaded file), decode its GPS coordinates, and map
//! them into that slot's pair of record fields. A per-slot fetch or decode
//! failure only omits that slot's fields.

use std::path::Path;

use tracing::{info, warn};

use crate::crm::CrmClient;
use crate::services::{exif, fetcher};
use crate::types::{FieldUpdate, SurveyRecord};

pub async fn process_survey(crm: &CrmClient, outdir: &Path, record: SurveyRecord) -> FieldUpdate {
    let mut update = FieldUpdate::new(record.id.clone());

    for (slot, locator) in &record.images {
        let Some(locator) = locator else { continue };

        let filename = format!("{}_{}.jpg", record.id, slot.name);
        let filepath = outdir.join(filename);

        if filepath.exists() {
            info!("skipping extant file for Id={} slot={}", record.id, slot.name);
        } else {
            info!("downloading image for Id={} at URL {}", record.id, locator);
            if let Err(e) = fetcher::download_attachment(crm, locator, &filepath).await {
                warn!(
                    "unable to download file for Id={} slot={}: {}",
                    record.id, slot.name, e
                );
            }
        }

        // Decode whatever is on disk; a failed download decodes to absent.
        let Some(coords) = exif::coords_from_file(&filepath) else {
            continue;
        };
        let (lat, lng) = coords.to_fixed();
        update.set(slot.lat_field, lat);
        update.set(slot.lng_field, lng);
    }

    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::services::exif::encode_gps;

    // 37.422 = 37° 25' 19.2", 122.084 = 122° 5' 2.4"
    const LAT_DMS: [(u32, u32); 3] = [(37, 1), (25, 1), (192, 10)];
    const LNG_DMS: [(u32, u32); 3] = [(122, 1), (5, 1), (24, 10)];

    fn record(row: serde_json::Value) -> SurveyRecord {
        SurveyRecord::from_row(row.as_object().unwrap()).unwrap()
    }

    fn offline_client() -> CrmClient {
        CrmClient::with_session("https://na1.example.com", "token")
    }

    #[tokio::test]
    async fn populated_slots_with_extant_files_produce_their_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("S1_House.jpg"),
            encode_gps(LAT_DMS, "N", LNG_DMS, "W"),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("S1_Token.jpg"),
            encode_gps(LAT_DMS, "S", LNG_DMS, "E"),
        )
        .unwrap();

        let record = record(json!({
            "Id": "S1",
            "Image_House__c": "/servlet/servlet.FileDownload?file=001",
            "Image_Token__c": "/servlet/servlet.FileDownload?file=002",
            "Image_Recipient__c": null,
        }));

        let update = process_survey(&offline_client(), dir.path(), record).await;

        assert_eq!(update.id, "S1");
        assert_eq!(update.fields.len(), 4);
        assert_eq!(
            update.fields.get("Image_House_GPS_Coordinates__Latitude__s"),
            Some(&json!("37.422000"))
        );
        assert_eq!(
            update.fields.get("Image_Token_GPS_Coordinates__Longitude__s"),
            Some(&json!("122.084000"))
        );
        assert!(update
            .fields
            .get("Image_Recipient_GPS_Coordinates__Latitude__s")
            .is_none());
    }

    #[tokio::test]
    async fn expected_update_for_single_house_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("S1_House.jpg"),
            encode_gps(LAT_DMS, "N", LNG_DMS, "W"),
        )
        .unwrap();

        let record = record(json!({
            "Id": "S1",
            "Image_House__c": "http://host/file?file=42",
        }));

        let update = process_survey(&offline_client(), dir.path(), record).await;

        let mut expected = FieldUpdate::new("S1");
        expected.set("Image_House_GPS_Coordinates__Latitude__s", "37.422000");
        expected.set("Image_House_GPS_Coordinates__Longitude__s", "-122.084000");
        assert_eq!(update, expected);
    }

    #[tokio::test]
    async fn undecodable_slot_is_omitted_without_failing_the_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("S1_House.jpg"), b"not an image").unwrap();
        std::fs::write(
            dir.path().join("S1_Token.jpg"),
            encode_gps(LAT_DMS, "N", LNG_DMS, "E"),
        )
        .unwrap();

        let record = record(json!({
            "Id": "S1",
            "Image_House__c": "/x?file=001",
            "Image_Token__c": "/x?file=002",
        }));

        let update = process_survey(&offline_client(), dir.path(), record).await;

        assert_eq!(update.fields.len(), 2);
        assert!(update
            .fields
            .get("Image_House_GPS_Coordinates__Latitude__s")
            .is_none());
    }

    #[tokio::test]
    async fn record_with_no_populated_slots_yields_empty_update() {
        let dir = tempfile::tempdir().unwrap();
        let record = record(json!({ "Id": "S9" }));

        let update = process_survey(&offline_client(), dir.path(), record).await;
        assert!(update.is_empty());
    }
}
