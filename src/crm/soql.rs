//! SOQL query construction for the two enrichment jobs.

use crate::types::{ADDRESS_FIELD, ADDRESS_LAT_FIELD, ADDRESS_OBJECT, IMAGE_SLOTS, SURVEY_OBJECT};

/// Build the survey work-set query: records with at least one populated image
/// field and every coordinate field still empty. Completeness is tracked at
/// record granularity — once any coordinate field is populated the record no
/// longer matches, so fields missed by partial success are not retried.
pub fn survey_query(limit: usize) -> String {
    let has_image = IMAGE_SLOTS
        .iter()
        .map(|slot| format!("{} != null", slot.url_field))
        .collect::<Vec<_>>()
        .join(" OR ");

    let no_coords = IMAGE_SLOTS
        .iter()
        .flat_map(|slot| {
            [
                format!("{} = null", slot.lat_field),
                format!("{} = null", slot.lng_field),
            ]
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    let fields = IMAGE_SLOTS
        .iter()
        .map(|slot| slot.url_field)
        .collect::<Vec<_>>()
        .join(",");

    let mut query = format!(
        "SELECT Id, {} FROM {} WHERE ({}) AND ({})",
        fields, SURVEY_OBJECT, has_image, no_coords
    );
    if limit > 0 {
        query.push_str(&format!(" LIMIT {}", limit));
    }
    query
}

/// Build the address work-set query. Only the coordinate field is filtered
/// here; a server-side `{address} != null` clause does not reliably match
/// these records, so null addresses are filtered client-side after the fetch.
pub fn address_query() -> String {
    format!(
        "SELECT Id, {} FROM {} WHERE {} = null",
        ADDRESS_FIELD, ADDRESS_OBJECT, ADDRESS_LAT_FIELD
    )
}
