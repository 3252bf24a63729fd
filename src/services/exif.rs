//! EXIF GPS coordinate decoding
//!
//! Pure extraction of a (latitude, longitude) pair from the GPS IFD of an
//! image. Any failure — unreadable file, unparseable container, missing GPS
//! tags — decodes to "no coordinates"; nothing here is fatal to the caller.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{Exif, In, Reader, Tag, Value};
use tracing::warn;

use crate::types::Coordinates;

/// GPS fields pulled from the metadata block, one explicit lookup per tag.
/// Each axis is a degrees/minutes/seconds triple plus a hemisphere reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsInfo {
    lat_dms: [f64; 3],
    lat_ref: char,
    lng_dms: [f64; 3],
    lng_ref: char,
}

impl GpsInfo {
    /// Extract the four GPS sub-fields from a parsed metadata block. Any
    /// missing or malformed sub-tag yields `None`.
    pub fn from_exif(exif: &Exif) -> Option<Self> {
        let lat_dms = dms_components(exif, Tag::GPSLatitude)?;
        let lat_ref = hemisphere_ref(exif, Tag::GPSLatitudeRef)?;
        let lng_dms = dms_components(exif, Tag::GPSLongitude)?;
        let lng_ref = hemisphere_ref(exif, Tag::GPSLongitudeRef)?;
        Some(Self {
            lat_dms,
            lat_ref,
            lng_dms,
            lng_ref,
        })
    }

    /// Combine each axis as `deg + min/60 + sec/3600`, negating latitude for
    /// non-northern references and longitude for non-eastern ones.
    pub fn to_coordinates(&self) -> Coordinates {
        let mut lat = to_degrees(self.lat_dms);
        if self.lat_ref != 'N' {
            lat = -lat;
        }
        let mut lng = to_degrees(self.lng_dms);
        if self.lng_ref != 'E' {
            lng = -lng;
        }
        Coordinates { lat, lng }
    }
}

fn to_degrees([deg, min, sec]: [f64; 3]) -> f64 {
    deg + min / 60.0 + sec / 3600.0
}

/// Read a degrees/minutes/seconds triple, converting each rational component
/// via numerator/denominator division.
fn dms_components(exif: &Exif, tag: Tag) -> Option<[f64; 3]> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(parts) if parts.len() >= 3 => {
            Some([parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64()])
        }
        Value::SRational(parts) if parts.len() >= 3 => {
            Some([parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64()])
        }
        _ => None,
    }
}

fn hemisphere_ref(exif: &Exif, tag: Tag) -> Option<char> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(strings) => strings
            .first()
            .and_then(|s| s.first())
            .map(|b| char::from(*b)),
        _ => None,
    }
}

/// Decode coordinates from a parsed metadata block, or `None` when the GPS
/// sub-block is missing or incomplete.
pub fn coords_from_exif(exif: &Exif) -> Option<Coordinates> {
    GpsInfo::from_exif(exif).map(|gps| gps.to_coordinates())
}

/// Decode coordinates from an image file on disk. Unreadable or unparseable
/// files are logged and treated as having no coordinates.
pub fn coords_from_file(path: &Path) -> Option<Coordinates> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!("unable to open image file {}: {}", path.display(), e);
            return None;
        }
    };
    let mut reader = BufReader::new(file);
    match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => coords_from_exif(&exif),
        Err(e) => {
            warn!("unable to parse image file {}: {}", path.display(), e);
            None
        }
    }
}

/// Build a raw Exif block from the given fields (test fixture).
#[cfg(test)]
pub(crate) fn encode_fields(fields: &[exif::Field]) -> Vec<u8> {
    use exif::experimental::Writer;

    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buf = std::io::Cursor::new(Vec::new());
    writer.write(&mut buf, false).expect("write test exif");
    buf.into_inner()
}

/// Build a raw Exif block carrying a full set of GPS fields (test fixture).
#[cfg(test)]
pub(crate) fn encode_gps(
    lat: [(u32, u32); 3],
    lat_ref: &str,
    lng: [(u32, u32); 3],
    lng_ref: &str,
) -> Vec<u8> {
    use exif::{Field, Rational};

    let rational = |parts: [(u32, u32); 3]| {
        Value::Rational(
            parts
                .iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        )
    };
    let ascii = |s: &str| Value::Ascii(vec![s.as_bytes().to_vec()]);

    encode_fields(&[
        Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: rational(lat),
        },
        Field {
            tag: Tag::GPSLatitudeRef,
            ifd_num: In::PRIMARY,
            value: ascii(lat_ref),
        },
        Field {
            tag: Tag::GPSLongitude,
            ifd_num: In::PRIMARY,
            value: rational(lng),
        },
        Field {
            tag: Tag::GPSLongitudeRef,
            ifd_num: In::PRIMARY,
            value: ascii(lng_ref),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::{Field, Rational};

    // 37.422 = 37° 25' 19.2", 122.084 = 122° 5' 2.4"
    const LAT_DMS: [(u32, u32); 3] = [(37, 1), (25, 1), (192, 10)];
    const LNG_DMS: [(u32, u32); 3] = [(122, 1), (5, 1), (24, 10)];

    fn decode(buf: Vec<u8>) -> Option<Coordinates> {
        let exif = Reader::new().read_raw(buf).expect("parse test exif");
        coords_from_exif(&exif)
    }

    #[test]
    fn round_trips_known_coordinates() {
        let coords = decode(encode_gps(LAT_DMS, "N", LNG_DMS, "W")).unwrap();
        let (lat, lng) = coords.to_fixed();
        assert_eq!(lat, "37.422000");
        assert_eq!(lng, "-122.084000");
    }

    #[test]
    fn northern_eastern_references_stay_positive() {
        let coords = decode(encode_gps(LAT_DMS, "N", LNG_DMS, "E")).unwrap();
        assert!(coords.lat > 0.0);
        assert!(coords.lng > 0.0);
    }

    #[test]
    fn southern_western_references_negate() {
        let coords = decode(encode_gps(LAT_DMS, "S", LNG_DMS, "W")).unwrap();
        let (lat, lng) = coords.to_fixed();
        assert_eq!(lat, "-37.422000");
        assert_eq!(lng, "-122.084000");
    }

    #[test]
    fn missing_reference_tag_is_absent() {
        let buf = encode_fields(&[Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![
                Rational { num: 37, denom: 1 },
                Rational { num: 25, denom: 1 },
                Rational { num: 192, denom: 10 },
            ]),
        }]);
        assert!(decode(buf).is_none());
    }

    #[test]
    fn missing_gps_block_is_absent() {
        let buf = encode_fields(&[Field {
            tag: Tag::Make,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"geosync test".to_vec()]),
        }]);
        assert!(decode(buf).is_none());
    }

    #[test]
    fn reads_coordinates_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.jpg");
        std::fs::write(&path, encode_gps(LAT_DMS, "N", LNG_DMS, "W")).unwrap();

        let coords = coords_from_file(&path).unwrap();
        assert_eq!(coords.to_fixed().0, "37.422000");
    }

    #[test]
    fn unparseable_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert!(coords_from_file(&path).is_none());
    }

    #[test]
    fn missing_file_is_absent() {
        assert!(coords_from_file(Path::new("/nonexistent/missing.jpg")).is_none());
    }
}
