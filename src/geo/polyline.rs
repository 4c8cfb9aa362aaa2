//! Encoded-polyline codec (the 1e-5 precision format OSRM and most
//! directions services emit for route geometry).

use thiserror::Error;

use crate::models::transport::GeoPoint;

const PRECISION: f64 = 1e5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolylineError {
    #[error("polyline truncated mid-coordinate at byte {0}")]
    Truncated(usize),

    #[error("invalid polyline byte {byte:#04x} at offset {index}")]
    InvalidByte { byte: u8, index: usize },
}

pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat = 0_i64;
    let mut lng = 0_i64;

    while index < bytes.len() {
        let (delta_lat, next) = decode_value(bytes, index)?;
        let (delta_lng, next) = decode_value(bytes, next)?;
        index = next;

        lat += delta_lat;
        lng += delta_lng;
        points.push(GeoPoint {
            lat: lat as f64 / PRECISION,
            lng: lng as f64 / PRECISION,
        });
    }

    Ok(points)
}

pub fn encode(points: &[GeoPoint]) -> String {
    let mut out = String::new();
    let mut prev_lat = 0_i64;
    let mut prev_lng = 0_i64;

    for point in points {
        let lat = (point.lat * PRECISION).round() as i64;
        let lng = (point.lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn decode_value(bytes: &[u8], mut index: usize) -> Result<(i64, usize), PolylineError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(index) else {
            return Err(PolylineError::Truncated(index));
        };
        if !(63..=126).contains(&byte) || shift > 58 {
            return Err(PolylineError::InvalidByte { byte, index });
        }

        let chunk = u64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        index += 1;

        if chunk < 0x20 {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1) as i64
    } else {
        (result >> 1) as i64
    };

    Ok((value, index))
}

fn encode_value(value: i64, out: &mut String) {
    let mut zigzag = if value < 0 {
        !((value as u64) << 1)
    } else {
        (value as u64) << 1
    };

    loop {
        let mut chunk = (zigzag & 0x1f) as u8;
        zigzag >>= 5;
        if zigzag != 0 {
            chunk |= 0x20;
        }
        out.push(char::from(chunk + 63));
        if zigzag == 0 {
            break;
        }
    }
}
