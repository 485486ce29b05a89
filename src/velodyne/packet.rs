//! Decodes one Velodyne UDP payload into calibrated points.

use crate::capture::ByteOrder;
use crate::error::Result;
use crate::velodyne::calibration::{Calibration, CalibrationProvider};
use crate::velodyne::consts::{EXPECTED_PAYLOAD_LEN, FIRING_REGION_LEN, FRAME_HEADER_LEN};
use crate::velodyne::model::Model;

/// One calibrated return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub intensity: u8,
}

/// The points decoded from a single packet, plus the packet's model and
/// starting azimuth (the azimuth of its first firing row, in degrees).
#[derive(Debug, Clone)]
pub struct DecodedPacket {
    pub model: Model,
    pub start_azimuth_deg: f64,
    pub timestamp: u32,
    pub points: Vec<Point>,
}

/// Decodes one raw UDP payload captured from a Velodyne sensor.
///
/// Payloads that aren't exactly [`EXPECTED_PAYLOAD_LEN`] bytes (1248) are
/// not Velodyne lidar data packets and are skipped by returning `Ok(None)`.
/// An unrecognized product id is a hard [`Error::UnsupportedModel`].
pub fn decode_packet(
    payload: &[u8],
    byte_order: ByteOrder,
    calibrations: &CalibrationProvider,
) -> Result<Option<DecodedPacket>> {
    if payload.len() != EXPECTED_PAYLOAD_LEN {
        return Ok(None);
    }

    let product_id = payload[payload.len() - 1];
    let model = Model::from_product_id(product_id)?;
    let calibration = calibrations.calibration_for(model)?;

    let firing_region = &payload[FRAME_HEADER_LEN..FRAME_HEADER_LEN + FIRING_REGION_LEN];
    let timestamp_start = FRAME_HEADER_LEN + FIRING_REGION_LEN;
    let timestamp = read_u32(byte_order, &payload[timestamp_start..timestamp_start + 4]);

    let row_len = model.parse_row_len();
    let rows = firing_region.chunks_exact(row_len);

    let mut points = Vec::with_capacity(model.channel_count() * model.tile_multiplier());
    let mut start_azimuth_deg = None;
    let mut point_index = 0usize;

    for row in rows {
        let azimuth_deg = (row[2] as f64 + row[3] as f64 * 256.0) / 100.0;
        if start_azimuth_deg.is_none() {
            start_azimuth_deg = Some(azimuth_deg);
        }

        for triplet in row[4..].chunks_exact(3).take(32) {
            let distance_raw = triplet[0] as f64 + triplet[1] as f64 * 256.0;
            let intensity = triplet[2];
            points.push(decode_point(
                &calibration,
                point_index,
                azimuth_deg,
                distance_raw,
                intensity,
            ));
            point_index += 1;
        }
    }

    // The assembler tracks the *corrected* azimuth of point 0, matching the
    // original's `startAngle = rotationAzimuth[0]` (already rotCorrection-
    // adjusted) rather than the raw wire azimuth.
    let start_azimuth_deg = start_azimuth_deg.unwrap_or(0.0)
        - calibration.rot_correction_rad()[0].to_degrees();

    Ok(Some(DecodedPacket {
        model,
        start_azimuth_deg,
        timestamp,
        points,
    }))
}

fn decode_point(
    calibration: &Calibration,
    index: usize,
    azimuth_deg: f64,
    distance_raw: f64,
    intensity: u8,
) -> Point {
    // For most models a packet's point count matches the tiled calibration
    // length exactly. HDL-64's 300-byte row stride produces fewer points
    // per packet (128) than its tiled arrays (64 channels x 4 = 256), so
    // index with modulo rather than assume an exact match.
    let index = index % calibration.len();
    let distance_m = distance_raw * calibration.dist_scalar() + calibration.dist_correction_m()[index];
    let mut azimuth_rad = azimuth_deg - calibration.rot_correction_rad()[index].to_degrees();
    azimuth_rad = azimuth_rad * std::f64::consts::PI / 180.0;

    let cos_elev = calibration.elevation_cos()[index];
    let sin_elev = calibration.elevation_sin()[index];

    Point {
        x: distance_m * azimuth_rad.sin() * cos_elev,
        y: distance_m * azimuth_rad.cos() * cos_elev,
        z: distance_m * sin_elev,
        intensity,
    }
}

fn read_u32(byte_order: ByteOrder, buf: &[u8]) -> u32 {
    match byte_order {
        ByteOrder::Little => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
        ByteOrder::Big => u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Builds a synthetic payload with every firing row carrying the same
    /// azimuth/distance/intensity, for `row_len`-byte rows and a given
    /// trailing product id.
    fn synthetic_payload(
        product_id: u8,
        row_len: usize,
        azimuth_hundredths: u16,
        distance_raw: u16,
        intensity: u8,
    ) -> Vec<u8> {
        let mut payload = vec![0u8; EXPECTED_PAYLOAD_LEN];
        let firing_region_start = FRAME_HEADER_LEN;

        // Fill every row with the same synthetic azimuth/distance so every
        // channel in the packet gets an identical, easy-to-check point.
        for row_start in (0..FIRING_REGION_LEN).step_by(row_len) {
            let row = &mut payload[firing_region_start + row_start..firing_region_start + row_start + row_len];
            row[2] = (azimuth_hundredths & 0xFF) as u8;
            row[3] = (azimuth_hundredths >> 8) as u8;
            for triplet_index in 0..32 {
                let offset = 4 + triplet_index * 3;
                row[offset] = (distance_raw & 0xFF) as u8;
                row[offset + 1] = (distance_raw >> 8) as u8;
                row[offset + 2] = intensity;
            }
        }

        payload[payload.len() - 1] = product_id;
        payload
    }

    fn synthetic_vlp16_payload(azimuth_hundredths: u16, distance_raw: u16, intensity: u8) -> Vec<u8> {
        synthetic_payload(
            34, // VLP-16 product id
            crate::velodyne::consts::vlp_16::PARSE_ROW_LEN,
            azimuth_hundredths,
            distance_raw,
            intensity,
        )
    }

    #[test]
    fn decodes_90_degree_1_meter_point() {
        // distScalar for VLP-16 is 1/500, so a raw distance of 500 is 1.0 m.
        // Azimuth of 9000 hundredths-of-a-degree is 90 degrees. Channel 0's
        // rotCorrection and distCorrection are both 0, and its vertAngle is
        // -15 degrees, so the point should land in the +y direction scaled
        // by cos(-15deg), with z = sin(-15deg).
        let payload = synthetic_vlp16_payload(9000, 500, 100);
        let calibrations = CalibrationProvider::new();
        let decoded = decode_packet(&payload, ByteOrder::Little, &calibrations)
            .unwrap()
            .unwrap();

        assert_eq!(decoded.model, Model::Vlp16);
        assert!((decoded.start_azimuth_deg - 90.0).abs() < 1e-9);
        // 1200 / 300 = 4 firing rows per packet, 32 triplets per row.
        assert_eq!(decoded.points.len(), 4 * 32);

        let first = decoded.points[0];
        assert!(first.x.abs() < 1e-9, "expected x ~ 0 at 90 degrees, got {}", first.x);
        assert!((first.y - (-15f64).to_radians().cos()).abs() < 1e-6);
        assert!((first.z - (-15f64).to_radians().sin()).abs() < 1e-6);
        assert_eq!(first.intensity, 100);
    }

    #[test]
    fn start_azimuth_is_rotation_corrected_for_non_vlp16_models() {
        // VLP-32c's channel-0 rotCorrection is -1.4 degrees, so the
        // corrected start azimuth is the wire azimuth minus that offset:
        // 90.0 - (-1.4) = 91.4 degrees.
        let payload = synthetic_payload(
            40, // VLP-32c product id
            crate::velodyne::consts::vlp_32c::PARSE_ROW_LEN,
            9000,
            500,
            100,
        );
        let calibrations = CalibrationProvider::new();
        let decoded = decode_packet(&payload, ByteOrder::Little, &calibrations)
            .unwrap()
            .unwrap();

        assert_eq!(decoded.model, Model::Vlp32c);
        assert!(
            (decoded.start_azimuth_deg - 91.4).abs() < 1e-9,
            "expected 91.4, got {}",
            decoded.start_azimuth_deg
        );
    }

    #[test]
    fn timestamp_is_read_from_the_four_bytes_after_the_firing_region() {
        let mut payload = synthetic_vlp16_payload(0, 0, 0);
        let timestamp_start = FRAME_HEADER_LEN + FIRING_REGION_LEN;
        payload[timestamp_start..timestamp_start + 4].copy_from_slice(&0x0011_2233u32.to_le_bytes());

        let calibrations = CalibrationProvider::new();
        let decoded = decode_packet(&payload, ByteOrder::Little, &calibrations)
            .unwrap()
            .unwrap();

        assert_eq!(decoded.timestamp, 0x0011_2233);
    }

    #[test]
    fn non_1248_byte_payload_is_skipped() {
        let calibrations = CalibrationProvider::new();
        let result = decode_packet(&[0u8; 100], ByteOrder::Little, &calibrations).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn unrecognized_product_id_is_fatal() {
        let mut payload = vec![0u8; EXPECTED_PAYLOAD_LEN];
        payload[payload.len() - 1] = 99;
        let calibrations = CalibrationProvider::new();
        let err = decode_packet(&payload, ByteOrder::Little, &calibrations).unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel(99)));
    }
}
