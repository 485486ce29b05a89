//! Top-level consumer surface: drives a capture's packet sequence through
//! decoding and rotation assembly, yielding one point cloud per sweep.

use crate::capture::{ByteOrder, CaptureReader};
use crate::error::Result;
use crate::velodyne::calibration::{CalibrationOverrides, CalibrationProvider};
use crate::velodyne::packet::decode_packet;
use crate::velodyne::rotation::{PointCloud, RotationAssembler};

const DEFAULT_MAX_FRAMES_PER_ROTATION: usize = 1200;

/// Iterates a Velodyne capture file, yielding one [`PointCloud`] per
/// detected sensor rotation.
pub struct VelodyneReader {
    byte_order: ByteOrder,
    payloads: Box<dyn Iterator<Item = Result<Vec<u8>>>>,
    calibrations: CalibrationProvider,
    assembler: RotationAssembler,
    lidar_name: Option<&'static str>,
    frames_per_rotation: Option<usize>,
    poisoned: bool,
}

impl VelodyneReader {
    /// Builds a reader over `capture` with the default window size (1200
    /// packets), using factory calibration for every supported model.
    pub fn new(capture: &CaptureReader) -> Self {
        Self::with_capacity(capture, DEFAULT_MAX_FRAMES_PER_ROTATION)
    }

    /// Builds a reader with an explicit `MAX_FRAMES_PER_ROTATION` window.
    pub fn with_capacity(capture: &CaptureReader, max_frames_per_rotation: usize) -> Self {
        Self::with_calibration_overrides(
            capture,
            max_frames_per_rotation,
            CalibrationOverrides::default(),
        )
    }

    /// Builds a reader that uses `overrides` in place of factory
    /// calibration for any model they name.
    pub fn with_calibration_overrides(
        capture: &CaptureReader,
        max_frames_per_rotation: usize,
        overrides: CalibrationOverrides,
    ) -> Self {
        Self {
            byte_order: capture.byte_order(),
            payloads: Box::new(capture.iter()),
            calibrations: CalibrationProvider::with_overrides(overrides),
            assembler: RotationAssembler::new(max_frames_per_rotation),
            lidar_name: None,
            frames_per_rotation: None,
            poisoned: false,
        }
    }

    /// The most recently decoded packet's model name. Meaningful only
    /// after the first yielded cloud.
    pub fn lidar_name(&self) -> Option<&'static str> {
        self.lidar_name
    }

    /// Packet count of the most recently emitted rotation.
    pub fn frames_per_rotation(&self) -> Option<usize> {
        self.frames_per_rotation
    }
}

impl Iterator for VelodyneReader {
    type Item = Result<PointCloud>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }

        loop {
            let payload = match self.payloads.next() {
                Some(Ok(payload)) => payload,
                Some(Err(err)) => {
                    self.poisoned = true;
                    return Some(Err(err));
                }
                None => return None,
            };

            let decoded = match decode_packet(&payload, self.byte_order, &self.calibrations) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => continue,
                Err(err) => {
                    self.poisoned = true;
                    return Some(Err(err));
                }
            };

            self.lidar_name = Some(decoded.model.name());

            if let Some(cloud) = self.assembler.push(decoded) {
                self.frames_per_rotation = Some(cloud.packet_count);
                return Some(Ok(cloud));
            }
        }
    }
}
