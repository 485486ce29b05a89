//! Groups decoded packets into full-rotation point clouds by watching for
//! the azimuth wraparound at the end of each sweep.

use crate::velodyne::packet::{DecodedPacket, Point};
use std::collections::VecDeque;

const ANGLE_TOLERANCE_DEG: f64 = 0.01;

/// One completed sweep: every point decoded from the packets between two
/// azimuth wraparounds, in packet arrival order.
#[derive(Debug, Clone)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub packet_count: usize,
}

/// Bounded sliding window over recent packets, emitting a [`PointCloud`]
/// each time it observes a full 360-degree sweep.
pub struct RotationAssembler {
    max_frames_per_rotation: usize,
    batches: VecDeque<Vec<Point>>,
    azimuths: VecDeque<f64>,
    wraparound_detected: bool,
}

impl RotationAssembler {
    pub fn new(max_frames_per_rotation: usize) -> Self {
        Self {
            max_frames_per_rotation,
            batches: VecDeque::with_capacity(max_frames_per_rotation),
            azimuths: VecDeque::with_capacity(max_frames_per_rotation),
            wraparound_detected: false,
        }
    }

    /// Feeds one decoded packet into the window. Returns `Some` with the
    /// completed rotation if this packet closed a full sweep.
    pub fn push(&mut self, packet: DecodedPacket) -> Option<PointCloud> {
        if self.batches.len() == self.max_frames_per_rotation {
            self.batches.pop_front();
            self.azimuths.pop_front();
        }

        let azimuth = packet.start_azimuth_deg;
        self.batches.push_back(packet.points);
        self.azimuths.push_back(azimuth);

        if self.azimuths.len() >= 2 {
            let previous = self.azimuths[self.azimuths.len() - 2];
            let current = self.azimuths[self.azimuths.len() - 1];
            if previous > current {
                self.wraparound_detected = true;
            }
        }

        let queue_len = self.azimuths.len();
        let first = self.azimuths.front().copied().unwrap_or(0.0);
        let last = self.azimuths.back().copied().unwrap_or(0.0);

        if queue_len > 20 && self.wraparound_detected && last + ANGLE_TOLERANCE_DEG > first {
            let packet_count = self.batches.len();
            let points = self.batches.drain(..).flatten().collect();
            self.azimuths.clear();
            self.wraparound_detected = false;
            return Some(PointCloud {
                points,
                packet_count,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_azimuth(azimuth_deg: f64) -> DecodedPacket {
        DecodedPacket {
            model: crate::velodyne::model::Model::Vlp16,
            start_azimuth_deg: azimuth_deg,
            timestamp: 0,
            points: vec![Point {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                intensity: 0,
            }],
        }
    }

    #[test]
    fn no_emission_before_wraparound() {
        let mut assembler = RotationAssembler::new(1200);
        for azimuth in (0..30).map(|i| i as f64 * 10.0) {
            assert!(assembler.push(packet_with_azimuth(azimuth)).is_none());
        }
    }

    #[test]
    fn emits_as_soon_as_wraparound_crosses_the_first_queued_azimuth() {
        // The emission condition compares against the *front* of the
        // window, so a wraparound fires on the very next packet once the
        // azimuth climbs back past whatever value entered the queue first.
        let mut assembler = RotationAssembler::new(1200);
        let mut emitted = None;
        for i in 0..25 {
            let azimuth = i as f64 * 15.0; // 0, 15, ..., 360
            assert!(assembler.push(packet_with_azimuth(azimuth)).is_none());
        }
        // 360 -> 1.0 is a decrease (wraparound), and 1.0 + tolerance already
        // exceeds the queue's first azimuth (0.0).
        if let Some(cloud) = assembler.push(packet_with_azimuth(1.0)) {
            emitted = Some(cloud);
        }
        let cloud = emitted.expect("expected a rotation to be emitted");
        assert_eq!(cloud.packet_count, 26);
    }

    #[test]
    fn queues_reset_after_emission() {
        let mut assembler = RotationAssembler::new(1200);
        for i in 0..25 {
            assembler.push(packet_with_azimuth(i as f64 * 15.0));
        }
        let first = assembler.push(packet_with_azimuth(1.0));
        assert!(first.is_some());

        // Immediately after emission the window is empty, so a lone
        // decreasing azimuth cannot itself trigger another emission.
        assert!(assembler.push(packet_with_azimuth(0.5)).is_none());
    }

    #[test]
    fn residual_queue_is_discarded_without_emission() {
        let mut assembler = RotationAssembler::new(1200);
        for azimuth in [10.0, 20.0, 5.0] {
            assembler.push(packet_with_azimuth(azimuth));
        }
        // Dropping the assembler here should not panic or emit; there is
        // nothing further to assert since the queue is simply dropped.
    }
}
