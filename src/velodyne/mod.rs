//! Velodyne sensor decoding: model identification, calibration, per-packet
//! decode, and rotation assembly.

pub mod calibration;
pub mod consts;
pub mod model;
pub mod packet;
pub mod reader;
pub mod rotation;

pub use calibration::{Calibration, CalibrationOverrides, CalibrationProvider, ModelOverride};
pub use model::Model;
pub use packet::{decode_packet, DecodedPacket, Point};
pub use reader::VelodyneReader;
pub use rotation::{PointCloud, RotationAssembler};
