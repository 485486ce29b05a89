//! Decodes Velodyne LiDAR packets out of pcap-format capture files and
//! reassembles them into rotation-aligned point clouds.
//!
//! The crate is a two-stage pipeline:
//!
//! 1. [`capture::CaptureReader`] parses the capture-file header and yields
//!    raw packet payloads, independent of what protocol those payloads hold.
//! 2. [`velodyne::VelodyneReader`] filters that payload stream for Velodyne
//!    sensor packets, decodes each one into calibrated 3D points via
//!    [`velodyne::calibration::CalibrationProvider`], and groups consecutive
//!    packets into full 360-degree sweeps.
//!
//! ```no_run
//! use velodyne_capture::capture::CaptureReader;
//! use velodyne_capture::velodyne::VelodyneReader;
//!
//! # fn main() -> velodyne_capture::error::Result<()> {
//! let capture = CaptureReader::open("capture.pcap")?;
//! let reader = VelodyneReader::new(&capture);
//! for cloud in reader {
//!     let cloud = cloud?;
//!     println!("rotation with {} points", cloud.points.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod error;
pub mod velodyne;

pub use error::{Error, Result};
