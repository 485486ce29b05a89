//! Reads the draft-gharris-opsawg-pcap-00 capture file format and yields raw
//! packet payloads.
//!
//! Only the legacy pcap file header is understood (not pcapng); link type 0
//! (loopback) is the only fully-supported link type, but others are accepted
//! with a warning since this crate only ever looks at the payload bytes.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Byte order of a capture file, resolved from its magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Resolution of the per-packet timestamp, resolved from the capture file's
/// magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampUnit {
    Microseconds,
    Nanoseconds,
}

fn read_u16(order: ByteOrder, buf: &[u8]) -> u16 {
    match order {
        ByteOrder::Little => LittleEndian::read_u16(buf),
        ByteOrder::Big => BigEndian::read_u16(buf),
    }
}

fn read_uint(order: ByteOrder, buf: &[u8]) -> u64 {
    match order {
        ByteOrder::Little => LittleEndian::read_uint(buf, buf.len()),
        ByteOrder::Big => BigEndian::read_uint(buf, buf.len()),
    }
}

const FILE_HEADER_LEN: usize = 24;
const PACKET_HEADER_LEN: usize = 16;

/// Parsed capture file header, plus the path used to reopen the file for
/// restartable iteration.
#[derive(Debug, Clone)]
pub struct CaptureReader {
    path: PathBuf,
    byte_order: ByteOrder,
    timestamp_unit: TimestampUnit,
    major_version: u16,
    minor_version: u16,
    snap_len: u32,
    fcs_flags: u8,
    link_type: u32,
    file_size: u64,
}

impl CaptureReader {
    /// Opens `path`, validates the file header, and records its metadata.
    ///
    /// Fails with [`Error::InvalidCaptureMagic`] if the first four bytes
    /// don't match a recognized pcap magic number in either byte order.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;

        let mut header = [0u8; FILE_HEADER_LEN];
        file.read_exact(&mut header)?;

        let (byte_order, timestamp_unit) = match header[0..4] {
            [0xA1, 0xB2, 0xC3, 0xD4] => (ByteOrder::Big, TimestampUnit::Microseconds),
            [0xA1, 0xB2, 0x3C, 0x4D] => (ByteOrder::Big, TimestampUnit::Nanoseconds),
            [0xD4, 0xC3, 0xB2, 0xA1] => (ByteOrder::Little, TimestampUnit::Microseconds),
            [0x4D, 0x3C, 0xB2, 0xA1] => (ByteOrder::Little, TimestampUnit::Nanoseconds),
            other => return Err(Error::InvalidCaptureMagic(other)),
        };

        let major_version = read_u16(byte_order, &header[4..6]);
        let minor_version = read_u16(byte_order, &header[6..8]);
        let snap_len = read_uint(byte_order, &header[16..20]) as u32;
        let fcs_flags = header[20];
        let link_type = read_uint(byte_order, &header[21..24]) as u32;

        if link_type != 0 {
            log::warn!(
                "capture file {} declares link type {link_type}; only loopback (0) is fully tested",
                path.display(),
            );
        }

        let file_size = file.metadata()?.len();

        Ok(Self {
            path,
            byte_order,
            timestamp_unit,
            major_version,
            minor_version,
            snap_len,
            fcs_flags,
            link_type,
            file_size,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn timestamp_unit(&self) -> TimestampUnit {
        self.timestamp_unit
    }

    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn snap_len(&self) -> u32 {
        self.snap_len
    }

    pub fn fcs_flags(&self) -> u8 {
        self.fcs_flags
    }

    pub fn link_type(&self) -> u32 {
        self.link_type
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Returns a restartable iterator over raw packet payloads, always
    /// starting from the first packet after the file header.
    pub fn iter(&self) -> CaptureIter {
        CaptureIter {
            path: self.path.clone(),
            byte_order: self.byte_order,
            file: None,
        }
    }
}

impl<'a> IntoIterator for &'a CaptureReader {
    type Item = Result<Vec<u8>>;
    type IntoIter = CaptureIter;

    fn into_iter(self) -> CaptureIter {
        self.iter()
    }
}

/// Lazy, restartable sequence of raw packet payloads from a capture file.
///
/// Each instance reopens the file on first use rather than sharing a handle
/// with the [`CaptureReader`] that produced it, so multiple iterations never
/// interfere with each other.
pub struct CaptureIter {
    path: PathBuf,
    byte_order: ByteOrder,
    file: Option<File>,
}

impl CaptureIter {
    fn ensure_open(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            let mut file = File::open(&self.path)?;
            file.seek(SeekFrom::Start(FILE_HEADER_LEN as u64))?;
            self.file = Some(file);
        }
        Ok(self.file.as_mut().expect("just opened"))
    }
}

impl Iterator for CaptureIter {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let byte_order = self.byte_order;
        let file = match self.ensure_open() {
            Ok(file) => file,
            Err(err) => return Some(Err(err.into())),
        };

        let mut header = [0u8; PACKET_HEADER_LEN];
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return None,
            Err(err) => return Some(Err(err.into())),
        }

        let captured_length = read_uint(byte_order, &header[8..12]) as usize;
        let mut payload = vec![0u8; captured_length];
        match file.read_exact(&mut payload) {
            Ok(()) => Some(Ok(payload)),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => None,
            Err(err) => Some(Err(err.into())),
        }
    }
}
