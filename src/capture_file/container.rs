use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};

use crate::error_handling::types::ContainerError;

/// Magic number opening every capture file this crate writes (native byte order).
pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
pub const PCAP_VERSION_MAJOR: u16 = 2;
pub const PCAP_VERSION_MINOR: u16 = 4;
pub const PCAP_SNAPLEN: u32 = 1500;
pub const LINKTYPE_ETHERNET: u32 = 1;

/// File header written once at the start of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalHeader {
    pub magic_number: u32,
    pub version_major: u16,
    pub version_minor: u16,
    /// GMT to local correction.
    pub thiszone: i32,
    /// Accuracy of timestamps.
    pub sigfigs: u32,
    pub snaplen: u32,
    /// Data link type.
    pub network: u32,
}

impl GlobalHeader {
    pub const LEN: usize = 24;

    /// The header for an Ethernet capture with a 1500 byte snapshot length.
    pub fn ethernet() -> Self {
        Self {
            magic_number: PCAP_MAGIC,
            version_major: PCAP_VERSION_MAJOR,
            version_minor: PCAP_VERSION_MINOR,
            thiszone: 0,
            sigfigs: 0,
            snaplen: PCAP_SNAPLEN,
            network: LINKTYPE_ETHERNET,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.magic_number.to_ne_bytes());
        buf[4..6].copy_from_slice(&self.version_major.to_ne_bytes());
        buf[6..8].copy_from_slice(&self.version_minor.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.thiszone.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.sigfigs.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.snaplen.to_ne_bytes());
        buf[20..24].copy_from_slice(&self.network.to_ne_bytes());
        buf
    }

    fn magic_of(buf: &[u8; Self::LEN]) -> u32 {
        u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]])
    }
}

/// Per-frame record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub ts_sec: u32,
    pub ts_usec: u32,
    /// Number of octets of the frame saved in the file.
    pub incl_len: u32,
    /// Actual length of the frame.
    pub orig_len: u32,
}

impl RecordHeader {
    pub const LEN: usize = 16;

    pub fn new(timestamp: DateTime<Utc>, frame_len: usize) -> Self {
        let len = frame_len as u32;
        Self {
            ts_sec: timestamp.timestamp() as u32,
            ts_usec: timestamp.timestamp_subsec_micros(),
            incl_len: len,
            orig_len: len,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.ts_sec.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.ts_usec.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.incl_len.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.orig_len.to_ne_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; Self::LEN]) -> Self {
        let word = |i: usize| u32::from_ne_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        Self {
            ts_sec: word(0),
            ts_usec: word(4),
            incl_len: word(8),
            orig_len: word(12),
        }
    }
}

/// A read-write, seekable handle that can also be cut back to zero length.
pub trait CaptureHandle: Read + Write + Seek {
    fn truncate(&mut self) -> std::io::Result<()>;
}

impl CaptureHandle for File {
    fn truncate(&mut self) -> std::io::Result<()> {
        self.set_len(0)
    }
}

impl CaptureHandle for Cursor<Vec<u8>> {
    fn truncate(&mut self) -> std::io::Result<()> {
        self.get_mut().clear();
        self.set_position(0);
        Ok(())
    }
}

/// A capture file positioned for appending records.
///
/// The handle is owned exclusively; appends perform an unsynchronised
/// header-then-frame write sequence, so sharing a file between connections
/// requires an external lock (see [`crate::sink::SharedCapture`]).
#[derive(Debug)]
pub struct CaptureFile<H: CaptureHandle = File> {
    handle: H,
    records: u64,
}

impl CaptureFile<File> {
    /// Opens (or creates) the file at `path` without truncating it and
    /// prepares it for appending.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(ContainerError::Open)?;
        let capture = Self::open(file)?;
        info!("Capture file ready at {}", path.display());
        Ok(capture)
    }
}

impl<H: CaptureHandle> CaptureFile<H> {
    /// Establishes the capture state of `handle`.
    ///
    /// - Empty: the global header is written.
    /// - Starts with the capture magic: positioned at end-of-file, prior
    ///   content untouched. Version and other header fields are not checked.
    /// - Anything else: truncated to zero, then the global header is written.
    ///
    /// # Errors
    /// Any failing seek, read, write or truncate. A non-empty file shorter
    /// than the global header fails with [`ContainerError::Read`]. On error the
    /// handle position is unspecified.
    pub fn open(mut handle: H) -> Result<Self, ContainerError> {
        let size = handle
            .seek(SeekFrom::End(0))
            .map_err(ContainerError::Seek)?;

        if size > 0 {
            handle
                .seek(SeekFrom::Start(0))
                .map_err(ContainerError::Seek)?;
            let mut buf = [0u8; GlobalHeader::LEN];
            handle.read_exact(&mut buf).map_err(ContainerError::Read)?;

            if GlobalHeader::magic_of(&buf) == PCAP_MAGIC {
                handle.seek(SeekFrom::End(0)).map_err(ContainerError::Seek)?;
                debug!("Appending to existing capture of {} bytes", size);
                return Ok(Self { handle, records: 0 });
            }

            warn!(
                "Capture file lacks pcap magic, discarding {} bytes of prior content",
                size
            );
            handle
                .seek(SeekFrom::Start(0))
                .map_err(ContainerError::Seek)?;
            handle.truncate().map_err(ContainerError::Truncate)?;
        }

        handle
            .write_all(&GlobalHeader::ethernet().to_bytes())
            .map_err(ContainerError::Write)?;
        debug!("Wrote capture global header");
        Ok(Self { handle, records: 0 })
    }

    /// Appends `frame` stamped with the current time.
    pub fn append(&mut self, frame: &[u8]) -> Result<(), ContainerError> {
        self.append_at(Utc::now(), frame)
    }

    /// Appends `frame` with an explicit capture timestamp.
    pub fn append_at(&mut self, timestamp: DateTime<Utc>, frame: &[u8]) -> Result<(), ContainerError> {
        let header = RecordHeader::new(timestamp, frame.len());
        self.handle
            .write_all(&header.to_bytes())
            .map_err(ContainerError::Write)?;
        self.handle.write_all(frame).map_err(ContainerError::Write)?;
        self.records += 1;
        trace!("Appended capture record of {} bytes", frame.len());
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ContainerError> {
        self.handle.flush().map_err(ContainerError::Write)
    }

    /// Number of records appended through this value.
    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn get_ref(&self) -> &H {
        &self.handle
    }

    pub fn into_inner(self) -> H {
        self.handle
    }
}
