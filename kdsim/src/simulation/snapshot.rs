//! Binary snapshots of the full particle store
//!
//! Layout: a postcard-encoded header (magic, format version, dimension) followed
//! by a postcard-encoded body (tick, time, one flat record per particle).
//! Floats are stored as raw little-endian bits, so a load of a dump is
//! bit-identical to the state that was dumped.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Result, SimError};
use super::states::Particle;

const MAGIC: [u8; 4] = *b"KDSN";
const VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u16,
    dimension: u32,
}

/// Persisted state: every particle plus the tick and time it was taken at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<const D: usize> {
    pub tick: u64,
    pub time: f64,
    pub particles: Vec<Particle<D>>,
}

impl<const D: usize> Snapshot<D> {
    /// Encode to bytes
    pub fn dump(&self) -> Result<Vec<u8>> {
        let header = Header {
            magic: MAGIC,
            version: VERSION,
            dimension: D as u32,
        };
        let mut bytes = postcard::to_stdvec(&header)?;
        bytes.extend(postcard::to_stdvec(self)?);
        Ok(bytes)
    }

    /// Decode bytes produced by [`Snapshot::dump`] with the same dimension
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let (header, body): (Header, &[u8]) = postcard::take_from_bytes(bytes)?;
        if header.magic != MAGIC {
            return Err(SimError::SnapshotFormat("not a snapshot file".into()));
        }
        if header.version != VERSION {
            return Err(SimError::SnapshotFormat(format!(
                "unsupported snapshot version {}",
                header.version
            )));
        }
        if header.dimension as usize != D {
            return Err(SimError::SnapshotFormat(format!(
                "snapshot has dimension {}, expected {D}",
                header.dimension
            )));
        }
        let (snapshot, rest): (Self, &[u8]) = postcard::take_from_bytes(body)?;
        if !rest.is_empty() {
            return Err(SimError::SnapshotFormat(format!(
                "{} trailing bytes after snapshot body",
                rest.len()
            )));
        }
        Ok(snapshot)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.dump()?)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::load(&bytes)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }
}

/// Dimension recorded in a snapshot, without decoding the body
pub fn snapshot_dimension(bytes: &[u8]) -> Result<usize> {
    let (header, _): (Header, &[u8]) = postcard::take_from_bytes(bytes)?;
    if header.magic != MAGIC {
        return Err(SimError::SnapshotFormat("not a snapshot file".into()));
    }
    Ok(header.dimension as usize)
}
