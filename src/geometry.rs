//! ## Geometry & Image Buffer
//!
//! The sole owner of the raw byte image. Every other module reaches the
//! bytes through `ImageBuffer::read_sector`/`write_sector`; nothing else in
//! the crate indexes a `Vec<u8>` directly. This mirrors the way the teacher
//! funnels all track/sector access in `fs::dos3x::mod.rs` through a disk
//! image wrapper rather than letting callers compute byte offsets by hand.

use crate::error::{Addr, Error, Result};
use log::debug;

pub const SECTOR_SIZE: usize = 256;

/// Number of tracks and sectors-per-track for one image. Tracks are
/// addressed `0..tracks`; sectors are addressed `1..=sectors_per_track`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub tracks: u16,
    pub sectors_per_track: u8,
}

impl Geometry {
    pub fn total_sectors(&self) -> usize {
        self.tracks as usize * self.sectors_per_track as usize
    }
}

/// A (track, sector) address. `(0, 0)` is the reserved nil/end-of-chain
/// sentinel and is never a valid addressable sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackSector {
    pub track: u8,
    pub sector: u8,
}

impl TrackSector {
    pub fn new(track: u8, sector: u8) -> Self {
        TrackSector { track, sector }
    }

    pub fn nil() -> Self {
        TrackSector { track: 0, sector: 0 }
    }

    pub fn is_nil(&self) -> bool {
        self.track == 0 && self.sector == 0
    }

    fn to_chunk_index(self, geometry: &Geometry) -> Option<usize> {
        if self.sector == 0 || self.sector as usize > geometry.sectors_per_track as usize {
            return None;
        }
        if self.track as usize >= geometry.tracks as usize {
            return None;
        }
        Some(self.track as usize * geometry.sectors_per_track as usize + (self.sector as usize - 1))
    }
}

/// Owns the entire disk image as a flat byte buffer plus the geometry used
/// to translate (track, sector) addresses into byte offsets. Analogous to
/// the teacher's chunk-addressable image abstraction in `fs/mod.rs`, scaled
/// down to FLEX's single flat addressing mode (no nibbles, no WOZ tracks).
pub struct ImageBuffer {
    data: Vec<u8>,
    geometry: Geometry,
}

impl ImageBuffer {
    /// Allocate a zeroed image of the given geometry.
    pub fn allocate(geometry: Geometry) -> Self {
        ImageBuffer {
            data: vec![0u8; geometry.total_sectors() * SECTOR_SIZE],
            geometry,
        }
    }

    /// Wrap raw bytes read from a file, inferring geometry per the
    /// three-strategy heuristic below.
    pub fn infer(data: Vec<u8>) -> Result<Self> {
        let geometry = infer_geometry(&data)?;
        Ok(ImageBuffer { data, geometry })
    }

    /// Take ownership of raw bytes under an already-known geometry
    /// (used by `FlexDisk::create`, which computes geometry itself).
    pub fn from_parts(data: Vec<u8>, geometry: Geometry) -> Self {
        ImageBuffer { data, geometry }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn read_sector(&self, ts: TrackSector) -> Result<[u8; SECTOR_SIZE]> {
        let idx = ts
            .to_chunk_index(&self.geometry)
            .ok_or(Error::BadAddress(Addr(ts.track, ts.sector)))?;
        let start = idx * SECTOR_SIZE;
        let mut out = [0u8; SECTOR_SIZE];
        out.copy_from_slice(&self.data[start..start + SECTOR_SIZE]);
        Ok(out)
    }

    pub fn write_sector(&mut self, ts: TrackSector, bytes: &[u8; SECTOR_SIZE]) -> Result<()> {
        let idx = ts
            .to_chunk_index(&self.geometry)
            .ok_or(Error::BadAddress(Addr(ts.track, ts.sector)))?;
        let start = idx * SECTOR_SIZE;
        self.data[start..start + SECTOR_SIZE].copy_from_slice(bytes);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Sector (0, 3) holds the SIR at a fixed 16-byte offset; end_track/
/// end_sector live at the tail of the 24-byte record. See `sir.rs`.
const SIR_CHUNK_INDEX: usize = 2;
const SIR_OFFSET_IN_SECTOR: usize = 16;
const SIR_END_TRACK_OFFSET: usize = 22;
const SIR_END_SECTOR_OFFSET: usize = 23;

/// Recover `Geometry` from a raw image when it was not supplied externally.
/// FLEX images carry no universal geometry field a reader can blindly
/// trust, so three independent strategies are tried in order and the first
/// one whose result is internally consistent (`tracks * sectors_per_track *
/// 256 == data.len()`, `tracks >= 1`, `sectors_per_track >= 5`) wins.
fn infer_geometry(data: &[u8]) -> Result<Geometry> {
    if data.len() % SECTOR_SIZE != 0 {
        return Err(Error::BadGeometry);
    }
    let total_sectors = data.len() / SECTOR_SIZE;

    if let Some(g) = try_chain_walk(data, total_sectors) {
        debug!("geometry inferred via chain walk: {:?}", g);
        return Ok(g);
    }
    if let Some(g) = try_longest_run(data, total_sectors) {
        debug!("geometry inferred via longest sector run: {:?}", g);
        return Ok(g);
    }
    if let Some(g) = try_sir_trust(data, total_sectors) {
        debug!("geometry inferred via SIR trust: {:?}", g);
        return Ok(g);
    }
    Err(Error::BadGeometry)
}

fn sector_header(data: &[u8], chunk_index: usize) -> Option<(u8, u8)> {
    let start = chunk_index * SECTOR_SIZE;
    if start + 2 > data.len() {
        return None;
    }
    Some((data[start], data[start + 1]))
}

fn geometry_is_consistent(g: Geometry, data_len: usize) -> bool {
    g.tracks >= 1 && g.sectors_per_track >= 5 && g.total_sectors() * SECTOR_SIZE == data_len
}

/// Strategy 1: walk the directory/sector-link chain starting at the first
/// sector past the SIR, tracking the highest track byte seen in a strictly
/// increasing sequence; T = max+1, and S = total_sectors / T, per the image
/// length rather than the walked run (matching `dskSectors =
/// dskFileSize/dskTracks/SECTOR_SIZE` in the original tools).
fn try_chain_walk(data: &[u8], total_sectors: usize) -> Option<Geometry> {
    if total_sectors <= SIR_CHUNK_INDEX {
        return None;
    }
    let mut max_track = 0u8;
    let mut last_track = 0u8;
    let mut run = 0usize;
    for idx in SIR_CHUNK_INDEX..total_sectors {
        let (t, _s) = sector_header(data, idx)?;
        if t >= last_track {
            run += 1;
            last_track = t;
            if t > max_track {
                max_track = t;
            }
        } else {
            break;
        }
    }
    if run == 0 {
        return None;
    }
    let tracks = max_track as u16 + 1;
    let sectors_per_track = (total_sectors / tracks as usize) as u8;
    let g = Geometry { tracks, sectors_per_track };
    if geometry_is_consistent(g, data.len()) {
        Some(g)
    } else {
        None
    }
}

/// Strategy 2: find the longest run of strictly-consecutive next-sector
/// byte values (byte 1 of each sector header) starting at the first sector
/// past the SIR; the run length is taken as S.
fn try_longest_run(data: &[u8], total_sectors: usize) -> Option<Geometry> {
    if total_sectors <= SIR_CHUNK_INDEX {
        return None;
    }
    let mut best_run = 0usize;
    let mut current_run = 1usize;
    let mut prev: Option<u8> = None;
    for idx in SIR_CHUNK_INDEX..total_sectors {
        let (_t, s) = sector_header(data, idx)?;
        match prev {
            Some(p) if s == p.wrapping_add(1) => current_run += 1,
            _ => current_run = 1,
        }
        if current_run > best_run {
            best_run = current_run;
        }
        prev = Some(s);
    }
    if best_run < 5 {
        return None;
    }
    let sectors_per_track = best_run as u8;
    let tracks = (total_sectors / sectors_per_track as usize) as u16;
    let g = Geometry { tracks, sectors_per_track };
    if geometry_is_consistent(g, data.len()) {
        Some(g)
    } else {
        None
    }
}

/// Strategy 3: trust the SIR's end_track/end_sector fields outright,
/// accepting only plausible values (end_track >= 34, end_sector >= 10) so a
/// corrupt or zeroed SIR does not produce a bogus geometry silently.
fn try_sir_trust(data: &[u8], total_sectors: usize) -> Option<Geometry> {
    if total_sectors <= SIR_CHUNK_INDEX {
        return None;
    }
    let base = SIR_CHUNK_INDEX * SECTOR_SIZE + SIR_OFFSET_IN_SECTOR;
    let end_track = *data.get(base + SIR_END_TRACK_OFFSET)?;
    let end_sector = *data.get(base + SIR_END_SECTOR_OFFSET)?;
    if end_track < 34 || end_sector < 10 {
        return None;
    }
    let g = Geometry {
        tracks: end_track as u16 + 1,
        sectors_per_track: end_sector,
    };
    if geometry_is_consistent(g, data.len()) {
        Some(g)
    } else {
        None
    }
}
