//! ## SIR Manager
//!
//! The System Information Record lives at a fixed 24-byte offset inside
//! track 0 sector 3. `Sir` is a `#[derive(DiskStruct)]` packed struct, the
//! same derivation the teacher uses for `VTOC`/`TrackSectorList` in
//! `dos33::mod` and `fs::dos3x::types` — "spares us having to manually write
//! code to copy bytes in and out for every new structure" as the teacher's
//! own comment puts it. 16-bit fields are stored as `[u8; 2]` and converted
//! through explicit big-endian helpers rather than a native `u16`, so the
//! struct's byte layout never depends on the host's endianness.

use crate::error::Result;
use crate::geometry::{Geometry, ImageBuffer, TrackSector};
use a2kit_macro::DiskStruct;
use a2kit_macro_derive::DiskStruct;
use log::warn;

pub const SIR_ADDR: TrackSector = TrackSector { track: 0, sector: 3 };
pub const SIR_OFFSET: usize = 16;
pub const SIR_SIZE: usize = 24;

#[derive(DiskStruct, Clone, Debug)]
pub struct Sir {
    pub label: [u8; 11],
    pub vol_number: [u8; 2],
    pub first_free_track: u8,
    pub first_free_sector: u8,
    pub last_free_track: u8,
    pub last_free_sector: u8,
    pub free_count: [u8; 2],
    pub month: u8,
    pub day: u8,
    pub year: u8,
    pub end_track: u8,
    pub end_sector: u8,
}

impl Sir {
    pub fn vol_number(&self) -> u16 {
        u16::from_be_bytes(self.vol_number)
    }
    pub fn set_vol_number(&mut self, v: u16) {
        self.vol_number = v.to_be_bytes();
    }
    pub fn free_count(&self) -> u16 {
        u16::from_be_bytes(self.free_count)
    }
    pub fn set_free_count(&mut self, v: u16) {
        self.free_count = v.to_be_bytes();
    }
    pub fn first_free(&self) -> TrackSector {
        TrackSector::new(self.first_free_track, self.first_free_sector)
    }
    pub fn set_first_free(&mut self, ts: TrackSector) {
        self.first_free_track = ts.track;
        self.first_free_sector = ts.sector;
    }
    pub fn last_free(&self) -> TrackSector {
        TrackSector::new(self.last_free_track, self.last_free_sector)
    }
    pub fn set_last_free(&mut self, ts: TrackSector) {
        self.last_free_track = ts.track;
        self.last_free_sector = ts.sector;
    }
    pub fn geometry(&self) -> Geometry {
        Geometry {
            tracks: self.end_track as u16 + 1,
            sectors_per_track: self.end_sector,
        }
    }
    pub fn label(&self) -> String {
        String::from_utf8_lossy(&self.label).trim_end().to_string()
    }
    pub fn set_label(&mut self, s: &str) {
        let mut bytes = [b' '; 11];
        for (i, b) in s.as_bytes().iter().take(11).enumerate() {
            bytes[i] = *b;
        }
        self.label = bytes;
    }
}

/// Loads, mutates, and persists the `Sir` struct within its owning sector.
/// Holds no state of its own; every associated function is explicit about
/// which buffer and record it touches, matching the "managers hold
/// non-owning views onto the image buffer" rule.
pub struct SirManager;

impl SirManager {
    pub fn load(img: &ImageBuffer) -> Result<Sir> {
        let sector = img.read_sector(SIR_ADDR)?;
        Ok(Sir::from_bytes(&sector[SIR_OFFSET..SIR_OFFSET + SIR_SIZE].to_vec()))
    }

    pub fn persist(img: &mut ImageBuffer, sir: &Sir) -> Result<()> {
        let mut sector = img.read_sector(SIR_ADDR)?;
        sector[SIR_OFFSET..SIR_OFFSET + SIR_SIZE].copy_from_slice(&sir.to_bytes());
        img.write_sector(SIR_ADDR, &sector)
    }

    pub fn set_free_list_head(img: &mut ImageBuffer, sir: &mut Sir, ts: TrackSector) -> Result<()> {
        sir.set_first_free(ts);
        Self::persist(img, sir)
    }

    pub fn decrement_free_count(img: &mut ImageBuffer, sir: &mut Sir) -> Result<()> {
        sir.set_free_count(sir.free_count().saturating_sub(1));
        Self::persist(img, sir)
    }

    pub fn increment_free_count(img: &mut ImageBuffer, sir: &mut Sir, n: u16) -> Result<()> {
        sir.set_free_count(sir.free_count() + n);
        Self::persist(img, sir)
    }

    /// Stamps a new creation date. Out-of-range month/day are logged and
    /// stored unvalidated rather than rejected outright, per the engine's
    /// non-fatal date-handling convention.
    pub fn set_creation_date(img: &mut ImageBuffer, sir: &mut Sir, month: u8, day: u8, year_mod_100: u8) -> Result<()> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            warn!("creation date {}/{}/{} is out of the expected range", month, day, year_mod_100);
        }
        sir.month = month;
        sir.day = day;
        sir.year = year_mod_100;
        Self::persist(img, sir)
    }
}

/// Builds a fresh SIR sector for a newly created volume. `free_head`/
/// `free_tail`/`free_count` are filled in afterward once the free-list
/// manager has threaded the data region.
pub fn new_sir(label: &str, vol_number: u16, geometry: Geometry, month: u8, day: u8, year_mod_100: u8) -> Sir {
    let mut sir = Sir::new();
    sir.set_label(label);
    sir.set_vol_number(vol_number);
    sir.month = month;
    sir.day = day;
    sir.year = year_mod_100;
    sir.end_track = (geometry.tracks - 1) as u8;
    sir.end_sector = geometry.sectors_per_track;
    sir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut sir = new_sir("TESTVOL", 1, Geometry { tracks: 35, sectors_per_track: 18 }, 7, 28, 26);
        sir.set_free_count(400);
        sir.set_first_free(TrackSector::new(1, 1));
        let bytes = sir.to_bytes();
        assert_eq!(bytes.len(), SIR_SIZE);
        let back = Sir::from_bytes(&bytes);
        assert_eq!(back.free_count(), 400);
        assert_eq!(back.first_free(), TrackSector::new(1, 1));
        assert_eq!(back.label(), "TESTVOL");
    }

    #[test]
    fn persists_into_its_sector() {
        let mut img = ImageBuffer::allocate(Geometry { tracks: 35, sectors_per_track: 18 });
        let mut sir = new_sir("TESTVOL", 1, Geometry { tracks: 35, sectors_per_track: 18 }, 7, 28, 26);
        SirManager::persist(&mut img, &sir).unwrap();
        let reloaded = SirManager::load(&img).unwrap();
        assert_eq!(reloaded.label(), "TESTVOL");
        SirManager::set_free_list_head(&mut img, &mut sir, TrackSector::new(2, 1)).unwrap();
        let reloaded = SirManager::load(&img).unwrap();
        assert_eq!(reloaded.first_free(), TrackSector::new(2, 1));
    }

    #[test]
    fn geometry_from_end_fields() {
        let sir = new_sir("X", 1, Geometry { tracks: 35, sectors_per_track: 18 }, 1, 1, 1);
        let g = sir.geometry();
        assert_eq!(g.tracks, 35);
        assert_eq!(g.sectors_per_track, 18);
    }
}
