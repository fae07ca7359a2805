//! ## Directory Manager
//!
//! The directory is a chain of sectors starting at track 0 sector 5, each
//! holding ten fixed 24-byte entries at offsets 16, 40, .., 232. Walking,
//! enumerating, inserting, deleting, and repacking entries are all built on
//! the same `walk` primitive, the way the teacher's `fs::prodos::directory`
//! module centers its catalog/`modify` logic on one chain walker over
//! `DirectoryBlock`s.

use crate::error::{Addr, Error, Result};
use crate::geometry::{ImageBuffer, TrackSector, SECTOR_SIZE};
use a2kit_macro::DiskStruct;
use a2kit_macro_derive::DiskStruct;
use colored::Colorize;
use std::collections::HashSet;
use std::fmt;

pub const DIR_START: TrackSector = TrackSector { track: 0, sector: 5 };
pub const DIR_ENTRY_SIZE: usize = 24;
pub const DIR_ENTRIES_PER_SECTOR: usize = 10;
pub const DIR_FIRST_ENTRY_OFFSET: usize = 16;

/// One 24-byte on-disk directory record. Status lives in `name[0]`: `0x00`
/// is an empty/never-used slot, a set high bit marks a deleted entry,
/// anything else is active.
#[derive(DiskStruct, Clone, Debug)]
pub struct DirectoryEntry {
    pub name: [u8; 8],
    pub ext: [u8; 3],
    pub unused1: [u8; 2],
    pub start_track: u8,
    pub start_sector: u8,
    pub end_track: u8,
    pub end_sector: u8,
    pub total_sectors: [u8; 2],
    pub random_flag: u8,
    pub unused2: u8,
    pub month: u8,
    pub day: u8,
    pub year: u8,
}

pub const RANDOM_FLAG_TEXT: u8 = 0xFF;
pub const RANDOM_FLAG_BINARY: u8 = 0x00;

impl DirectoryEntry {
    pub fn is_empty(&self) -> bool {
        self.name[0] == 0x00
    }
    pub fn is_deleted(&self) -> bool {
        self.name[0] & 0x80 != 0
    }
    pub fn is_active(&self) -> bool {
        !self.is_empty() && !self.is_deleted()
    }
    pub fn mark_deleted(&mut self) {
        self.name[0] |= 0x80;
    }
    pub fn mark_empty(&mut self) {
        self.name[0] = 0x00;
    }
    pub fn start(&self) -> TrackSector {
        TrackSector::new(self.start_track, self.start_sector)
    }
    pub fn set_start(&mut self, ts: TrackSector) {
        self.start_track = ts.track;
        self.start_sector = ts.sector;
    }
    pub fn end(&self) -> TrackSector {
        TrackSector::new(self.end_track, self.end_sector)
    }
    pub fn set_end(&mut self, ts: TrackSector) {
        self.end_track = ts.track;
        self.end_sector = ts.sector;
    }
    pub fn total_sectors(&self) -> u16 {
        u16::from_be_bytes(self.total_sectors)
    }
    pub fn set_total_sectors(&mut self, n: u16) {
        self.total_sectors = n.to_be_bytes();
    }
    pub fn is_text(&self) -> bool {
        self.random_flag == RANDOM_FLAG_TEXT
    }
    /// Filename as `BASE.EXT`, NUL/space padding stripped.
    pub fn display_name(&self) -> String {
        let base = String::from_utf8_lossy(&self.name)
            .trim_end_matches(['\0', ' '])
            .to_string();
        let ext = String::from_utf8_lossy(&self.ext)
            .trim_end_matches(['\0', ' '])
            .to_string();
        if ext.is_empty() {
            base
        } else {
            format!("{}.{}", base, ext)
        }
    }
    /// Unsigned byte-wise comparison key used for the sort operation:
    /// filename bytes first, then extension bytes, per §4.4.
    pub fn sort_key(&self) -> ([u8; 8], [u8; 3]) {
        (self.name, self.ext)
    }
}

/// Fixed-width catalog line: name.ext, sector count, start/end addresses,
/// date, sequential/binary marker, styled on `fs::prodos::directory::Entry`.
impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_text() { "txt".green() } else { "bin".yellow() };
        write!(
            f,
            "{:<12} {:>5} sec  {:02}/{:02}-{:02}/{:02}  {:02}/{:02}/{:02}  [{}]",
            self.display_name(),
            self.total_sectors(),
            self.start_track,
            self.start_sector,
            self.end_track,
            self.end_sector,
            self.month,
            self.day,
            self.year,
            kind
        )
    }
}

/// Location of one entry slot within the directory: the sector it lives in
/// and its zero-based index (0..10) within that sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLocation {
    pub sector: TrackSector,
    pub slot: usize,
}

impl EntryLocation {
    fn byte_offset(&self) -> usize {
        DIR_FIRST_ENTRY_OFFSET + self.slot * DIR_ENTRY_SIZE
    }
}

pub struct DirectoryManager;

impl DirectoryManager {
    /// Directory sectors in chain order, guarding against self-links and
    /// cycles the way every chain walker in this crate does.
    pub fn walk_sectors(img: &ImageBuffer) -> Result<Vec<TrackSector>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = DIR_START;
        loop {
            if cur.is_nil() {
                break;
            }
            if !seen.insert(cur) {
                return Err(Error::CorruptChain(Addr(cur.track, cur.sector)));
            }
            let sector = img.read_sector(cur)?;
            out.push(cur);
            let next = TrackSector::new(sector[0], sector[1]);
            if next == cur {
                return Err(Error::CorruptChain(Addr(cur.track, cur.sector)));
            }
            cur = next;
        }
        Ok(out)
    }

    /// Every entry in the directory, active or not, alongside its location.
    pub fn all_entries(img: &ImageBuffer) -> Result<Vec<(DirectoryEntry, EntryLocation)>> {
        let mut out = Vec::new();
        for sector in Self::walk_sectors(img)? {
            let bytes = img.read_sector(sector)?;
            for slot in 0..DIR_ENTRIES_PER_SECTOR {
                let loc = EntryLocation { sector, slot };
                let off = loc.byte_offset();
                let entry = DirectoryEntry::from_bytes(&bytes[off..off + DIR_ENTRY_SIZE].to_vec());
                out.push((entry, loc));
            }
        }
        Ok(out)
    }

    /// Active entries only, in walk order, with their locations.
    pub fn active_entries(img: &ImageBuffer) -> Result<Vec<(DirectoryEntry, EntryLocation)>> {
        Ok(Self::all_entries(img)?
            .into_iter()
            .filter(|(e, _)| e.is_active())
            .collect())
    }

    pub fn find_by_name(
        img: &ImageBuffer,
        name: &[u8; 8],
        ext: &[u8; 3],
    ) -> Result<Option<(DirectoryEntry, EntryLocation)>> {
        Ok(Self::active_entries(img)?
            .into_iter()
            .find(|(e, _)| &e.name == name && &e.ext == ext))
    }

    fn write_entry_at(img: &mut ImageBuffer, loc: EntryLocation, entry: &DirectoryEntry) -> Result<()> {
        let mut bytes = img.read_sector(loc.sector)?;
        let off = loc.byte_offset();
        bytes[off..off + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        img.write_sector(loc.sector, &bytes)
    }

    /// Inserts `entry` into the first empty-or-deleted slot found while
    /// walking the directory. `Error::DirectoryFull` if none exists.
    pub fn insert(img: &mut ImageBuffer, entry: &DirectoryEntry) -> Result<EntryLocation> {
        for (existing, loc) in Self::all_entries(img)? {
            if existing.is_empty() || existing.is_deleted() {
                Self::write_entry_at(img, loc, entry)?;
                return Ok(loc);
            }
        }
        Err(Error::DirectoryFull)
    }

    /// Marks the slot's filename byte empty in place. The caller is
    /// responsible for returning the entry's data chain to the free list.
    pub fn delete_at(img: &mut ImageBuffer, loc: EntryLocation) -> Result<()> {
        let mut bytes = img.read_sector(loc.sector)?;
        let off = loc.byte_offset();
        bytes[off] = 0x00;
        img.write_sector(loc.sector, &bytes)
    }

    /// Rewrites the directory chain in place from a caller-supplied entry
    /// list (already filtered/sorted as desired), preserving the existing
    /// chain of directory sectors and their link order. Each directory
    /// sector's payload is rebuilt from scratch: up to ten entries packed
    /// sequentially, the remaining slots (if any) zeroed, and the link to
    /// the next directory sector is either the original next-link (more
    /// entries remain) or `(0, 0)` (the entry sequence has ended). Fails
    /// with `Error::DirectoryFull` if more entries are supplied than the
    /// existing chain has capacity for — repack never grows the directory.
    pub fn rewrite(img: &mut ImageBuffer, entries: &[DirectoryEntry]) -> Result<()> {
        let sectors = Self::walk_sectors(img)?;
        let capacity = sectors.len() * DIR_ENTRIES_PER_SECTOR;
        if entries.len() > capacity {
            return Err(Error::DirectoryFull);
        }

        // Snapshot each directory sector's original next-link before any
        // sector in the chain is overwritten.
        let mut next_links = Vec::with_capacity(sectors.len());
        for &ts in &sectors {
            let bytes = img.read_sector(ts)?;
            next_links.push(TrackSector::new(bytes[0], bytes[1]));
        }

        let mut cursor = 0usize;
        for (i, &ts) in sectors.iter().enumerate() {
            let mut bytes = [0u8; SECTOR_SIZE];
            let slots_here = entries[cursor..].len().min(DIR_ENTRIES_PER_SECTOR);
            for slot in 0..slots_here {
                let off = DIR_FIRST_ENTRY_OFFSET + slot * DIR_ENTRY_SIZE;
                bytes[off..off + DIR_ENTRY_SIZE].copy_from_slice(&entries[cursor + slot].to_bytes());
            }
            cursor += slots_here;
            let out_of_entries = cursor >= entries.len();
            let next = if out_of_entries {
                TrackSector::nil()
            } else {
                next_links[i]
            };
            bytes[0] = next.track;
            bytes[1] = next.sector;
            img.write_sector(ts, &bytes)?;
            if out_of_entries {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn threaded_directory(img: &mut ImageBuffer, sectors: usize) -> Vec<TrackSector> {
        let mut tss = Vec::new();
        for i in 0..sectors {
            tss.push(TrackSector::new(0, 5 + i as u8));
        }
        for (i, &ts) in tss.iter().enumerate() {
            let mut buf = [0u8; SECTOR_SIZE];
            if i + 1 < tss.len() {
                buf[0] = tss[i + 1].track;
                buf[1] = tss[i + 1].sector;
            }
            img.write_sector(ts, &buf).unwrap();
        }
        tss
    }

    fn entry(name: &str) -> DirectoryEntry {
        let mut e = DirectoryEntry::new();
        let mut n = [0u8; 8];
        for (i, b) in name.as_bytes().iter().take(8).enumerate() {
            n[i] = *b;
        }
        e.name = n;
        e.ext = *b"TXT";
        e.random_flag = RANDOM_FLAG_TEXT;
        e
    }

    #[test]
    fn walk_stops_at_nil_link() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        let tss = threaded_directory(&mut img, 3);
        let walked = DirectoryManager::walk_sectors(&img).unwrap();
        assert_eq!(walked, tss);
    }

    #[test]
    fn insert_and_find_round_trips() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        threaded_directory(&mut img, 1);
        let e = entry("HELLO");
        DirectoryManager::insert(&mut img, &e).unwrap();
        let found = DirectoryManager::find_by_name(&img, &e.name, &e.ext).unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().0.display_name(), "HELLO.TXT");
    }

    #[test]
    fn insert_fails_when_directory_is_full() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        threaded_directory(&mut img, 1);
        for i in 0..DIR_ENTRIES_PER_SECTOR {
            DirectoryManager::insert(&mut img, &entry(&format!("F{}", i))).unwrap();
        }
        assert!(matches!(
            DirectoryManager::insert(&mut img, &entry("ONEMORE")),
            Err(Error::DirectoryFull)
        ));
    }

    #[test]
    fn delete_then_insert_reuses_the_slot() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        threaded_directory(&mut img, 1);
        let e = entry("GONE");
        let loc = DirectoryManager::insert(&mut img, &e).unwrap();
        DirectoryManager::delete_at(&mut img, loc).unwrap();
        assert!(DirectoryManager::find_by_name(&img, &e.name, &e.ext).unwrap().is_none());
        let e2 = entry("BACK");
        let loc2 = DirectoryManager::insert(&mut img, &e2).unwrap();
        assert_eq!(loc2, loc);
    }

    #[test]
    fn rewrite_sorts_and_preserves_chain_termination() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        threaded_directory(&mut img, 2);
        for name in ["ZULU", "ALPHA", "MIKE"] {
            DirectoryManager::insert(&mut img, &entry(name)).unwrap();
        }
        let mut entries: Vec<DirectoryEntry> = DirectoryManager::active_entries(&img)
            .unwrap()
            .into_iter()
            .map(|(e, _)| e)
            .collect();
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        DirectoryManager::rewrite(&mut img, &entries).unwrap();
        let names: Vec<String> = DirectoryManager::active_entries(&img)
            .unwrap()
            .into_iter()
            .map(|(e, _)| e.display_name())
            .collect();
        assert_eq!(names, vec!["ALPHA.TXT", "MIKE.TXT", "ZULU.TXT"]);
    }

    #[test]
    fn rewrite_rejects_more_entries_than_chain_capacity() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        threaded_directory(&mut img, 1);
        let entries: Vec<DirectoryEntry> =
            (0..DIR_ENTRIES_PER_SECTOR + 1).map(|i| entry(&format!("F{}", i))).collect();
        assert!(matches!(
            DirectoryManager::rewrite(&mut img, &entries),
            Err(Error::DirectoryFull)
        ));
    }
}
