//! ## Public Engine API
//!
//! `FlexDisk` is the façade every front end calls: each public method is a
//! sequenced composition of the lower managers, in the order §2's data-flow
//! diagram lays out. This mirrors the teacher's `fs::DiskFS` trait objects
//! (`fs::dos3x::Disk`, `fs::prodos::Disk`, ...) which likewise take
//! ownership of an image and expose coarse `save`/`load`/`delete`-style
//! operations instead of letting callers touch sectors directly.

use crate::directory::{
    DirectoryEntry, DirectoryManager, EntryLocation, RANDOM_FLAG_BINARY, RANDOM_FLAG_TEXT,
};
use crate::error::{Error, Result};
use crate::fileio::{FileIo, TextMode};
use crate::freelist::FreeListManager;
use crate::geometry::{Geometry, ImageBuffer, TrackSector, SECTOR_SIZE};
use crate::names::host_name_to_flex;
use crate::sir::{new_sir, Sir, SirManager};
use chrono::{Datelike, NaiveDateTime};
use log::{debug, info};

pub const BOOT_SECTOR_1: TrackSector = TrackSector { track: 0, sector: 1 };
pub const BOOT_SECTOR_2: TrackSector = TrackSector { track: 0, sector: 2 };
pub const RESERVED_SECTOR: TrackSector = TrackSector { track: 0, sector: 4 };

/// Resolves the historical disagreement (spec.md §9 Open Questions) over
/// what the directory entry's random-file flag byte means. Defaults to
/// `TextIsFF`, matching `flexadd`'s literal behavior; exposed so a caller
/// that needs FLEX Advanced Programmer's Guide semantics can opt in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomFlagPolicy {
    /// `flexadd`-compatible: 0xFF marks text/sequential, 0x00 marks binary/random.
    TextIsFF,
    /// FLEX Advanced Programmer's Guide convention, inverted from the above.
    TextIsZero,
}

impl RandomFlagPolicy {
    fn flag_for(&self, mode: TextMode) -> u8 {
        match (self, mode) {
            (RandomFlagPolicy::TextIsFF, TextMode::Text) => RANDOM_FLAG_TEXT,
            (RandomFlagPolicy::TextIsFF, TextMode::Binary) => RANDOM_FLAG_BINARY,
            (RandomFlagPolicy::TextIsZero, TextMode::Text) => RANDOM_FLAG_BINARY,
            (RandomFlagPolicy::TextIsZero, TextMode::Binary) => RANDOM_FLAG_TEXT,
        }
    }
}

/// Resolves the second Open Question: whether a newly written entry's
/// end-track/end-sector are populated from the file's last sector
/// (conformant) or left zeroed (the legacy `flexadd` behavior, preserved
/// here only for compatibility testing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityMode {
    Conformant,
    LegacyZeroEnd,
}

impl Default for CompatibilityMode {
    fn default() -> Self {
        CompatibilityMode::Conformant
    }
}

/// Whether the directory's sort step runs before a repack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Unsorted,
    Lexicographic,
}

#[derive(Debug, Clone)]
pub struct DiskStats {
    pub label: String,
    pub vol_number: u16,
    pub tracks: u16,
    pub sectors_per_track: u8,
    pub free_sectors: u16,
    pub active_files: usize,
}

/// One directory listing row, produced by [`FlexDisk::list`].
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub name: String,
    pub total_sectors: u16,
    pub start: TrackSector,
    pub end: TrackSector,
    pub is_text: bool,
    pub month: u8,
    pub day: u8,
    pub year: u8,
}

impl From<&DirectoryEntry> for ListingRow {
    fn from(e: &DirectoryEntry) -> Self {
        ListingRow {
            name: e.display_name(),
            total_sectors: e.total_sectors(),
            start: e.start(),
            end: e.end(),
            is_text: e.is_text(),
            month: e.month,
            day: e.day,
            year: e.year,
        }
    }
}

/// Owns one FLEX volume image for the duration of a session. No operation
/// here is safe to call concurrently with another on the same handle (§5);
/// nothing in this crate attempts to enforce that beyond normal Rust
/// aliasing rules on `&mut FlexDisk`.
pub struct FlexDisk {
    img: ImageBuffer,
    pub random_flag_policy: RandomFlagPolicy,
    pub compat: CompatibilityMode,
}

impl FlexDisk {
    /// Opens an existing image, inferring its geometry per §4.1.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        let img = ImageBuffer::infer(bytes)?;
        debug!("opened image with geometry {:?}", img.geometry());
        Ok(FlexDisk {
            img,
            random_flag_policy: RandomFlagPolicy::TextIsFF,
            compat: CompatibilityMode::Conformant,
        })
    }

    /// Formats a brand-new volume in memory: zeroed buffer, optional boot
    /// sectors, SIR, directory chain, and a fully threaded free list over
    /// every non-reserved sector on tracks `1..tracks`. The caller persists
    /// the result with [`FlexDisk::to_bytes`].
    pub fn create(
        geometry: Geometry,
        label: &str,
        vol_number: u16,
        boot: Option<([u8; SECTOR_SIZE], [u8; SECTOR_SIZE])>,
        created: Option<NaiveDateTime>,
    ) -> Result<Self> {
        let mut img = ImageBuffer::allocate(geometry);

        if let Some((b1, b2)) = boot {
            img.write_sector(BOOT_SECTOR_1, &b1)?;
            img.write_sector(BOOT_SECTOR_2, &b2)?;
        }

        let when = created.unwrap_or_else(|| chrono::Local::now().naive_local());
        let year_mod_100 = (when.year() % 100) as u8;
        let mut sir = new_sir(label, vol_number, geometry, when.month() as u8, when.day() as u8, year_mod_100);
        SirManager::persist(&mut img, &sir)?;
        img.write_sector(RESERVED_SECTOR, &[0u8; SECTOR_SIZE])?;

        // §3: sectors 5..S of track 0 are the directory chain in full; its
        // size is not a free parameter, it is whatever is left on track 0
        // once boot/SIR/reserved have claimed sectors 1-4.
        let dir_sectors = geometry.sectors_per_track.saturating_sub(4);
        Self::thread_directory_chain(&mut img, dir_sectors)?;

        let data_start_track = 1u16;
        let (free_head, free_tail, free_count) =
            Self::thread_free_list(&mut img, geometry, data_start_track)?;
        sir.set_first_free(free_head);
        sir.set_last_free(free_tail);
        sir.set_free_count(free_count);
        SirManager::persist(&mut img, &sir)?;

        info!(
            "created {}-track {}-sector volume {:?}, {} free sectors",
            geometry.tracks, geometry.sectors_per_track, label, free_count
        );

        Ok(FlexDisk {
            img,
            random_flag_policy: RandomFlagPolicy::TextIsFF,
            compat: CompatibilityMode::Conformant,
        })
    }

    fn thread_directory_chain(img: &mut ImageBuffer, dir_sectors: u8) -> Result<()> {
        for i in 0..dir_sectors {
            let ts = TrackSector::new(0, 5 + i);
            let mut buf = [0u8; SECTOR_SIZE];
            if i + 1 < dir_sectors {
                buf[0] = 0;
                buf[1] = 5 + i + 1;
            }
            img.write_sector(ts, &buf)?;
        }
        Ok(())
    }

    fn thread_free_list(
        img: &mut ImageBuffer,
        geometry: Geometry,
        first_data_track: u16,
    ) -> Result<(TrackSector, TrackSector, u16)> {
        let mut chain = Vec::new();
        for track in first_data_track..geometry.tracks {
            for sector in 1..=geometry.sectors_per_track {
                chain.push(TrackSector::new(track as u8, sector));
            }
        }
        if chain.is_empty() {
            return Ok((TrackSector::nil(), TrackSector::nil(), 0));
        }
        for (i, &ts) in chain.iter().enumerate() {
            let mut buf = [0u8; SECTOR_SIZE];
            if let Some(&next) = chain.get(i + 1) {
                buf[0] = next.track;
                buf[1] = next.sector;
            }
            img.write_sector(ts, &buf)?;
        }
        Ok((chain[0], *chain.last().unwrap(), chain.len() as u16))
    }

    pub fn geometry(&self) -> Geometry {
        self.img.geometry()
    }

    fn load_sir(&self) -> Result<Sir> {
        SirManager::load(&self.img)
    }

    /// Flattens the in-memory image back into bytes for the caller to
    /// persist; the engine never writes to the filesystem itself.
    pub fn to_bytes(&self) -> &[u8] {
        self.img.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.img.into_bytes()
    }

    /// Adds a file, threading its bytes (optionally text-encoded) into a
    /// fresh sector chain and inserting a directory entry for it. If the
    /// directory has no room, the chain just allocated is unwound back to
    /// the free list before the error propagates (entry-level atomicity,
    /// §4.5/§7).
    pub fn add_file(
        &mut self,
        host_name: &str,
        contents: &[u8],
        mode: TextMode,
        created: Option<NaiveDateTime>,
    ) -> Result<EntryLocation> {
        let mut sir = self.load_sir()?;
        let encoded = match mode {
            TextMode::Text => crate::fileio::encode_text_import(contents),
            TextMode::Binary => contents.to_vec(),
        };

        let (head, total_sectors) = FileIo::write_chain(&mut self.img, &mut sir, &encoded)?;

        let end = match self.compat {
            CompatibilityMode::Conformant => Self::chain_tail(&self.img, head)?,
            CompatibilityMode::LegacyZeroEnd => TrackSector::nil(),
        };

        let (base, ext) = host_name_to_flex(host_name);
        let when = created.unwrap_or_else(|| chrono::Local::now().naive_local());
        let mut entry = DirectoryEntry::new();
        entry.name = base;
        entry.ext = ext;
        entry.set_start(head);
        entry.set_end(end);
        entry.set_total_sectors(total_sectors);
        entry.random_flag = self.random_flag_policy.flag_for(mode);
        entry.month = when.month() as u8;
        entry.day = when.day() as u8;
        entry.year = (when.year() % 100) as u8;

        match DirectoryManager::insert(&mut self.img, &entry) {
            Ok(loc) => {
                info!("added {} ({} sectors)", host_name, total_sectors);
                Ok(loc)
            }
            Err(e) => {
                FileIo::release_chain(&mut self.img, &mut sir, head, total_sectors)?;
                Err(e)
            }
        }
    }

    fn chain_tail(img: &ImageBuffer, head: TrackSector) -> Result<TrackSector> {
        let mut seen = std::collections::HashSet::new();
        let mut cur = head;
        let max_steps = img.geometry().total_sectors();
        loop {
            if seen.len() >= max_steps || !seen.insert(cur) {
                return Err(Error::CorruptChain(crate::error::Addr(cur.track, cur.sector)));
            }
            let sector = img.read_sector(cur)?;
            let next = TrackSector::new(sector[0], sector[1]);
            if next.is_nil() {
                return Ok(cur);
            }
            cur = next;
        }
    }

    /// Extracts a file's contents by host name, reading its chain in the
    /// requested mode. `Error::NotFound` if no active entry matches.
    pub fn extract_file(&self, host_name: &str, mode: TextMode, check_sequence: bool) -> Result<Vec<u8>> {
        let (base, ext) = host_name_to_flex(host_name);
        let (entry, _) = DirectoryManager::find_by_name(&self.img, &base, &ext)?.ok_or(Error::NotFound)?;
        FileIo::read_chain(&self.img, entry.start(), mode, check_sequence)
    }

    /// Deletes a file by host name: marks its slot empty and returns its
    /// chain to the free list.
    pub fn delete_file(&mut self, host_name: &str) -> Result<()> {
        let (base, ext) = host_name_to_flex(host_name);
        let (entry, loc) = DirectoryManager::find_by_name(&self.img, &base, &ext)?.ok_or(Error::NotFound)?;
        let mut sir = self.load_sir()?;
        DirectoryManager::delete_at(&mut self.img, loc)?;
        FileIo::release_chain(&mut self.img, &mut sir, entry.start(), entry.total_sectors())?;
        info!("deleted {}", host_name);
        Ok(())
    }

    /// Lists every active entry in directory walk order.
    pub fn list(&self) -> Result<Vec<ListingRow>> {
        Ok(DirectoryManager::active_entries(&self.img)?
            .iter()
            .map(|(e, _)| ListingRow::from(e))
            .collect())
    }

    /// Repacks the directory, optionally sorting active entries
    /// lexicographically by name then extension first (§4.4). Deleted and
    /// empty slots are dropped; the existing directory chain is never
    /// grown, so an oversized active-entry set fails with
    /// `Error::DirectoryFull` rather than silently truncating (§9).
    pub fn sort(&mut self, order: SortOrder) -> Result<()> {
        let mut entries: Vec<DirectoryEntry> = DirectoryManager::active_entries(&self.img)?
            .into_iter()
            .map(|(e, _)| e)
            .collect();
        if order == SortOrder::Lexicographic {
            entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        }
        DirectoryManager::rewrite(&mut self.img, &entries)
    }

    /// Reads one raw 256-byte sector for a hex-dump front end.
    pub fn dump_sector(&self, ts: TrackSector) -> Result<[u8; SECTOR_SIZE]> {
        self.img.read_sector(ts)
    }

    /// Address of the sector containing a given byte offset, rounded down
    /// to the sector boundary (§4.6 hex dump).
    pub fn sector_for_offset(&self, byte_offset: usize) -> Result<TrackSector> {
        let geometry = self.img.geometry();
        let chunk = byte_offset / SECTOR_SIZE;
        let sectors_per_track = geometry.sectors_per_track as usize;
        if sectors_per_track == 0 {
            return Err(Error::BadGeometry);
        }
        let track = chunk / sectors_per_track;
        let sector = chunk % sectors_per_track + 1;
        Ok(TrackSector::new(track as u8, sector as u8))
    }

    pub fn stat(&self) -> Result<DiskStats> {
        let sir = self.load_sir()?;
        let geometry = self.img.geometry();
        let active = DirectoryManager::active_entries(&self.img)?.len();
        Ok(DiskStats {
            label: sir.label(),
            vol_number: sir.vol_number(),
            tracks: geometry.tracks,
            sectors_per_track: geometry.sectors_per_track,
            free_sectors: sir.free_count(),
            active_files: active,
        })
    }
}
