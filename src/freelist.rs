//! ## Free-List Manager
//!
//! FLEX threads unused sectors into a single singly-linked chain rooted at
//! the SIR's first-free/last-free fields — a strict sequential allocator,
//! not a bitmap. This is a different allocation strategy than the teacher's
//! DOS 3.x VTOC bitmap (`fs::dos3x::mod::get_track_map`/`allocate_sector`),
//! so the algorithm here is authored fresh; the chain-threading mechanics
//! (patch a predecessor's link bytes, then persist) follow the same pattern
//! the teacher uses to build track-sector-list chains when writing a file
//! in `fs::dos3x::mod::write_file`.

use crate::error::{Error, Result};
use crate::geometry::{ImageBuffer, TrackSector};
use crate::sir::{Sir, SirManager};

pub struct FreeListManager;

impl FreeListManager {
    /// Pops one sector off the head of the free chain, threading the SIR's
    /// first-free pointer forward to what that sector's link bytes point
    /// at. Returns `Error::OutOfSpace` if the SIR reports zero free sectors.
    pub fn allocate_sector(img: &mut ImageBuffer, sir: &mut Sir) -> Result<TrackSector> {
        if sir.free_count() == 0 {
            return Err(Error::OutOfSpace);
        }
        let head = sir.first_free();
        let sector = img.read_sector(head)?;
        let next = TrackSector::new(sector[0], sector[1]);
        sir.set_first_free(next);
        if next.is_nil() {
            sir.set_last_free(TrackSector::nil());
        }
        SirManager::decrement_free_count(img, sir)
            .map(|_| head)
    }

    /// Appends an already-built chain (`head..=tail`, `count` sectors long)
    /// onto the tail of the free list. Used when deleting a file, and when
    /// initially threading a freshly created volume's entire data region.
    pub fn release_chain(
        img: &mut ImageBuffer,
        sir: &mut Sir,
        head: TrackSector,
        tail: TrackSector,
        count: u16,
    ) -> Result<()> {
        let old_tail = sir.last_free();
        if old_tail.is_nil() {
            sir.set_first_free(head);
        } else {
            let mut tail_sector = img.read_sector(old_tail)?;
            tail_sector[0] = head.track;
            tail_sector[1] = head.sector;
            img.write_sector(old_tail, &tail_sector)?;
        }
        sir.set_last_free(tail);
        SirManager::increment_free_count(img, sir, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::sir::new_sir;

    fn thread_free_chain(img: &mut ImageBuffer, start: TrackSector, count: u8) -> TrackSector {
        let mut ts = start;
        for i in 0..count {
            let next = if i + 1 < count {
                TrackSector::new(ts.track, ts.sector + 1)
            } else {
                TrackSector::nil()
            };
            let mut buf = [0u8; 256];
            buf[0] = next.track;
            buf[1] = next.sector;
            img.write_sector(ts, &buf).unwrap();
            if i + 1 < count {
                ts = next;
            }
        }
        ts
    }

    #[test]
    fn allocate_walks_the_chain_and_decrements_count() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        let tail = thread_free_chain(&mut img, TrackSector::new(1, 1), 5);
        let mut sir = new_sir("V", 1, geometry, 1, 1, 1);
        sir.set_first_free(TrackSector::new(1, 1));
        sir.set_last_free(tail);
        sir.set_free_count(5);

        let got = FreeListManager::allocate_sector(&mut img, &mut sir).unwrap();
        assert_eq!(got, TrackSector::new(1, 1));
        assert_eq!(sir.first_free(), TrackSector::new(1, 2));
        assert_eq!(sir.free_count(), 4);
    }

    #[test]
    fn allocate_on_empty_list_is_out_of_space() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        let mut sir = new_sir("V", 1, geometry, 1, 1, 1);
        sir.set_free_count(0);
        assert!(matches!(
            FreeListManager::allocate_sector(&mut img, &mut sir),
            Err(Error::OutOfSpace)
        ));
    }

    #[test]
    fn release_chain_appends_to_existing_tail() {
        let geometry = Geometry { tracks: 2, sectors_per_track: 10 };
        let mut img = ImageBuffer::allocate(geometry);
        let mut sir = new_sir("V", 1, geometry, 1, 1, 1);
        let tail = thread_free_chain(&mut img, TrackSector::new(1, 1), 3);
        sir.set_first_free(TrackSector::new(1, 1));
        sir.set_last_free(tail);
        sir.set_free_count(3);

        FreeListManager::release_chain(&mut img, &mut sir, TrackSector::new(1, 5), TrackSector::new(1, 6), 2).unwrap();
        assert_eq!(sir.free_count(), 5);
        assert_eq!(sir.last_free(), TrackSector::new(1, 6));
        let old_tail_sector = img.read_sector(tail).unwrap();
        assert_eq!((old_tail_sector[0], old_tail_sector[1]), (1, 5));
    }
}
