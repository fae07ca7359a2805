//! ## File I/O
//!
//! Reads and writes file-data sector chains: allocation from the free list,
//! link threading, and logical-record-number stamping, plus the text codec
//! applied on request during import/export. Grounded on the teacher's
//! `fs::cpm::types::TextConverter` (`TextConversion::from_utf8`/`to_utf8`,
//! a plain byte-by-byte loop building a `Vec<u8>`) for the codec shape, and
//! on `fs::dos3x::mod::write_file`'s allocate-then-patch-predecessor pattern
//! for chain threading — reauthored here against the free-list allocator
//! instead of a VTOC bitmap.

use crate::error::{Addr, Error, Result};
use crate::freelist::FreeListManager;
use crate::geometry::{ImageBuffer, TrackSector, SECTOR_SIZE};
use crate::sir::Sir;
use std::collections::HashSet;

pub const PAYLOAD_SIZE: usize = SECTOR_SIZE - 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    Binary,
    Text,
}

/// Host bytes, LF-to-CR translated and stripped of CR, FLEX's on-disk text
/// convention at import time. Tab compression is never emitted on import
/// (§4.5): this is strictly the inverse of the LF/CR half of `decode`.
pub fn encode_text_import(host_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(host_bytes.len());
    for &b in host_bytes {
        match b {
            0x0A => out.push(0x0D),
            0x0D => {}
            other => out.push(other),
        }
    }
    out
}

/// FLEX on-disk text bytes decoded to host bytes at export time: a CR or LF
/// emits a host `\n` unless the byte immediately before it was its
/// counterpart (so a CR/LF or LF/CR pair collapses to one line break, but
/// three or more consecutive line-ending bytes do not); a `0x09 N` pair
/// expands to `N` literal spaces; remaining control bytes (`< 0x20`) are
/// dropped; printable ASCII (`0x20..=0x7E`) passes through unchanged. This
/// is a direct port of the original tool's `last_char`/`spacecomp` state
/// machine (`flextract.c::exportTextFile`), which looks *back* at the
/// previous byte rather than ahead, and whose state spans the whole file,
/// not just one sector — see [`TextDecoder`] for the carry-across-sectors
/// form used by [`FileIo::read_chain`].
pub fn decode_text_export(flex_bytes: &[u8]) -> Vec<u8> {
    TextDecoder::new().feed(flex_bytes)
}

/// Carries the export codec's `last_char`/space-compression state across
/// sector boundaries, since a CR/LF pair or a `0x09 N` space-run count byte
/// can straddle two 252-byte payloads and the original tool's decoder is a
/// single pass over the whole file, not one reset per sector.
#[derive(Default)]
pub struct TextDecoder {
    last_char: u8,
    space_comp_pending: bool,
}

impl TextDecoder {
    pub fn new() -> Self {
        TextDecoder::default()
    }

    /// Decodes one chunk of FLEX text bytes, carrying state forward for the
    /// next call.
    pub fn feed(&mut self, flex_bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(flex_bytes.len());
        for &b in flex_bytes {
            if self.space_comp_pending {
                out.extend(std::iter::repeat(b' ').take(b as usize));
                self.space_comp_pending = false;
            } else {
                match b {
                    0x0A => {
                        if self.last_char != 0x0D {
                            out.push(b'\n');
                        }
                    }
                    0x0D => {
                        if self.last_char != 0x0A {
                            out.push(b'\n');
                        }
                    }
                    0x09 => {
                        self.space_comp_pending = true;
                    }
                    0x20..=0x7E => {
                        out.push(b);
                    }
                    _ => {}
                }
            }
            self.last_char = b;
        }
        out
    }
}

pub struct FileIo;

impl FileIo {
    /// Writes `data` as a new sector chain, allocating one sector at a time
    /// from the free list and threading links as each successor is
    /// allocated. Zero-length input still allocates one sector (LRN 1,
    /// terminator link). On `Error::OutOfSpace`, every sector allocated
    /// during this call is spliced back onto the free list before the
    /// error propagates, so a failed add never leaks sectors (§4.5).
    ///
    /// A binary chain's final sector always has its unused payload tail
    /// zeroed; extracting a binary file whose length is not a multiple of
    /// `PAYLOAD_SIZE` (252) therefore yields the original bytes followed by
    /// zero padding out to the sector boundary — FLEX's directory entry has
    /// no byte-exact length field, only a sector count, so this is a
    /// documented limit on binary round-tripping rather than a bug (text
    /// files are unaffected: the codec drops control bytes, including the
    /// padding, on export).
    pub fn write_chain(img: &mut ImageBuffer, sir: &mut Sir, data: &[u8]) -> Result<(TrackSector, u16)> {
        let chunks: Vec<&[u8]> = if data.is_empty() {
            vec![&[][..]]
        } else {
            data.chunks(PAYLOAD_SIZE).collect()
        };

        let mut allocated: Vec<TrackSector> = Vec::with_capacity(chunks.len());
        let mut prev: Option<TrackSector> = None;
        let mut head: Option<TrackSector> = None;

        for (i, chunk) in chunks.iter().enumerate() {
            let ts = match FreeListManager::allocate_sector(img, sir) {
                Ok(ts) => ts,
                Err(e) => {
                    if let (Some(h), Some(&tail)) = (head, allocated.last()) {
                        FreeListManager::release_chain(img, sir, h, tail, allocated.len() as u16)?;
                    }
                    return Err(e);
                }
            };
            if head.is_none() {
                head = Some(ts);
            }

            let mut buf = [0u8; SECTOR_SIZE];
            let lrn = (i + 1) as u16;
            buf[2..4].copy_from_slice(&lrn.to_be_bytes());
            buf[4..4 + chunk.len()].copy_from_slice(chunk);
            img.write_sector(ts, &buf)?;

            if let Some(p) = prev {
                let mut pbuf = img.read_sector(p)?;
                pbuf[0] = ts.track;
                pbuf[1] = ts.sector;
                img.write_sector(p, &pbuf)?;
            }
            allocated.push(ts);
            prev = Some(ts);
        }

        Ok((head.expect("at least one sector is always allocated"), chunks.len() as u16))
    }

    /// Walks a file's data chain from `head`, decoding each sector's
    /// payload per `mode`. When `check_sequence` is set, each sector's
    /// stored LRN must match the 1-based running count or the read halts
    /// with `Error::CorruptChain`; the same error guards self-links and
    /// walks exceeding the image's total sector count (§9).
    pub fn read_chain(
        img: &ImageBuffer,
        head: TrackSector,
        mode: TextMode,
        check_sequence: bool,
    ) -> Result<Vec<u8>> {
        let max_steps = img.geometry().total_sectors();
        let mut out = Vec::new();
        let mut decoder = TextDecoder::new();
        let mut seen = HashSet::new();
        let mut cur = head;
        let mut expected_lrn: u16 = 1;

        while !cur.is_nil() {
            if seen.len() >= max_steps || !seen.insert(cur) {
                return Err(Error::CorruptChain(Addr(cur.track, cur.sector)));
            }
            let sector = img.read_sector(cur)?;
            let next = TrackSector::new(sector[0], sector[1]);
            if next == cur {
                return Err(Error::CorruptChain(Addr(cur.track, cur.sector)));
            }
            if check_sequence {
                let lrn = u16::from_be_bytes([sector[2], sector[3]]);
                if lrn != expected_lrn {
                    return Err(Error::CorruptChain(Addr(cur.track, cur.sector)));
                }
            }
            let payload = &sector[4..SECTOR_SIZE];
            match mode {
                // Binary sectors concatenate directly; text sectors are fed
                // through one `TextDecoder` spanning the whole chain so a
                // CR/LF pair or a 0x09-space-run count byte split across a
                // sector boundary still decodes correctly (§4.5).
                TextMode::Binary => out.extend_from_slice(payload),
                TextMode::Text => out.extend(decoder.feed(payload)),
            }
            expected_lrn += 1;
            cur = next;
        }
        Ok(out)
    }

    /// Releases a file's entire data chain (as recorded by the directory
    /// entry's start address and sector count) back to the free list. The
    /// chain's on-disk tail is located by walking to the last non-nil
    /// sector before the terminator, as real FLEX's delete path does.
    pub fn release_chain(img: &mut ImageBuffer, sir: &mut Sir, head: TrackSector, count: u16) -> Result<()> {
        if head.is_nil() || count == 0 {
            return Ok(());
        }
        let max_steps = img.geometry().total_sectors();
        let mut seen = HashSet::new();
        let mut cur = head;
        let mut tail = head;
        loop {
            if seen.len() >= max_steps || !seen.insert(cur) {
                return Err(Error::CorruptChain(Addr(cur.track, cur.sector)));
            }
            let sector = img.read_sector(cur)?;
            let next = TrackSector::new(sector[0], sector[1]);
            tail = cur;
            if next.is_nil() {
                break;
            }
            if next == cur {
                return Err(Error::CorruptChain(Addr(cur.track, cur.sector)));
            }
            cur = next;
        }
        FreeListManager::release_chain(img, sir, head, tail, count)
    }
}
