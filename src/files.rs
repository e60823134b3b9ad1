//! Virtual file handles mirroring simulation-language file I/O.
//!
//! A [`FileToken`] is a 32-bit value with two encodings. With bit 31 clear
//! it is a legacy multi-channel descriptor (MCD): a bitmask in which bit
//! `i` addresses channel slot `i`, so one value can target up to 31
//! channels at once. With bit 31 set it is an ordinary single descriptor
//! whose low bits index an unbounded pool. Internally the two cases are
//! the tagged [`FileRef`]; the packed integer exists only at the
//! collaborator boundary.
//!
//! Channel slots 0-2 are reserved for the standard streams: single indices
//! 0/1/2 are stdin/stdout/stderr, and MCD bits 1 and 2 address stdout and
//! stderr as always-open channels.
//!
//! Open failures are ordinary, caller-visible outcomes: both open calls
//! return the invalid token `0` and the caller checks.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};

use parking_lot::Mutex;

use crate::types::FileToken;

/// Bit marking a token as a single descriptor rather than an MCD bitmask.
const SINGLE_BIT: FileToken = 1 << 31;
/// Number of channel slots addressable by an MCD bitmask.
const MCD_SLOTS: u32 = 31;
/// Channel slots below this index are the standard streams.
const MCD_RESERVED: u32 = 3;
/// First index of the single-descriptor pool, past the legacy region.
const FIRST_SINGLE: u32 = MCD_SLOTS + 1 + 3;
/// Single-descriptor pool growth chunk.
const GROW_CHUNK: u32 = 10;

/// Decoded form of a [`FileToken`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileRef {
    /// One descriptor: a standard stream (0-2) or a slot in the single
    /// pool.
    Single(u32),
    /// A bitmask of legacy channels; bit `i` addresses slot `i`.
    Multi(u32),
}

impl FileRef {
    /// Decodes the wire encoding.
    pub fn decode(token: FileToken) -> Self {
        if token & SINGLE_BIT != 0 {
            FileRef::Single(token & !SINGLE_BIT)
        } else {
            FileRef::Multi(token)
        }
    }

    /// Re-packs into the wire encoding.
    pub fn encode(self) -> FileToken {
        match self {
            FileRef::Single(idx) => idx | SINGLE_BIT,
            FileRef::Multi(mask) => mask,
        }
    }

    /// Slot indices this reference addresses, lowest first.
    pub fn indices(self) -> Vec<u32> {
        match self {
            FileRef::Single(idx) => vec![idx],
            FileRef::Multi(mask) => (0..MCD_SLOTS).filter(|i| mask & (1 << i) != 0).collect(),
        }
    }
}

#[derive(Debug)]
enum Stream {
    Stdout,
    Stderr,
    Disk(File),
}

impl Stream {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Stream::Stdout => io::stdout().write_all(bytes),
            Stream::Stderr => io::stderr().write_all(bytes),
            Stream::Disk(f) => f.write_all(bytes),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Stdout => io::stdout().flush(),
            Stream::Stderr => io::stderr().flush(),
            Stream::Disk(f) => f.flush(),
        }
    }

    fn as_disk(&mut self) -> Option<&mut File> {
        match self {
            Stream::Disk(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct FdTableInner {
    /// Indices 0..31 are the legacy channel slots; the single pool starts
    /// at [`FIRST_SINGLE`].
    fds: Vec<Option<Stream>>,
    free_single: Vec<u32>,
    free_mcd: Vec<u32>,
}

impl FdTableInner {
    fn new() -> Self {
        let mut fds: Vec<Option<Stream>> = Vec::with_capacity(MCD_SLOTS as usize);
        fds.resize_with(MCD_SLOTS as usize, || None);
        fds[1] = Some(Stream::Stdout);
        fds[2] = Some(Stream::Stderr);
        Self {
            fds,
            free_single: Vec::new(),
            free_mcd: (MCD_RESERVED..MCD_SLOTS).collect(),
        }
    }

    fn grow_single_pool(&mut self) {
        let start = (self.fds.len() as u32).max(FIRST_SINGLE);
        self.fds.resize_with((start + GROW_CHUNK) as usize, || None);
        self.free_single.extend(start..start + GROW_CHUNK);
    }
}

/// Parses a C-style open mode string. The `b` qualifier is accepted and
/// ignored; streams are always byte-oriented here.
fn open_with_mode(path: &str, mode: &str) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    match mode.replace('b', "").as_str() {
        "r" => opts.read(true),
        "r+" => opts.read(true).write(true),
        "w" => opts.write(true).create(true).truncate(true),
        "w+" => opts.read(true).write(true).create(true).truncate(true),
        "a" => opts.append(true).create(true),
        "a+" => opts.read(true).append(true).create(true),
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported open mode `{}`", other),
            ))
        }
    };
    opts.open(path)
}

/// The virtual file table: token allocation, decoding, and stream
/// operations behind one lock.
#[derive(Debug)]
pub struct FileTable {
    inner: Mutex<FdTableInner>,
}

impl FileTable {
    /// Creates a table with the standard channels open and every other
    /// slot free.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FdTableInner::new()),
        }
    }

    /// Opens `path` for writing on one free legacy channel.
    ///
    /// Returns the channel's bit (a power of two), or `0` when the pool is
    /// exhausted or the open fails.
    pub fn open_multi(&self, path: &str) -> FileToken {
        let mut inner = self.inner.lock();
        let Some(slot) = inner.free_mcd.pop() else {
            return 0;
        };
        match open_with_mode(path, "w") {
            Ok(f) => {
                inner.fds[slot as usize] = Some(Stream::Disk(f));
                1 << slot
            }
            Err(_) => {
                inner.free_mcd.push(slot);
                0
            }
        }
    }

    /// Opens `path` with a C-style `mode` on one slot of the single pool.
    ///
    /// Returns the slot index with bit 31 set, distinguishing the token
    /// from any MCD bitmask, or `0` when the open fails. The pool grows
    /// ten slots at a time and never shrinks.
    pub fn open_single(&self, path: &str, mode: &str) -> FileToken {
        let Ok(f) = open_with_mode(path, mode) else {
            return 0;
        };
        let mut inner = self.inner.lock();
        if inner.free_single.is_empty() {
            inner.grow_single_pool();
        }
        let idx = inner
            .free_single
            .pop()
            .expect("single pool empty after growth");
        inner.fds[idx as usize] = Some(Stream::Disk(f));
        idx | SINGLE_BIT
    }

    /// Decodes `token` into its tagged form. Pure; does not consult the
    /// table, so an already-closed token still decodes.
    pub fn resolve(&self, token: FileToken) -> FileRef {
        FileRef::decode(token)
    }

    /// Writes `bytes` to every stream `token` resolves to.
    ///
    /// Returns the number of streams written. Invalid tokens and channels
    /// that fail to write contribute nothing.
    pub fn write(&self, token: FileToken, bytes: &[u8]) -> usize {
        let mut inner = self.inner.lock();
        let mut written = 0;
        match FileRef::decode(token) {
            FileRef::Single(0) => {}
            FileRef::Single(1) => {
                if io::stdout().write_all(bytes).is_ok() {
                    written += 1;
                }
            }
            FileRef::Single(2) => {
                if io::stderr().write_all(bytes).is_ok() {
                    written += 1;
                }
            }
            FileRef::Single(idx) => {
                if let Some(Some(stream)) = inner.fds.get_mut(idx as usize) {
                    if stream.write_all(bytes).is_ok() {
                        written += 1;
                    }
                }
            }
            multi @ FileRef::Multi(_) => {
                for slot in multi.indices() {
                    if let Some(Some(stream)) = inner.fds.get_mut(slot as usize) {
                        if stream.write_all(bytes).is_ok() {
                            written += 1;
                        }
                    }
                }
            }
        }
        written
    }

    /// Flushes every stream `token` resolves to.
    pub fn flush(&self, token: FileToken) {
        let mut inner = self.inner.lock();
        for slot in FileRef::decode(token).indices() {
            match slot {
                0 => {}
                1 => {
                    let _ = io::stdout().flush();
                }
                2 => {
                    let _ = io::stderr().flush();
                }
                idx => {
                    if let Some(Some(stream)) = inner.fds.get_mut(idx as usize) {
                        let _ = stream.flush();
                    }
                }
            }
        }
    }

    /// Repositions a single-descriptor stream.
    ///
    /// `origin` follows the C convention: 0 from start, 1 from current,
    /// 2 from end. Mirrors the C status convention: 0 on success,
    /// `u32::MAX` on error. Multi-channel, standard-stream, and invalid
    /// tokens return 0 without effect.
    pub fn seek(&self, token: FileToken, offset: i64, origin: u32) -> u32 {
        let pos = match origin {
            0 => SeekFrom::Start(offset.max(0) as u64),
            1 => SeekFrom::Current(offset),
            2 => SeekFrom::End(offset),
            _ => return 0,
        };
        let mut inner = self.inner.lock();
        let Some(file) = Self::single_disk(&mut inner, token) else {
            return 0;
        };
        match file.seek(pos) {
            Ok(_) => 0,
            Err(_) => u32::MAX,
        }
    }

    /// Current position of a single-descriptor stream, or 0 for
    /// multi-channel, standard-stream, and invalid tokens.
    pub fn tell(&self, token: FileToken) -> u32 {
        let mut inner = self.inner.lock();
        let Some(file) = Self::single_disk(&mut inner, token) else {
            return 0;
        };
        match file.stream_position() {
            Ok(pos) => pos as u32,
            Err(_) => 0,
        }
    }

    /// Closes the stream(s) `token` addresses and returns the slot(s) to
    /// the appropriate free list.
    ///
    /// On an MCD value only the set bits are released; the standard
    /// channels (bits 0-2) stay open. Already-free slots are ignored.
    pub fn close(&self, token: FileToken) {
        let mut inner = self.inner.lock();
        match FileRef::decode(token) {
            FileRef::Single(idx) => {
                if idx < FIRST_SINGLE || idx as usize >= inner.fds.len() {
                    return;
                }
                if inner.fds[idx as usize].take().is_some() {
                    inner.free_single.push(idx);
                }
            }
            FileRef::Multi(mask) => {
                for slot in (MCD_RESERVED..MCD_SLOTS).filter(|i| mask & (1 << i) != 0) {
                    if inner.fds[slot as usize].take().is_some() {
                        inner.free_mcd.push(slot);
                    }
                }
            }
        }
    }

    /// Writes a human-readable listing of every open slot.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let inner = self.inner.lock();
        writeln!(w, "  files:")?;
        for (idx, slot) in inner.fds.iter().enumerate() {
            if let Some(stream) = slot {
                let kind = match stream {
                    Stream::Stdout => "stdout",
                    Stream::Stderr => "stderr",
                    Stream::Disk(_) => "file",
                };
                writeln!(w, "    slot {}: {}", idx, kind)?;
            }
        }
        Ok(())
    }

    /// Counts open slots per kind, for diagnostics.
    pub fn open_counts(&self) -> HashMap<&'static str, usize> {
        let inner = self.inner.lock();
        let mut counts = HashMap::new();
        for slot in inner.fds.iter().flatten() {
            let kind = match slot {
                Stream::Stdout => "stdout",
                Stream::Stderr => "stderr",
                Stream::Disk(_) => "file",
            };
            *counts.entry(kind).or_insert(0) += 1;
        }
        counts
    }

    fn single_disk(inner: &mut FdTableInner, token: FileToken) -> Option<&mut File> {
        match FileRef::decode(token) {
            FileRef::Single(idx) if idx >= MCD_RESERVED => inner
                .fds
                .get_mut(idx as usize)
                .and_then(|s| s.as_mut())
                .and_then(|s| s.as_disk()),
            _ => None,
        }
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn tmp_path(tag: &str) -> PathBuf {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("simrt_files_{}_{}_{}", std::process::id(), tag, n))
    }

    #[test]
    fn test_decode_encode_roundtrip() {
        let single = FileRef::decode(40 | SINGLE_BIT);
        assert_eq!(single, FileRef::Single(40));
        assert_eq!(single.encode(), 40 | SINGLE_BIT);

        let multi = FileRef::decode(0b1010_1000);
        assert_eq!(multi, FileRef::Multi(0b1010_1000));
        assert_eq!(multi.indices(), vec![3, 5, 7]);

        assert_eq!(FileRef::decode(0), FileRef::Multi(0));
        assert!(FileRef::decode(0).indices().is_empty());
    }

    #[test]
    fn test_open_multi_returns_single_bit() {
        let table = FileTable::new();
        let path = tmp_path("mcd");
        let token = table.open_multi(path.to_str().unwrap());

        assert_ne!(token, 0);
        assert!(token.is_power_of_two());
        assert_eq!(token & SINGLE_BIT, 0);

        table.close(token);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_open_multi_failure_returns_zero_and_keeps_slot() {
        let table = FileTable::new();
        let bad = "/nonexistent_dir_simrt/x";
        assert_eq!(table.open_multi(bad), 0);

        // The slot went back to the pool: a good open still succeeds.
        let path = tmp_path("mcd_after_fail");
        let token = table.open_multi(path.to_str().unwrap());
        assert_ne!(token, 0);
        table.close(token);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_mcd_pool_exhaustion_and_reuse() {
        let table = FileTable::new();
        let mut tokens = Vec::new();
        let mut paths = Vec::new();

        loop {
            let path = tmp_path("pool");
            let token = table.open_multi(path.to_str().unwrap());
            if token == 0 {
                break;
            }
            tokens.push(token);
            paths.push(path);
        }

        // 31 slots minus the reserved standard-stream slots 0-2.
        assert_eq!(tokens.len(), (MCD_SLOTS - MCD_RESERVED) as usize);
        assert_eq!(table.open_multi(tmp_path("extra").to_str().unwrap()), 0);

        // Closing one channel frees exactly that slot for reuse.
        let freed = tokens.pop().unwrap();
        table.close(freed);
        let path = tmp_path("reuse");
        let again = table.open_multi(path.to_str().unwrap());
        assert_eq!(again, freed);

        table.close(again);
        for t in tokens {
            table.close(t);
        }
        for p in paths {
            let _ = std::fs::remove_file(p);
        }
    }

    #[test]
    fn test_open_single_sets_top_bit_distinct_indices() {
        let table = FileTable::new();
        let a_path = tmp_path("single_a");
        let b_path = tmp_path("single_b");
        let a = table.open_single(a_path.to_str().unwrap(), "w");
        let b = table.open_single(b_path.to_str().unwrap(), "w");

        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(a & SINGLE_BIT, 0);
        assert_ne!(b & SINGLE_BIT, 0);
        assert_ne!(a & !SINGLE_BIT, b & !SINGLE_BIT);

        table.close(a);
        table.close(b);
        let _ = std::fs::remove_file(a_path);
        let _ = std::fs::remove_file(b_path);
    }

    #[test]
    fn test_single_pool_grows_past_one_chunk() {
        let table = FileTable::new();
        let mut tokens = Vec::new();
        let mut paths = Vec::new();

        for _ in 0..(GROW_CHUNK + 3) {
            let path = tmp_path("grow");
            let token = table.open_single(path.to_str().unwrap(), "w");
            assert_ne!(token, 0);
            tokens.push(token);
            paths.push(path);
        }

        let mut indices: Vec<u32> = tokens.iter().map(|t| t & !SINGLE_BIT).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), tokens.len());

        for t in tokens {
            table.close(t);
        }
        for p in paths {
            let _ = std::fs::remove_file(p);
        }
    }

    #[test]
    fn test_open_single_failure_returns_zero() {
        let table = FileTable::new();
        assert_eq!(table.open_single("/nonexistent_dir_simrt/x", "r"), 0);
        assert_eq!(table.open_single(tmp_path("m").to_str().unwrap(), "q"), 0);
    }

    #[test]
    fn test_mcd_write_targets_every_set_bit() {
        let table = FileTable::new();
        let a_path = tmp_path("wide_a");
        let b_path = tmp_path("wide_b");
        let a = table.open_multi(a_path.to_str().unwrap());
        let b = table.open_multi(b_path.to_str().unwrap());

        let both = a | b;
        assert_eq!(table.write(both, b"broadcast\n"), 2);
        table.flush(both);
        table.close(both);

        assert_eq!(std::fs::read_to_string(&a_path).unwrap(), "broadcast\n");
        assert_eq!(std::fs::read_to_string(&b_path).unwrap(), "broadcast\n");
        let _ = std::fs::remove_file(a_path);
        let _ = std::fs::remove_file(b_path);
    }

    #[test]
    fn test_seek_tell_single_only() {
        let table = FileTable::new();
        let path = tmp_path("seek");
        let token = table.open_single(path.to_str().unwrap(), "w+");

        assert_eq!(table.write(token, b"0123456789"), 1);
        assert_eq!(table.tell(token), 10);
        assert_eq!(table.seek(token, 4, 0), 0);
        assert_eq!(table.tell(token), 4);

        // Invalid resolutions are zero-returning no-ops.
        assert_eq!(table.seek(0, 4, 0), 0);
        assert_eq!(table.tell(0), 0);
        let mcd = table.open_multi(tmp_path("seek_mcd").to_str().unwrap());
        assert_eq!(table.seek(mcd, 4, 0), 0);
        assert_eq!(table.tell(mcd), 0);

        table.close(token);
        table.close(mcd);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_close_is_tolerant() {
        let table = FileTable::new();

        // Invalid, already-closed, and standard-stream tokens are ignored.
        table.close(0);
        table.close(1 | SINGLE_BIT);
        table.close(0b110); // stdout/stderr channels stay open

        let path = tmp_path("double");
        let token = table.open_single(path.to_str().unwrap(), "w");
        table.close(token);
        table.close(token);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_dump_lists_standard_channels() {
        let table = FileTable::new();
        let mut out = Vec::new();
        table.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("slot 1: stdout"));
        assert!(text.contains("slot 2: stderr"));

        let counts = table.open_counts();
        assert_eq!(counts.get("stdout"), Some(&1));
        assert_eq!(counts.get("file"), None);
    }
}
