//! Archive creation: record emission, per-volume byte budgets, deferred
//! header patches.
//!
//! The writer emits placeholders for every field it cannot know up front
//! (volume body lengths, record stored lengths, volume count, total
//! uncompressed size) and patches them once the value exists.  A volume that
//! still owes a patch (the first volume always, and whichever volume holds
//! the current record header) stays open, "parked", across volume rolls;
//! everything else closes as soon as its body length is patched.
//!
//! Record headers never straddle volumes: when fewer than 32 budget bytes
//! remain, the roll happens before the record starts.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::archive::format::{
    self, BODY_LEN_OFFSET, FILE_HEADER_LEN, TOTAL_UNPACKED_OFFSET, VOLUME_COUNT_OFFSET,
    VOLUME_HEADER_LEN,
};
use crate::archive::volume::{next_volume_path, strip_directory};
use crate::bits::ByteSink;
use crate::codec::implode::{find_best_encoding, implode};
use crate::codec::stats::CodecStats;
use crate::codec::{DictSize, Strategy};
use crate::error::{LfgError, Result};
use crate::{displaylevel, displayout};

// ---------------------------------------------------------------------------
// Options and summary
// ---------------------------------------------------------------------------

/// Window-size selection for the packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictChoice {
    /// Pick per file from its size (1 KiB ≤ 1024 bytes, 2 KiB ≤ 2048, else 4 KiB).
    Auto,
    /// Use one window size for every file.
    Fixed(DictSize),
}

/// Caller-selected packing behavior.
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub dict: DictChoice,
    /// Search strategy for the normal optimization levels.
    pub strategy: Strategy,
    /// Try every window × strategy combination per file and keep the
    /// smallest; overrides `dict` and `strategy`.
    pub exhaustive: bool,
    /// Byte budget of the first volume file.
    pub first_disk_size: u64,
    /// Byte budget of each subsequent volume file.
    pub disk_size: u64,
    /// Report per-file codec statistics and timing.
    pub show_stats: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            dict: DictChoice::Auto,
            strategy: Strategy::Lazy,
            exhaustive: false,
            first_disk_size: u64::from(u32::MAX),
            disk_size: u64::from(u32::MAX),
            show_stats: false,
        }
    }
}

/// Result of one packing run.
#[derive(Debug, Clone, Copy)]
pub struct PackSummary {
    pub files_packed: usize,
    /// Volume files written.
    pub volume_count: u32,
    /// Total bytes across all volume files, headers included.
    pub archive_bytes: u64,
    /// Sum of the input file sizes.
    pub unpacked_bytes: u64,
}

// Smallest usable budgets: volume header + one record header + one payload
// byte (plus the archive header on the first volume).
const MIN_FIRST_DISK_SIZE: u64 = VOLUME_HEADER_LEN + format::ARCHIVE_HEADER_LEN + FILE_HEADER_LEN + 1;
const MIN_DISK_SIZE: u64 = VOLUME_HEADER_LEN + FILE_HEADER_LEN + 1;

// ---------------------------------------------------------------------------
// Budgeted volume sink
// ---------------------------------------------------------------------------

struct VolumeHandle {
    file: File,
    index: u32,
}

/// Byte sink that spreads its output across volume files, honoring the
/// per-volume budget and keeping patch-pending volumes open.
struct PackSink {
    current: VolumeHandle,
    current_path: PathBuf,
    parked: Vec<VolumeHandle>,
    /// Bytes still allowed into the current volume.
    space_left: u64,
    /// Budget for each volume after the current one.
    disk_size: u64,
    /// Volumes created so far.
    volume_count: u32,
    /// Volume holding the record header awaiting its stored-length patch.
    record_volume: Option<u32>,
    /// Finished volume bytes (body + header) accumulated at each roll.
    closed_bytes: u64,
    buf: Vec<u8>,
}

impl PackSink {
    const BUF_CAP: usize = 8192;

    fn new(file: File, path: PathBuf, first_disk_size: u64) -> Self {
        PackSink {
            current: VolumeHandle { file, index: 0 },
            current_path: path,
            parked: Vec::new(),
            space_left: first_disk_size
                - (VOLUME_HEADER_LEN + format::ARCHIVE_HEADER_LEN),
            disk_size: u64::from(u32::MAX),
            volume_count: 1,
            record_volume: None,
            closed_bytes: 0,
            buf: Vec::with_capacity(Self::BUF_CAP),
        }
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.current.file.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    /// End position of the current volume (the only place appends go).
    fn current_end(&mut self) -> io::Result<u64> {
        self.flush_buf()?;
        self.current.file.seek(SeekFrom::End(0))
    }

    /// Patches the current volume's body-length field from its final size.
    fn patch_current_body_len(&mut self) -> io::Result<u64> {
        let end = self.current_end()?;
        self.current.file.seek(SeekFrom::Start(BODY_LEN_OFFSET))?;
        let body = (end - VOLUME_HEADER_LEN) as u32;
        self.current.file.write_all(&body.to_le_bytes())?;
        self.current.file.seek(SeekFrom::End(0))?;
        Ok(end)
    }

    /// Closes out the current volume and opens the next one in the naming
    /// sequence with a fresh budget.
    fn roll_volume(&mut self) -> io::Result<()> {
        let end = self.patch_current_body_len()?;
        self.closed_bytes += end;

        let next_path = next_volume_path(&self.current_path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cannot derive a continuation volume name from {}",
                    self.current_path.display()
                ),
            )
        })?;

        let next_file = File::create(&next_path)?;
        let next_index = self.volume_count;
        let old = std::mem::replace(
            &mut self.current,
            VolumeHandle { file: next_file, index: next_index },
        );
        // Volume 1 is owed its count/total patches, and the record-holder
        // volume its stored-length patch; both stay open.
        if old.index == 0 || Some(old.index) == self.record_volume {
            self.parked.push(old);
        }
        displaylevel!(3, "opening volume {}", next_path.display());

        format::write_volume_header(&mut self.current.file, 0)?;
        self.current_path = next_path;
        self.space_left = self.disk_size - VOLUME_HEADER_LEN;
        self.volume_count += 1;
        Ok(())
    }

    /// Rolls now unless a full record header still fits the budget.
    fn ensure_header_space(&mut self) -> io::Result<()> {
        if self.space_left < FILE_HEADER_LEN {
            self.flush_buf()?;
            self.roll_volume()?;
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            self.put_byte(b)?;
        }
        Ok(())
    }

    /// Writes `value` at `offset` inside the given volume, which must be the
    /// current volume or a parked one.  A parked volume other than the first
    /// is closed once patched.
    fn patch_u32(&mut self, volume: u32, offset: u64, value: u32) -> io::Result<()> {
        self.flush_buf()?;
        if volume == self.current.index {
            self.current.file.seek(SeekFrom::Start(offset))?;
            self.current.file.write_all(&value.to_le_bytes())?;
            self.current.file.seek(SeekFrom::End(0))?;
            return Ok(());
        }
        let pos = self
            .parked
            .iter()
            .position(|v| v.index == volume)
            .expect("patched volume must be current or parked");
        self.parked[pos].file.seek(SeekFrom::Start(offset))?;
        self.parked[pos].file.write_all(&value.to_le_bytes())?;
        if volume != 0 {
            self.parked.swap_remove(pos); // closes the handle
        }
        Ok(())
    }

    /// Final patch pass: last volume's body length, and the first volume's
    /// volume count and total-uncompressed fields.
    fn finish(mut self, total_unpacked: u32) -> io::Result<(u32, u64)> {
        let end = self.patch_current_body_len()?;
        let total_bytes = self.closed_bytes + end;

        let count_byte = [(self.volume_count & 0xFF) as u8];
        if self.current.index == 0 {
            self.current.file.seek(SeekFrom::Start(VOLUME_COUNT_OFFSET))?;
            self.current.file.write_all(&count_byte)?;
            self.current.file.seek(SeekFrom::Start(TOTAL_UNPACKED_OFFSET))?;
            self.current.file.write_all(&total_unpacked.to_le_bytes())?;
            self.current.file.sync_all()?;
        } else {
            let first = self
                .parked
                .iter_mut()
                .find(|v| v.index == 0)
                .expect("first volume stays parked until finish");
            first.file.seek(SeekFrom::Start(VOLUME_COUNT_OFFSET))?;
            first.file.write_all(&count_byte)?;
            first.file.seek(SeekFrom::Start(TOTAL_UNPACKED_OFFSET))?;
            first.file.write_all(&total_unpacked.to_le_bytes())?;
            first.file.sync_all()?;
            self.current.file.sync_all()?;
        }
        Ok((self.volume_count, total_bytes))
    }
}

impl ByteSink for PackSink {
    fn put_byte(&mut self, byte: u8) -> io::Result<()> {
        if self.space_left == 0 {
            self.flush_buf()?;
            self.roll_volume()?;
        }
        self.buf.push(byte);
        if self.buf.len() == Self::BUF_CAP {
            self.flush_buf()?;
        }
        self.space_left -= 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

fn print_file_line(name: &str, stored_len: u64, input_len: u64, dict: DictSize) {
    let ratio = if input_len > 0 {
        100.0 - (stored_len as f64 * 100.0) / (input_len as f64)
    } else {
        0.0
    };
    displayout!(
        2,
        "  {:<13}{:>10}     {:>10}  {:>7.2}%         0          {}K",
        name,
        stored_len,
        input_len,
        ratio,
        dict.window_size() / 1024
    );
}

fn print_stats(stats: &CodecStats, strategy: Strategy, elapsed_secs: f64) {
    displayout!(
        2,
        "    literals: {}  dictionary lookups: {}  strategy: {:?}",
        stats.literal_count,
        stats.match_count,
        strategy
    );
    if let (Some((min_off, max_off)), Some((min_len, max_len))) =
        (stats.offset_range(), stats.length_range())
    {
        displayout!(2, "    offset [{min_off}, {max_off}]  length [{min_len}, {max_len}]");
    }
    displayout!(2, "    implode took {elapsed_secs:.3} seconds");
}

/// Packs `inputs` into a (possibly multi-volume) archive rooted at
/// `archive_path`.  Continuation volumes take the same path with the
/// pre-extension character advanced (`…A.XXX`, `…B.XXX`, …).
///
/// # Errors
///
/// Any per-file failure is fatal for the run: partially written volumes are
/// flushed and closed but not removed.
pub fn pack_archive(
    archive_path: &Path,
    inputs: &[PathBuf],
    opts: &PackOptions,
) -> Result<PackSummary> {
    if opts.first_disk_size < MIN_FIRST_DISK_SIZE {
        return Err(LfgError::DiskSizeTooSmall(opts.first_disk_size as u32));
    }
    if opts.disk_size < MIN_DISK_SIZE {
        return Err(LfgError::DiskSizeTooSmall(opts.disk_size as u32));
    }
    let path_str = archive_path.display().to_string();
    if path_str.len() > 255 {
        return Err(LfgError::FilenameTooLong(path_str));
    }
    let archive_name = strip_directory(&path_str).to_owned();

    let mut first_file = File::create(archive_path)?;
    format::write_volume_header(&mut first_file, 0)?;
    format::write_archive_header(&mut first_file, &archive_name, 1, 0)?;

    let mut sink = PackSink::new(first_file, archive_path.to_path_buf(), opts.first_disk_size);
    sink.disk_size = opts.disk_size;

    displayout!(2, "Imploding file(s) and creating archive {archive_name}...");
    displayout!(2, "");
    displayout!(
        2,
        "  Filename       Archived       Original    Ratio   Literal   Dictionary"
    );
    displayout!(
        2,
        "------------------------------------------------------------------------"
    );

    let mut total_unpacked: u64 = 0;
    let mut files_packed = 0usize;

    for input_path in inputs {
        let input_str = input_path.display().to_string();
        if input_str.len() > 255 {
            return Err(LfgError::FilenameTooLong(input_str));
        }
        let name = strip_directory(&input_str).to_owned();
        if name.len() > 12 {
            displaylevel!(2, "warning: filename {name} truncated to fit the 13-byte header field");
        }

        let mut input = File::open(input_path)?;
        let input_len = input.metadata()?.len();
        if input_len > u64::from(u32::MAX) {
            return Err(LfgError::UnsupportedParameter(format!(
                "{name}: files over 4 GiB cannot be archived"
            )));
        }

        // The record header must sit entirely inside one volume.
        sink.ensure_header_space().map_err(LfgError::Io)?;
        let record_volume = sink.current.index;
        let record_start = sink.current_end().map_err(LfgError::Io)?;
        sink.record_volume = Some(record_volume);

        let mut header_bytes = Vec::with_capacity(FILE_HEADER_LEN as usize);
        format::write_file_header(&mut header_bytes, &name, input_len as u32)?;
        sink.write_bytes(&header_bytes).map_err(LfgError::Io)?;

        let (dict, strategy) = if opts.exhaustive {
            let (d, s, _) = find_best_encoding(&mut input, input_len)?;
            (d, s)
        } else {
            let d = match opts.dict {
                DictChoice::Auto => DictSize::auto_for_len(input_len),
                DictChoice::Fixed(d) => d,
            };
            (d, opts.strategy)
        };

        let mut stats = opts.show_stats.then(CodecStats::new);
        let start = Instant::now();
        let payload_len = implode(&mut input, input_len, &mut sink, dict, strategy, stats.as_mut())?;
        let elapsed = start.elapsed().as_secs_f64();

        let stored_len = payload_len + FILE_HEADER_LEN;
        sink.patch_u32(record_volume, record_start + 4, stored_len as u32)
            .map_err(LfgError::Io)?;
        sink.record_volume = None;

        total_unpacked += input_len;
        files_packed += 1;
        print_file_line(&name, stored_len, input_len, dict);
        if let Some(stats) = &stats {
            print_stats(stats, strategy, elapsed);
        }
    }

    if total_unpacked > u64::from(u32::MAX) {
        return Err(LfgError::UnsupportedParameter(
            "total uncompressed size over 4 GiB cannot be recorded".into(),
        ));
    }
    let (volume_count, archive_bytes) =
        sink.finish(total_unpacked as u32).map_err(LfgError::Io)?;

    displayout!(
        2,
        "------------------------------------------------------------------------"
    );
    displayout!(2, "  total {archive_bytes:>14} bytes from {total_unpacked} bytes");
    displayout!(
        2,
        "Packed {files_packed} file{} onto {volume_count} disk file{}.",
        if files_packed == 1 { "" } else { "s" },
        if volume_count == 1 { "" } else { "s" }
    );

    Ok(PackSummary {
        files_packed,
        volume_count,
        archive_bytes,
        unpacked_bytes: total_unpacked,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
