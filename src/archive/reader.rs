//! Archive extraction: volume parsing, file iteration, volume hopping.
//!
//! One [`extract_archive`] call processes one logical archive, however many
//! volume files it spans.  The reader walks `FILE` records by their stored
//! lengths; the compressed payload in between is handed to the decoder
//! through a [`ByteFeed`] that transparently hops to the next volume when
//! the current one runs dry.  Record positions are rebased across hops, so
//! the walk continues seamlessly in the new volume.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::archive::format::{
    self, ArchiveHeader, FileHeader, FILE_HEADER_LEN, FILE_TAG, VOLUME_HEADER_LEN,
};
use crate::archive::volume::next_volume_path;
use crate::bits::ByteFeed;
use crate::codec::explode::explode;
use crate::codec::stats::CodecStats;
use crate::error::{LfgError, Result};
use crate::{displaylevel, displayout};

// ---------------------------------------------------------------------------
// Options and summary
// ---------------------------------------------------------------------------

/// Caller-selected extraction behavior.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// List contents without writing any output files.
    pub info_only: bool,
    /// Report per-file codec statistics and timing.
    pub show_stats: bool,
    /// Overwrite existing output files instead of skipping the record.
    pub overwrite: bool,
    /// Directory extracted files are created in (current directory if unset).
    pub output_dir: Option<PathBuf>,
}

/// Result of one archive run.
#[derive(Debug, Clone, Copy)]
pub struct ExtractSummary {
    /// Entries of the caller's path list this archive consumed: the initial
    /// volume plus any continuation resolved through the list rather than
    /// the filename convention.
    pub paths_consumed: usize,
    /// Files fully extracted (or listed, in info mode).
    pub files_done: usize,
    /// Files skipped or failed; the run continued past them.
    pub files_failed: usize,
    /// Total uncompressed bytes written (or accounted, in info mode).
    pub bytes_written: u64,
}

// ---------------------------------------------------------------------------
// Volume cursor
// ---------------------------------------------------------------------------

/// Opens a volume file and validates its header.
///
/// Returns the file positioned after the 8-byte header, the on-disk file
/// length, and the header's body length.  A disagreement between the two is
/// reported as a warning, not an error.
fn open_volume(path: &Path) -> Result<(File, u64, u32)> {
    let display_path = path.display().to_string();
    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let body_len = format::read_volume_header(&mut file, &display_path)?;
    if file_len != u64::from(body_len) + VOLUME_HEADER_LEN {
        displaylevel!(
            2,
            "warning: {display_path}: file length {file_len} does not match indicated length {body_len} + 8"
        );
    }
    Ok((file, file_len, body_len))
}

/// Read-side view of the current volume plus the state needed to advance to
/// the next one.
struct VolumeCursor<'a> {
    file: File,
    path: PathBuf,
    /// On-disk length of the current volume (header included).
    file_len: u64,
    /// Read position within the current volume.
    logical_pos: u64,
    /// Absolute position (in the current volume) of the next file record.
    next_record_pos: u64,
    /// Volume files opened so far for this archive.
    volumes_seen: usize,
    /// Volume count declared by the archive header.
    volume_count: usize,
    /// The caller's archive path list, for continuation fallback.
    paths: &'a [PathBuf],
    /// Entries of `paths` consumed so far.
    consumed: usize,
    buf: Vec<u8>,
    buf_pos: usize,
    buf_len: usize,
}

impl<'a> VolumeCursor<'a> {
    fn new(file: File, path: PathBuf, file_len: u64, paths: &'a [PathBuf]) -> Self {
        VolumeCursor {
            file,
            path,
            file_len,
            logical_pos: VOLUME_HEADER_LEN,
            next_record_pos: 0,
            volumes_seen: 1,
            volume_count: 1,
            paths,
            consumed: 1,
            buf: vec![0u8; 8192],
            buf_pos: 0,
            buf_len: 0,
        }
    }

    /// Moves the read position, dropping any buffered bytes.
    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.logical_pos = pos;
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(())
    }

    /// Opens the continuation volume: first the filename convention (the
    /// pre-extension letter incremented), then the next entry of the
    /// caller's archive list.  Rebases `next_record_pos` into the new
    /// volume's coordinates.  Returns `false` when no continuation exists.
    fn advance_volume(&mut self) -> Result<bool> {
        if self.next_record_pos >= self.file_len {
            self.next_record_pos -= self.file_len;
            self.next_record_pos += VOLUME_HEADER_LEN;
        }

        let mut opened = None;
        if let Some(candidate) = next_volume_path(&self.path) {
            match open_volume(&candidate) {
                Ok(vol) => opened = Some((candidate, vol)),
                Err(_) => {}
            }
        }
        if opened.is_none() {
            if let Some(candidate) = self.paths.get(self.consumed) {
                match open_volume(candidate) {
                    Ok(vol) => {
                        self.consumed += 1;
                        opened = Some((candidate.clone(), vol));
                    }
                    Err(_) => {}
                }
            }
        }

        let Some((path, (file, file_len, _body_len))) = opened else {
            displaylevel!(1, "error: continuation volume not found after {}", self.path.display());
            return Ok(false);
        };

        displaylevel!(3, "{}\t{:>9} bytes", path.display(), file_len);
        self.file = file;
        self.path = path;
        self.file_len = file_len;
        self.logical_pos = VOLUME_HEADER_LEN;
        self.buf_pos = 0;
        self.buf_len = 0;
        self.volumes_seen += 1;
        Ok(true)
    }

    /// Positions the cursor at the next file record, crossing volume
    /// boundaries as needed.  `Ok(false)` means the archive is complete.
    fn position_at_next_record(&mut self) -> Result<bool> {
        while self.next_record_pos >= self.file_len {
            if self.volumes_seen >= self.volume_count {
                return Ok(false);
            }
            if !self.advance_volume()? {
                displaylevel!(2, "warning: unexpected end of archive data");
                return Ok(false);
            }
        }
        self.seek_to(self.next_record_pos)?;
        Ok(true)
    }
}

/// Plain reads within the current volume; no hopping.  Record headers never
/// straddle volumes, so header parsing goes through this.
impl Read for VolumeCursor<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.buf_pos < self.buf_len {
            let n = out.len().min(self.buf_len - self.buf_pos);
            out[..n].copy_from_slice(&self.buf[self.buf_pos..self.buf_pos + n]);
            self.buf_pos += n;
            self.logical_pos += n as u64;
            return Ok(n);
        }
        let n = self.file.read(out)?;
        self.logical_pos += n as u64;
        Ok(n)
    }
}

/// Payload reads: when the volume runs out mid-stream, hop to the next one
/// and keep feeding bytes from just after its header.
impl ByteFeed for VolumeCursor<'_> {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            if self.buf_pos < self.buf_len {
                let byte = self.buf[self.buf_pos];
                self.buf_pos += 1;
                self.logical_pos += 1;
                return Ok(Some(byte));
            }
            let n = self.file.read(&mut self.buf)?;
            if n > 0 {
                self.buf_len = n;
                self.buf_pos = 0;
                continue;
            }
            match self.advance_volume() {
                Ok(true) => continue,
                Ok(false) => return Ok(None),
                Err(LfgError::Io(e)) => return Err(e),
                Err(other) => return Err(io::Error::new(io::ErrorKind::InvalidData, other.to_string())),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-file handling
// ---------------------------------------------------------------------------

fn print_file_line(header: &FileHeader) {
    let savings = if header.unpacked_len > 0 {
        100.0 - (f64::from(header.stored_len) * 100.0) / f64::from(header.unpacked_len)
    } else {
        0.0
    };
    displayout!(
        2,
        "  {:<13}{:>9} bytes    {:>9} bytes   {:>7.2}%",
        header.name,
        header.stored_len,
        header.unpacked_len,
        savings
    );
}

fn print_stats(stats: &CodecStats, elapsed_secs: f64) {
    displayout!(2, "    literals: {}  dictionary lookups: {}", stats.literal_count, stats.match_count);
    if let (Some((min_off, max_off)), Some((min_len, max_len))) =
        (stats.offset_range(), stats.length_range())
    {
        displayout!(
            2,
            "    offset [{min_off}, {max_off}]  length [{min_len}, {max_len}]"
        );
    }
    displayout!(2, "    explode took {elapsed_secs:.3} seconds");
}

/// Extracts (or skips) one record's payload.  Returns the bytes written.
fn extract_one_file(
    cursor: &mut VolumeCursor<'_>,
    header: &FileHeader,
    opts: &ExtractOptions,
) -> Result<u64> {
    let out_name = Path::new(&header.name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&header.name));
    let out_path = match &opts.output_dir {
        Some(dir) => dir.join(out_name),
        None => out_name,
    };

    if !opts.overwrite && out_path.exists() {
        return Err(LfgError::OutputExists(out_path.display().to_string()));
    }
    let out_file = File::create(&out_path)?;
    let mut out = BufWriter::new(out_file);

    let expected = (header.unpacked_len > 0).then_some(u64::from(header.unpacked_len));
    let mut stats = opts.show_stats.then(CodecStats::new);

    let start = Instant::now();
    let summary = explode(&mut *cursor, &mut out, expected, stats.as_mut())?;
    out.flush()?;

    if summary.length_mismatch {
        displaylevel!(
            2,
            "warning: {}: wrote {} bytes, header said {}",
            header.name,
            summary.bytes_written,
            header.unpacked_len
        );
    }
    if let Some(stats) = &stats {
        print_stats(stats, start.elapsed().as_secs_f64());
    }
    Ok(summary.bytes_written)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extracts (or, with `info_only`, lists) the archive starting at
/// `paths[0]`.  Later entries of `paths` serve as continuation volumes when
/// the filename convention does not resolve.
///
/// Per-file failures are reported and skipped; the summary counts them.
///
/// # Errors
///
/// Fatal for the whole archive: an unreadable or invalid first volume, or a
/// missing `FILE` tag where a record must start.
pub fn extract_archive(paths: &[PathBuf], opts: &ExtractOptions) -> Result<ExtractSummary> {
    let first = paths.first().ok_or_else(|| {
        LfgError::Io(io::Error::new(io::ErrorKind::InvalidInput, "no archive path given"))
    })?;
    if first.as_os_str().len() > 255 {
        return Err(LfgError::FilenameTooLong(first.display().to_string()));
    }

    let (mut file, file_len, _body_len) = open_volume(first)?;
    let display_path = first.display().to_string();
    let header: ArchiveHeader = format::read_archive_header(&mut file, &display_path)?;

    if header.volume_count == 0 {
        displaylevel!(2, "warning: disk count of 0 indicated, archive may be corrupted");
    }

    displayout!(2, "Reported archive name:       {}", header.name);
    displayout!(2, "Disk count:                  {}", header.volume_count);
    displayout!(2, "Space needed for extraction: {} bytes", header.total_unpacked);
    displayout!(2, "");
    if opts.info_only {
        displayout!(2, "Archived file info:");
    } else {
        match &opts.output_dir {
            Some(dir) => displayout!(2, "Extracting files to {}...", dir.display()),
            None => displayout!(2, "Extracting files..."),
        }
    }
    displayout!(2, "Filename       Archived Size      Exploded Size    Savings");
    displayout!(2, "------------------------------------------------------------");
    displaylevel!(3, "{display_path}\t{file_len:>9} bytes");

    let mut cursor = VolumeCursor::new(file, first.clone(), file_len, paths);
    cursor.volume_count = usize::from(header.volume_count).max(1);
    cursor.logical_pos = VOLUME_HEADER_LEN + format::ARCHIVE_HEADER_LEN;
    cursor.next_record_pos = cursor.logical_pos;

    let mut summary = ExtractSummary {
        paths_consumed: 1,
        files_done: 0,
        files_failed: 0,
        bytes_written: 0,
    };

    while cursor.position_at_next_record()? {
        let record_start = cursor.logical_pos;
        let vol_path = cursor.path.display().to_string();

        let mut tag = [0u8; 4];
        cursor
            .read_exact(&mut tag)
            .map_err(|_| LfgError::NotAnArchive(format!("{vol_path}: truncated file record")))?;
        if tag != FILE_TAG {
            return Err(LfgError::NotAnArchive(format!(
                "{vol_path}: 'FILE' tag not found at record boundary"
            )));
        }

        let file_header = format::read_file_header(&mut cursor, &vol_path)?;
        if !file_header.filler_ok {
            displaylevel!(2, "warning: unexpected values in file header, archive may be corrupted");
        }
        if file_header.stored_len < FILE_HEADER_LEN as u32 {
            return Err(LfgError::NotAnArchive(format!(
                "{}: file record shorter than its header",
                cursor.path.display()
            )));
        }

        cursor.next_record_pos = record_start + u64::from(file_header.stored_len);
        if cursor.next_record_pos > cursor.file_len {
            displaylevel!(3, "  {:<13} (continues on next volume)", file_header.name);
        }
        print_file_line(&file_header);

        if opts.info_only {
            summary.files_done += 1;
            summary.bytes_written += u64::from(file_header.unpacked_len);
            continue;
        }

        match extract_one_file(&mut cursor, &file_header, opts) {
            Ok(written) => {
                summary.files_done += 1;
                summary.bytes_written += written;
            }
            Err(e) => {
                displaylevel!(1, "error: {}: {e}", file_header.name);
                summary.files_failed += 1;
            }
        }
    }

    displayout!(2, "------------------------------------------------------------");
    displayout!(
        2,
        "  {} files{}{:>30} bytes",
        summary.files_done,
        if summary.files_failed > 0 { " (some failed)" } else { "" },
        summary.bytes_written
    );
    displayout!(2, "");

    summary.paths_consumed = cursor.consumed;
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
