//! ZIP export of the result set.
//!
//! Builds an in-memory archive from the accumulated frame records.
//! Entries are named `frame_NNNNN.<ext>` with the extension sniffed from
//! the image bytes. Export never mutates the records: a failed build
//! leaves the result set intact.

use std::io::{Cursor, Write};

use stillframe_core::naming::frame_archive_filename;
use stillframe_core::types::FrameRecord;

/// Archive build failure. Reported to the caller; already-held results
/// are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("nothing to export: no frame has image bytes")]
    Empty,

    #[error("archive write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Sniff the file extension for an image payload, defaulting to `png`.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "jpg",
        Ok(image::ImageFormat::WebP) => "webp",
        // PNG is what the ffmpeg source and both engines emit.
        _ => "png",
    }
}

/// Build a ZIP archive from `(name, bytes)` entries.
///
/// Entries are stored uncompressed -- the payloads are already-encoded
/// images that deflate cannot shrink meaningfully.
pub fn build_archive(entries: &[(String, &[u8])]) -> Result<Vec<u8>, ExportError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Build the export archive for a run's records.
///
/// Enhanced bytes are preferred per frame, the extracted original
/// otherwise; frames with neither (failed extraction) are skipped.
pub fn archive_records(records: &[FrameRecord]) -> Result<Vec<u8>, ExportError> {
    let entries: Vec<(String, &[u8])> = records
        .iter()
        .filter_map(|record| {
            record.export_bytes().map(|bytes| {
                (
                    frame_archive_filename(record.frame_number, image_extension(bytes)),
                    bytes,
                )
            })
        })
        .collect();

    if entries.is_empty() {
        return Err(ExportError::Empty);
    }

    tracing::debug!(entries = entries.len(), "Building export archive");
    build_archive(&entries)
}
