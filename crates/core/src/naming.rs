//! Archive entry naming convention.
//!
//! Exported frames are named deterministically so the archive sorts in
//! frame order in any file browser.

use crate::types::FrameNumber;

/// Generate the archive entry name for a frame.
///
/// Convention: `frame_{number:05}.{ext}` -- the frame number zero-padded
/// to 5 digits.
///
/// # Examples
///
/// ```
/// use stillframe_core::naming::frame_archive_filename;
///
/// assert_eq!(frame_archive_filename(5, "png"), "frame_00005.png");
/// assert_eq!(frame_archive_filename(12345, "jpg"), "frame_12345.jpg");
/// ```
pub fn frame_archive_filename(frame_number: FrameNumber, ext: &str) -> String {
    format!("frame_{frame_number:05}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_five_digits() {
        assert_eq!(frame_archive_filename(1, "png"), "frame_00001.png");
        assert_eq!(frame_archive_filename(99, "png"), "frame_00099.png");
    }

    #[test]
    fn wide_numbers_are_not_truncated() {
        assert_eq!(frame_archive_filename(123456, "png"), "frame_123456.png");
    }

    #[test]
    fn extension_is_caller_supplied() {
        assert_eq!(frame_archive_filename(7, "webp"), "frame_00007.webp");
    }
}
