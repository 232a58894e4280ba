//! # Frame Reader
//!
//! Splits the raw serial byte stream into delimiter-terminated text frames.

use bytes::{Buf, BytesMut};

/// Default frame terminator (line feed)
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// Initial buffer capacity; a few frames worth of device output
const INITIAL_CAPACITY: usize = 256;

/// Buffers partial serial input and yields complete frames
///
/// Bytes after the last delimiter stay in the buffer until a later chunk
/// completes them. The delimiter itself is not part of the emitted frame.
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
    delimiter: u8,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    /// Create a reader that splits on newlines
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }

    /// Create a reader that splits on a device-specific delimiter byte
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            delimiter,
        }
    }

    /// Append a chunk and iterate over the frames it completes
    ///
    /// The iterator is lazy: frames not pulled from it stay buffered and are
    /// returned by later calls.
    ///
    /// # Examples
    ///
    /// ```
    /// use meter_bridge::ingest::frame::FrameReader;
    ///
    /// let mut reader = FrameReader::new();
    /// assert_eq!(reader.feed(b"230.5,1.2,").count(), 0);
    ///
    /// let frames: Vec<String> = reader.feed(b"276.6,1024.3,50.0,0.98\n").collect();
    /// assert_eq!(frames, vec!["230.5,1.2,276.6,1024.3,50.0,0.98"]);
    /// ```
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.push(chunk);
        Frames { reader: self }
    }

    /// Append a chunk without extracting frames
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete frame out of the buffer, if any
    pub fn next_frame(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == self.delimiter)?;
        let line = self.buffer.split_to(end);
        self.buffer.advance(1);
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Bytes received after the last delimiter
    pub fn residual(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard any buffered partial frame
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// The configured delimiter byte
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

/// Lazy iterator over complete frames, see [`FrameReader::feed`]
#[derive(Debug)]
pub struct Frames<'a> {
    reader: &'a mut FrameReader,
}

impl Iterator for Frames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_frame() {
        let mut reader = FrameReader::new();
        let frames: Vec<String> = reader.feed(b"230.5,1.2,276.6,1024.3,50.0,0.98\n").collect();

        assert_eq!(frames, vec!["230.5,1.2,276.6,1024.3,50.0,0.98"]);
        assert!(reader.residual().is_empty());
    }

    #[test]
    fn test_empty_chunk_yields_nothing() {
        let mut reader = FrameReader::new();
        assert_eq!(reader.feed(b"").count(), 0);
        assert!(reader.residual().is_empty());
    }

    #[test]
    fn test_terminator_only_yields_empty_frame() {
        let mut reader = FrameReader::new();
        let frames: Vec<String> = reader.feed(b"\n").collect();
        assert_eq!(frames, vec![String::new()]);
    }

    #[test]
    fn test_partial_frame_is_kept_across_chunks() {
        let mut reader = FrameReader::new();

        assert_eq!(reader.feed(b"230.5,1.").count(), 0);
        assert_eq!(reader.residual(), b"230.5,1.");

        assert_eq!(reader.feed(b"2,276.6").count(), 0);
        let frames: Vec<String> = reader.feed(b",1024.3,50.0,0.98\n230").collect();

        assert_eq!(frames, vec!["230.5,1.2,276.6,1024.3,50.0,0.98"]);
        assert_eq!(reader.residual(), b"230");
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut reader = FrameReader::new();
        let frames: Vec<String> = reader.feed(b"a\nb\n\nc").collect();

        assert_eq!(frames, vec!["a", "b", ""]);
        assert_eq!(reader.residual(), b"c");
    }

    #[test]
    fn test_unconsumed_frames_stay_buffered() {
        let mut reader = FrameReader::new();
        {
            let mut frames = reader.feed(b"first\nsecond\n");
            assert_eq!(frames.next().as_deref(), Some("first"));
        }

        let rest: Vec<String> = reader.feed(b"third\n").collect();
        assert_eq!(rest, vec!["second", "third"]);
    }

    #[test]
    fn test_carriage_return_is_preserved_in_frame() {
        // Trimming is the parser's job; the reader only splits
        let mut reader = FrameReader::new();
        let frames: Vec<String> = reader.feed(b"1,2,3,4,5,6\r\n").collect();
        assert_eq!(frames, vec!["1,2,3,4,5,6\r"]);
    }

    #[test]
    fn test_clear_discards_partial_frame() {
        let mut reader = FrameReader::new();
        assert_eq!(reader.feed(b"230").count(), 0);

        reader.clear();
        assert!(reader.residual().is_empty());

        let frames: Vec<String> = reader.feed(b"5.1,1.2,276.6,1024.3,50.0,0.98\n").collect();
        assert_eq!(frames, vec!["5.1,1.2,276.6,1024.3,50.0,0.98"]);
    }

    #[test]
    fn test_custom_delimiter() {
        let mut reader = FrameReader::with_delimiter(b';');
        assert_eq!(reader.delimiter(), b';');

        let frames: Vec<String> = reader.feed(b"1,2,3,4,5,6;7,8").collect();
        assert_eq!(frames, vec!["1,2,3,4,5,6"]);
        assert_eq!(reader.residual(), b"7,8");
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let mut reader = FrameReader::new();
        let frames: Vec<String> = reader.feed(&[0xFF, b'1', b'\n']).collect();
        assert_eq!(frames, vec!["\u{FFFD}1"]);
    }

    #[test]
    fn test_no_bytes_created_or_lost() {
        let stream = b"230.5,1.2,276.6,1024.3,50.0,0.98\nabc,1\n\n1,2,3,4,5\ntrailing";

        // Feed the same stream in several chunkings
        for chunk_size in [1, 2, 3, 7, 16, stream.len()] {
            let mut reader = FrameReader::new();
            let mut rebuilt = Vec::new();

            for chunk in stream.chunks(chunk_size) {
                for frame in reader.feed(chunk) {
                    rebuilt.extend_from_slice(frame.as_bytes());
                    rebuilt.push(b'\n');
                }
            }
            rebuilt.extend_from_slice(reader.residual());

            assert_eq!(rebuilt, stream.to_vec(), "chunk size {}", chunk_size);
        }
    }
}
