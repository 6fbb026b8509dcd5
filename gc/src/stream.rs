//! Buffered line-by-line reader used by the circuit loader.

use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// Default buffer size for the underlying `BufReader`.
const DEFAULT_BUFFER_SIZE: usize = crate::constants::BUFFER_SIZE;

/// A zero-copy line reader over a circuit file.
///
/// Circuit files can run to hundreds of megabytes; this avoids materializing the whole
/// file or allocating a new `String` per line.
#[derive(Debug)]
pub struct BufferedLineStream {
    reader: BufReader<File>,
    line_buffer: String,
    /// 1-based number of the line last returned by `next_line`.
    line_number: usize,
}

impl BufferedLineStream {
    /// Create a new stream with the default buffer size.
    pub fn new(file: File) -> Self {
        Self::with_buffer_size(file, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new stream with a custom buffer size.
    pub fn with_buffer_size(file: File, buffer_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, file),
            line_buffer: String::with_capacity(1024),
            line_number: 0,
        }
    }

    /// Read the next line.
    ///
    /// Returns `None` at EOF. On success, returns the 1-based number of the line just
    /// read together with its text (trailing newline characters stripped), so callers
    /// never need to borrow `self` again while the text is still in use. The returned
    /// `&str` is valid until the next call to `next_line`.
    pub fn next_line(&mut self) -> Option<Result<(usize, &str), io::Error>> {
        self.line_buffer.clear();

        match self.reader.read_line(&mut self.line_buffer) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                let line = self.line_buffer.trim_end();
                Some(Ok((self.line_number, line)))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// 1-based number of the line last returned by `next_line`.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stream_from(content: &str) -> BufferedLineStream {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        use std::io::Seek;
        f.seek(std::io::SeekFrom::Start(0)).unwrap();
        BufferedLineStream::new(f)
    }

    #[test]
    fn reads_lines_and_tracks_line_number() {
        let mut s = stream_from("a\nbb\nccc\n");
        assert_eq!(s.next_line().unwrap().unwrap(), (1, "a"));
        assert_eq!(s.line_number(), 1);
        assert_eq!(s.next_line().unwrap().unwrap(), (2, "bb"));
        assert_eq!(s.next_line().unwrap().unwrap(), (3, "ccc"));
        assert_eq!(s.line_number(), 3);
        assert!(s.next_line().is_none());
    }

    #[test]
    fn empty_stream_yields_no_lines() {
        let mut s = stream_from("");
        assert!(s.next_line().is_none());
    }
}
