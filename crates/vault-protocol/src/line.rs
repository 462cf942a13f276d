//! LF-terminated line framing with a tolerated CR and a hard length cap.

use std::io::{self, BufRead, Write};

use crate::MAX_LINE_LEN;

/// Failure modes for [`read_line`].
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// The peer closed the connection before a full line arrived.
    #[error("connection closed")]
    Eof,
    /// A line exceeded [`MAX_LINE_LEN`] bytes without a terminator.
    #[error("line exceeds {MAX_LINE_LEN} bytes")]
    Oversize,
    /// An underlying I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reads one LF-terminated line, tolerating an optional preceding CR, and
/// returns it without the terminator.
///
/// # Errors
///
/// Returns [`LineError::Eof`] if the stream ends before a line terminator
/// is seen, [`LineError::Oversize`] if more than [`MAX_LINE_LEN`] bytes
/// (excluding the terminator) are read without finding one, and
/// [`LineError::Io`] for any other I/O failure.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<String, LineError> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            return Err(LineError::Eof);
        }
        if byte[0] == b'\n' {
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
            return Ok(String::from_utf8_lossy(&buf).into_owned());
        }
        buf.push(byte[0]);
        if buf.len() > MAX_LINE_LEN {
            return Err(LineError::Oversize);
        }
    }
}

/// Writes `text` followed by a single LF.
///
/// # Errors
///
/// Propagates any I/O error from the underlying writer.
pub fn write_line<W: Write>(writer: &mut W, text: &str) -> io::Result<()> {
    writer.write_all(text.as_bytes())?;
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn reads_a_plain_lf_terminated_line() {
        let mut reader = BufReader::new(&b"hello\nworld\n"[..]);
        assert_eq!(read_line(&mut reader).unwrap(), "hello");
        assert_eq!(read_line(&mut reader).unwrap(), "world");
    }

    #[test]
    fn tolerates_a_preceding_cr() {
        let mut reader = BufReader::new(&b"hello\r\n"[..]);
        assert_eq!(read_line(&mut reader).unwrap(), "hello");
    }

    #[test]
    fn reports_eof_when_no_terminator_arrives() {
        let mut reader = BufReader::new(&b"no terminator"[..]);
        assert!(matches!(read_line(&mut reader), Err(LineError::Eof)));
    }

    #[test]
    fn reports_oversize_for_a_too_long_line() {
        let long = "a".repeat(MAX_LINE_LEN + 1);
        let input = format!("{long}\n");
        let mut reader = BufReader::new(input.as_bytes());
        assert!(matches!(read_line(&mut reader), Err(LineError::Oversize)));
    }

    #[test]
    fn write_line_appends_a_single_lf() {
        let mut out = Vec::new();
        write_line(&mut out, "OK: done").unwrap();
        assert_eq!(out, b"OK: done\n");
    }
}
