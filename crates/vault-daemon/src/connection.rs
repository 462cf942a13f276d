//! A connection handed from the listener to a session worker.

use std::io::BufReader;
use std::net::{SocketAddr, TcpStream};

/// An accepted TCP connection, still unauthenticated, queued for a session
/// worker to pick up.
pub struct Connection {
    /// The peer's address, used to key log spans.
    pub peer: SocketAddr,
    stream: TcpStream,
}

impl Connection {
    /// Wraps a freshly accepted stream.
    #[must_use]
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { peer, stream }
    }

    /// Splits the connection into a buffered reader (for line framing and,
    /// later, `read_exact` body reads) and a raw writer handle.
    ///
    /// Both halves refer to the same socket: `TcpStream::try_clone` shares
    /// the underlying file descriptor rather than opening a second
    /// connection, so a shutdown or error on one side is visible on the
    /// other.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the stream cannot be cloned.
    pub fn split(self) -> std::io::Result<(BufReader<TcpStream>, TcpStream)> {
        let writer = self.stream.try_clone()?;
        Ok((BufReader::new(self.stream), writer))
    }
}
