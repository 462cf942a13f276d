//! Shared test harness: stands up the full session/file worker pipeline
//! against an ephemeral port and a throwaway storage root, and provides a
//! minimal line-protocol client for driving it the way a real client
//! would.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tempfile::TempDir;
use vault_core::VaultConfig;
use vault_daemon::connection::Connection;
use vault_daemon::task::Task;
use vault_daemon::{listener, pool};
use vault_registry::Registry;

/// A running instance of the daemon pipeline, bound to an OS-assigned
/// ephemeral port, torn down via the specification's shutdown sequence
/// when dropped.
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub storage_root: TempDir,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
    connection_queue: Arc<vault_queue::BoundedQueue<Connection>>,
    task_queue: Arc<vault_queue::BoundedQueue<Arc<Task>>>,
    session_handles: Vec<JoinHandle<()>>,
    file_handles: Vec<JoinHandle<()>>,
    pub registry: Arc<Registry>,
}

/// Overrides applied on top of [`VaultConfig::default`] for a test server.
pub struct ServerOptions {
    pub user_quota: u64,
    pub max_users: usize,
    pub session_workers: usize,
    pub file_workers: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            user_quota: 100 * 1024 * 1024,
            max_users: 100,
            session_workers: 3,
            file_workers: 2,
        }
    }
}

impl TestServer {
    /// Starts a fresh server with the given options, bound to `127.0.0.1:0`.
    #[must_use]
    pub fn start(options: ServerOptions) -> Self {
        let storage_root = TempDir::new().expect("create temp storage root");
        let config = Arc::new(VaultConfig {
            port: 0,
            session_pool_size: options.session_workers,
            file_pool_size: options.file_workers,
            connection_queue_capacity: 8,
            task_queue_capacity: 8,
            storage_root: storage_root.path().to_path_buf(),
            user_quota: options.user_quota,
            max_users: options.max_users,
            ..VaultConfig::default()
        });

        let registry = Arc::new(
            Registry::load(&config.storage_root, config.user_quota, config.max_users)
                .expect("load registry"),
        );

        let tcp_listener = listener::bind(&config).expect("bind ephemeral port");
        let addr = tcp_listener.local_addr().expect("local addr");

        let connection_queue = Arc::new(vault_queue::BoundedQueue::<Connection>::new(
            config.connection_queue_capacity,
        ));
        let task_queue = Arc::new(vault_queue::BoundedQueue::<Arc<Task>>::new(
            config.task_queue_capacity,
        ));

        let session_handles = pool::spawn_session_workers(
            config.session_pool_size,
            Arc::clone(&connection_queue),
            Arc::clone(&registry),
            Arc::clone(&config),
            Arc::clone(&task_queue),
        );
        let file_handles = pool::spawn_file_workers(
            config.file_pool_size,
            Arc::clone(&task_queue),
            Arc::clone(&registry),
            Arc::clone(&config),
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let accept_thread = {
            let connection_queue = Arc::clone(&connection_queue);
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || {
                listener::run_accept_loop(&tcp_listener, &connection_queue, &shutdown);
            })
        };

        Self {
            addr,
            storage_root,
            shutdown,
            accept_thread: Some(accept_thread),
            connection_queue,
            task_queue,
            session_handles,
            file_handles,
            registry,
        }
    }

    /// Opens a fresh TCP connection and reads past the welcome banner.
    #[must_use]
    pub fn connect(&self) -> Client {
        let stream = TcpStream::connect(self.addr).expect("connect to test server");
        let mut client = Client::new(stream);
        client.read_line(); // welcome banner
        client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        self.connection_queue.shutdown();
        for handle in self.session_handles.drain(..) {
            let _ = handle.join();
        }
        self.task_queue.shutdown();
        for handle in self.file_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// A minimal line-protocol client used to drive a [`TestServer`] the way a
/// real client would: one read/write call per protocol step, no implicit
/// buffering across helper calls beyond what `BufReader` requires.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn new(stream: TcpStream) -> Self {
        let reader_half = stream.try_clone().expect("clone stream for reading");
        Self {
            reader: BufReader::new(reader_half),
            writer: stream,
        }
    }

    /// Sends one LF-terminated command line.
    pub fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).expect("write command");
        self.writer.write_all(b"\n").expect("write terminator");
    }

    /// Sends raw bytes with no framing (used for upload bodies).
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("write raw body");
    }

    /// Reads one LF-terminated reply line, without the terminator.
    pub fn read_line(&mut self) -> String {
        let mut buf = String::new();
        self.reader.read_line(&mut buf).expect("read reply line");
        buf.trim_end_matches(['\n', '\r']).to_string()
    }

    /// Reads exactly `n` bytes (used for download bodies).
    pub fn read_exact(&mut self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        self.reader.read_exact(&mut buf).expect("read exact body");
        buf
    }

    /// Registers and logs in as a fresh user, returning once `LOGIN`
    /// succeeds.
    pub fn register_and_login(&mut self, username: &str, password: &str) {
        self.send(&format!("REGISTER {username} {password}"));
        let reply = self.read_line();
        assert!(reply.starts_with("OK"), "register failed: {reply}");

        self.send(&format!("LOGIN {username} {password}"));
        let reply = self.read_line();
        assert!(reply.starts_with("OK"), "login failed: {reply}");
    }

    /// Runs a full `UPLOAD` exchange for `body`, returning the final
    /// `SUCCESS:`/`ERROR:` line.
    pub fn upload(&mut self, filename: &str, body: &[u8]) -> String {
        self.send(&format!("UPLOAD {filename}"));
        let ready = self.read_line();
        if !ready.starts_with("READY") {
            return ready;
        }
        self.send(&format!("SIZE {}", body.len()));
        let ok = self.read_line();
        if !ok.starts_with("OK") {
            return ok;
        }
        self.send_raw(body);
        self.read_line()
    }

    /// Runs a `LIST` exchange. The wire reply is itself LF-delimited (a
    /// header line, then one line per file), so this reads the header,
    /// parses the file count out of it, and then reads exactly that many
    /// further lines. Returns `(header, file_lines)`.
    pub fn list(&mut self) -> (String, Vec<String>) {
        self.send("LIST");
        let header = self.read_line();
        let count: usize = header
            .split_whitespace()
            .next()
            .and_then(|n| n.parse().ok())
            .expect("LIST header should start with a file count");
        let files = (0..count).map(|_| self.read_line()).collect();
        (header, files)
    }

    /// Runs a full `DOWNLOAD` exchange, returning the body bytes on
    /// success or `None` if the server replied with an error.
    pub fn download(&mut self, filename: &str) -> Option<Vec<u8>> {
        self.send(&format!("DOWNLOAD {filename}"));
        let reply = self.read_line();
        let size: usize = reply.strip_prefix("SIZE: ")?.trim().parse().ok()?;
        Some(self.read_exact(size))
    }
}
