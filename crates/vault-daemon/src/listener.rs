//! The accept loop and the five-step shutdown sequence.
//!
//! `TcpListener::accept` has no native cancellation, so the listener is put
//! in non-blocking mode and polled against a shutdown flag on a short
//! interval; this is the same flag [`install_shutdown_handler`] flips from
//! a `SIGINT`/`SIGTERM` handler.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Socket, Type};
use tracing::{info, warn};
use vault_core::VaultConfig;

use crate::connection::Connection;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Binds the listening socket with `SO_REUSEADDR` set, matching the
/// original prototype's `setsockopt(SO_REUSEADDR)` call so a restarted
/// daemon does not fail to bind while the previous socket drains
/// `TIME_WAIT`.
pub fn bind(config: &VaultConfig) -> std::io::Result<TcpListener> {
    let address: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&address.into())?;
    socket.listen(config.listen_backlog as i32)?;
    let listener: TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Installs a `SIGINT`/`SIGTERM` handler that flips the returned flag.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be registered.
pub fn install_shutdown_handler() -> Result<Arc<AtomicBool>, std::io::Error> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&flag))?;
    Ok(flag)
}

/// Accepts connections until `shutdown` is set, pushing each one onto
/// `connection_queue` without blocking: a queue that is momentarily full is
/// the admission-control signal named by the specification, so a new
/// connection is refused (and the socket dropped) rather than the accept
/// loop stalling.
pub fn run_accept_loop(
    listener: &TcpListener,
    connection_queue: &vault_queue::BoundedQueue<Connection>,
    shutdown: &AtomicBool,
) {
    info!("accept loop started");
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!(error = %e, "failed to restore blocking mode on accepted socket");
                    continue;
                }
                match connection_queue.try_push(Connection::new(stream, peer)) {
                    Ok(Ok(())) => {}
                    Ok(Err(_rejected)) => {
                        warn!(%peer, "connection queue full, refusing connection");
                    }
                    Err(_shutting_down) => {
                        info!("connection queue shut down, stopping accept loop");
                        break;
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
    info!("accept loop stopping");
}
