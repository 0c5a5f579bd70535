//! The status server: accept loop, per-connection handling, and lifecycle.
//!
//! Each accepted connection gets exactly one bounded read, one response, and
//! is then closed. Connection-level failures are logged and dropped; they
//! never stop the accept loop.
//!
//! ```rust,ignore
//! let flag = SharedFlag::new(false);
//! let server = StatusServer::bind(&ServerConfig::default(), Arc::new(flag.clone())).await?;
//! let mut handle = server.start();
//! flag.set(true); // host marks its stream as running
//! // ...
//! handle.stop().await;
//! ```

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument as _};
use uuid::Uuid;

use crate::{
    api::{response, StatusEndpoint},
    config::{Config, MonitorMode, ServerConfig, MAX_REQUEST_BYTES_LIMIT},
    error::ServerError,
    monitor::{DirectMonitor, Liveness, PolledMonitor, Poller},
};

/// Delay after a failed `accept()` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// A bound, not yet running, status server.
pub struct StatusServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    endpoint: StatusEndpoint,
    read_timeout: Duration,
    max_request_bytes: usize,
    poller: Option<(Arc<PolledMonitor>, Duration)>,
}

impl StatusServer {
    /// Bind the listener and answer liveness from `liveness`.
    pub async fn bind(
        config: &ServerConfig,
        liveness: Arc<dyn Liveness>,
    ) -> Result<Self, ServerError> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        Ok(Self {
            listener,
            local_addr,
            endpoint: StatusEndpoint::new(liveness),
            read_timeout: config.read_timeout(),
            max_request_bytes: config.max_request_bytes.clamp(1, MAX_REQUEST_BYTES_LIMIT),
            poller: None,
        })
    }

    /// Bind using the marker monitor described by `config.monitor`.
    pub async fn from_config(config: &Config) -> Result<Self, ServerError> {
        let marker = config.monitor.marker();
        let stale_after = config.monitor.stale_after();

        match config.monitor.mode {
            MonitorMode::Poll => {
                let monitor = Arc::new(PolledMonitor::new(marker, stale_after));
                let server = Self::bind(&config.server, Arc::clone(&monitor) as Arc<dyn Liveness>)
                    .await?;
                Ok(server.with_poller(monitor, config.monitor.poll_interval()))
            }
            MonitorMode::Direct => {
                let monitor = DirectMonitor::new(marker, stale_after);
                Self::bind(&config.server, Arc::new(monitor)).await
            }
        }
    }

    /// Run a [`Poller`] for `monitor` for as long as the server runs.
    pub fn with_poller(mut self, monitor: Arc<PolledMonitor>, interval: Duration) -> Self {
        self.poller = Some((monitor, interval));
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the poller (if any) and the accept loop on the current runtime.
    pub fn start(self) -> ServerHandle {
        let poller = self
            .poller
            .map(|(monitor, interval)| Poller::spawn(monitor, interval));

        let shutdown = CancellationToken::new();
        let conn = ConnectionSettings {
            endpoint: self.endpoint,
            read_timeout: self.read_timeout,
            max_request_bytes: self.max_request_bytes,
        };
        let accept_task = tokio::spawn(accept_loop(
            self.listener,
            Arc::new(conn),
            shutdown.clone(),
        ));

        info!(addr = %self.local_addr, "status server listening");

        ServerHandle {
            local_addr: self.local_addr,
            shutdown,
            accept_task: Some(accept_task),
            poller,
        }
    }
}

/// Owner of a running server.
///
/// Dropping the handle cancels the accept loop and the poller without waiting
/// for them; [`stop`](Self::stop) waits.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    accept_task: Option<JoinHandle<()>>,
    poller: Option<Poller>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.accept_task.is_some()
    }

    /// Close the listener and stop the poller. A second call is a no-op.
    pub async fn stop(&mut self) {
        let Some(task) = self.accept_task.take() else {
            return;
        };
        self.shutdown.cancel();
        if let Err(e) = task.await {
            warn!(error = %e, "accept loop ended abnormally");
        }
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        info!(addr = %self.local_addr, "status server stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct ConnectionSettings {
    endpoint: StatusEndpoint,
    read_timeout: Duration,
    max_request_bytes: usize,
}

async fn accept_loop(
    listener: TcpListener,
    conn: Arc<ConnectionSettings>,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                let conn = Arc::clone(&conn);
                let span = tracing::debug_span!("connection", id = %Uuid::new_v4(), %peer);
                tokio::spawn(
                    async move {
                        if let Err(e) = serve_connection(stream, &conn).await {
                            debug!(error = %e, "connection abandoned");
                        }
                    }
                    .instrument(span),
                );
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                if pause_after_accept_error(&shutdown).await {
                    break;
                }
            }
        }
    }
}

/// Pause before accepting again so a persistent error (e.g. fd exhaustion)
/// does not spin. Returns `true` if shutdown was requested meanwhile.
async fn pause_after_accept_error(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => false,
    }
}

/// Read one request, write one response, close.
async fn serve_connection(mut stream: TcpStream, conn: &ConnectionSettings) -> io::Result<()> {
    let mut buf = vec![0u8; conn.max_request_bytes];

    let n = match tokio::time::timeout(conn.read_timeout, stream.read(&mut buf)).await {
        Ok(read) => read?,
        Err(_) => {
            debug!(timeout_ms = conn.read_timeout.as_millis() as u64, "request read timed out");
            return Ok(());
        }
    };
    if n == 0 {
        debug!("client closed before sending a request");
        return Ok(());
    }

    let request = String::from_utf8_lossy(&buf[..n]);
    let request_line = request.lines().next().unwrap_or_default();
    let resp = conn.endpoint.handle(request_line);

    stream.write_all(&response::encode(&resp)).await?;
    stream.shutdown().await
}
