//! Per-player connection pump.
//!
//! A [`Connection`] owns two tasks bound to one transport: an inbound loop that
//! decodes JSON envelopes and hands them to the room one at a time, and an
//! outbound loop that drains a bounded queue into the transport. Either loop
//! failing fires the removal callback, at most once per connection.
//!
//! Releasing a connection never cancels a payload mid-flight: the read loop
//! only checks for release between frames.

use futures::future::BoxFuture;
use futures::{Sink, Stream, StreamExt};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::oneshot;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

/// A decoded inbound message with its `event` field still in place.
pub type Envelope = Map<String, Value>;

/// Called for every inbound envelope; the next frame is read only after the
/// returned future completes.
pub type PayloadHandler = Arc<dyn Fn(Envelope) -> BoxFuture<'static, ()> + Send + Sync>;

pub type ConnectionId = Uuid;

const DEFAULT_OUTBOUND_CAPACITY: usize = 64;
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// One frame read off the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close,
}

impl From<warp::ws::Message> for Frame {
    fn from(message: warp::ws::Message) -> Self {
        if message.is_close() {
            Frame::Close
        } else if message.is_ping() {
            Frame::Ping
        } else if message.is_pong() {
            Frame::Pong
        } else if let Ok(text) = message.to_str() {
            Frame::Text(text.to_owned())
        } else {
            Frame::Binary(message.into_bytes())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Payloads buffered before `send` starts waiting
    pub outbound_capacity: usize,
    /// How long `send` waits on a full queue before the peer is dropped
    pub send_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection for '{0}' is closed")]
    Closed(String),
    #[error("'{player}' did not drain its queue within {timeout:?}")]
    SendTimeout { player: String, timeout: Duration },
}

/// Fires the removal callback once, on its own task.
struct RemovalLatch {
    fired: AtomicBool,
    on_close: Mutex<Option<BoxFuture<'static, ()>>>,
}

impl RemovalLatch {
    fn new(on_close: BoxFuture<'static, ()>) -> Self {
        Self {
            fired: AtomicBool::new(false),
            on_close: Mutex::new(Some(on_close)),
        }
    }

    fn fire(&self) {
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        let callback = self
            .on_close
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or_else(|poisoned| poisoned.into_inner().take());
        if let Some(callback) = callback {
            tokio::spawn(callback);
        }
    }

    fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Cheap, cloneable sending half of a connection.
///
/// Rooms snapshot these under their lock and send after releasing it.
#[derive(Clone)]
pub struct Outbound {
    player: Arc<str>,
    queue: mpsc::Sender<String>,
    send_timeout: Duration,
    latch: Arc<RemovalLatch>,
}

impl Outbound {
    pub fn player(&self) -> &str {
        &self.player
    }

    /// Queues a payload for the write loop.
    ///
    /// Waits while the queue is full. A peer that stays full for longer than
    /// the send timeout is treated as gone and its removal fires.
    pub async fn send(&self, payload: String) -> Result<(), ConnectionError> {
        match self.queue.send_timeout(payload, self.send_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!(
                    player = %self.player,
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "slow consumer, closing connection"
                );
                self.latch.fire();
                Err(ConnectionError::SendTimeout {
                    player: self.player.to_string(),
                    timeout: self.send_timeout,
                })
            }
            Err(SendTimeoutError::Closed(_)) => {
                Err(ConnectionError::Closed(self.player.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbound")
            .field("player", &self.player)
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

/// Handle to a running connection pump.
///
/// Dropping it closes the outbound queue, which ends the write loop, and
/// stops the read loop before it takes the next frame.
pub struct Connection {
    id: ConnectionId,
    outbound: Outbound,
    // dropped with the handle; the read loop sees the channel close
    _release: oneshot::Sender<()>,
}

impl Connection {
    /// Starts both loops. Must be called from within a tokio runtime.
    ///
    /// `on_close` receives the new connection's id and builds the removal
    /// future; it is only polled if removal actually fires.
    pub fn spawn<R, W, E, C>(
        player: &str,
        reader: R,
        writer: W,
        on_payload: PayloadHandler,
        on_close: C,
        options: ConnectionOptions,
    ) -> Self
    where
        R: Stream<Item = Result<Frame, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
        W: Sink<String> + Send + Unpin + 'static,
        W::Error: Display + Send,
        C: FnOnce(ConnectionId) -> BoxFuture<'static, ()>,
    {
        let id = Uuid::new_v4();
        let player: Arc<str> = Arc::from(player);
        let latch = Arc::new(RemovalLatch::new(on_close(id)));
        let (queue, rx) = mpsc::channel(options.outbound_capacity.max(1));
        let (release, released) = oneshot::channel();

        tokio::spawn(read_loop(
            Arc::clone(&player),
            reader,
            on_payload,
            Arc::clone(&latch),
            released,
        ));
        tokio::spawn(write_loop(Arc::clone(&player), writer, rx, Arc::clone(&latch)));

        Self {
            id,
            outbound: Outbound {
                player,
                queue,
                send_timeout: options.send_timeout,
                latch,
            },
            _release: release,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn player(&self) -> &str {
        self.outbound.player()
    }

    pub fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }

    pub async fn send(&self, payload: String) -> Result<(), ConnectionError> {
        self.outbound.send(payload).await
    }

    /// True once either loop (or a send timeout) has triggered removal.
    pub fn is_closing(&self) -> bool {
        self.outbound.latch.has_fired()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("player", &self.player())
            .finish()
    }
}

pub fn decode(bytes: &[u8]) -> Result<Envelope, serde_json::Error> {
    serde_json::from_slice(bytes)
}

async fn read_loop<R, E>(
    player: Arc<str>,
    mut reader: R,
    on_payload: PayloadHandler,
    latch: Arc<RemovalLatch>,
    mut released: oneshot::Receiver<()>,
) where
    R: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = &mut released => {
                tracing::debug!(player = %player, "connection released, stopping read loop");
                return;
            }
            next = reader.next() => next,
        };
        let Some(next) = next else {
            break;
        };
        let decoded = match next {
            Ok(Frame::Text(text)) => decode(text.as_bytes()),
            Ok(Frame::Binary(bytes)) => decode(&bytes),
            Ok(Frame::Ping | Frame::Pong) => continue,
            Ok(Frame::Close) => {
                tracing::debug!(player = %player, "peer closed connection");
                break;
            }
            Err(err) => {
                tracing::debug!(player = %player, error = %err, "read failed");
                break;
            }
        };

        match decoded {
            Ok(envelope) => on_payload(envelope).await,
            Err(err) => {
                tracing::warn!(player = %player, error = %err, "undecodable message");
                break;
            }
        }
    }
    latch.fire();
}

async fn write_loop<W>(
    player: Arc<str>,
    writer: W,
    rx: mpsc::Receiver<String>,
    latch: Arc<RemovalLatch>,
) where
    W: Sink<String> + Unpin,
    W::Error: Display,
{
    let outcome = ReceiverStream::new(rx)
        .map(Ok::<String, W::Error>)
        .forward(writer)
        .await;
    if let Err(err) = outcome {
        tracing::warn!(player = %player, error = %err, "write failed");
        latch.fire();
    }
}
