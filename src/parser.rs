//! Streaming decoder for the DAP wire format.
//!
//! [`ProtocolParser`] consumes arbitrarily-chunked bytes from a debug
//! adapter's stdout, reassembles Content-Length framed JSON messages, and
//! dispatches each one to registered listeners:
//!
//! 1. `data` — for every decoded message.
//! 2. `event_<name>` / `request_<command>` / `response_<command>` — for the
//!    three standard message types.
//! 3. `<type>` — for messages whose type is none of the above.
//!
//! All processing of a chunk completes synchronously inside [`feed`], so
//! dispatch order exactly matches byte-arrival order.
//!
//! [`feed`]: ProtocolParser::feed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::DapError;
use crate::protocol::{kind_event_name, DATA_EVENT};
use crate::registry::ListenerRegistry;
use crate::transport::{CONTENT_LENGTH, HEADER_TERMINATOR, LINE_SEPARATOR};

/// Read buffer size for the stream pump.
const READ_CHUNK_SIZE: usize = 8192;

/// Frame extraction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Scanning the buffer for a complete header block.
    AwaitingHeader,
    /// Header consumed; waiting for this many body bytes.
    AwaitingBody(usize),
}

/// Streaming DAP message decoder with a listener registry.
pub struct ProtocolParser {
    buffer: Vec<u8>,
    state: DecodeState,
    listeners: ListenerRegistry,
    disposed: Arc<AtomicBool>,
}

impl ProtocolParser {
    /// Create a decoder with an empty buffer and no listeners.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: DecodeState::AwaitingHeader,
            listeners: ListenerRegistry::new(),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a persistent listener for a named event.
    ///
    /// Returns the parser to allow chaining. Multiple listeners for the same
    /// name all fire, in registration order.
    pub fn on(
        &mut self,
        event: impl Into<String>,
        listener: impl FnMut(&serde_json::Value) + Send + 'static,
    ) -> &mut Self {
        self.listeners.on(event, listener);
        self
    }

    /// Register a listener that fires at most once, then is removed.
    pub fn once(
        &mut self,
        event: impl Into<String>,
        listener: impl FnMut(&serde_json::Value) + Send + 'static,
    ) -> &mut Self {
        self.listeners.once(event, listener);
        self
    }

    /// Consume one chunk of raw bytes from the stream.
    ///
    /// Appends the chunk to the internal buffer and extracts every complete
    /// frame already buffered before returning. Chunks arriving after
    /// disposal are ignored entirely.
    ///
    /// # Errors
    ///
    /// Fails fast on a `Content-Length` value that does not parse as a
    /// non-negative integer, and on a frame body that is not UTF-8 JSON.
    /// The decoder performs no recovery; the stream driver owns the failure.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), DapError> {
        if self.is_disposed() {
            return Ok(());
        }
        self.buffer.extend_from_slice(chunk);
        loop {
            // A listener may have disposed the parser mid-dispatch.
            if self.is_disposed() {
                break;
            }
            let progressed = match self.state {
                DecodeState::AwaitingBody(length) => self.take_body(length)?,
                DecodeState::AwaitingHeader => self.take_header()?,
            };
            if !progressed {
                break;
            }
        }
        Ok(())
    }

    /// Mark the decoder disposed. Idempotent.
    ///
    /// Already-registered listeners stay registered but never fire again,
    /// because no further data is consumed.
    pub fn dispose(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Whether [`dispose`](ProtocolParser::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// A cloneable handle sharing this parser's disposed flag.
    ///
    /// Lets a listener callback dispose the parser from within dispatch,
    /// where no `&mut` access to the parser exists.
    pub fn dispose_handle(&self) -> DisposeHandle {
        DisposeHandle {
            disposed: self.disposed.clone(),
        }
    }

    /// Try to consume a complete header block from the front of the buffer.
    ///
    /// Returns `Ok(false)` when the terminator has not arrived yet. A header
    /// block without a recognizable `Content-Length` line is consumed and
    /// scanning continues.
    fn take_header(&mut self) -> Result<bool, DapError> {
        let Some(idx) = find_terminator(&self.buffer) else {
            return Ok(false);
        };
        let header = String::from_utf8_lossy(&self.buffer[..idx]).into_owned();
        self.buffer.drain(..idx + HEADER_TERMINATOR.len());

        // Keys are case-sensitive and must be followed by a colon and at
        // least one space; the last matching line wins when duplicated.
        let mut length_value: Option<String> = None;
        for line in header.split(LINE_SEPARATOR) {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            if key != CONTENT_LENGTH || !value.starts_with(' ') {
                continue;
            }
            length_value = Some(value.trim().to_string());
        }

        if let Some(value) = length_value {
            let length = value
                .parse::<usize>()
                .map_err(|_| DapError::InvalidContentLength { value })?;
            self.state = DecodeState::AwaitingBody(length);
        }
        Ok(true)
    }

    /// Try to consume a complete body of `length` bytes from the buffer.
    ///
    /// Returns `Ok(false)` when not enough bytes are buffered. A zero-length
    /// body is framed but not dispatched.
    fn take_body(&mut self, length: usize) -> Result<bool, DapError> {
        if self.buffer.len() < length {
            return Ok(false);
        }
        let body: Vec<u8> = self.buffer.drain(..length).collect();
        self.state = DecodeState::AwaitingHeader;
        if body.is_empty() {
            return Ok(true);
        }
        let text = std::str::from_utf8(&body)?;
        let message: serde_json::Value = serde_json::from_str(text)?;
        self.dispatch(&message);
        Ok(true)
    }

    /// Emit the kind-specific event (if any), then the generic `data` event.
    fn dispatch(&mut self, message: &serde_json::Value) {
        if let Some(name) = kind_event_name(message) {
            self.listeners.emit(&name, message);
        }
        self.listeners.emit(DATA_EVENT, message);
    }
}

impl Default for ProtocolParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of the first header terminator in `buffer`, if present.
fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Shared disposal flag for a [`ProtocolParser`].
#[derive(Debug, Clone)]
pub struct DisposeHandle {
    disposed: Arc<AtomicBool>,
}

impl DisposeHandle {
    /// Dispose the parser this handle belongs to. Idempotent.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Whether the parser has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Attach a shared parser to a readable byte source.
///
/// Spawns a pump task that reads chunks from `stream` and feeds them to the
/// parser until EOF, a read error, a decode error, or disposal. Decode
/// errors are fatal for the stream: the pump logs them and stops.
///
/// The returned [`ReaderHandle`] owns the subscription; dropping it or
/// calling [`detach`](ReaderHandle::detach) stops the pump.
pub fn connect<R>(parser: Arc<Mutex<ProtocolParser>>, stream: R) -> ReaderHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut stream = stream;
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    let mut parser = parser.lock().await;
                    if parser.is_disposed() {
                        break;
                    }
                    if let Err(err) = parser.feed(&chunk[..n]) {
                        tracing::error!("protocol stream decode failed: {err}");
                        break;
                    }
                }
                Err(err) => {
                    tracing::debug!("protocol stream closed: {err}");
                    break;
                }
            }
        }
    });
    ReaderHandle { task: Some(task) }
}

/// Owned subscription to a connected stream.
///
/// Released exactly once: the first `detach` (or drop) aborts the pump task,
/// later calls are no-ops.
#[derive(Debug)]
pub struct ReaderHandle {
    task: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Stop pumping the stream. Idempotent.
    pub fn detach(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the pump task is still owned by this handle.
    pub fn is_attached(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.detach();
    }
}
