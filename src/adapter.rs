//! Debug adapter process supervision.
//!
//! Spawns the debug adapter as a child process with piped stdio, feeds its
//! stdout into a shared [`ProtocolParser`], and relays outgoing protocol
//! messages through a writer task.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};

use crate::error::DapError;
use crate::parser::{connect, ProtocolParser, ReaderHandle};
use crate::protocol::Request;
use crate::transport::encode_message;

/// How the debug adapter process is launched.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Executable to spawn (e.g. `python`).
    pub command: String,
    /// Arguments (e.g. `["-m", "debugpy.adapter"]`).
    pub args: Vec<String>,
    /// Working directory for the adapter, if any.
    pub cwd: Option<PathBuf>,
}

impl AdapterConfig {
    /// Config for a command with arguments, inheriting the current directory.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            cwd: None,
        }
    }
}

/// A supervised debug adapter process and its protocol stream.
pub struct DebugAdapterProcess {
    config: AdapterConfig,
    parser: Arc<Mutex<ProtocolParser>>,
    reader: Option<ReaderHandle>,
    writer_tx: Option<mpsc::Sender<Vec<u8>>>,
    child: Option<Child>,
    next_seq: i64,
}

impl DebugAdapterProcess {
    /// Create a supervisor for the given launch configuration.
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            parser: Arc::new(Mutex::new(ProtocolParser::new())),
            reader: None,
            writer_tx: None,
            child: None,
            next_seq: 1,
        }
    }

    /// The shared protocol parser; subscribe to it before or after `start`.
    pub fn parser(&self) -> Arc<Mutex<ProtocolParser>> {
        self.parser.clone()
    }

    /// The launch configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Whether the adapter process has been started and not shut down.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Spawn the adapter process and wire up its stdio.
    ///
    /// Stdout is connected to the protocol parser; stdin is serviced by a
    /// writer task fed from an internal channel.
    pub async fn start(&mut self) -> Result<(), DapError> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null());
        if let Some(cwd) = &self.config.cwd {
            command.current_dir(cwd);
        }
        let mut child = command.spawn()?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            DapError::SpawnFailed(std::io::Error::other("could not capture stdin"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            DapError::SpawnFailed(std::io::Error::other("could not capture stdout"))
        })?;

        // Writer task: sends framed messages to the adapter.
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
        tokio::spawn(async move {
            while let Some(bytes) = writer_rx.recv().await {
                if stdin.write_all(&bytes).await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        self.reader = Some(connect(self.parser.clone(), stdout));
        self.writer_tx = Some(writer_tx);
        self.child = Some(child);

        tracing::debug!(command = %self.config.command, "debug adapter started");
        Ok(())
    }

    /// Allocate the next sequence number for an outgoing request.
    fn next_seq(&mut self) -> i64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Send a request to the adapter, returning its sequence number.
    pub async fn send_request(
        &mut self,
        command: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<i64, DapError> {
        let seq = self.next_seq();
        let request = Request::new(seq, command, arguments);
        let value = serde_json::to_value(&request)?;
        self.send_message(&value).await?;
        Ok(seq)
    }

    /// Frame and send an arbitrary protocol message to the adapter.
    pub async fn send_message(&self, message: &serde_json::Value) -> Result<(), DapError> {
        let writer_tx = self.writer_tx.as_ref().ok_or(DapError::NotStarted)?;
        writer_tx
            .send(encode_message(message))
            .await
            .map_err(|_| DapError::ChannelClosed)
    }

    /// Stop the adapter: detach the reader, close stdin, reap the child.
    ///
    /// Idempotent; also disposes the parser so late stdout data is ignored.
    pub async fn shutdown(&mut self) {
        self.writer_tx = None;
        if let Some(mut reader) = self.reader.take() {
            reader.detach();
        }
        self.parser.lock().await.dispose();
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
    }
}

impl std::fmt::Debug for DebugAdapterProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugAdapterProcess")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}
