//! JSON lines on stdin/stdout, standing in for the device API and the state broadcast.
//!
//! Every inbound line is one [`HeatingInput`], either read from stdin or from the output of a
//! polled command. Outbound lines are `{"action": ...}` for commands and `{"state": ...}` for
//! snapshots. Both directions use camelCase field names.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::{Mutex, mpsc, watch},
};
use tokio_util::sync::CancellationToken;

use super::{ClimateApi, UpdateSource};
use crate::heating::ClimateAction;
use crate::state::DeepHeatingState;
use crate::system::HeatingInput;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum OutboundLine<'a> {
    Action(&'a ClimateAction),
    State(&'a DeepHeatingState),
}

pub struct JsonLinesSource<R> {
    reader: R,
    sender: mpsc::Sender<HeatingInput>,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R, sender: mpsc::Sender<HeatingInput>) -> Self {
        Self { reader, sender }
    }

    /// Forwards inputs until the reader is exhausted.
    pub async fn run(self, token: CancellationToken) {
        let mut lines = self.reader.lines();

        loop {
            let line = tokio::select! {
                _ = token.cancelled() => break,
                line = lines.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("Input stream ended");
                    break;
                }
                Err(e) => {
                    tracing::error!("Error reading input stream: {}", e);
                    break;
                }
            };

            let Some(input) = decode_line(&line) else {
                continue;
            };

            if let Err(e) = self.sender.send(input).await {
                tracing::error!("Heating system is gone, stopping input: {}", e);
                break;
            }
        }
    }
}

fn decode_line(line: &str) -> Option<HeatingInput> {
    if line.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(line) {
        Ok(input) => Some(input),
        Err(e) => {
            tracing::warn!("Ignoring undecodable input line {:?}: {}", line, e);
            None
        }
    }
}

/// Runs a program on every poll and reads one input per line of its output.
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(command: &[String]) -> anyhow::Result<Self> {
        let (program, args) = command.split_first().context("Poll command is empty")?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl UpdateSource for CommandSource {
    fn name(&self) -> &str {
        &self.program
    }

    async fn fetch(&mut self) -> anyhow::Result<Vec<HeatingInput>> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Error starting {}", self.program))?;

        if !output.status.success() {
            anyhow::bail!("{} exited with {}", self.program, output.status);
        }

        let stdout = String::from_utf8(output.stdout)?;
        Ok(stdout.lines().filter_map(decode_line).collect())
    }
}

/// Writes commands and snapshots as JSON lines. Cloned handles share one writer.
pub struct JsonLinesSink<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for JsonLinesSink<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    async fn write_line(&self, line: &OutboundLine<'_>) -> anyhow::Result<()> {
        let mut json = serde_json::to_vec(line)?;
        json.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&json).await?;
        writer.flush().await?;

        Ok(())
    }

    /// Writes the current snapshot and every later one until the system stops.
    pub async fn publish_state(self, mut state: watch::Receiver<DeepHeatingState>, token: CancellationToken) {
        loop {
            let snapshot = state.borrow_and_update().clone();
            if let Err(e) = self.write_line(&OutboundLine::State(&snapshot)).await {
                tracing::error!("Error writing state snapshot: {:?}", e);
            }

            tokio::select! {
                _ = token.cancelled() => break,
                changed = state.changed() => {
                    if changed.is_err() {
                        tracing::info!("State channel closed, stopping state output");
                        break;
                    }
                }
            }
        }
    }
}

impl<W: AsyncWrite + Unpin + Send + 'static> ClimateApi for JsonLinesSink<W> {
    async fn apply(&self, action: &ClimateAction) -> anyhow::Result<()> {
        self.write_line(&OutboundLine::Action(action)).await
    }
}
