//! # Ingestion Loop
//!
//! Drives the serial link through an explicit state machine and pushes every
//! valid frame through parse → timestamp → persist.
//!
//! ```text
//! Closed ──run()──▶ Opening ──Opened──▶ Listening ──Closed──▶ Closed
//!                      │                    │
//!                      └──open/Error──▶ Faulted ◀──Error──┘
//! ```
//!
//! A reader task owns the port and delivers [`SerialEvent`]s in arrival order
//! over a channel; the loop is their only consumer. Per-frame failures (parse
//! or persist) are logged and counted, never fatal. Serial failures move the
//! loop to [`LoopState::Faulted`] and are returned to the caller.
//!
//! Writes run as spawned tasks. The loop does not wait for them when it
//! stops, and dropping the loop detaches rather than cancels them. Use
//! [`IngestionLoop::settle_within`] to bound how long a caller waits.
//!
//! Each `run` starts from an empty frame buffer; a fragment left over from a
//! previous session is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::frame::FrameReader;
use super::parser;
use super::record::Record;
use super::timestamp::TimestampProvider;
use crate::error::{MeterBridgeError, Result};
use crate::serial::{ByteStream, PortOpener};
use crate::store::Persister;

/// Bytes requested from the port per read
pub const READ_CHUNK_SIZE: usize = 1024;

/// Serial events buffered between the reader task and the loop
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle of the serial connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No serial resource held
    Closed,
    /// Open requested, waiting for confirmation
    Opening,
    /// Consuming chunks
    Listening,
    /// Serial failure; terminal
    Faulted,
}

/// Event delivered by the serial reader task
#[derive(Debug)]
pub enum SerialEvent {
    Opened,
    Chunk(Bytes),
    Error(std::io::Error),
    Closed,
}

/// Collaborators the loop needs, built once at startup
pub struct IngestContext {
    pub opener: Box<dyn PortOpener>,
    pub persister: Persister,
    pub timestamps: TimestampProvider,
}

/// Running counters, shared with in-flight writes
#[derive(Debug, Default)]
pub struct IngestStats {
    frames_received: AtomicU64,
    frames_rejected: AtomicU64,
    records_persisted: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_rejected: u64,
    pub records_persisted: u64,
    pub write_failures: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Aborts the reader task, and with it the port, on every exit path
struct ReaderGuard(JoinHandle<()>);

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Serial-to-store ingestion state machine
pub struct IngestionLoop {
    context: IngestContext,
    link: String,
    frames: FrameReader,
    state: LoopState,
    stats: Arc<IngestStats>,
    in_flight: JoinSet<()>,
}

impl std::fmt::Debug for IngestionLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionLoop")
            .field("link", &self.link)
            .field("state", &self.state)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl IngestionLoop {
    pub fn new(context: IngestContext, frames: FrameReader) -> Self {
        let link = context.opener.describe();
        Self {
            context,
            link,
            frames,
            state: LoopState::Closed,
            stats: Arc::new(IngestStats::default()),
            in_flight: JoinSet::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Writes spawned but not yet reaped
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Open the link and ingest until it closes or fails
    ///
    /// # Returns
    ///
    /// * `Ok(())` - the stream ended and the loop is [`LoopState::Closed`]
    ///
    /// # Errors
    ///
    /// - [`MeterBridgeError::SerialOpen`] if the port cannot be opened
    /// - [`MeterBridgeError::SerialRuntime`] if the link fails while listening
    ///
    /// Both leave the loop in [`LoopState::Faulted`], after which `run` refuses
    /// to start again.
    pub async fn run(&mut self) -> Result<()> {
        if self.state == LoopState::Faulted {
            return Err(MeterBridgeError::SerialRuntime(format!(
                "ingestion loop for {} is faulted",
                self.link
            )));
        }

        self.transition(LoopState::Opening);
        // A fragment left by a previous session must not prefix the new stream
        if !self.frames.residual().is_empty() {
            debug!("Discarding {} buffered bytes before reopening", self.frames.residual().len());
            self.frames.clear();
        }

        let port = match self.context.opener.open() {
            Ok(port) => port,
            Err(e) => {
                error!("Error opening serial port {}: {}", self.link, e);
                self.transition(LoopState::Faulted);
                return Err(e);
            }
        };

        let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let _reader = ReaderGuard(tokio::spawn(read_serial(port, events_tx)));

        let result = self.listen(&mut events_rx).await;
        self.log_summary();
        result
    }

    /// Wait for every spawned write to finish
    pub async fn settle(&mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            if let Err(e) = result {
                warn!("Persist task failed: {}", e);
            }
        }
    }

    /// Wait up to `grace` for spawned writes to finish
    ///
    /// Returns `true` if every write completed in time. Writes still pending
    /// afterwards stay detached.
    pub async fn settle_within(&mut self, grace: Duration) -> bool {
        match tokio::time::timeout(grace, self.settle()).await {
            Ok(()) => true,
            Err(_) => {
                warn!("{} writes still in flight after {:?}", self.in_flight.len(), grace);
                false
            }
        }
    }

    async fn listen(&mut self, events: &mut mpsc::Receiver<SerialEvent>) -> Result<()> {
        while let Some(event) = events.recv().await {
            self.handle_event(event)?;
            if self.state == LoopState::Closed {
                return Ok(());
            }
        }

        warn!("Serial reader for {} stopped without closing", self.link);
        self.transition(LoopState::Closed);
        Ok(())
    }

    fn handle_event(&mut self, event: SerialEvent) -> Result<()> {
        match (self.state, event) {
            (LoopState::Opening, SerialEvent::Opened) => {
                info!("Serial port {} opened. Listening for data...", self.link);
                self.transition(LoopState::Listening);
            }
            (LoopState::Listening, SerialEvent::Chunk(chunk)) => {
                self.process_chunk(&chunk);
            }
            (LoopState::Opening | LoopState::Listening, SerialEvent::Error(e)) => {
                error!("Error on serial port {}: {}", self.link, e);
                self.transition(LoopState::Faulted);
                return Err(MeterBridgeError::SerialRuntime(format!("{}: {}", self.link, e)));
            }
            (LoopState::Opening | LoopState::Listening, SerialEvent::Closed) => {
                info!("Serial port {} closed", self.link);
                self.transition(LoopState::Closed);
            }
            (state, event) => {
                warn!("Ignoring serial event {:?} in state {:?}", event, state);
            }
        }
        Ok(())
    }

    fn process_chunk(&mut self, chunk: &[u8]) {
        self.frames.push(chunk);
        while let Some(frame) = self.frames.next_frame() {
            self.process_frame(&frame);
        }
        self.reap_finished_writes();
    }

    fn process_frame(&mut self, frame: &str) {
        self.stats.frames_received.fetch_add(1, Ordering::Relaxed);
        debug!("Received data: {}", frame.trim());

        let reading = match parser::parse(frame) {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.frames_rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Invalid data received ({}): {:?}", e, frame.trim());
                return;
            }
        };

        let record = Record::new(reading, self.context.timestamps.now());
        let persister = self.context.persister.clone();
        let stats = Arc::clone(&self.stats);

        self.in_flight.spawn(async move {
            match persister.save(&record).await {
                Ok(()) => {
                    stats.records_persisted.fetch_add(1, Ordering::Relaxed);
                    match serde_json::to_string(&record) {
                        Ok(json) => info!("Data saved: {}", json),
                        Err(_) => info!("Data saved: {:?}", record),
                    }
                }
                Err(e) => {
                    stats.write_failures.fetch_add(1, Ordering::Relaxed);
                    error!("Error inserting reading: {}", e);
                }
            }
        });
    }

    fn reap_finished_writes(&mut self) {
        while let Some(result) = self.in_flight.try_join_next() {
            if let Err(e) = result {
                warn!("Persist task failed: {}", e);
            }
        }
    }

    fn transition(&mut self, next: LoopState) {
        debug!("Ingestion loop {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn log_summary(&self) {
        let stats = self.stats.snapshot();
        info!(
            "Ingestion stopped ({:?}): {} frames, {} rejected, {} saved, {} write failures, {} writes in flight",
            self.state,
            stats.frames_received,
            stats.frames_rejected,
            stats.records_persisted,
            stats.write_failures,
            self.in_flight.len()
        );
    }
}

impl Drop for IngestionLoop {
    fn drop(&mut self) {
        // Outstanding writes complete on their own
        self.in_flight.detach_all();
    }
}

/// Reader task: owns the port and turns reads into events
async fn read_serial(mut port: Box<dyn ByteStream>, events: mpsc::Sender<SerialEvent>) {
    if events.send(SerialEvent::Opened).await.is_err() {
        return;
    }

    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let event = match port.read(&mut buf).await {
            Ok(0) => SerialEvent::Closed,
            Ok(n) => SerialEvent::Chunk(Bytes::copy_from_slice(&buf[..n])),
            Err(e) => SerialEvent::Error(e),
        };

        let last = !matches!(event, SerialEvent::Chunk(_));
        if events.send(event).await.is_err() || last {
            break;
        }
    }
}
