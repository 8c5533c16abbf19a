//! Tokio driver for a Wiegand interface.
//!
//! This module wires an [`EdgeSource`] and a [`TokioTimer`] to a
//! [`FrameDecoder`] and runs them as background tasks.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  line id  ┌──────────────┐  card  ┌──────────────┐
//! │ Edge task  │──────────►│              │───────►│ handler      │
//! └────────────┘  on_edge  │ FrameDecoder │        ├──────────────┤
//! ┌────────────┐           │              │───────►│ card channel │──► ReaderHandle::recv
//! │ Timer task │──────────►│              │        ├──────────────┤
//! └────────────┘  on_tick  └──────────────┘───────►│ poll slot    │──► ReaderHandle::poll
//!                                                  └──────────────┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use wiegand_reader::config::ReaderConfig;
//! use wiegand_reader::devices::AnyEdgeSource;
//! use wiegand_reader::mock::MockEdgeSource;
//! use wiegand_reader::reader::WiegandReader;
//!
//! #[tokio::main]
//! async fn main() -> wiegand_reader::Result<()> {
//!     let config = ReaderConfig::new(13, 14);
//!     let (source, _edges) = MockEdgeSource::new(&config);
//!
//!     let mut reader = WiegandReader::new(config)?.with_handler(|card| {
//!         println!("Card read: {card}");
//!     });
//!     reader.register_source(AnyEdgeSource::Mock(source));
//!
//!     let mut handle = reader.start()?;
//!     while let Some(mut card) = handle.recv().await {
//!         if card.parse(None) {
//!             println!("Facility {:?}, number {:?}", card.facility(), card.number());
//!         }
//!     }
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use wiegand_core::CardRecord;

use crate::config::ReaderConfig;
use crate::decoder::FrameDecoder;
use crate::devices::AnyEdgeSource;
use crate::sink::CardHandler;
use crate::timer::TokioTimer;
use crate::traits::EdgeSource;
use crate::{ReaderError, Result};

/// Completed cards buffered for [`ReaderHandle::recv`] before new ones are
/// dropped from the stream. Dropped cards are still visible through polling.
const CARD_CHANNEL_CAPACITY: usize = 32;

/// Builder for a running Wiegand reader.
///
/// # Lifecycle
///
/// 1. Create the reader with a configuration
/// 2. Register an edge source and, optionally, a completion handler
/// 3. Call `start()` to spawn the edge and timer tasks
/// 4. Use the returned handle to receive or poll cards
/// 5. Call `shutdown()` on the handle to stop the tasks
pub struct WiegandReader {
    config: ReaderConfig,
    source: Option<AnyEdgeSource>,
    handler: Option<CardHandler>,
}

impl WiegandReader {
    /// Create a reader.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Configuration` if the configuration is invalid.
    pub fn new(config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source: None,
            handler: None,
        })
    }

    /// Register the edge source to read from.
    pub fn register_source(&mut self, source: AnyEdgeSource) {
        self.source = Some(source);
    }

    /// Call `handler` with every completed, unparsed card.
    ///
    /// The handler runs on the timer task and must not block.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(CardRecord) + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Spawn the edge and timer tasks and return a handle to them.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Configuration` if no edge source is registered.
    pub fn start(mut self) -> Result<ReaderHandle> {
        let source = self
            .source
            .take()
            .ok_or_else(|| ReaderError::configuration("No edge source registered"))?;

        let (card_tx, card_rx) = mpsc::channel(CARD_CHANNEL_CAPACITY);
        let user_handler = self.handler.take();
        let handler = move |card: CardRecord| {
            if let Err(mpsc::error::TrySendError::Full(_)) = card_tx.try_send(card.clone()) {
                warn!("Card channel full, card only available through poll");
            }
            if let Some(handler) = &user_handler {
                // The tick loop outlives handler panics.
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(card)));
                if let Err(payload) = outcome {
                    warn!(reason = panic_message(&*payload), "Card handler panicked");
                }
            }
        };

        let (timer, ticks) = TokioTimer::new(self.config.timer_id);
        let decoder = Arc::new(FrameDecoder::with_handler(timer, &self.config, handler)?);

        info!(
            source = source.name(),
            data0 = self.config.data0_line,
            data1 = self.config.data1_line,
            interval_ms = self.config.sample_interval_ms,
            timer_id = ?self.config.timer_id,
            "Starting Wiegand reader"
        );

        let mut tasks = JoinSet::new();
        tasks.spawn(Self::edge_task(source, self.config, Arc::clone(&decoder)));

        let tick_decoder = Arc::clone(&decoder);
        tasks.spawn(async move {
            ticks
                .run(move || {
                    tick_decoder.on_tick();
                })
                .await;
            Ok(())
        });

        Ok(ReaderHandle {
            decoder,
            card_rx,
            tasks,
        })
    }

    async fn edge_task(
        mut source: AnyEdgeSource,
        config: ReaderConfig,
        decoder: Arc<FrameDecoder<TokioTimer>>,
    ) -> Result<()> {
        loop {
            let id = match source.next_edge().await {
                Ok(id) => id,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Edge source failed");
                    return Err(e);
                }
            };

            match config.line_for(id) {
                Ok(line) => decoder.on_edge(line),
                Err(e) => warn!(error = %e, "Ignoring edge"),
            }
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Handle to a running Wiegand reader.
///
/// Cards can be consumed as a stream with [`recv`](Self::recv), or sampled
/// with [`poll`](Self::poll); both see every completed frame.
pub struct ReaderHandle {
    decoder: Arc<FrameDecoder<TokioTimer>>,
    card_rx: mpsc::Receiver<CardRecord>,
    tasks: JoinSet<Result<()>>,
}

impl ReaderHandle {
    /// Latest card and the number of frames completed so far.
    pub fn poll(&self) -> (Option<CardRecord>, u64) {
        self.decoder.poll()
    }

    /// Wait for the next completed card.
    pub async fn recv(&mut self) -> Option<CardRecord> {
        self.card_rx.recv().await
    }

    /// Wait for the next completed card, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Timeout` if no card completes in time.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<CardRecord> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(timeout, self.card_rx.recv()).await {
            Ok(Some(card)) => Ok(card),
            Ok(None) => Err(ReaderError::disconnected("card channel")),
            Err(_) => Err(ReaderError::timeout(millis)),
        }
    }

    /// The decoder driven by this reader.
    pub fn decoder(&self) -> &FrameDecoder<TokioTimer> {
        &self.decoder
    }

    /// Stop the edge and timer tasks.
    ///
    /// Task errors (such as a disconnected edge source) are logged, not
    /// returned.
    pub async fn shutdown(mut self) -> Result<()> {
        self.tasks.abort_all();

        let mut error_count = 0;
        let mut panic_count = 0;

        while let Some(result) = self.tasks.join_next().await {
            match Self::classify_task_result(result) {
                TaskTermination::Success | TaskTermination::Cancelled => {}
                TaskTermination::Error => error_count += 1,
                TaskTermination::Panic => panic_count += 1,
            }
        }

        if error_count + panic_count > 0 {
            warn!(error_count, panic_count, "Reader tasks ended abnormally");
        }
        info!(frames = self.decoder.sink().sequence(), "Wiegand reader stopped");
        Ok(())
    }

    /// Classify the termination status of a task.
    fn classify_task_result(
        result: std::result::Result<Result<()>, tokio::task::JoinError>,
    ) -> TaskTermination {
        match result {
            Ok(Ok(())) => TaskTermination::Success,
            Ok(Err(_)) => TaskTermination::Error,
            Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
            Err(_) => TaskTermination::Panic,
        }
    }
}

/// Task termination classification for shutdown handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    /// Task completed successfully.
    Success,
    /// Task returned an error.
    Error,
    /// Task was cancelled (expected during shutdown).
    Cancelled,
    /// Task panicked.
    Panic,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEdgeSource;

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = WiegandReader::new(ReaderConfig::new(1, 1));
        assert!(matches!(result, Err(ReaderError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_start_without_source_fails() {
        let reader = WiegandReader::new(ReaderConfig::new(1, 2)).unwrap();
        assert!(!reader.has_source());
        assert!(reader.start().is_err());
    }

    #[tokio::test]
    async fn test_register_source() {
        let config = ReaderConfig::new(1, 2);
        let (source, _handle) = MockEdgeSource::new(&config);
        let mut reader = WiegandReader::new(config).unwrap();
        reader.register_source(source.into());

        assert!(reader.has_source());
        assert_eq!(reader.config().data1_line, 2);
    }

    #[tokio::test]
    async fn test_shutdown_idle_reader() {
        let config = ReaderConfig::new(1, 2);
        let (source, _edges) = MockEdgeSource::new(&config);
        let mut reader = WiegandReader::new(config).unwrap();
        reader.register_source(source.into());

        let handle = reader.start().unwrap();
        assert_eq!(handle.poll(), (None, 0));
        handle.shutdown().await.unwrap();
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static message");

        let payload = panic::catch_unwind(|| panic!("card {}", 7)).unwrap_err();
        assert_eq!(panic_message(&*payload), "card 7");

        let payload = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }

    #[test]
    fn test_classify_task_result() {
        assert_eq!(
            ReaderHandle::classify_task_result(Ok(Ok(()))),
            TaskTermination::Success
        );
        assert_eq!(
            ReaderHandle::classify_task_result(Ok(Err(ReaderError::timeout(1)))),
            TaskTermination::Error
        );
    }
}
