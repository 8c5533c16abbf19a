//! Mock edge source for testing and development.
//!
//! This module provides a simulated Wiegand interface that can be driven
//! programmatically, for testing the reader without GPIO hardware.

use crate::{
    ReaderError, Result,
    config::ReaderConfig,
    traits::EdgeSource,
    types::Line,
};
use tokio::sync::mpsc;
use wiegand_core::ParityLayout;
use wiegand_core::constants::MAX_FRAME_BITS;

/// Mock edge source for testing and development.
///
/// Edges are produced by a [`MockEdgeHandle`], which knows the configured
/// line identifiers and turns bits into edges on the matching line.
///
/// # Examples
///
/// ```
/// use wiegand_reader::config::ReaderConfig;
/// use wiegand_reader::mock::MockEdgeSource;
/// use wiegand_reader::traits::EdgeSource;
///
/// #[tokio::main]
/// async fn main() -> wiegand_reader::Result<()> {
///     let config = ReaderConfig::new(13, 14);
///     let (mut source, mut handle) = MockEdgeSource::new(&config);
///
///     handle.send_bit(true).await?;
///     assert_eq!(source.next_edge().await?, 14);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockEdgeSource {
    /// Channel receiver for line identifiers
    edge_rx: mpsc::Receiver<u32>,

    /// Source name
    name: String,
}

impl MockEdgeSource {
    /// Create a mock source for the lines in `config`.
    ///
    /// Returns a tuple of (MockEdgeSource, MockEdgeHandle) where the handle
    /// is used to simulate edges.
    pub fn new(config: &ReaderConfig) -> (Self, MockEdgeHandle) {
        Self::with_name("Mock Wiegand Interface".to_string(), config)
    }

    /// Create a mock source with a custom name.
    pub fn with_name(name: String, config: &ReaderConfig) -> (Self, MockEdgeHandle) {
        // One 64-bit frame fits without backpressure.
        let (edge_tx, edge_rx) = mpsc::channel(MAX_FRAME_BITS as usize);

        let source = Self {
            edge_rx,
            name: name.clone(),
        };

        let handle = MockEdgeHandle {
            edge_tx,
            name,
            config: config.clone(),
            edges_sent: 0,
        };

        (source, handle)
    }
}

impl EdgeSource for MockEdgeSource {
    async fn next_edge(&mut self) -> Result<u32> {
        self.edge_rx
            .recv()
            .await
            .ok_or_else(|| ReaderError::disconnected(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for driving a mock edge source.
///
/// Dropping every handle disconnects the source.
#[derive(Debug, Clone)]
pub struct MockEdgeHandle {
    /// Channel sender for line identifiers
    edge_tx: mpsc::Sender<u32>,

    /// Source name
    name: String,

    /// Line identifiers of the reader being simulated
    config: ReaderConfig,

    /// Edges sent through this handle
    edges_sent: usize,
}

impl MockEdgeHandle {
    /// Send a falling edge on an arbitrary line identifier.
    ///
    /// Useful for simulating noise on a line the reader does not watch.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has been dropped.
    pub async fn send_edge(&mut self, line: u32) -> Result<()> {
        self.edge_tx
            .send(line)
            .await
            .map_err(|_| ReaderError::disconnected(self.name.clone()))?;
        self.edges_sent += 1;
        Ok(())
    }

    /// Send a falling edge on one of the data lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has been dropped.
    pub async fn send_line(&mut self, line: Line) -> Result<()> {
        self.send_edge(self.config.id_of(line)).await
    }

    /// Send one bit.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has been dropped.
    pub async fn send_bit(&mut self, bit: bool) -> Result<()> {
        self.send_line(Line::for_bit(bit)).await
    }

    /// Send a sequence of bits in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has been dropped.
    pub async fn send_bits(&mut self, bits: &[bool]) -> Result<()> {
        for &bit in bits {
            self.send_bit(bit).await?;
        }
        Ok(())
    }

    /// Send the low `bit_count` bits of `raw`, most significant first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bit_count` is zero or wider than 64 bits
    /// - the source has been dropped
    pub async fn send_frame(&mut self, raw: u64, bit_count: u32) -> Result<()> {
        if bit_count == 0 || bit_count > MAX_FRAME_BITS {
            return Err(ReaderError::invalid_data(format!(
                "Frame must be 1-{MAX_FRAME_BITS} bits, got {bit_count}"
            )));
        }
        for i in (0..bit_count).rev() {
            self.send_bit((raw >> i) & 1 == 1).await?;
        }
        Ok(())
    }

    /// Present a card encoded with `layout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields do not fit the layout or the source
    /// has been dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_reader::config::ReaderConfig;
    /// use wiegand_reader::mock::MockEdgeSource;
    /// use wiegand_core::ParityLayout;
    ///
    /// #[tokio::main]
    /// async fn main() -> wiegand_reader::Result<()> {
    ///     let (_source, mut handle) = MockEdgeSource::new(&ReaderConfig::new(0, 1));
    ///     handle.present_card(ParityLayout::H10301, 5, 1234).await?;
    ///     assert_eq!(handle.edges_sent(), 26);
    ///     Ok(())
    /// }
    /// ```
    pub async fn present_card(
        &mut self,
        layout: ParityLayout,
        facility: u64,
        number: u64,
    ) -> Result<()> {
        let raw = layout.encode(facility, number)?;
        self.send_frame(raw, layout.bit_count()).await
    }

    /// Get the source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of edges sent through this handle.
    pub fn edges_sent(&self) -> usize {
        self.edges_sent
    }
}
