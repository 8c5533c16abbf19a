//! Enum wrappers for edge source dispatch.
//!
//! Native `async fn` in traits (RPITIT, Rust Edition 2024) is not
//! object-safe, so the reader cannot hold a `Box<dyn EdgeSource>`. The enum
//! below gives it one concrete type to store while each variant keeps its
//! own implementation.
//!
//! # Examples
//!
//! ```
//! use wiegand_reader::config::ReaderConfig;
//! use wiegand_reader::devices::AnyEdgeSource;
//! use wiegand_reader::mock::MockEdgeSource;
//! use wiegand_reader::traits::EdgeSource;
//!
//! let (source, _handle) = MockEdgeSource::new(&ReaderConfig::new(13, 14));
//! let any_source = AnyEdgeSource::Mock(source);
//! assert_eq!(any_source.name(), "Mock Wiegand Interface");
//! ```

use crate::Result;
use crate::mock::MockEdgeSource;
use crate::traits::EdgeSource;

/// Enum wrapper for edge source dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyEdgeSource {
    /// Mock interface for development and testing.
    Mock(MockEdgeSource),
}

impl EdgeSource for AnyEdgeSource {
    async fn next_edge(&mut self) -> Result<u32> {
        match self {
            Self::Mock(source) => source.next_edge().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Mock(source) => source.name(),
        }
    }
}

impl From<MockEdgeSource> for AnyEdgeSource {
    fn from(source: MockEdgeSource) -> Self {
        Self::Mock(source)
    }
}
