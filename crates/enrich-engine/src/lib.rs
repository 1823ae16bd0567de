//! Fragment enrichment engine.
//!
//! For one record and reporting period the [`Orchestrator`] fetches every
//! fragment not yet captured, concurrently, commits each result the moment
//! it arrives, and then derives the summary and status from whatever the
//! store holds. [`BatchRunner`] drives the orchestrator over a worklist, one
//! record at a time.
//!
//! Remote access goes through the [`Transport`] trait; [`HttpTransport`] is
//! the production implementation.

#![allow(async_fn_in_trait)]

pub mod batch;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod tracker;
pub mod transport;

pub use batch::{BatchReport, BatchRunner, Pacing};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use fetcher::{FetchOutcome, FragmentFetcher, FragmentResult, RetryPolicy};
pub use orchestrator::{EnrichmentReport, Orchestrator};
pub use tracker::ManifestTracker;
pub use transport::{
  FragmentRequest, HttpConfig, HttpTransport, RawResponse, Transport, TransportError,
};

#[cfg(test)]
mod fake;
