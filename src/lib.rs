//! # trq - Transcript Query Engine
//!
//! trq scans a sharded transcript corpus for records matching a small query
//! language with boolean operators, phrases, wildcards, proximity and
//! co-occurrence constraints, and raw regular expressions.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`query`] - Query parsing and matcher compilation
//! - [`corpus`] - Shard and record types, network fetching
//! - [`cache`] - Persistent shard cache with version invalidation
//! - [`scan`] - Scan coordination and result aggregation
//! - [`session`] - Message-passing execution adapter
//! - [`output`] - Result formatting for the CLI
//!
//! ## Quick Start
//!
//! ```ignore
//! use trq::corpus::{CorpusMeta, HttpShardFetcher};
//! use trq::cache::ShardCache;
//! use trq::query::{parse_and_compile, CompileOptions};
//! use trq::scan::{CancelFlag, ScanCoordinator, ScanOptions, ScanOutcome};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let fetcher = Arc::new(HttpShardFetcher::new("https://corpus.example/data"));
//! let meta = fetcher.fetch_meta().await?;
//! let cache = Arc::new(ShardCache::open("/tmp/trq-shards")?);
//!
//! let matcher = parse_and_compile("alpha NEAR/6 beta", CompileOptions::default())?;
//! let coordinator = ScanCoordinator::new(cache, fetcher, ScanOptions::default());
//!
//! if let ScanOutcome::Complete(result) =
//!     coordinator.scan(&matcher, &meta, &CancelFlag::new(), |_| {}).await
//! {
//!     for (id, count) in &result.counts {
//!         println!("{id}: {count}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod corpus;
pub mod error;
pub mod output;
pub mod progress;
pub mod query;
pub mod scan;
pub mod session;
