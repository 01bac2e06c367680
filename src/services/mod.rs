//! Services
//!
//! Business logic of the analyzer. The CLI and any embedding host call into
//! these through [`AnalysisService`].

pub mod analysis;
pub mod cancellation;
pub mod chunker;
pub mod events;
pub mod log_signature;
pub mod prompt;

pub use analysis::{AnalysisService, AnalysisStatus, CostEstimate, HttpProviderFactory};
pub use cancellation::{check_cancelled, CancellationRegistry, CancellationToken};
pub use chunker::{Chunk, ChunkPlan};
pub use events::{AnalysisEventStream, JsonLinesSink, OutputFormat, VecSink};
