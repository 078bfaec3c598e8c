//! Service layer modules for external integrations.
//!
//! Contains the envelope codec, the upstream admin API client and the report
//! snapshot cache.

pub mod envelope;
pub mod report_cache;
pub mod upstream;

pub use envelope::{codec_from_mode, EnvelopeCodec, SharedCodec};
pub use report_cache::ReportCache;
pub use upstream::UpstreamClient;
