//! Endpoint resolution and response normalization.
//!
//! Control flow for one upload: [`candidates`] → [`prober`] → [`normalizer`]
//! → [`assembler`], driven by [`analyzer::Detector`].

pub mod analyzer;
pub mod assembler;
pub mod candidates;
pub mod error;
pub mod media;
pub mod normalizer;
pub mod prober;
pub mod verdict;

pub use analyzer::{Detector, Resolution};
pub use assembler::{DetectionOutcome, OutcomeAssembler};
pub use candidates::{Candidate, generate_candidates};
pub use error::DetectionError;
pub use media::{MediaAsset, MediaKind};
pub use normalizer::{EmbeddedJson, KnownFields, ResponseNormalizer, VerdictExtractor, parse_lenient};
pub use prober::{
    EndpointProber, HttpTransport, ProbeAttempt, ProbeOutcome, ProbeSuccess, ProviderTransport,
    TransportResponse,
};
pub use verdict::{Label, RawVerdict, Verdict};
