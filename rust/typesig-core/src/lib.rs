pub mod analysis;
pub mod authenticator;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod features;
pub mod profile;
pub mod report;
pub mod sample;
pub mod store;

// Re-export common types
pub use crate::authenticator::{
    find_match, AuthState, AuthenticationOutcome, AuthenticationReport, Authenticator, RangeCheck,
    Verdict,
};
pub use crate::config::{MatchThresholds, RegressionConfig, TypesigConfig};
pub use crate::enrollment::{
    CollectionReport, Enrollment, PhraseRequest, PhraseSource, Purpose, TypedPhrase,
};
pub use crate::error::{BiometricError, Result};
pub use crate::features::{FeatureExtractor, KeyTimeline};
pub use crate::profile::{compute_bounds, compute_profile, Bounds, Profile};
pub use crate::sample::{Feature, FeatureVector, PerFeature, Sample};
pub use crate::store::{SampleStore, StorePresence};
