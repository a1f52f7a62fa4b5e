//! Application layer with the lookup orchestration services.

/// Service implementations.
pub mod services;

pub use services::freshness::{FRESHNESS_MAX_DAYS, FRESHNESS_MIN_DAYS, FreshnessPolicy};
pub use services::image_service::SpeciesImageService;
pub use services::session_memo::{DEFAULT_MEMO_CAPACITY, SessionMemo};
