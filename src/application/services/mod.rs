pub mod freshness;
pub mod image_service;
pub mod session_memo;
