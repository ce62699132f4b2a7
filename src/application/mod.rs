// Application layer - Use cases over the observatory repository
pub mod admin_service;
pub mod chart_panel;
pub mod error;
pub mod live_service;
pub mod map_service;
pub mod measurement_feed;
pub mod normalizer;
pub mod observatory_repository;
pub mod series_builder;
pub mod session_service;

#[cfg(test)]
pub mod testing;
