// Infrastructure layer - External dependencies and adapters
pub mod api_client;
pub mod config;
pub mod observatory_client;
pub mod push_feed;
pub mod wire;

#[cfg(test)]
pub mod fake_backend;
