// Domain layer - Observatory entities and pure rules
pub mod chart;
pub mod filter;
pub mod forms;
pub mod listing;
pub mod measurement;
pub mod network;
pub mod session;
