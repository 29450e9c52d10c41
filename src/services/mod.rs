// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod cache;
pub mod geolocation_client;
pub mod orchestrator;
pub mod overpass_client;

pub use cache::*;
pub use geolocation_client::*;
pub use orchestrator::*;
pub use overpass_client::*;
