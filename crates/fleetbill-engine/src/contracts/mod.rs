//! Contracts module
//!
//! Provides contract version storage and resolution:
//! - TripRepository: storage seam for trips and contract versions
//! - resolve: picks the version valid at an instant
//! - InMemoryTripRepository: arena-backed reference implementation

pub mod memory;
pub mod repository;
pub mod resolver;

pub use memory::{InMemoryTripRepository, SeedData};
pub use repository::{TripContext, TripRepository};
pub use resolver::{ensure_no_overlap, resolve};
