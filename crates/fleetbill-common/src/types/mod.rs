//! Core data types for FleetBill

pub mod calculation;
pub mod rules;
pub mod trip;
