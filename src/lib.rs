//! Projection of size-structured coral populations across a wild reef, a
//! protected nursery and a larval-rearing facility under restoration
//! management.

pub mod config;
pub mod demography;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod manager;
pub mod matrix;
pub mod model;
pub mod population;
pub mod stats;
