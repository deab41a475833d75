//! Yield server - HTTP front end for the crop yield predictor

pub mod api;
pub mod config;
pub mod startup;
