//! # UI Module
//!
//! Terminal display components for the Canarinho tuner.

pub mod cent_meter;
pub mod main_display;
