//! Library side of `gridbind`: logging, settings, the in-memory market and
//! the commands that drive the grid engine.

pub mod commands;
pub mod logging;
pub mod market;
pub mod render;
pub mod settings;
pub mod simulation;
