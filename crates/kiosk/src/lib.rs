//! Command line front end for the tray recognition service.

pub mod app;
pub mod cli;
pub mod config;
pub mod frames;
pub mod logging;
pub mod observer;
pub mod report;
