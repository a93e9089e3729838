//! Interactive logic circuit diagrams: pins, gates, wires and a fixed-point
//! propagation pass drawn into a retained vector scene.

#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod assets;
pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod export;
pub mod module;
pub mod routing;
pub mod scene;
pub mod simulator;
pub mod svg;
pub use app::App;
