//! Streaming session core: login and connection tracking, a serialising
//! coordinator loop for playback commands, and the audio bridge between the
//! service's decoder and the output device.

pub mod audio;
pub mod auth;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod model;
pub mod session;
