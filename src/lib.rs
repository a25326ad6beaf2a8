//! Dubflow - Automated Video Dubbing Pipeline
//!
//! Turns a classroom-style video into copies dubbed into other
//! languages: transcribe with whisper, translate (directly or through a
//! pivot language), synthesize speech per segment, fit each clip back
//! into its original time slot, and composite full-length audio tracks
//! that ffmpeg muxes into per-language videos.

pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod routing;
pub mod synthesis;
pub mod timing;
pub mod track;
pub mod transcribe;
pub mod transcript;
pub mod translate;

#[cfg(test)]
pub mod testutil;
