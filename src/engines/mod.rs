//! Speech synthesis backends.
//!
//! This module contains implementations of [`SynthesisEngine`](crate::SynthesisEngine).
//!
//! # Available Engines
//!
//! - `command` - any external TTS program (espeak-ng preset, custom and cloning command templates)

pub mod command;
