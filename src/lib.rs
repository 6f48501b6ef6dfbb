#![cfg_attr(not(test), no_std)]
//! Touch pad to MIDI percussion core.
//!
//! Everything here is hardware agnostic so it builds (and is tested) on the
//! host; `main.rs` wires it to the Mega 2560 peripherals.
extern crate alloc;

#[macro_use]
pub mod diag;

pub mod app;
pub mod boot;
pub mod calibrate;
pub mod config;
pub mod hash;
pub mod indicator;
pub mod kit;
pub mod midi;
pub mod pad;
pub mod scanner;
pub mod schedule;
pub mod sensor;
pub mod serial;
pub mod update;
pub mod velocity;
