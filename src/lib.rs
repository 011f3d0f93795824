#![cfg_attr(not(test), no_std)]

mod log;

mod error;

pub mod checksum;
pub mod config;
pub mod diagnostic;
pub mod frame;
pub mod interface;
pub mod params;
pub mod register_io;
pub mod transport;

pub use crate::error::{Error, Result};
pub use crate::register_io::{LinkState, RegisterIo};
