// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostics for a UEFI application: where was I loaded?
//!
//! # Crate organisation
//!
//! Firmware services are reached through two traits so that the logic can be
//! exercised on the host without a real firmware:
//!
//! - [`Firmware`] covers the boot-time capability lookup (the loaded-image
//!   protocol of an image handle) and the run-time reset service.
//! - [`Console`] covers text output with display attributes.
//!
//! The [`image`] module resolves the descriptor of the running image and
//! reports its base address. The [`console`] module implements the small
//! markup language used for output (`%H`, `%N` and `%E` attribute switches)
//! and [`StatusText`] renders firmware status codes as human-readable text.
//!
//! [`run`] ties everything together: it is what the application's entry
//! point calls.
//!
//! ## Debugging
//!
//! When [`Config::wait_for_debugger`] is set, [`run`] halts right after the
//! image base has been printed until an external debugger releases it. See
//! [`debug::wait_for_debugger`].

#![cfg_attr(not(test), no_std)]
// Enable some additional warnings and lints.
#![warn(clippy::ptr_as_ptr, missing_docs, unused)]
#![deny(clippy::all)]
#![deny(clippy::must_use_candidate)]

#[macro_use]
pub mod console;
pub mod debug;
pub mod firmware;
pub mod image;

mod app;
mod status;
#[cfg(test)]
mod testing;

pub use self::app::{Config, run};
pub use self::console::{Attribute, Console};
pub use self::firmware::{Firmware, ImageDescriptor};
pub use self::image::{ImageInfo, QueryError};
pub use self::status::StatusText;
