// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving the descriptor of the running image.

use crate::console::Console;
use crate::firmware::{Firmware, ImageDescriptor};
use crate::status::StatusText;
use core::fmt::{self, Display, Formatter};
use log::{debug, info, warn};
use uefi::{Handle, Status};

/// Where an image was loaded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Address at which the loader mapped the image.
    pub base: u64,
    /// Size of the image in memory, in bytes.
    pub size: u64,
}

/// Errors returned by [`query_image`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The firmware has no loaded-image capability for the handle.
    LookupFailed(Status),
}

impl QueryError {
    /// Firmware status behind the error.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::LookupFailed(status) => *status,
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LookupFailed(status) => {
                write!(f, "loaded image lookup failed: {}", StatusText(*status))
            }
        }
    }
}

impl core::error::Error for QueryError {}

/// Look up the loaded-image descriptor of `image` and read where it lives.
///
/// `image` must be the handle the firmware passed to the entry point.
///
/// # Errors
///
/// [`QueryError::LookupFailed`] when the firmware cannot provide the
/// descriptor. No descriptor field is read in that case.
pub fn query_image<F: Firmware + ?Sized>(
    image: Handle,
    firmware: &F,
) -> Result<ImageInfo, QueryError> {
    debug!("looking up loaded image protocol of {image:?}");

    let descriptor = firmware
        .loaded_image(image)
        .map_err(|err| QueryError::LookupFailed(err.status()))?;

    Ok(ImageInfo {
        base: descriptor.image_base(),
        size: descriptor.image_size(),
    })
}

/// Query the image base and print the outcome on `console`.
///
/// On success the line reads `Image base: 0x...`; on failure
/// `handleprotocol: <status>` is printed in the error attribute. The lookup
/// is never retried.
///
/// # Errors
///
/// The outer error reports a console failure; the inner result is the
/// outcome of the query itself.
pub fn report_image_base<F, C>(
    image: Handle,
    firmware: &F,
    console: &mut C,
) -> Result<Result<ImageInfo, QueryError>, fmt::Error>
where
    F: Firmware + ?Sized,
    C: Console + ?Sized,
{
    let result = query_image(image, firmware);
    match &result {
        Ok(info) => {
            info!("image base: {:#x}, size: {} bytes", info.base, info.size);
            cprint!(console, "Image base: {:#x}\n", info.base)?;
        }
        Err(err) => {
            warn!("{err}");
            cprint!(
                console,
                "%Ehandleprotocol: {}%N\n",
                StatusText(err.status())
            )?;
        }
    }
    Ok(result)
}
