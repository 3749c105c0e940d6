// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firmware services used by the probe.
//!
//! The firmware hands the application a table of function pointers. Only two
//! of those services matter here, so they are expressed as a trait that the
//! application implements on top of the [`uefi`] crate, and that tests can
//! implement with a mock.

use uefi::{Handle, Status};

/// Metadata about a loaded image.
///
/// This is the part of the loaded-image protocol the probe reads.
pub trait ImageDescriptor {
    /// Address at which the loader placed the image.
    fn image_base(&self) -> u64;

    /// Size of the image in memory, in bytes.
    fn image_size(&self) -> u64;
}

/// Boot-time and run-time services of the firmware.
pub trait Firmware {
    /// Descriptor returned by [`Firmware::loaded_image`].
    ///
    /// It borrows from the firmware, so it cannot outlive the service table
    /// that produced it.
    type LoadedImage<'a>: ImageDescriptor
    where
        Self: 'a;

    /// Look up the loaded-image capability of `image`.
    ///
    /// `image` must be the handle the firmware passed to the entry point.
    ///
    /// # Errors
    ///
    /// Fails with the firmware status when `image` does not carry the
    /// capability (for example [`Status::UNSUPPORTED`]) or when the firmware
    /// does not implement it at all.
    fn loaded_image(&self, image: Handle) -> uefi::Result<Self::LoadedImage<'_>>;

    /// Power off the machine, passing `status` as the reset payload.
    ///
    /// Real firmware never returns from this call.
    fn shutdown(&self, status: Status);
}
