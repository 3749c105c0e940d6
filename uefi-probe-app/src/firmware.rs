// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firmware services backed by the system table.

use core::fmt::{self, Write};
use uefi::boot::{self, ScopedProtocol};
use uefi::proto::loaded_image::LoadedImage;
use uefi::runtime::{self, ResetType};
use uefi::{Handle, Status, system};
use uefi_probe::{Attribute, Console, Firmware, ImageDescriptor};

/// The loaded-image protocol, opened exclusively for the duration of a
/// query.
pub struct OpenLoadedImage(ScopedProtocol<LoadedImage>);

impl ImageDescriptor for OpenLoadedImage {
    fn image_base(&self) -> u64 {
        let (base, _) = self.0.info();
        base.addr() as u64
    }

    fn image_size(&self) -> u64 {
        let (_, size) = self.0.info();
        size
    }
}

/// Boot and runtime services of the running firmware.
pub struct UefiFirmware;

impl Firmware for UefiFirmware {
    type LoadedImage<'a> = OpenLoadedImage;

    fn loaded_image(&self, image: Handle) -> uefi::Result<OpenLoadedImage> {
        boot::open_protocol_exclusive::<LoadedImage>(image).map(OpenLoadedImage)
    }

    fn shutdown(&self, status: Status) {
        runtime::reset(ResetType::SHUTDOWN, status, None)
    }
}

/// The firmware's standard text output.
pub struct UefiConsole;

impl Write for UefiConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        system::with_stdout(|stdout| stdout.write_str(s))
    }
}

impl Console for UefiConsole {
    fn set_attribute(&mut self, attribute: Attribute) -> fmt::Result {
        let (foreground, background) = attribute.colors();
        system::with_stdout(|stdout| stdout.set_color(foreground, background))
            .map_err(|_| fmt::Error)
    }
}
