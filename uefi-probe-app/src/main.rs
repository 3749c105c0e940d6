// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]
#![no_std]

mod firmware;

use crate::firmware::{UefiConsole, UefiFirmware};
use log::info;
use uefi::prelude::*;
use uefi_probe::Config;

#[entry]
fn main() -> Status {
    uefi::helpers::init().unwrap();

    let config = Config {
        wait_for_debugger: cfg!(feature = "debug-attach"),
        shutdown_on_exit: cfg!(feature = "qemu"),
        ..Config::default()
    };
    info!("starting with {config:?}");

    uefi_probe::run(
        boot::image_handle(),
        &UefiFirmware,
        &mut UefiConsole,
        &config,
    )
}
