// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::console::Console;
use crate::debug;
use crate::firmware::Firmware;
use crate::image::report_image_base;
use core::fmt;
use log::{info, warn};
use uefi::{Handle, Status};

/// Behaviour of [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Text shown highlighted at the top of the banner.
    pub banner: &'static str,
    /// Halt after printing the image base until a debugger releases the
    /// application. See [`debug::wait_for_debugger`].
    pub wait_for_debugger: bool,
    /// Ask the firmware to power off the machine once everything is printed.
    pub shutdown_on_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            banner: "UEFI:Test",
            wait_for_debugger: false,
            shutdown_on_exit: false,
        }
    }
}

fn print_banner<C: Console + ?Sized>(console: &mut C, config: &Config) -> fmt::Result {
    cprint!(console, "\n%H*** {} ***%N\n\n", config.banner)?;
    cprint!(console, "Hello world !\n\n")?;
    cprint!(console, "test status: %H<OK>%N\n\n")
}

/// Body of the application's entry point.
///
/// Reports the image base of `image` (continuing if the lookup fails),
/// optionally waits for a debugger, prints the banner and optionally powers
/// the machine off. Always returns [`Status::SUCCESS`]: failures along the
/// way are reported on the console and in the log only.
pub fn run<F, C>(image: Handle, firmware: &F, console: &mut C, config: &Config) -> Status
where
    F: Firmware + ?Sized,
    C: Console + ?Sized,
{
    // A failed lookup has already been reported; keep going either way.
    if report_image_base(image, firmware, console).is_err() {
        warn!("failed to write the image base to the console");
    }

    if config.wait_for_debugger {
        debug::wait_for_debugger();
    }

    if print_banner(console, config).is_err() {
        warn!("failed to write the banner to the console");
    }

    if config.shutdown_on_exit {
        info!("shutting down");
        firmware.shutdown(Status::SUCCESS);
    }

    Status::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Attribute;
    use crate::testing::{BrokenConsole, MockFirmware, RecordingConsole, handle};

    #[test]
    fn test_run_without_loaded_image() {
        let firmware = MockFirmware::without_loaded_image(Status::UNSUPPORTED);
        let mut console = RecordingConsole::default();

        let status = run(handle(0x1000), &firmware, &mut console, &Config::default());

        assert_eq!(status, Status::SUCCESS);
        let text = console.text();
        assert_eq!(text.matches("handleprotocol:").count(), 1);
        assert!(text.contains("handleprotocol: Unsupported\n"));
        assert!(!text.contains("Image base"));
        // The banner still follows the failure.
        let failure = text.find("handleprotocol:").unwrap();
        let banner = text.find("*** UEFI:Test ***").unwrap();
        assert!(failure < banner);
        assert_eq!(firmware.descriptor_reads.get(), 0);
        assert_eq!(firmware.shutdown_count.get(), 0);
    }

    #[test]
    fn test_run_with_loaded_image() {
        let image = handle(0x1000);
        let firmware = MockFirmware::with_loaded_image(image, 0x1000_0000, 0x8000);
        let mut console = RecordingConsole::default();

        let status = run(image, &firmware, &mut console, &Config::default());

        assert_eq!(status, Status::SUCCESS);
        assert_eq!(
            console.text(),
            "Image base: 0x10000000\n\
             \n*** UEFI:Test ***\n\n\
             Hello world !\n\n\
             test status: <OK>\n\n"
        );
        assert_eq!(
            console.attributes(),
            [
                Attribute::Highlight,
                Attribute::Normal,
                Attribute::Highlight,
                Attribute::Normal
            ]
        );
    }

    #[test]
    fn test_run_shutdown() {
        let image = handle(0x1000);
        let firmware = MockFirmware::with_loaded_image(image, 0x1000_0000, 0x8000);
        let mut console = RecordingConsole::default();
        let config = Config {
            shutdown_on_exit: true,
            ..Config::default()
        };

        let status = run(image, &firmware, &mut console, &config);

        assert_eq!(status, Status::SUCCESS);
        assert_eq!(firmware.shutdown_count.get(), 1);
        assert_eq!(firmware.shutdowns.get(), Some(Status::SUCCESS));
    }

    #[test]
    fn test_run_custom_banner() {
        let firmware = MockFirmware::without_loaded_image(Status::NOT_FOUND);
        let mut console = RecordingConsole::default();
        let config = Config {
            banner: "probe",
            ..Config::default()
        };

        let status = run(handle(0x1000), &firmware, &mut console, &config);

        assert_eq!(status, Status::SUCCESS);

        assert!(console.text().contains("\n*** probe ***\n\n"));
        assert!(console.text().contains("handleprotocol: Not Found\n"));
    }

    #[test]
    fn test_run_console_failure_still_succeeds() {
        let firmware = MockFirmware::without_loaded_image(Status::UNSUPPORTED);
        let config = Config {
            shutdown_on_exit: true,
            ..Config::default()
        };

        let status = run(handle(0x1000), &firmware, &mut BrokenConsole, &config);

        assert_eq!(status, Status::SUCCESS);
        assert_eq!(firmware.shutdown_count.get(), 1);
    }
}
