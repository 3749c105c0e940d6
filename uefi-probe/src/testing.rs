// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock firmware and console shared by the unit tests.

use crate::console::{Attribute, Console};
use crate::firmware::{Firmware, ImageDescriptor};
use core::cell::Cell;
use core::ffi::c_void;
use core::fmt;
use uefi::{Handle, Status};

/// Something observed on a [`RecordingConsole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Text(String),
    Attribute(Attribute),
}

/// Console that remembers everything written to it. Adjacent text writes
/// are merged into one event.
#[derive(Debug, Default)]
pub struct RecordingConsole {
    pub events: Vec<Event>,
}

impl RecordingConsole {
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Text(text) => Some(text.as_str()),
                Event::Attribute(_) => None,
            })
            .collect()
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Attribute(attribute) => Some(*attribute),
                Event::Text(_) => None,
            })
            .collect()
    }
}

impl fmt::Write for RecordingConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(Event::Text(text)) = self.events.last_mut() {
            text.push_str(s);
        } else {
            self.events.push(Event::Text(s.to_owned()));
        }
        Ok(())
    }
}

impl Console for RecordingConsole {
    fn set_attribute(&mut self, attribute: Attribute) -> fmt::Result {
        self.events.push(Event::Attribute(attribute));
        Ok(())
    }
}

/// Console whose every operation fails.
#[derive(Debug, Default)]
pub struct BrokenConsole;

impl fmt::Write for BrokenConsole {
    fn write_str(&mut self, _: &str) -> fmt::Result {
        Err(fmt::Error)
    }
}

impl Console for BrokenConsole {
    fn set_attribute(&mut self, _: Attribute) -> fmt::Result {
        Err(fmt::Error)
    }
}

/// Descriptor handed out by [`MockFirmware`]. Counts field reads.
pub struct MockImage<'a> {
    base: u64,
    size: u64,
    reads: &'a Cell<usize>,
}

impl ImageDescriptor for MockImage<'_> {
    fn image_base(&self) -> u64 {
        self.reads.set(self.reads.get() + 1);
        self.base
    }

    fn image_size(&self) -> u64 {
        self.reads.set(self.reads.get() + 1);
        self.size
    }
}

/// Firmware with an optional loaded-image capability registered for a
/// single handle.
pub struct MockFirmware {
    image: Option<(Handle, u64, u64)>,
    missing_status: Status,
    pub lookups: Cell<usize>,
    pub descriptor_reads: Cell<usize>,
    pub shutdowns: Cell<Option<Status>>,
    pub shutdown_count: Cell<usize>,
}

impl MockFirmware {
    /// Firmware with no loaded-image capability at all.
    pub fn without_loaded_image(status: Status) -> Self {
        Self {
            image: None,
            missing_status: status,
            lookups: Cell::new(0),
            descriptor_reads: Cell::new(0),
            shutdowns: Cell::new(None),
            shutdown_count: Cell::new(0),
        }
    }

    /// Firmware where `handle` was loaded at `base`.
    pub fn with_loaded_image(handle: Handle, base: u64, size: u64) -> Self {
        Self {
            image: Some((handle, base, size)),
            ..Self::without_loaded_image(Status::UNSUPPORTED)
        }
    }
}

impl Firmware for MockFirmware {
    type LoadedImage<'a> = MockImage<'a>;

    fn loaded_image(&self, image: Handle) -> uefi::Result<MockImage<'_>> {
        self.lookups.set(self.lookups.get() + 1);
        match self.image {
            Some((handle, base, size)) if handle == image => Ok(MockImage {
                base,
                size,
                reads: &self.descriptor_reads,
            }),
            _ => Err(self.missing_status.into()),
        }
    }

    fn shutdown(&self, status: Status) {
        self.shutdowns.set(Some(status));
        self.shutdown_count.set(self.shutdown_count.get() + 1);
    }
}

/// A non-null handle for tests. Never dereferenced.
pub fn handle(addr: usize) -> Handle {
    unsafe { Handle::from_ptr(addr as *mut c_void) }.expect("test handle must be non-null")
}
