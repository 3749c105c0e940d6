// SPDX-License-Identifier: MIT OR Apache-2.0

//! Where the application's sections end up once the firmware has loaded it,
//! so gdb can be pointed at the right addresses.

use anyhow::{Context, Result};
use object::{Object, ObjectSection};
use std::path::Path;

/// Section offsets relative to the image base.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SectionOffsets {
    pub text: u64,
    pub data: Option<u64>,
}

impl SectionOffsets {
    /// Read the offsets from the PE image in `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let file = object::File::parse(data)?;
        let image_base = file.relative_address_base();
        let offset = |name: &str| {
            file.section_by_name(name)
                .map(|section| section.address() - image_base)
        };

        Ok(Self {
            text: offset(".text").context("image has no .text section")?,
            data: offset(".data"),
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let data = fs_err::read(path)?;
        Self::parse(&data)
            .with_context(|| format!("failed to read the sections of {}", path.display()))
    }
}

/// gdb command that loads the symbols of `file` for an image loaded at
/// `image_base`.
pub fn add_symbol_file_command(file: &Path, image_base: u64, offsets: SectionOffsets) -> String {
    let text = image_base + offsets.text;
    match offsets.data {
        Some(data) => format!(
            "add-symbol-file {} {text:#x} -s .data {:#x}",
            file.display(),
            image_base + data
        ),
        None => format!("add-symbol-file {} {text:#x}", file.display()),
    }
}
