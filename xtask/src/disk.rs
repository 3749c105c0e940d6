// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bootable disk images holding a single EFI System partition.

use anyhow::{Context, Result, bail, ensure};
use fatfs::{FileSystem, FormatVolumeOptions, FsOptions};
use gptman::{GPT, GPTPartitionEntry};
use std::io::{Cursor, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

const SECTOR_SIZE: u64 = 512;

/// First sector of the partition; leaves the usual 1 MiB gap after the
/// partition table.
const PARTITION_START_LBA: u64 = 2048;

/// Sectors the backup header and entries take at the end of the disk.
const BACKUP_TABLE_SECTORS: u64 = 33;

/// Type GUID of an EFI System partition (C12A7328-F81F-11D2-BA4B-00A0C93EC93B),
/// in on-disk byte order.
const EFI_SYSTEM_PARTITION: [u8; 16] = [
    0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11, 0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9, 0x3b,
];

// Fixed GUIDs keep the output reproducible.
const DISK_GUID: [u8; 16] = *b"uefi-probe-disk!";
const PARTITION_GUID: [u8; 16] = *b"uefi-probe-esp!!";

const VOLUME_LABEL: [u8; 11] = *b"UEFI PROBE ";

/// A file to place on the EFI System partition.
#[derive(Debug)]
pub struct EspFile {
    /// Destination inside the partition, `/`-separated, 8.3 names only.
    pub dest: String,
    /// Source path on the host.
    pub src: PathBuf,
}

impl EspFile {
    /// The fallback boot loader location the firmware looks for on
    /// removable media.
    pub fn boot_loader(boot_file_name: &str, src: PathBuf) -> Self {
        Self {
            dest: format!("EFI/BOOT/{boot_file_name}"),
            src,
        }
    }

    /// A file copied to the root directory under its own name.
    pub fn in_root(src: PathBuf) -> Result<Self> {
        let name = src
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("invalid file name: {}", src.display()))?;
        Ok(Self {
            dest: name.to_string(),
            src,
        })
    }
}

fn get_partition_byte_range(gpt: &GPT) -> Result<Range<usize>> {
    let partition = &gpt[1];
    let start = usize::try_from(partition.starting_lba * SECTOR_SIZE)?;
    let end = usize::try_from((partition.ending_lba + 1) * SECTOR_SIZE)?;
    Ok(start..end)
}

/// Write a raw disk image of `size_mib` MiB to `path`, with a GUID partition
/// table and one FAT formatted EFI System partition containing `files`.
pub fn create_esp_disk(path: &Path, size_mib: u64, files: &[EspFile]) -> Result<()> {
    let num_bytes = size_mib * 1024 * 1024;
    ensure!(
        num_bytes / SECTOR_SIZE > PARTITION_START_LBA + BACKUP_TABLE_SECTORS,
        "disk size of {size_mib} MiB is too small"
    );

    let partition_byte_range;
    let mut disk = vec![0; usize::try_from(num_bytes)?];
    {
        let mut cur = Cursor::new(&mut disk);

        let mut gpt = GPT::new_from(&mut cur, SECTOR_SIZE, DISK_GUID)?;
        gpt[1] = GPTPartitionEntry {
            partition_type_guid: EFI_SYSTEM_PARTITION,
            unique_partition_guid: PARTITION_GUID,
            starting_lba: PARTITION_START_LBA,
            ending_lba: gpt.header.last_usable_lba,
            attribute_bits: 0,
            partition_name: "EFI system partition".into(),
        };

        partition_byte_range = get_partition_byte_range(&gpt)?;

        GPT::write_protective_mbr_into(&mut cur, SECTOR_SIZE)?;
        gpt.write_into(&mut cur)?;
    }

    init_esp(&mut disk[partition_byte_range], files)?;

    fs_err::write(path, &disk)?;
    println!("wrote {} ({size_mib} MiB)", path.display());

    Ok(())
}

fn init_esp(partition: &mut [u8], files: &[EspFile]) -> Result<()> {
    fatfs::format_volume(
        &mut Cursor::new(&mut *partition),
        FormatVolumeOptions::new().volume_label(VOLUME_LABEL),
    )?;

    let fs = FileSystem::new(
        Cursor::new(partition),
        FsOptions::new().update_accessed_date(false),
    )?;
    let root_dir = fs.root_dir();

    for file in files {
        let data = fs_err::read(&file.src)?;

        let (dirs, name) = match file.dest.rsplit_once('/') {
            Some((dirs, name)) => (Some(dirs), name),
            None => (None, file.dest.as_str()),
        };
        if name.is_empty() {
            bail!("destination has no file name: {}", file.dest);
        }

        let mut dir = root_dir.clone();
        for component in dirs.into_iter().flat_map(|dirs| dirs.split('/')) {
            dir = dir
                .create_dir(component)
                .with_context(|| format!("failed to create directory {component}"))?;
        }

        let mut out = dir
            .create_file(name)
            .with_context(|| format!("failed to create {} (8.3 names only)", file.dest))?;
        out.truncate()?;
        out.write_all(&data)?;
        println!("  {} -> {}", file.src.display(), file.dest);
    }

    Ok(())
}
