// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::arch::UefiArch;
use clap::{Parser, Subcommand};
use std::ops::Deref;
use std::path::PathBuf;

// Define some common options so that the doc strings don't have to be
// copy-pasted.

#[derive(Debug, Parser)]
pub struct TargetOpt {
    /// UEFI target to build for.
    #[clap(long, action, default_value_t)]
    pub target: UefiArch,
}

impl Deref for TargetOpt {
    type Target = UefiArch;

    fn deref(&self) -> &Self::Target {
        &self.target
    }
}

#[derive(Debug, Parser)]
pub struct BuildModeOpt {
    /// Build in release mode.
    #[clap(long, action)]
    pub release: bool,
}

impl BuildModeOpt {
    pub fn as_str(&self) -> &'static str {
        if self.release { "release" } else { "debug" }
    }
}

#[derive(Debug, Parser)]
pub struct WarningOpt {
    /// Treat warnings as errors.
    #[clap(long, action)]
    pub warnings_as_errors: bool,
}

/// Developer utility for building, packaging and running uefi-probe.
#[derive(Debug, Parser)]
pub struct Opt {
    #[clap(subcommand)]
    pub action: Action,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    Build(BuildOpt),
    Clippy(ClippyOpt),
    Disk(DiskOpt),
    Run(QemuOpt),
    Test(TestOpt),
}

/// Build the application for a UEFI target.
#[derive(Debug, Parser)]
pub struct BuildOpt {
    #[clap(flatten)]
    pub target: TargetOpt,

    #[clap(flatten)]
    pub build_mode: BuildModeOpt,

    /// Build the variant that powers the machine off when done.
    #[clap(long, action)]
    pub qemu: bool,

    /// Build the variant that waits for a debugger after printing the
    /// image base.
    #[clap(long, action)]
    pub debug_attach: bool,
}

/// Run clippy on all the packages.
#[derive(Debug, Parser)]
pub struct ClippyOpt {
    #[clap(flatten)]
    pub target: TargetOpt,

    #[clap(flatten)]
    pub warning: WarningOpt,
}

/// Build the application and write a bootable disk image containing it.
#[derive(Debug, Parser)]
pub struct DiskOpt {
    #[clap(flatten)]
    pub target: TargetOpt,

    #[clap(flatten)]
    pub build_mode: BuildModeOpt,

    /// Path of the disk image to create.
    #[clap(long, short, action)]
    pub output: PathBuf,

    /// Size of the disk image in MiB.
    #[clap(long, action, default_value_t = 46)]
    pub size_mib: u64,

    /// Extra files to copy into the root directory of the EFI partition.
    #[clap(action)]
    pub files: Vec<PathBuf>,
}

/// Build the application and run it in QEMU.
#[derive(Debug, Parser)]
pub struct QemuOpt {
    #[clap(flatten)]
    pub target: TargetOpt,

    #[clap(flatten)]
    pub build_mode: BuildModeOpt,

    /// Disable hardware accelerated virtualization support in QEMU.
    #[clap(long, action)]
    pub disable_kvm: bool,

    /// Run QEMU without a GUI.
    #[clap(long, action)]
    pub headless: bool,

    /// Let gdb attach on tcp::1234 and make the application wait for it.
    #[clap(long, action)]
    pub gdb: bool,

    /// Path of an OVMF code file.
    #[clap(long, action)]
    pub ovmf_code: Option<PathBuf>,

    /// Path of an OVMF vars file.
    #[clap(long, action)]
    pub ovmf_vars: Option<PathBuf>,
}

/// Run unit tests on the host.
#[derive(Debug, Parser)]
pub struct TestOpt;
