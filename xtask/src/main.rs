// SPDX-License-Identifier: MIT OR Apache-2.0

mod arch;
mod cargo;
mod disk;
mod opt;
mod qemu;
mod symbols;
mod util;

use anyhow::Result;
use cargo::{Cargo, CargoAction, Feature, Package, app_path};
use clap::Parser;
use disk::EspFile;
use opt::{Action, BuildOpt, ClippyOpt, DiskOpt, Opt, QemuOpt};
use util::run_cmd;

fn build(opt: &BuildOpt) -> Result<()> {
    let mut features = Vec::new();
    if opt.qemu {
        features.push(Feature::Qemu);
    }
    if opt.debug_attach {
        features.push(Feature::DebugAttach);
    }

    let cargo = Cargo {
        action: CargoAction::Build,
        features,
        packages: vec![Package::UefiProbeApp],
        release: opt.build_mode.release,
        target: Some(*opt.target),
        warnings_as_errors: false,
    };
    run_cmd(cargo.command()?)
}

fn clippy(opt: &ClippyOpt) -> Result<()> {
    // Run clippy on the UEFI packages.
    let cargo = Cargo {
        action: CargoAction::Clippy,
        features: vec![Feature::Qemu, Feature::LogDebugcon],
        packages: Package::uefi(),
        release: false,
        target: Some(*opt.target),
        warnings_as_errors: opt.warning.warnings_as_errors,
    };
    run_cmd(cargo.command()?)?;

    // Run clippy on xtask.
    let cargo = Cargo {
        action: CargoAction::Clippy,
        features: Vec::new(),
        packages: vec![Package::Xtask],
        release: false,
        target: None,
        warnings_as_errors: opt.warning.warnings_as_errors,
    };
    run_cmd(cargo.command()?)
}

/// Build the app and write a disk image that boots it.
fn disk(opt: &DiskOpt) -> Result<()> {
    let cargo = Cargo {
        action: CargoAction::Build,
        features: Vec::new(),
        packages: vec![Package::UefiProbeApp],
        release: opt.build_mode.release,
        target: Some(*opt.target),
        warnings_as_errors: false,
    };
    run_cmd(cargo.command()?)?;

    let mut files = vec![EspFile::boot_loader(
        opt.target.boot_file_name(),
        app_path(*opt.target, &opt.build_mode),
    )];
    for file in &opt.files {
        files.push(EspFile::in_root(file.clone())?);
    }

    disk::create_esp_disk(&opt.output, opt.size_mib, &files)
}

/// Build the app in its QEMU configuration and boot it.
fn run_vm(opt: &QemuOpt) -> Result<()> {
    let mut features = vec![Feature::Qemu, Feature::LogDebugcon];
    if opt.gdb {
        features.push(Feature::DebugAttach);
    }

    let cargo = Cargo {
        action: CargoAction::Build,
        features,
        packages: vec![Package::UefiProbeApp],
        release: opt.build_mode.release,
        target: Some(*opt.target),
        warnings_as_errors: false,
    };
    run_cmd(cargo.command()?)?;

    qemu::run_qemu(*opt.target, opt)
}

/// Run unit tests and integration tests on the host. The application
/// itself only runs inside a VM.
fn run_host_tests() -> Result<()> {
    let cargo = Cargo {
        action: CargoAction::Test,
        features: Vec::new(),
        packages: Package::host_tested(),
        release: false,
        // Use the host target so that tests can run without a VM.
        target: None,
        warnings_as_errors: false,
    };
    run_cmd(cargo.command()?)
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    match &opt.action {
        Action::Build(build_opt) => build(build_opt),
        Action::Clippy(clippy_opt) => clippy(clippy_opt),
        Action::Disk(disk_opt) => disk(disk_opt),
        Action::Run(qemu_opt) => run_vm(qemu_opt),
        Action::Test(_) => run_host_tests(),
    }
}
