// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::arch::UefiArch;
use crate::opt::BuildModeOpt;
use anyhow::{Result, bail};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Clone, Copy, Debug)]
pub enum Package {
    UefiProbe,
    UefiProbeApp,
    Xtask,
}

impl Package {
    fn as_str(self) -> &'static str {
        match self {
            Self::UefiProbe => "uefi-probe",
            Self::UefiProbeApp => "uefi-probe-app",
            Self::Xtask => "xtask",
        }
    }

    /// Packages that are built for a UEFI target.
    pub fn uefi() -> Vec<Package> {
        vec![Self::UefiProbe, Self::UefiProbeApp]
    }

    /// Packages whose tests run on the host. The app has a panic handler,
    /// which conflicts with `std`.
    pub fn host_tested() -> Vec<Package> {
        vec![Self::UefiProbe, Self::Xtask]
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Feature {
    Qemu,
    DebugAttach,
    LogDebugcon,
}

impl Feature {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Qemu => "uefi-probe-app/qemu",
            Self::DebugAttach => "uefi-probe-app/debug-attach",
            Self::LogDebugcon => "uefi-probe-app/log-debugcon",
        }
    }

    fn comma_separated_string(features: &[Feature]) -> String {
        features
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Clone, Copy, Debug)]
pub enum CargoAction {
    Build,
    Clippy,
    Test,
}

/// Directory cargo writes the artifacts for `arch` to.
pub fn target_dir(arch: UefiArch, build_mode: &BuildModeOpt) -> PathBuf {
    Path::new("target")
        .join(arch.as_triple())
        .join(build_mode.as_str())
}

/// Path of the built application.
pub fn app_path(arch: UefiArch, build_mode: &BuildModeOpt) -> PathBuf {
    target_dir(arch, build_mode).join("uefi-probe-app.efi")
}

/// Get a modified PATH to remove entries added by rustup. This is
/// necessary on Windows, see
/// https://github.com/rust-lang/rustup/issues/3031.
fn sanitized_path(orig_path: OsString) -> Result<OsString> {
    let paths = env::split_paths(&orig_path);
    let sanitized_paths = paths.filter(|path| {
        !path
            .components()
            .any(|component| component.as_os_str() == ".rustup")
    });

    Ok(env::join_paths(sanitized_paths)?)
}

/// Cargo automatically sets some env vars that can prevent the
/// channel arg (e.g. "+nightly") from working. Unset them in the
/// child's environment.
pub fn fix_nested_cargo_env(cmd: &mut Command) -> Result<()> {
    cmd.env_remove("RUSTC");
    cmd.env_remove("RUSTDOC");
    let orig_path = env::var_os("PATH").unwrap_or_default();
    cmd.env("PATH", sanitized_path(orig_path)?);
    Ok(())
}

#[derive(Debug)]
pub struct Cargo {
    pub action: CargoAction,
    pub features: Vec<Feature>,
    pub packages: Vec<Package>,
    pub release: bool,
    pub target: Option<UefiArch>,
    pub warnings_as_errors: bool,
}

impl Cargo {
    pub fn command(&self) -> Result<Command> {
        let mut cmd = Command::new("cargo");

        fix_nested_cargo_env(&mut cmd)?;

        let action;
        let mut tool_args: Vec<&str> = Vec::new();
        match self.action {
            CargoAction::Build => {
                action = "build";
            }
            CargoAction::Clippy => {
                action = "clippy";
                if self.warnings_as_errors {
                    tool_args.extend(["-D", "warnings"]);
                }
            }
            CargoAction::Test => {
                action = "test";
            }
        };
        cmd.arg(action);

        if self.release {
            cmd.arg("--release");
        }

        if let Some(target) = self.target {
            cmd.arg("--target").arg(target.as_triple());
        }

        if self.packages.is_empty() {
            bail!("packages cannot be empty");
        }
        for package in &self.packages {
            cmd.args(["--package", package.as_str()]);
        }

        if !self.features.is_empty() {
            cmd.arg("--features")
                .arg(Feature::comma_separated_string(&self.features));
        }

        if !tool_args.is_empty() {
            cmd.arg("--");
            cmd.args(tool_args);
        }

        Ok(cmd)
    }
}
