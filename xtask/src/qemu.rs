// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::arch::UefiArch;
use crate::cargo::{app_path, target_dir};
use crate::opt::QemuOpt;
use crate::symbols::{SectionOffsets, add_symbol_file_command};
use crate::util::{command_to_string, first_existing, is_linux_host, is_windows_host};
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::env;
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tempfile::TempDir;
#[cfg(target_os = "linux")]
use {std::fs::Permissions, std::os::unix::fs::PermissionsExt};

/// Port gdb connects to when running with `--gdb`.
const GDB_PORT: u16 = 1234;

#[derive(Clone, Copy, Debug)]
enum OvmfFileType {
    Code,
    Vars,
}

impl OvmfFileType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Vars => "vars",
        }
    }

    /// Locations where distributions install the firmware.
    fn system_paths(self, arch: UefiArch) -> &'static [&'static str] {
        match (arch, self) {
            (UefiArch::AArch64, Self::Code) => &[
                "/usr/share/AAVMF/AAVMF_CODE.fd",
                "/usr/share/edk2/aarch64/QEMU_EFI-pflash.raw",
            ],
            (UefiArch::AArch64, Self::Vars) => &[
                "/usr/share/AAVMF/AAVMF_VARS.fd",
                "/usr/share/edk2/aarch64/vars-template-pflash.raw",
            ],
            (UefiArch::IA32, Self::Code) => &["/usr/share/edk2/ia32/OVMF_CODE.fd"],
            (UefiArch::IA32, Self::Vars) => &["/usr/share/edk2/ia32/OVMF_VARS.fd"],
            (UefiArch::X86_64, Self::Code) => &[
                "/usr/share/OVMF/OVMF_CODE.fd",
                "/usr/share/OVMF/OVMF_CODE_4M.fd",
                "/usr/share/edk2/ovmf/OVMF_CODE.fd",
                "/usr/share/edk2/x64/OVMF_CODE.fd",
            ],
            (UefiArch::X86_64, Self::Vars) => &[
                "/usr/share/OVMF/OVMF_VARS.fd",
                "/usr/share/OVMF/OVMF_VARS_4M.fd",
                "/usr/share/edk2/ovmf/OVMF_VARS.fd",
                "/usr/share/edk2/x64/OVMF_VARS.fd",
            ],
        }
    }
}

struct OvmfPaths {
    code: PathBuf,
    vars: PathBuf,
}

impl OvmfPaths {
    /// Search for an OVMF file (either code or vars).
    ///
    /// An explicit command-line path wins; otherwise the usual system
    /// install locations are tried.
    fn find_ovmf_file(
        file_type: OvmfFileType,
        user_provided: Option<&PathBuf>,
        arch: UefiArch,
    ) -> Result<PathBuf> {
        if let Some(path) = user_provided {
            // The user provided an exact path to use; verify that it
            // exists.
            if path.exists() {
                Ok(path.clone())
            } else {
                bail!(
                    "ovmf {} file does not exist: {}",
                    file_type.as_str(),
                    path.display()
                );
            }
        } else {
            first_existing(file_type.system_paths(arch).iter().copied()).with_context(|| {
                format!(
                    "no ovmf {} file found for {arch}, pass --ovmf-{}",
                    file_type.as_str(),
                    file_type.as_str()
                )
            })
        }
    }

    fn find(opt: &QemuOpt, arch: UefiArch) -> Result<Self> {
        let code = Self::find_ovmf_file(OvmfFileType::Code, opt.ovmf_code.as_ref(), arch)?;
        let vars = Self::find_ovmf_file(OvmfFileType::Vars, opt.ovmf_vars.as_ref(), arch)?;

        Ok(Self { code, vars })
    }
}

enum PflashMode {
    ReadOnly,
    ReadWrite,
}

fn add_pflash_args(cmd: &mut Command, file: &Path, mode: PflashMode) {
    // Build the argument as an OsString to avoid requiring a UTF-8 path.
    let mut arg = OsString::from("if=pflash,format=raw,readonly=");
    arg.push(match mode {
        PflashMode::ReadOnly => "on",
        PflashMode::ReadWrite => "off",
    });
    arg.push(",file=");
    arg.push(file);

    cmd.arg("-drive");
    cmd.arg(arg);
}

/// Send the application's log output (port 0xe9) and OVMF's debug output
/// (port 0x402) to files in `log_dir`. Returns the path of the application
/// log.
fn add_debugcon_args(cmd: &mut Command, log_dir: &Path) -> PathBuf {
    let app_log = log_dir.join("debugcon.log");
    let mut arg = OsString::from("file:");
    arg.push(&app_log);
    cmd.arg("-debugcon");
    cmd.arg(arg);

    let mut arg = OsString::from("file,id=fw,path=");
    arg.push(log_dir.join("ovmf-debugcon.log"));
    cmd.arg("-chardev");
    cmd.arg(arg);
    cmd.args(["-device", "isa-debugcon,chardev=fw,iobase=0x402"]);

    app_log
}

/// Watches the serial console of the VM.
pub struct SerialScanner {
    ansi_escape: Regex,
    image_base_line: Regex,
    image_base: Option<u64>,
    lookup_failure: Option<String>,
}

impl SerialScanner {
    pub fn new() -> Self {
        Self {
            // The console output protocol adds ANSI escapes when writing
            // to the serial device.
            ansi_escape: Regex::new(r"(\x9b|\x1b\[)[0-?]*[ -/]*[@-~]").expect("invalid regex"),
            image_base_line: Regex::new(r"Image base: 0x([0-9a-fA-F]+)").expect("invalid regex"),
            image_base: None,
            lookup_failure: None,
        }
    }

    /// Record what `line` reports. Returns the line without escapes or
    /// trailing whitespace, and the image base if this line reports it.
    pub fn process_line(&mut self, line: &str) -> (String, Option<u64>) {
        let line = self.ansi_escape.replace_all(line.trim_end(), "").into_owned();

        let mut reported_base = None;
        if let Some(captures) = self.image_base_line.captures(&line) {
            reported_base = u64::from_str_radix(&captures[1], 16).ok();
            self.image_base = reported_base;
        } else if let Some(pos) = line.find("handleprotocol:") {
            self.lookup_failure = Some(line[pos..].to_string());
        }

        (line, reported_base)
    }

    pub fn image_base(&self) -> Option<u64> {
        self.image_base
    }
}

impl Default for SerialScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Create an EFI boot directory to pass into QEMU.
fn build_esp_dir(opt: &QemuOpt) -> Result<PathBuf> {
    let esp_dir = target_dir(*opt.target, &opt.build_mode).join("esp");

    let boot_dir = esp_dir.join("EFI").join("BOOT");
    if !boot_dir.exists() {
        fs_err::create_dir_all(&boot_dir)?;
    }

    let app = app_path(*opt.target, &opt.build_mode);
    fs_err::copy(app, boot_dir.join(opt.target.boot_file_name()))?;

    Ok(esp_dir)
}

/// Wrap a child process to automatically kill it when dropped.
struct ChildWrapper(Child);

impl Drop for ChildWrapper {
    fn drop(&mut self) {
        // Do nothing if child has already exited (this call doesn't block).
        if matches!(self.0.try_wait(), Ok(Some(_))) {
            return;
        }

        if let Err(err) = self.0.kill() {
            eprintln!("failed to kill process: {err}");
        }
        if let Err(err) = self.0.wait() {
            eprintln!("failed to wait for process exit: {err}");
        }
    }
}

pub fn run_qemu(arch: UefiArch, opt: &QemuOpt) -> Result<()> {
    let mut cmd = Command::new(arch.qemu_exe());

    if is_windows_host() {
        // The QEMU installer for Windows does not add its directory to the
        // PATH.
        let mut path = env::var_os("PATH").unwrap_or_default();
        path.push(r";C:\Program Files\qemu");
        cmd.env("PATH", path);
    }

    // Disable default devices.
    // QEMU by defaults enables a ton of devices which slow down boot.
    cmd.arg("-nodefaults");

    // Skip right past the boot menu. `splash-time` is ignored unless the
    // menu is enabled.
    cmd.args(["-boot", "menu=on,splash-time=0"]);

    let mut debugcon_log = None;
    match arch {
        UefiArch::AArch64 => {
            cmd.args(["-machine", "virt"]);
            cmd.args(["-cpu", "cortex-a72"]);
            cmd.args(["-device", "virtio-gpu-pci"]);
        }
        UefiArch::IA32 | UefiArch::X86_64 => {
            cmd.args(["-machine", "q35"]);
            cmd.args(["-m", "256M"]);
            cmd.args(["-vga", "std"]);

            if is_linux_host() && !opt.disable_kvm {
                cmd.arg("--enable-kvm");
            }

            let log_dir = target_dir(arch, &opt.build_mode);
            fs_err::create_dir_all(&log_dir)?;
            debugcon_log = Some(add_debugcon_args(&mut cmd, &log_dir));
        }
    }

    let tmp_dir = TempDir::new()?;
    let tmp_dir = tmp_dir.path();

    let ovmf_paths = OvmfPaths::find(opt, arch)?;

    // Make a copy of the OVMF vars file so that it can be used
    // read+write without modifying the original.
    let ovmf_vars = tmp_dir.join("ovmf_vars");
    fs_err::copy(&ovmf_paths.vars, &ovmf_vars)?;
    // Distribution files are often read-only.
    #[cfg(target_os = "linux")]
    fs_err::set_permissions(&ovmf_vars, Permissions::from_mode(0o666))?;

    add_pflash_args(&mut cmd, &ovmf_paths.code, PflashMode::ReadOnly);
    add_pflash_args(&mut cmd, &ovmf_vars, PflashMode::ReadWrite);

    // Mount the ESP directory as a FAT drive.
    cmd.arg("-drive");
    let mut drive_arg = OsString::from("format=raw,file=fat:rw:");
    drive_arg.push(build_esp_dir(opt)?);
    cmd.arg(drive_arg);

    if opt.headless {
        cmd.args(["-display", "none"]);
    }

    if opt.gdb {
        cmd.arg("-gdb").arg(format!("tcp::{GDB_PORT}"));
    }

    // The firmware console is mirrored on the serial port.
    cmd.args(["-serial", "stdio"]);

    println!("{}", command_to_string(&cmd));

    let app = app_path(arch, &opt.build_mode);
    let section_offsets = match SectionOffsets::read(&app) {
        Ok(offsets) => Some(offsets),
        Err(err) => {
            eprintln!("warning: symbols cannot be located: {err:#}");
            None
        }
    };

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    let mut child = ChildWrapper(cmd.spawn().context("failed to launch qemu")?);
    let stdout = child.0.stdout.take().context("qemu stdout is not piped")?;

    let mut scanner = SerialScanner::new();
    for line in BufReader::new(stdout).lines() {
        let (line, image_base) = scanner.process_line(&line?);
        println!("{line}");

        if let Some(image_base) = image_base {
            let symbols = section_offsets
                .map(|offsets| add_symbol_file_command(&app, image_base, offsets));
            if opt.gdb {
                print_gdb_instructions(arch, &line, symbols.as_deref());
            } else if let Some(symbols) = symbols {
                println!("load symbols in gdb with: {symbols}");
            }
        }
    }

    if let Some(debugcon_log) = debugcon_log {
        println!("log output written to {}", debugcon_log.display());
    }

    let status = child.0.wait()?;
    let qemu_exit_code = status
        .code()
        .context(format!("qemu was terminated by a signal: {status:?}"))?;

    if qemu_exit_code != 0 {
        bail!("qemu exited with code {qemu_exit_code}, expected 0");
    }

    match (scanner.image_base(), &scanner.lookup_failure) {
        (Some(base), _) => {
            println!("uefi-probe-app was loaded at {base:#x}");
            Ok(())
        }
        (None, Some(failure)) => bail!("the image base lookup failed: {failure}"),
        (None, None) => bail!("the image base was never reported"),
    }
}

fn print_gdb_instructions(arch: UefiArch, line: &str, symbols: Option<&str>) {
    println!("--------------------------------------------------------------");
    println!("{line}; the application now waits for a debugger:");
    println!("  (gdb) target remote :{GDB_PORT}");
    if let Some(symbols) = symbols {
        println!("  (gdb) {symbols}");
    }
    println!("  (gdb) set architecture {}", arch.gdb_architecture());
    println!("  (gdb) frame function uefi_probe::debug::wait_for_debugger");
    println!("  (gdb) set var wait = 0");
    println!("  (gdb) continue");
    println!("--------------------------------------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_strips_escapes() {
        let mut scanner = SerialScanner::new();
        let (line, image_base) =
            scanner.process_line("\x1b[1;37;40m*** UEFI:Test ***\x1b[0;37;40m\r\n");
        assert_eq!(line, "*** UEFI:Test ***");
        assert_eq!(image_base, None);
        assert_eq!(scanner.image_base(), None);
    }

    #[test]
    fn test_scanner_image_base() {
        let mut scanner = SerialScanner::new();
        let (line, image_base) = scanner.process_line("\x1b[0;37;40mImage base: 0x6e2f000\r\n");
        assert_eq!(line, "Image base: 0x6e2f000");
        assert_eq!(image_base, Some(0x6e2_f000));
        assert_eq!(scanner.image_base(), Some(0x6e2_f000));

        // Later lines do not report the base again.
        let (_, image_base) = scanner.process_line("Hello world !");
        assert_eq!(image_base, None);
        assert_eq!(scanner.image_base(), Some(0x6e2_f000));
    }

    #[test]
    fn test_scanner_lookup_failure() {
        let mut scanner = SerialScanner::new();
        scanner.process_line("\x1b[1;33;40mhandleprotocol: Unsupported\x1b[0;37;40m");
        assert_eq!(scanner.image_base(), None);
        assert_eq!(
            scanner.lookup_failure.as_deref(),
            Some("handleprotocol: Unsupported")
        );
    }

    #[test]
    fn test_user_provided_ovmf_path_must_exist() {
        let missing = PathBuf::from("/nonexistent/OVMF_CODE.fd");
        let err = OvmfPaths::find_ovmf_file(OvmfFileType::Code, Some(&missing), UefiArch::X86_64)
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_debugcon_args() {
        let mut cmd = Command::new("qemu");
        let log = add_debugcon_args(&mut cmd, Path::new("target/x86_64-unknown-uefi/debug"));
        assert_eq!(log, Path::new("target/x86_64-unknown-uefi/debug/debugcon.log"));
        assert_eq!(
            command_to_string(&cmd),
            "qemu -debugcon file:target/x86_64-unknown-uefi/debug/debugcon.log \
             -chardev file,id=fw,path=target/x86_64-unknown-uefi/debug/ovmf-debugcon.log \
             -device isa-debugcon,chardev=fw,iobase=0x402"
        );
    }

    #[test]
    fn test_pflash_args() {
        let mut cmd = Command::new("qemu");
        add_pflash_args(&mut cmd, Path::new("code.fd"), PflashMode::ReadOnly);
        assert_eq!(
            command_to_string(&cmd),
            "qemu -drive if=pflash,format=raw,readonly=on,file=code.fd"
        );
    }
}
