// SPDX-License-Identifier: MIT OR Apache-2.0

//! Halt for an external debugger.
//!
//! Firmware debugging usually goes like this: the application prints its
//! image base, then spins. The developer attaches gdb to the virtual
//! machine, loads the symbols at the printed base, clears the wait flag and
//! continues.

use core::hint;
use core::ptr;
use log::info;

/// Spin until a debugger clears the local `wait` flag.
///
/// From gdb, select the frame of this function and run `set var wait = 0`,
/// then `continue`. Nothing inside the program ever clears the flag, so
/// without a debugger this never returns.
#[inline(never)]
pub fn wait_for_debugger() {
    info!("waiting for debugger, clear `wait` to continue");

    let mut wait = true;
    spin_while_set(&mut wait);

    info!("debugger released the wait loop");
}

/// Spin as long as `flag` reads `true`. The flag is changed from outside the
/// program, so every iteration reloads it from memory.
fn spin_while_set(flag: &mut bool) {
    let flag: *mut bool = flag;
    // SAFETY: `flag` comes from a live `&mut bool`, so it is valid, aligned
    // and initialized for the whole loop.
    while unsafe { ptr::read_volatile(flag) } {
        hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_flag_does_not_spin() {
        let mut wait = false;
        spin_while_set(&mut wait);
        assert!(!wait);
    }
}
