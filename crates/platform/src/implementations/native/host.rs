//! Host identification through the kernel

use std::ffi::CStr;
use std::mem::MaybeUninit;

/// Machine identifier as reported by `uname(2)`, e.g. `x86_64` or `arm64`.
pub(crate) fn machine_identifier() -> Option<String> {
    let mut uts = MaybeUninit::<libc::utsname>::zeroed();
    // SAFETY: uname only writes into the struct we hand it, and zeroed memory
    // is a valid `utsname`.
    let rc = unsafe { libc::uname(uts.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: uname returned success so the struct is initialized, and the
    // kernel NUL-terminates `machine`.
    let machine = unsafe {
        let uts = uts.assume_init_ref();
        CStr::from_ptr(uts.machine.as_ptr())
    };
    Some(machine.to_string_lossy().into_owned())
}

/// True when the process runs under Rosetta on an Apple silicon host.
#[cfg(target_os = "macos")]
pub(crate) fn is_translated() -> bool {
    let mut value: libc::c_int = 0;
    let mut size = std::mem::size_of::<libc::c_int>();
    // SAFETY: the name is NUL-terminated, and `value`/`size` describe a
    // writable buffer of exactly `size` bytes.
    let rc = unsafe {
        libc::sysctlbyname(
            c"sysctl.proc_translated".as_ptr(),
            std::ptr::addr_of_mut!(value).cast::<libc::c_void>(),
            std::ptr::addr_of_mut!(size),
            std::ptr::null_mut(),
            0,
        )
    };
    // ENOENT means the kernel predates Rosetta 2; treat as native
    rc == 0 && value == 1
}

#[cfg(not(target_os = "macos"))]
pub(crate) fn is_translated() -> bool {
    false
}
