//! Startup privilege check.

/// Whether the check applies on this platform without being asked for.
pub fn required_by_platform() -> bool {
    cfg!(windows)
}

#[cfg(unix)]
pub fn is_elevated() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(windows)]
pub fn is_elevated() -> bool {
    // `net session` only succeeds from an elevated process.
    std::process::Command::new("net")
        .arg("session")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(any(unix, windows)))]
pub fn is_elevated() -> bool {
    false
}

pub const ELEVATION_HINT: &str = "Please run this program as administrator.\n\
Right-click the program and choose 'Run as administrator'.";
