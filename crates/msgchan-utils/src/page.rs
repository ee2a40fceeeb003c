//! Cross-platform system page size lookup.

#[cfg(unix)]
pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        tracing::warn!(%size, "sysconf(_SC_PAGESIZE) returned a non-positive value, falling back to 4096");
        4096
    } else {
        size as usize
    }
}

#[cfg(windows)]
pub fn page_size() -> usize {
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    unsafe {
        let mut info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut info);
        info.dwPageSize as usize
    }
}

#[cfg(not(any(unix, windows)))]
pub fn page_size() -> usize {
    tracing::warn!("page size detection not implemented for this platform, falling back to 4096");
    4096
}
