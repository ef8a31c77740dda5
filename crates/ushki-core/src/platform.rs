//! Platform paths and mpv process helpers.

use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/ushki/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("ushki")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ushki")
    }
}

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/ushki/
    // (avoid macOS Application Support folder for consistency)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("ushki")
    }
    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ushki")
    }
}

/// Unique IPC socket name for one mpv handle. The pid plus a per-process
/// counter keeps concurrent handles and concurrent processes apart.
#[cfg(unix)]
pub fn mpv_socket_name(tag: u64) -> String {
    format!(
        "{}/ushki-mpv-{}-{}.sock",
        std::env::temp_dir().display(),
        std::process::id(),
        tag
    )
}

#[cfg(windows)]
pub fn mpv_socket_name(tag: u64) -> String {
    format!("ushki-mpv-{}-{}", std::process::id(), tag)
}

#[cfg(unix)]
pub fn mpv_socket_arg(socket_name: &str) -> String {
    format!("--input-ipc-server={}", socket_name)
}

#[cfg(windows)]
pub fn mpv_socket_arg(socket_name: &str) -> String {
    format!("--input-ipc-server=\\\\.\\pipe\\{}", socket_name)
}

#[cfg(unix)]
pub fn mpv_binary_name() -> &'static str {
    "mpv"
}

#[cfg(windows)]
pub fn mpv_binary_name() -> &'static str {
    "mpv.exe"
}
