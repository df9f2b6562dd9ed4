use std::{env, path::PathBuf};

/// Resolves the daemon control socket path from environment and defaults.
pub fn default_socket_path() -> PathBuf {
    if let Some(override_path) = env::var_os("BOSUN_SOCKET") {
        return PathBuf::from(override_path);
    }

    if let Some(runtime_dir) = env::var_os("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("bosund.sock");
    }

    PathBuf::from("/tmp/bosund.sock")
}
