use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/docpipe/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("docpipe")
    }
    #[cfg(windows)]
    {
        // On Windows, check for portable data directory in executable directory first
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_data = exe_dir.join("data");
                if portable_data.exists() {
                    return portable_data;
                }
            }
        }

        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docpipe")
    }
}

pub fn config_dir() -> PathBuf {
    // On Windows, check for portable config.toml in executable directory first
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_config = exe_dir.join("config.toml");
                if portable_config.exists() {
                    return exe_dir.to_path_buf();
                }
            }
        }
    }

    // On macOS and Linux, always use ~/.config/docpipe/
    // (avoid macOS Application Support folder for consistency)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("docpipe")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docpipe")
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}
