use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "GAUGE_READOUT_CONFIG";

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the config file path: `$GAUGE_READOUT_CONFIG`, else `<exe_dir>/config.json`
pub fn get_config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => get_exe_dir().join("config.json"),
    }
}

/// Returns the per-user data directory for downloaded OCR data.
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gauge-readout")
}

/// Returns the local tessdata directory: `<data_dir>/tessdata/`
pub fn get_tessdata_dir() -> PathBuf {
    get_data_dir().join("tessdata")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tessdata_dir_is_under_data_dir() {
        assert!(get_tessdata_dir().starts_with(get_data_dir()));
        assert!(get_tessdata_dir().ends_with("tessdata"));
    }

    #[test]
    fn test_logs_dir_is_next_to_executable() {
        assert_eq!(get_logs_dir(), get_exe_dir().join("logs"));
    }
}
