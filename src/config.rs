use std::path::PathBuf;
use std::time::Duration;

use crate::guard::DEFAULT_SESSION_TTL;

/// File name of the backing spreadsheet
pub const DATA_FILE_NAME: &str = "barcode_database.xlsx";

/// Address the web server listens on unless told otherwise
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Runtime settings of the barcode desk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub data_file: PathBuf,
    pub session_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_file: default_data_file(),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl Config {
    /// Build the configuration from positional command-line arguments
    ///
    /// Usage: `website [BIND_ADDR] [DATA_FILE]`. `args[0]` is the program name.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = Config::default();

        if let Some(addr) = args.get(1) {
            config.bind_addr = addr.clone();
        }
        if let Some(path) = args.get(2) {
            config.data_file = PathBuf::from(path);
        }

        config
    }
}

/// The backing file sits next to the executable
///
/// Falls back to the working directory when the executable path is unknown.
pub fn default_data_file() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DATA_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(DATA_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_arguments() {
        let config = Config::from_args(&args(&["website"]));

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert!(config.data_file.ends_with(DATA_FILE_NAME));
        assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
    }

    #[test]
    fn positional_overrides() {
        let config = Config::from_args(&args(&["website", "0.0.0.0:8080", "/tmp/codes.xlsx"]));

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.data_file, PathBuf::from("/tmp/codes.xlsx"));
    }
}
