use std::io;
use std::path::PathBuf;

/// Location of the per-user data directory holding `config.toml` and
/// the structured error log.
#[derive(Debug, Clone)]
pub struct DataPath {
    pub root: PathBuf,
}

impl DataPath {
    pub fn new(data_path: Option<PathBuf>) -> io::Result<Self> {
        let root = match data_path {
            Some(path) => path,
            None => dirs::home_dir()
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        "Home directory not found. Please specify --data-path.",
                    )
                })?
                .join(".indexr"),
        };

        Ok(Self { root })
    }

    pub fn ensure_exists(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.root.join("error.log")
    }
}

pub fn validate_server_url(value: &str) -> io::Result<()> {
    if value.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Server URL cannot be empty",
        ));
    }

    let parsed = url::Url::parse(value).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid server URL: {e}"),
        )
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Server URL must use http or https, got '{other}'"),
            ));
        }
    }

    if parsed.host_str().is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Server URL must include a host",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_path_uses_explicit_root() {
        let data_path =
            DataPath::new(Some(PathBuf::from("/tmp/indexr-test"))).expect("Should build path");
        assert_eq!(
            data_path.config_path(),
            PathBuf::from("/tmp/indexr-test/config.toml")
        );
        assert_eq!(
            data_path.error_log_path(),
            PathBuf::from("/tmp/indexr-test/error.log")
        );
    }

    #[test]
    fn test_validate_server_url_accepts_http_and_https() {
        assert!(validate_server_url("http://localhost:8000").is_ok());
        assert!(validate_server_url("https://indexer.example.com").is_ok());
    }

    #[test]
    fn test_validate_server_url_rejects_bad_input() {
        assert!(validate_server_url("").is_err());
        assert!(validate_server_url("not a url").is_err());
        assert!(validate_server_url("ftp://example.com").is_err());
        assert!(validate_server_url("file:///etc/passwd").is_err());
    }
}
