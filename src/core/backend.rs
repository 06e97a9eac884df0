use crate::core::job::{CancelJobResponse, JobSnapshot, StartJobResponse};
use crate::core::models::DataPath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;

/// The three operations the opaque indexing service exposes.
#[async_trait::async_trait]
pub trait IndexBackend: Send + Sync {
    /// Query the current job snapshot.
    async fn job_status(&self) -> io::Result<JobSnapshot>;

    /// Ask the server to start a new indexing run.
    async fn start_job(&self) -> io::Result<StartJobResponse>;

    /// Ask the server to cancel the given run.
    async fn cancel_job(&self, task_id: &str) -> io::Result<CancelJobResponse>;
}

/// Error types for backend operations
#[derive(Debug)]
pub enum BackendError {
    ConnectionError(String),
    ApiError(String),
    DataParseError(String),
    ConfigurationError(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::ConnectionError(msg) => write!(f, "Connection error: {msg}"),
            BackendError::ApiError(msg) => write!(f, "API error: {msg}"),
            BackendError::DataParseError(msg) => write!(f, "Data parse error: {msg}"),
            BackendError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for io::Error {
    fn from(err: BackendError) -> Self {
        io::Error::other(err)
    }
}

/// Structured error context for detailed error reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: String,
    pub timestamp: String,
    pub error_type: String,
    pub error_message: String,
    pub request_url: Option<String>,
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl ErrorContext {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            error_type: String::new(),
            error_message: String::new(),
            request_url: None,
            status_code: None,
            response_body: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_error(mut self, error_type: &str, message: &str) -> Self {
        self.error_type = error_type.to_string();
        self.error_message = message.to_string();
        self
    }

    pub fn with_request_details(
        mut self,
        url: &str,
        status_code: Option<u16>,
        response_body: Option<&str>,
    ) -> Self {
        self.request_url = Some(url.to_string());
        self.status_code = status_code;
        self.response_body = response_body.map(|s| s.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn log_error(&self, data_path: &DataPath) {
        log::error!(
            target: "backend_errors",
            "Backend error | Operation: {} | Type: {} | Message: {} | URL: {:?} | Status: {:?} | Context: {:?}",
            self.operation,
            self.error_type,
            self.error_message,
            self.request_url,
            self.status_code,
            self.metadata
        );

        if let Err(e) = self.write_to_error_log(data_path) {
            log::warn!("Failed to write to error log file: {e}");
        }
    }

    fn write_to_error_log(
        &self,
        data_path: &DataPath,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        use std::fs::OpenOptions;
        use std::io::Write;

        std::fs::create_dir_all(&data_path.root)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(data_path.error_log_path())?;

        // One structured error per line, as JSON
        let error_json = serde_json::to_string(self)?;
        writeln!(file, "{error_json}")?;

        Ok(())
    }
}

/// Utility functions for reading the structured error log
pub struct ErrorLogReader;

impl ErrorLogReader {
    /// Read recent errors, most recent first.
    pub fn read_recent_errors(
        data_path: &DataPath,
        limit: usize,
        operation_filter: Option<&str>,
    ) -> Result<Vec<ErrorContext>, Box<dyn std::error::Error + Send + Sync>> {
        use std::fs::File;
        use std::io::{BufRead, BufReader};

        let error_log_path = data_path.error_log_path();
        if !error_log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(error_log_path)?;
        let reader = BufReader::new(file);

        let mut errors = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if let Ok(error) = serde_json::from_str::<ErrorContext>(&line) {
                if let Some(operation) = operation_filter {
                    if error.operation != operation {
                        continue;
                    }
                }
                errors.push(error);
            }
        }

        errors.reverse();
        errors.truncate(limit);

        Ok(errors)
    }

    /// Aggregate error counts per operation.
    pub fn get_error_stats(
        data_path: &DataPath,
    ) -> Result<HashMap<String, ErrorStats>, Box<dyn std::error::Error + Send + Sync>> {
        use std::fs::File;
        use std::io::{BufRead, BufReader};

        let error_log_path = data_path.error_log_path();
        if !error_log_path.exists() {
            return Ok(HashMap::new());
        }

        let file = File::open(error_log_path)?;
        let reader = BufReader::new(file);

        let mut stats: HashMap<String, ErrorStats> = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            if let Ok(error) = serde_json::from_str::<ErrorContext>(&line) {
                let entry = stats
                    .entry(error.operation.clone())
                    .or_insert_with(ErrorStats::new);
                entry.total_errors += 1;

                let count = entry
                    .error_types
                    .entry(error.error_type.clone())
                    .or_insert(0);
                *count += 1;

                entry.last_error_time = Some(error.timestamp.clone());
            }
        }

        Ok(stats)
    }

    /// Remove the error log if present.
    pub fn clear(data_path: &DataPath) -> io::Result<()> {
        let error_log_path = data_path.error_log_path();
        if error_log_path.exists() {
            std::fs::remove_file(error_log_path)?;
        }
        Ok(())
    }
}

/// Statistics about errors for one backend operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub error_types: HashMap<String, usize>,
    pub last_error_time: Option<String>,
}

impl ErrorStats {
    fn new() -> Self {
        Self {
            total_errors: 0,
            error_types: HashMap::new(),
            last_error_time: None,
        }
    }
}
