use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("download.dest_dir must not be empty")]
    EmptyDestination,

    #[error("download.user_agent must not be empty")]
    EmptyUserAgent,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_input(config)?;
    validate_concurrency(config)?;
    validate_download(config)?;
    Ok(())
}

fn positive(value: u64, field: &'static str) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

fn validate_input(config: &Config) -> Result<(), ValidationError> {
    positive(config.input.max_file_bytes.as_u64(), "input.max_file_bytes")?;
    positive(config.input.max_url_length as u64, "input.max_url_length")
}

/// Zero slots or zero workers would deadlock the producer
fn validate_concurrency(config: &Config) -> Result<(), ValidationError> {
    positive(config.queue.capacity as u64, "queue.capacity")?;
    positive(config.workers.count as u64, "workers.count")
}

fn validate_download(config: &Config) -> Result<(), ValidationError> {
    let download = &config.download;

    if download.dest_dir.as_os_str().is_empty() {
        return Err(ValidationError::EmptyDestination);
    }
    if download.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }

    positive(
        download.max_document_bytes.as_u64(),
        "download.max_document_bytes",
    )?;
    positive(download.read_timeout_secs, "download.read_timeout_secs")?;
    positive(download.connect_timeout_secs, "download.connect_timeout_secs")
}
