//! HTTP executor for presigned-URL transfers

use crate::cache::{Command, Operation};
use crate::transfer::{archive, emit, TransferError, TransferExecutor, TransferOutcome};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use ureq::SendBody;
use tracing::{debug, warn};
use url::Url;

/// Executes operations with blocking `ureq` requests on tokio's blocking pool
#[derive(Debug, Clone, Default)]
pub struct HttpExecutor;

impl HttpExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransferExecutor for HttpExecutor {
    async fn execute(&self, operation: &Operation) -> TransferOutcome {
        let direction = operation.direction;
        let commands = operation.commands.clone();

        let outcome = match tokio::task::spawn_blocking(move || run_commands(&commands)).await {
            Ok(result) => TransferOutcome::from(result),
            Err(e) => TransferOutcome::Error(format!("transfer task failed: {}", e)),
        };

        outcome.log(direction);
        outcome
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn run_commands(commands: &[Command]) -> Result<(), TransferError> {
    for command in commands {
        match command {
            Command::Log { message, severity } => emit(*severity, message),
            Command::DownloadWithTimeout {
                urls,
                archive,
                timeout_secs,
            } => download(urls, archive, Duration::from_secs(*timeout_secs))?,
            Command::Extract { archive: path, into } => archive::extract(path, into)?,
            Command::Compress {
                root,
                directories,
                archive: path,
            } => {
                if archive::compress(root, directories, path)? == 0 {
                    let _ = fs::remove_file(path);
                    return Err(TransferError::NothingArchived);
                }
            }
            Command::UploadWithTimeout {
                url,
                archive,
                timeout_secs,
            } => upload(url, archive, Duration::from_secs(*timeout_secs))?,
        }
    }
    Ok(())
}

fn agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    ureq::Agent::new_with_config(config)
}

/// Try each candidate in order until one exists. All candidates share one
/// deadline.
fn download(urls: &[Url], archive: &Path, timeout: Duration) -> Result<(), TransferError> {
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| TransferError::archive(format!("creating {}", parent.display()), e))?;
    }

    let deadline = Instant::now() + timeout;
    let mut last_error = None;

    for url in urls {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransferError::Timeout(timeout.as_secs()));
        }

        match download_one(url, archive, remaining) {
            Ok(()) => {
                debug!("Downloaded cache archive {}", url.path());
                return Ok(());
            }
            Err(TransferError::Miss) => debug!("No cache archive at {}", url.path()),
            Err(TransferError::Timeout(_)) => {
                let _ = fs::remove_file(archive);
                return Err(TransferError::Timeout(timeout.as_secs()));
            }
            Err(e) => {
                warn!("Fetching {} failed: {}", url.path(), e);
                let _ = fs::remove_file(archive);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(TransferError::Miss))
}

fn download_one(url: &Url, archive: &Path, timeout: Duration) -> Result<(), TransferError> {
    let mut response = agent(timeout)
        .get(url.as_str())
        .call()
        .map_err(|e| classify(e, timeout))?;

    match response.status().as_u16() {
        200 => {}
        404 => return Err(TransferError::Miss),
        // S3 answers 403 for missing keys when the signer may not list the bucket
        403 => {
            return match error_code(&mut response) {
                None => Err(TransferError::Miss),
                Some(code) if code == "AccessDenied" || code == "NoSuchKey" => {
                    Err(TransferError::Miss)
                }
                Some(code) => {
                    warn!("Object store refused GET {} with HTTP 403 ({})", url.path(), code);
                    Err(TransferError::Denied {
                        verb: "GET",
                        status: 403,
                        code,
                    })
                }
            }
        }
        status => return Err(TransferError::Rejected { verb: "GET", status }),
    }

    let mut file = File::create(archive)
        .map_err(|e| TransferError::archive(format!("creating {}", archive.display()), e))?;
    io::copy(&mut response.body_mut().as_reader(), &mut file)
        .map_err(|e| classify_io(e, timeout))?;
    Ok(())
}

fn upload(url: &Url, archive: &Path, timeout: Duration) -> Result<(), TransferError> {
    let reading = || format!("reading {}", archive.display());
    let mut file = File::open(archive).map_err(|e| TransferError::archive(reading(), e))?;
    let length = file
        .metadata()
        .map_err(|e| TransferError::archive(reading(), e))?
        .len();

    // Presigned PUTs need a known length; S3 rejects chunked bodies
    let response = agent(timeout)
        .put(url.as_str())
        .header("Content-Type", "application/gzip")
        .header("Content-Length", length.to_string())
        .send(SendBody::from_reader(&mut file))
        .map_err(|e| classify(e, timeout))?;

    match response.status().as_u16() {
        200..=299 => {
            debug!("Uploaded {} bytes to {}", length, url.path());
            Ok(())
        }
        status => Err(TransferError::Rejected { verb: "PUT", status }),
    }
}

/// `<Code>` of an S3 XML error body, if there is one
fn error_code(response: &mut ureq::http::Response<ureq::Body>) -> Option<String> {
    let body = response
        .body_mut()
        .with_config()
        .limit(64 * 1024)
        .read_to_string()
        .ok()?;
    let start = body.find("<Code>")? + "<Code>".len();
    let end = start + body[start..].find("</Code>")?;
    let code = body[start..end].trim();
    (!code.is_empty()).then(|| code.to_string())
}

fn classify(error: ureq::Error, timeout: Duration) -> TransferError {
    match error {
        ureq::Error::Timeout(_) => TransferError::Timeout(timeout.as_secs()),
        ureq::Error::Io(e) => classify_io(e, timeout),
        other => TransferError::NetworkFailure(other.to_string()),
    }
}

fn classify_io(error: io::Error, timeout: Duration) -> TransferError {
    let wrapped_timeout = error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<ureq::Error>())
        .is_some_and(|inner| matches!(inner, ureq::Error::Timeout(_)));

    if wrapped_timeout || error.kind() == io::ErrorKind::TimedOut {
        TransferError::Timeout(timeout.as_secs())
    } else {
        TransferError::NetworkFailure(error.to_string())
    }
}
