//! Downstream trigger: new object in the bucket → start the ETL batch job.
//!
//! Runs outside the ingest pipeline, invoked by the bucket's notification
//! mechanism. The job service sits behind `JobLauncher`. Failures are
//! returned as a 500 response value, never raised.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info};

/// Job started for each new object.
pub const JOB_NAME: &str = "glue-etl-bovespa-v2";
/// Value passed as the job's `--JOB_NAME` argument.
pub const JOB_NAME_ARG: &str = "glue-etl-bovespa";

/// Errors while handling a notification.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("malformed event: {0}")]
    Event(String),

    #[error("job launch failed: {0}")]
    Launch(String),
}

/// Starts batch jobs.
pub trait JobLauncher {
    /// Start `job_name` with `arguments`; returns the run identifier.
    fn start_job_run(
        &self,
        job_name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> Result<String, TriggerError>;
}

/// Launcher that only logs the request. Used by the CLI dry run.
pub struct LoggingLauncher;

impl JobLauncher for LoggingLauncher {
    fn start_job_run(
        &self,
        job_name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> Result<String, TriggerError> {
        info!(job_name, ?arguments, "dry run: job not started");
        Ok(format!("dry-run-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S")))
    }
}

#[derive(Debug, Deserialize)]
struct S3Event {
    #[serde(rename = "Records")]
    records: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketRef,
    object: ObjectRef,
}

#[derive(Debug, Deserialize)]
struct BucketRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectRef {
    key: String,
}

/// Status/body pair returned to the notification runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON document, serialized.
    pub body: String,
}

impl TriggerResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Parsed body.
    pub fn body_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Locator of the first record's object, percent-decoded.
///
/// `+` is kept as-is; only `%XX` escapes are decoded.
pub fn object_locator(event: &Value) -> Result<String, TriggerError> {
    let event: S3Event =
        S3Event::deserialize(event).map_err(|e| TriggerError::Event(e.to_string()))?;
    let record = event
        .records
        .first()
        .ok_or_else(|| TriggerError::Event("no records".into()))?;
    let raw = format!("s3://{}/{}", record.s3.bucket.name, record.s3.object.key);
    Ok(percent_decode_str(&raw).decode_utf8_lossy().into_owned())
}

/// Arguments passed to the job for one input object.
pub fn job_arguments(input_file: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("--input_file".to_string(), input_file.to_string()),
        ("--JOB_NAME".to_string(), JOB_NAME_ARG.to_string()),
        (
            "--enable-continuous-cloudwatch-log".to_string(),
            "true".to_string(),
        ),
    ])
}

/// Handle one bucket notification.
pub fn handle_event(event: &Value, launcher: &dyn JobLauncher) -> TriggerResponse {
    info!(%event, "event received");
    match start_for_event(event, launcher) {
        Ok((file, run_id)) => TriggerResponse {
            status_code: 200,
            body: json!({
                "message": "batch job started",
                "jobRunId": run_id,
                "processedFile": file,
            })
            .to_string(),
        },
        Err(e) => {
            error!("trigger failed: {e}");
            TriggerResponse {
                status_code: 500,
                body: json!({
                    "error": e.to_string(),
                    "message": "failed to process file",
                })
                .to_string(),
            }
        }
    }
}

fn start_for_event(
    event: &Value,
    launcher: &dyn JobLauncher,
) -> Result<(String, String), TriggerError> {
    let file = object_locator(event)?;
    info!(%file, "object locator");

    let args = job_arguments(&file);
    info!(job = JOB_NAME, ?args, "starting job");
    let run_id = launcher.start_job_run(JOB_NAME, &args)?;
    info!(%run_id, "job started");
    Ok((file, run_id))
}
