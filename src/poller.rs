//! Import status poller
//!
//! Queries the status endpoint for one record id until the import reaches a
//! terminal state or the attempt budget runs out. Every non-terminal answer
//! (transport error, non-200, bad JSON, missing or unknown status,
//! `importing`) is retried after the same fixed interval.

use crate::api::{ApiClient, RawResponse, STATUS_PATH};
use crate::config::PollSettings;
use crate::error::Result;
use crate::status::{extract_status, FailureReport, ImportStatus};
use crate::ui::{self, Report};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where status responses come from.
pub trait StatusSource {
    /// Perform one status request for `record_id`.
    fn fetch_status(&self, record_id: &str) -> Result<RawResponse>;

    /// The request URL with the credential masked, for logging.
    fn request_url(&self, record_id: &str) -> String;

    /// Mask any credential that appears in `text`.
    fn redact(&self, text: &str) -> String {
        text.to_string()
    }
}

impl StatusSource for ApiClient {
    fn fetch_status(&self, record_id: &str) -> Result<RawResponse> {
        self.fetch_import_status(record_id)
    }

    fn request_url(&self, record_id: &str) -> String {
        self.display_url(&status_path(record_id))
    }

    fn redact(&self, text: &str) -> String {
        self.redact_token(text)
    }
}

fn status_path(record_id: &str) -> String {
    format!("{STATUS_PATH}/{record_id}")
}

/// Terminal result of a poll session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        attempts: u32,
        elapsed: Duration,
    },
    Failure {
        attempts: u32,
        elapsed: Duration,
        report: FailureReport,
    },
    Timeout {
        attempts: u32,
        elapsed: Duration,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Failure { attempts, .. }
            | Self::Timeout { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Success { elapsed, .. }
            | Self::Failure { elapsed, .. }
            | Self::Timeout { elapsed, .. } => *elapsed,
        }
    }

    /// Process exit code: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// What a single attempt resolved to.
enum Step {
    Retry,
    Completed,
    Failed(FailureReport),
}

pub struct StatusPoller<'s, S: StatusSource> {
    source: &'s S,
    settings: PollSettings,
}

impl<'s, S: StatusSource> StatusPoller<'s, S> {
    pub fn new(source: &'s S, settings: PollSettings) -> Self {
        Self { source, settings }
    }

    /// Poll until a terminal outcome, then write the matching footer.
    pub fn run(&self, record_id: &str, report: &mut Report) -> io::Result<Outcome> {
        let outcome = self.poll(record_id, report)?;
        match &outcome {
            Outcome::Success { elapsed, .. } => report.success_footer(*elapsed)?,
            Outcome::Failure {
                elapsed,
                report: details,
                ..
            } => report.failure_footer(*elapsed, details)?,
            Outcome::Timeout { elapsed, attempts } => report.timeout_footer(*elapsed, *attempts)?,
        }
        Ok(outcome)
    }

    /// Poll until a terminal outcome, logging each attempt.
    pub fn poll(&self, record_id: &str, report: &mut Report) -> io::Result<Outcome> {
        let PollSettings {
            max_attempts,
            interval,
        } = self.settings;
        let started = Instant::now();
        info!(record_id, max_attempts, ?interval, "polling import status");

        for attempt in 1..=max_attempts {
            report.attempt_header(attempt, max_attempts)?;
            let url = self.source.request_url(record_id);
            report.request("GET", &url, &status_path(record_id))?;

            let step = match self.source.fetch_status(record_id) {
                Ok(res) => self.classify(&res, report)?,
                Err(err) => {
                    // Transport errors count as an ordinary retry
                    let message = self.source.redact(&err.to_string());
                    warn!(attempt, error = %message, "status request failed");
                    report.blank()?;
                    report.warn("Warning: Request exception")?;
                    report.line(format!("  Exception: {message}"))?;
                    report.line(format!("  Request URL: {url}"))?;
                    Step::Retry
                }
            };

            match step {
                Step::Completed => {
                    report.line("  Import completed")?;
                    info!(attempt, "import completed");
                    return Ok(Outcome::Success {
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    });
                }
                Step::Failed(details) => {
                    report.line("  Import failed")?;
                    warn!(attempt, "import failed");
                    return Ok(Outcome::Failure {
                        attempts: attempt,
                        elapsed: started.elapsed(),
                        report: details,
                    });
                }
                // No wait after the final attempt; the timeout follows at once
                Step::Retry if attempt < max_attempts => {
                    report.retry_notice(interval)?;
                    wait(interval);
                }
                Step::Retry => {}
            }
        }

        warn!(max_attempts, "import still not completed, giving up");
        Ok(Outcome::Timeout {
            attempts: max_attempts,
            elapsed: started.elapsed(),
        })
    }

    fn classify(&self, res: &RawResponse, report: &mut Report) -> io::Result<Step> {
        report.response(res, &self.source.redact(&res.body))?;

        if !res.is_ok() {
            debug!(status = res.status, "non-200 status response");
            report.blank()?;
            report.warn("Warning: API returned non-200 status code")?;
            report.line(format!("  Status code: {}", res.status))?;
            report.line(format!("  Status description: {}", res.reason))?;
            return Ok(Step::Retry);
        }

        // Body parses, but may still lack data.status
        let doc = match res.json() {
            Ok(doc) => doc,
            Err(err) => {
                debug!(error = %err, "status body is not JSON");
                report.blank()?;
                report.warn("Warning: Unable to parse JSON response")?;
                report.line(format!("  Error: {err}"))?;
                return Ok(Step::Retry);
            }
        };

        let Some(raw_status) = extract_status(&doc) else {
            report.blank()?;
            report.warn("Warning: Unable to extract status from response")?;
            let pretty = serde_json::to_string_pretty(&doc).unwrap_or_default();
            report.line(format!(
                "  Response data structure: {}",
                self.source.redact(&pretty)
            ))?;
            return Ok(Step::Retry);
        };

        report.blank()?;
        report.line("Status information:")?;
        report.line(format!("  Current status: {raw_status}"))?;

        Ok(match ImportStatus::parse(raw_status) {
            ImportStatus::Importing => {
                report.line("  Importing")?;
                Step::Retry
            }
            ImportStatus::Completed => Step::Completed,
            ImportStatus::Failed => Step::Failed(FailureReport::from_response(&doc)),
            ImportStatus::Unknown(other) => {
                warn!(status = %other, "unknown import status");
                report.warn(&format!("  Warning: Unknown status: {other}"))?;
                Step::Retry
            }
        })
    }
}

/// Blocking sleep between attempts.
fn wait(interval: Duration) {
    if interval.is_zero() {
        return;
    }
    let spinner = ui::spinner(format!(
        "Waiting {} seconds before next check...",
        interval.as_secs()
    ));
    std::thread::sleep(interval);
    spinner.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::redact::mask_token;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    const TOKEN: &str = "abcdefghijklmnop";

    /// Replays a fixed list of replies, then answers `importing` forever.
    struct ScriptedSource {
        replies: RefCell<VecDeque<Result<RawResponse>>>,
        calls: Cell<u32>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Result<RawResponse>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: Cell::new(0),
            }
        }
    }

    impl StatusSource for ScriptedSource {
        fn fetch_status(&self, _record_id: &str) -> Result<RawResponse> {
            self.calls.set(self.calls.get() + 1);
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(json_reply(r#"{"data":{"status":"importing"}}"#)))
        }

        fn request_url(&self, record_id: &str) -> String {
            mask_token(
                &format!("http://tapdata.local{}?access_token={TOKEN}", status_path(record_id)),
                TOKEN,
            )
        }

        fn redact(&self, text: &str) -> String {
            mask_token(text, TOKEN)
        }
    }

    fn json_reply(body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            reason: "OK".into(),
            headers: vec![("content-type".into(), "application/json".into())],
            body: body.into(),
        }
    }

    fn fast() -> PollSettings {
        PollSettings {
            max_attempts: 60,
            interval: Duration::ZERO,
        }
    }

    fn run(source: &ScriptedSource, settings: PollSettings) -> (Outcome, String) {
        let mut buf = Vec::new();
        let outcome = {
            let mut report = Report::plain(&mut buf);
            StatusPoller::new(source, settings)
                .run("rec-1", &mut report)
                .unwrap()
        };
        (outcome, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_always_importing_times_out_after_budget() {
        let source = ScriptedSource::new(vec![]);
        let (outcome, log) = run(&source, fast());
        assert!(matches!(outcome, Outcome::Timeout { attempts: 60, .. }));
        assert_eq!(source.calls.get(), 60);
        assert_eq!(outcome.exit_code(), 1);
        assert!(log.contains("Check attempt: 60/60"));
        assert!(!log.contains("Check attempt: 61/"));
        assert!(log.contains("Checked 60 times, import still not completed"));
    }

    #[test]
    fn test_completed_stops_immediately() {
        let source = ScriptedSource::new(vec![
            Ok(json_reply(r#"{"data":{"status":"importing"}}"#)),
            Ok(json_reply(r#"{"data":{"status":"importing"}}"#)),
            Ok(json_reply(r#"{"data":{"status":"completed"}}"#)),
        ]);
        let (outcome, log) = run(&source, fast());
        assert!(matches!(outcome, Outcome::Success { attempts: 3, .. }));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(source.calls.get(), 3);
        assert!(log.contains("Import completed successfully!"));
        assert!(!log.contains("Check attempt: 4/"));
    }

    #[test]
    fn test_failed_renders_details_in_order() {
        let body = r#"{"data":{"status":"failed","message":"import aborted","details":[
            {"groupName":"G1","message":"m","recordDetails":[
                {"resourceName":"R1","resourceType":"table","action":"create","message":"x"}]}]}}"#;
        let source = ScriptedSource::new(vec![Ok(json_reply(body))]);
        let (outcome, log) = run(&source, fast());
        assert!(matches!(outcome, Outcome::Failure { attempts: 1, .. }));
        assert_eq!(outcome.exit_code(), 1);

        let footer = &log[log.find("Import failed!").unwrap()..];
        let positions: Vec<usize> = ["G1", "m", "R1", "table", "create", "x"]
            .iter()
            .scan(0, |from, needle| {
                let at = *from + footer[*from..].find(needle)?;
                *from = at + needle.len();
                Some(at)
            })
            .collect();
        assert_eq!(positions.len(), 6);
        assert!(footer.contains("Error message: import aborted"));
    }

    #[test]
    fn test_transport_error_is_retried() {
        let source = ScriptedSource::new(vec![
            Err(ApiError::transport("connect", "connection refused")),
            Err(ApiError::transport("timeout", "operation timed out")),
            Ok(json_reply(r#"{"data":{"status":"completed"}}"#)),
        ]);
        let (outcome, log) = run(&source, fast());
        assert!(matches!(outcome, Outcome::Success { attempts: 3, .. }));
        assert_eq!(log.matches("Warning: Request exception").count(), 2);
    }

    #[test]
    fn test_transport_errors_until_budget() {
        let replies = (0..5)
            .map(|_| Err(ApiError::transport("connect", "connection refused")))
            .collect();
        let source = ScriptedSource::new(replies);
        let settings = PollSettings {
            max_attempts: 5,
            interval: Duration::ZERO,
        };
        let (outcome, _) = run(&source, settings);
        assert!(matches!(outcome, Outcome::Timeout { attempts: 5, .. }));
        assert_eq!(source.calls.get(), 5);
    }

    #[test]
    fn test_protocol_and_data_errors_are_retried() {
        let source = ScriptedSource::new(vec![
            Ok(RawResponse {
                status: 502,
                reason: "Bad Gateway".into(),
                ..Default::default()
            }),
            Ok(json_reply("<html>not json</html>")),
            Ok(json_reply(r#"{"data":{}}"#)),
            Ok(json_reply(r#"{"data":{"status":""}}"#)),
            Ok(json_reply(r#"{"data":{"status":"queued"}}"#)),
            Ok(json_reply(r#"{"data":{"status":"completed"}}"#)),
        ]);
        let (outcome, log) = run(&source, fast());
        assert!(matches!(outcome, Outcome::Success { attempts: 6, .. }));
        assert!(log.contains("Warning: API returned non-200 status code"));
        assert!(log.contains("Status description: Bad Gateway"));
        assert!(log.contains("Warning: Unable to parse JSON response"));
        assert_eq!(
            log.matches("Warning: Unable to extract status from response").count(),
            2
        );
        assert!(log.contains("Warning: Unknown status: queued"));
    }

    #[test]
    fn test_waits_between_attempts_but_not_after_last() {
        let source = ScriptedSource::new(vec![
            Err(ApiError::transport("connect", "connection refused")),
            Ok(json_reply("<html>not json</html>")),
            Ok(json_reply(r#"{"data":{"status":"importing"}}"#)),
        ]);
        let settings = PollSettings {
            max_attempts: 3,
            interval: Duration::from_millis(50),
        };
        let started = Instant::now();
        let (outcome, _) = run(&source, settings);
        let elapsed = started.elapsed();

        assert!(matches!(outcome, Outcome::Timeout { attempts: 3, .. }));
        assert!(elapsed >= Duration::from_millis(100), "only {elapsed:?} elapsed");
        assert!(elapsed < Duration::from_millis(150), "{elapsed:?} elapsed");
    }

    #[test]
    fn test_no_retry_notice_after_last_attempt() {
        let source = ScriptedSource::new(vec![]);
        let settings = PollSettings {
            max_attempts: 2,
            interval: Duration::ZERO,
        };
        let (_, log) = run(&source, settings);
        assert_eq!(log.matches("Will retry in 0 seconds...").count(), 1);
    }

    #[test]
    fn test_credential_never_logged() {
        let source = ScriptedSource::new(vec![
            Err(ApiError::transport(
                "connect",
                format!("error sending request for url (http://tapdata.local/x?access_token={TOKEN})"),
            )),
            Ok(json_reply(&format!(r#"{{"data":{{"status":"completed","token":"{TOKEN}"}}}}"#))),
        ]);
        let (_, log) = run(&source, fast());
        assert!(log.contains("access_token=abcdefgh...mnop"));
        assert!(!log.contains(TOKEN));
    }
}
