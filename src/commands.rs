//! Command handlers
//!
//! One function per CLI subcommand. Each validates its inputs before any
//! network call, writes human-readable progress to the given `Report` and
//! returns its result directly.

use anyhow::{Context, Result};
use tracing::info;

use crate::api::ApiClient;
use crate::bundle::{validate_bundle, Bundle};
use crate::ci;
use crate::config::{PollSettings, Settings};
use crate::error::ArgumentError;
use crate::poller::{Outcome, StatusPoller};
use crate::ui::{format_size, Report};

/// Reject an empty required argument.
pub fn require(name: &'static str, value: &str) -> Result<(), ArgumentError> {
    if value.is_empty() {
        return Err(ArgumentError::Empty(name));
    }
    Ok(())
}

fn access_code(settings: &Settings) -> Result<&str, ArgumentError> {
    settings.access_code().ok_or(ArgumentError::MissingAccessCode)
}

fn client(base_url: &str, settings: &Settings) -> Result<ApiClient> {
    ApiClient::new(base_url, settings.request_timeout()).context("Failed to build HTTP client")
}

/// Exchange the configured access code for an access token.
pub fn token(base_url: &str, settings: &Settings, log: &mut Report) -> Result<String> {
    require("BASE_URL", base_url)?;
    let code = access_code(settings)?;

    let client = client(base_url, settings)?;
    let token = client
        .generate_token(code, log)
        .context("Failed to get access token")?;
    Ok(token)
}

/// Upload a bundle and return the record id of the started import.
pub fn import(
    base_url: &str,
    access_token: &str,
    tar_file: &str,
    settings: &Settings,
    report: &mut Report,
) -> Result<String> {
    require("BASE_URL", base_url)?;
    require("ACCESS_TOKEN", access_token)?;
    let bundle = validate_bundle(tar_file)?;

    let mut client = client(base_url, settings)?;
    client.set_token(access_token);
    report.import_header(base_url, tar_file)?;
    upload(&client, &bundle, report)
}

fn upload(client: &ApiClient, bundle: &Bundle, report: &mut Report) -> Result<String> {
    report.line(format!(
        "TAR file validation passed, size: {}",
        format_size(bundle.size)
    ))?;
    report.blank()?;

    let record_id = client
        .import_bundle(&bundle.path, report)
        .context("Failed to import TAR file")?;

    // Later workflow steps read the record id from GITHUB_OUTPUT
    if ci::publish_record_id(&record_id).context("Failed to write GITHUB_OUTPUT")? {
        info!(record_id = %record_id, "record id published to GITHUB_OUTPUT");
    }
    report.import_footer(&record_id)?;
    Ok(record_id)
}

/// Poll the import status of `record_id` to a terminal outcome.
pub fn status_check(
    base_url: &str,
    access_token: &str,
    record_id: &str,
    settings: &Settings,
    report: &mut Report,
) -> Result<Outcome> {
    require("BASE_URL", base_url)?;
    require("ACCESS_TOKEN", access_token)?;
    require("RECORD_ID", record_id)?;
    let poll = settings.poll_settings()?;

    let mut client = client(base_url, settings)?;
    client.set_token(access_token);
    report.check_header(client.base_url(), record_id)?;
    watch(&client, record_id, poll, report)
}

fn watch(
    client: &ApiClient,
    record_id: &str,
    poll: PollSettings,
    report: &mut Report,
) -> Result<Outcome> {
    let outcome = StatusPoller::new(client, poll).run(record_id, report)?;
    info!(
        attempts = outcome.attempts(),
        elapsed_secs = outcome.elapsed().as_secs(),
        success = outcome.is_success(),
        "status check finished"
    );
    Ok(outcome)
}

/// Token, upload and status check in one run.
pub fn deploy(
    base_url: &str,
    tar_file: &str,
    settings: &Settings,
    report: &mut Report,
) -> Result<Outcome> {
    // Check every input up front so nothing is uploaded for a run that
    // cannot finish
    require("BASE_URL", base_url)?;
    let bundle = validate_bundle(tar_file)?;
    let code = access_code(settings)?;
    let poll = settings.poll_settings()?;

    let mut client = client(base_url, settings)?;
    let token = client
        .generate_token(code, report)
        .context("Failed to get access token")?;
    client.set_token(&token);

    report.import_header(base_url, tar_file)?;
    let record_id = upload(&client, &bundle, report)?;

    report.blank()?;
    report.check_header(client.base_url(), &record_id)?;
    watch(&client, &record_id, poll, report)
}
