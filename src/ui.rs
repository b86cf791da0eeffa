// UI layer: renders the human-readable progress log and the final report.
// All output goes through a `Report`, which wraps whatever sink the caller
// hands in (stdout, stderr, or a buffer in tests).

use crate::api::RawResponse;
use crate::status::FailureReport;
use chrono::Local;
use crossterm::style::{style, Stylize};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

const RULE: usize = 42;
const ATTEMPT_RULE: usize = 60;
const UNKNOWN: &str = "Unknown";

/// Destination for human-readable logs.
pub struct Report<'a> {
    out: &'a mut dyn Write,
    color: bool,
}

impl<'a> Report<'a> {
    pub fn new(out: &'a mut dyn Write, color: bool) -> Self {
        Self { out, color }
    }

    /// A report without terminal styling.
    pub fn plain(out: &'a mut dyn Write) -> Self {
        Self::new(out, false)
    }

    pub fn stdout(out: &'a mut io::Stdout) -> Self {
        let color = out.is_terminal();
        Self::new(out, color)
    }

    pub fn stderr(out: &'a mut io::Stderr) -> Self {
        let color = out.is_terminal();
        Self::new(out, color)
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.out, "{}", text.as_ref())
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn rule(&mut self) -> io::Result<()> {
        self.line("=".repeat(RULE))
    }

    fn good(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", style(text).green().bold())
        } else {
            self.line(text)
        }
    }

    fn bad(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", style(text).red().bold())
        } else {
            self.line(text)
        }
    }

    pub fn warn(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", style(text).yellow())
        } else {
            self.line(text)
        }
    }

    pub fn error(&mut self, text: &str) -> io::Result<()> {
        self.bad(&format!("Error: {text}"))
    }

    /// `Response Headers:` followed by one indented line per header.
    pub fn headers(&mut self, headers: &[(String, String)]) -> io::Result<()> {
        self.line("Response Headers:")?;
        for (name, value) in headers {
            self.line(format!("  {name}: {value}"))?;
        }
        Ok(())
    }

    // =========================================================================
    // Status check
    // =========================================================================

    pub fn check_header(&mut self, base_url: &str, record_id: &str) -> io::Result<()> {
        self.rule()?;
        self.line("Tapdata Import Status Check")?;
        self.rule()?;
        self.line(format!("Base URL: {base_url}"))?;
        self.line(format!("Record ID: {record_id}"))?;
        self.line(format!("Start time: {}", now()))?;
        self.blank()
    }

    pub fn attempt_header(&mut self, attempt: u32, max_attempts: u32) -> io::Result<()> {
        self.blank()?;
        self.line("=".repeat(ATTEMPT_RULE))?;
        self.line(format!(
            "Check attempt: {attempt}/{max_attempts} ({})",
            Local::now().format("%H:%M:%S")
        ))?;
        self.line("=".repeat(ATTEMPT_RULE))
    }

    pub fn request(&mut self, method: &str, url: &str, path: &str) -> io::Result<()> {
        self.blank()?;
        self.line("Sending request:")?;
        self.line(format!("  Method: {method}"))?;
        self.line(format!("  URL: {url}"))?;
        self.line(format!("  Full path: {path}"))
    }

    pub fn response(&mut self, res: &RawResponse, redacted_body: &str) -> io::Result<()> {
        self.blank()?;
        self.line("Received response:")?;
        self.line(format!("  HTTP Status Code: {}", res.status))?;
        self.line("  Response Headers:")?;
        for (name, value) in &res.headers {
            self.line(format!("    {name}: {value}"))?;
        }
        self.line(format!("  Response Body Length: {} bytes", res.body.len()))?;
        self.line(format!("  Response Content: {redacted_body}"))
    }

    pub fn retry_notice(&mut self, interval: Duration) -> io::Result<()> {
        self.line(format!("  Will retry in {} seconds...", interval.as_secs()))
    }

    pub fn success_footer(&mut self, elapsed: Duration) -> io::Result<()> {
        self.blank()?;
        self.rule()?;
        self.good("Import completed successfully!")?;
        self.rule()?;
        self.line(format!("Total duration: {} seconds", elapsed.as_secs()))?;
        self.line(format!("End time: {}", now()))?;
        self.rule()
    }

    pub fn failure_footer(&mut self, elapsed: Duration, report: &FailureReport) -> io::Result<()> {
        self.blank()?;
        self.rule()?;
        self.bad("Import failed!")?;
        self.rule()?;
        write!(self.out, "{}", render_failure(report))?;
        self.blank()?;
        self.line(format!("Total duration: {} seconds", elapsed.as_secs()))?;
        self.line(format!("End time: {}", now()))?;
        self.rule()
    }

    pub fn timeout_footer(&mut self, elapsed: Duration, attempts: u32) -> io::Result<()> {
        self.blank()?;
        self.rule()?;
        self.bad("Check timeout!")?;
        self.rule()?;
        self.line(format!(
            "Checked {attempts} times, import still not completed"
        ))?;
        self.line(format!("Total duration: {} seconds", elapsed.as_secs()))?;
        self.line(format!("End time: {}", now()))?;
        self.rule()
    }

    // =========================================================================
    // Import
    // =========================================================================

    pub fn import_header(&mut self, base_url: &str, tar_file: &str) -> io::Result<()> {
        self.rule()?;
        self.line("Tapdata Configuration Import")?;
        self.rule()?;
        self.line(format!("Base URL: {base_url}"))?;
        self.line(format!("TAR File: {tar_file}"))?;
        self.line(format!("Start time: {}", now()))?;
        self.blank()
    }

    pub fn import_footer(&mut self, record_id: &str) -> io::Result<()> {
        self.rule()?;
        self.good("Import task submitted")?;
        self.line(format!("Record ID: {record_id}"))?;
        self.line(format!("End time: {}", now()))?;
        self.rule()
    }
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Render the message and per-group details of a failed import.
pub fn render_failure(report: &FailureReport) -> String {
    let mut out = String::new();
    if let Some(message) = non_empty(&report.message) {
        out.push_str(&format!("Error message: {message}\n"));
    }

    let groups = report.groups();
    if groups.is_empty() {
        return out;
    }
    out.push_str("\nDetails:\n");
    for group in groups {
        out.push_str(&format!("\nGroup name: {}\n", or_unknown(&group.group_name)));
        if let Some(message) = non_empty(&group.message) {
            out.push_str(&format!("Message: {message}\n"));
        }
        let records = group.records();
        if records.is_empty() {
            continue;
        }
        out.push_str("Resource details:\n");
        for record in records {
            out.push_str(&format!(
                "  - {} ({})\n",
                or_unknown(&record.resource_name),
                or_unknown(&record.resource_type)
            ));
            out.push_str(&format!("    Action: {}\n", or_unknown(&record.action)));
            if let Some(message) = non_empty(&record.message) {
                out.push_str(&format!("    Message: {message}\n"));
            }
        }
    }
    out
}

/// `512B`, `1.5K`, `2.0M`.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes < KIB {
        format!("{bytes}B")
    } else if bytes < MIB {
        format!("{:.1}K", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1}M", bytes as f64 / MIB as f64)
    }
}

/// Spinner on stderr; indicatif keeps it hidden when stderr is not a
/// terminal, so CI logs stay clean.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
