use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{error, info};
use time::macros::format_description;
use time::OffsetDateTime;

const SEPARATOR_WIDTH: usize = 40;
const LOG_FILE_NAME: &str = "ddns.log";

/// Per-run record of what happened, written to the log file once at exit.
///
/// Every line also goes through the `log` facade so it shows up on the
/// console. If the value is dropped before [`RunLog::flush`] ran (early
/// return or panic), `Drop` writes it out.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    lines: Vec<String>,
    flushed: bool,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: vec!["-".repeat(SEPARATOR_WIDTH)],
            flushed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, text: impl AsRef<str>) {
        let line = stamped(text.as_ref());
        info!("{}", text.as_ref().trim());
        self.lines.push(line);
    }

    pub fn error(&mut self, text: impl AsRef<str>) {
        let line = stamped(text.as_ref());
        error!("{}", text.as_ref().trim());
        self.lines.push(line);
    }

    /// Appends a continuation line without a timestamp.
    pub fn raw(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref().trim();
        error!("{text}");
        self.lines.push(text.to_string());
    }

    /// Logs a multi-line report: the first line stamped, the rest raw.
    pub fn failure(&mut self, lines: &[String]) {
        let mut iter = lines.iter();
        if let Some(first) = iter.next() {
            self.error(first);
        }
        for line in iter {
            self.raw(line);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn join(&self, sep: &str) -> String {
        self.lines.join(sep)
    }

    /// Appends all lines to the log file. Only the first call writes.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{}\n", self.lines.join("\n")).as_bytes())
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!("Failed to write log file {}: {e}", self.path.display());
        }
    }
}

/// `ddns.log` beside the running executable, or in the working directory
/// when the executable path is unknown.
pub fn default_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(LOG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}

fn stamped(text: &str) -> String {
    format!("{} - {}", timestamp(), text.trim())
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]/[month]/[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_default()
}
