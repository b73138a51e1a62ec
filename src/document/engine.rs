//! Headless browser rendering engine.
//!
//! Writes the HTML document into a private temporary directory, launches an
//! isolated browser instance against it and collects the printed PDF. The
//! browser child is spawned with `kill_on_drop`, and the temporary directory
//! (profile, markup, output) is removed when it goes out of scope, so every
//! exit path tears the instance down.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tempfile::tempdir;
use tokio::process::Command;

use super::html::render_document;
use super::traits::{DocumentRenderer, RenderMethod};
use super::{InvoiceLayout, RenderError};

const MARKUP_FILE: &str = "invoice.html";
const OUTPUT_FILE: &str = "invoice.pdf";
const PROFILE_DIR: &str = "profile";
const STDERR_TAIL: usize = 400;

/// Stateless-per-call renderer driving a Chromium-compatible binary.
#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    binary: String,
    load_timeout: Duration,
    settle: Duration,
}

impl ChromiumEngine {
    pub fn new(binary: impl Into<String>, load_timeout: Duration, settle: Duration) -> Self {
        Self {
            binary: binary.into(),
            load_timeout,
            settle,
        }
    }

    /// Command-line for one print job; paths are inside the job's temp directory.
    fn print_args(&self, profile: &std::path::Path, output: &std::path::Path, markup: &std::path::Path) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--no-first-run".to_string(),
            "--disable-extensions".to_string(),
            "--hide-scrollbars".to_string(),
            "--no-pdf-header-footer".to_string(),
            "--run-all-compositor-stages-before-draw".to_string(),
            format!("--timeout={}", self.load_timeout.as_millis()),
            format!("--virtual-time-budget={}", self.settle.as_millis()),
            format!("--user-data-dir={}", profile.display()),
            format!("--print-to-pdf={}", output.display()),
            format!("file://{}", markup.display()),
        ]
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(count - STDERR_TAIL).collect()
    }
}

#[async_trait]
impl DocumentRenderer for ChromiumEngine {
    fn method(&self) -> RenderMethod {
        RenderMethod::Engine
    }

    async fn render(&self, layout: &InvoiceLayout) -> Result<Vec<u8>, RenderError> {
        let markup = render_document(layout);

        // Dropped on every return below, which removes profile, markup and output.
        let temp_dir = tempdir().map_err(RenderError::TempDir)?;
        let markup_path = temp_dir.path().join(MARKUP_FILE);
        let output_path = temp_dir.path().join(OUTPUT_FILE);
        let profile_path = temp_dir.path().join(PROFILE_DIR);

        tokio::fs::write(&markup_path, markup.as_bytes())
            .await
            .map_err(RenderError::WriteMarkup)?;

        let child = Command::new(&self.binary)
            .args(self.print_args(&profile_path, &output_path, &markup_path))
            .current_dir(temp_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::EngineLaunch {
                binary: self.binary.clone(),
                source,
            })?;

        log::debug!(
            "Rendering engine started for invoice {} (pid {:?})",
            layout.meta.number,
            child.id()
        );

        // The ceiling covers page load plus the settle budget; on expiry the
        // `wait_with_output` future (and with it the child) is dropped and killed.
        let ceiling = self.load_timeout + self.settle;
        let output = match tokio::time::timeout(ceiling, child.wait_with_output()).await {
            Ok(result) => result.map_err(RenderError::ReadPdf)?,
            Err(_) => return Err(RenderError::EngineTimeout(ceiling.as_secs())),
        };

        if !output.status.success() {
            return Err(RenderError::EngineExit {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let pdf = tokio::fs::read(&output_path)
            .await
            .map_err(RenderError::ReadPdf)?;

        if pdf.len() < 5 || !pdf.starts_with(b"%PDF-") {
            return Err(RenderError::InvalidPdf(pdf.len()));
        }

        log::debug!(
            "Rendering engine produced {} bytes for invoice {}",
            pdf.len(),
            layout.meta.number
        );
        Ok(pdf)
    }
}
