use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{PlatformSupport, TargetProbe};
use crate::error::AppError;

// ── tasklist ─────────────────────────────────────────────────────

/// Asks Windows `tasklist` whether an image with the target's name is
/// running. Reports unsupported on every other platform.
pub struct TasklistProbe {
    image_name: String,
}

impl TasklistProbe {
    pub fn new(image_name: String) -> Self {
        Self { image_name }
    }

    fn filter(&self) -> String {
        format!("IMAGENAME eq {}", self.image_name)
    }
}

/// `tasklist /NH` prints an informational line instead of a row when the
/// filter matches nothing, so look for the image name itself.
fn listing_contains(stdout: &str, image_name: &str) -> bool {
    let needle = image_name.to_lowercase();
    stdout.to_lowercase().contains(&needle)
}

#[async_trait]
impl TargetProbe for TasklistProbe {
    fn support(&self) -> PlatformSupport {
        if cfg!(target_os = "windows") {
            PlatformSupport::Supported
        } else {
            PlatformSupport::unsupported_here()
        }
    }

    async fn is_target_running(&self) -> Result<bool, AppError> {
        self.support().ensure()?;
        let output = tokio::process::Command::new("tasklist")
            .args(["/FI", &self.filter(), "/FO", "CSV", "/NH"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::ProbeFailed {
                message: format!("tasklist: {e}"),
            })?;
        if !output.status.success() {
            return Err(AppError::ProbeFailed {
                message: format!("tasklist exited with {:?}", output.status.code()),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(listing_contains(&stdout, &self.image_name))
    }
}

// ── HTTP status endpoint ─────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetStatus {
    is_running: bool,
}

/// Asks a remote status endpoint (another instance's `/api/check-target`,
/// or anything answering `{ "isRunning": bool }`).
pub struct HttpStatusProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpStatusProbe {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TargetProbe for HttpStatusProbe {
    fn support(&self) -> PlatformSupport {
        PlatformSupport::Supported
    }

    async fn is_target_running(&self) -> Result<bool, AppError> {
        let probe_failed = |e: reqwest::Error| AppError::ProbeFailed {
            message: format!("{}: {e}", self.url),
        };
        let resp = self
            .client
            .get(&self.url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(probe_failed)?
            .error_for_status()
            .map_err(probe_failed)?;
        let status: TargetStatus = resp.json().await.map_err(probe_failed)?;
        Ok(status.is_running)
    }
}
