//! Line-delimited JSON over standard input and output

use anyhow::{Context, Result};
use logicbox_common::{Diagnostic, ScriptResponse};
use logicbox_sandbox::SandboxService;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
    BufWriter,
};
use tracing::{debug, info, warn};

/// Longest request line accepted when none is configured
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Counters for one stdio session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdioStats {
    pub requests: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Reads one JSON request per line and writes one JSON response per line
pub struct StdioHandler {
    service: Arc<SandboxService>,
    max_line_bytes: usize,
}

impl StdioHandler {
    pub fn new(service: Arc<SandboxService>) -> Self {
        Self {
            service,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Lines longer than this are answered with `MalformedInput` unread
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Serve the process's own stdin and stdout until EOF
    pub async fn run_stdio(&self) -> Result<StdioStats> {
        self.run(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve `reader` until EOF. Blank lines are skipped.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<StdioStats>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);
        let mut stats = StdioStats::default();
        let mut line = Vec::new();

        loop {
            line.clear();
            let limit = self.max_line_bytes as u64 + 1;
            let read = (&mut reader)
                .take(limit)
                .read_until(b'\n', &mut line)
                .await
                .context("Failed to read request")?;
            if read == 0 {
                break;
            }
            let terminated = line.last() == Some(&b'\n');
            if !terminated && line.len() > self.max_line_bytes {
                discard_line(&mut reader).await?;
            } else if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            stats.requests += 1;
            debug!(line_len = line.len(), "Received stdio request");

            let response = if !terminated && line.len() > self.max_line_bytes {
                warn!(max_line_bytes = self.max_line_bytes, "Rejected oversized request line");
                ScriptResponse::rejected(Diagnostic::malformed(format!(
                    "request line exceeds {} bytes",
                    self.max_line_bytes
                )))
            } else {
                self.service.handle_body(&line).await
            };
            if response.is_success() {
                stats.succeeded += 1;
            } else {
                stats.failed += 1;
            }

            let mut encoded =
                serde_json::to_string(&response).context("Failed to encode response")?;
            encoded.push('\n');
            writer
                .write_all(encoded.as_bytes())
                .await
                .context("Failed to write response")?;
            writer.flush().await.context("Failed to flush response")?;
        }

        info!(
            requests = stats.requests,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Stdio input closed"
        );
        Ok(stats)
    }
}

/// Skip input up to and including the next newline
async fn discard_line<B: AsyncBufRead + Unpin>(reader: &mut B) -> Result<()> {
    loop {
        let available = reader.fill_buf().await.context("Failed to read request")?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}
