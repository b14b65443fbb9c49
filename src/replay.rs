//! Fix source abstraction for navigation updates
//!
//! This module provides a trait-based abstraction for consuming position
//! fixes from different sources. This enables:
//! - Production: live device geolocation pushed by the host application
//! - Testing/CLI: replaying recorded fixes from JSON-lines files

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::position::PositionFix;

/// Trait for sources of position fixes
#[async_trait]
pub trait FixSource: Send + Sync {
    /// Get the next fix from the source
    ///
    /// Returns:
    /// - `Ok(Some(fix))` - next fix available
    /// - `Ok(None)` - end of stream (no more fixes)
    /// - `Err(e)` - error reading from the source
    async fn next_fix(&mut self) -> Result<Option<PositionFix>>;

    /// Optional: hint of how many fixes remain (for progress reporting)
    fn remaining_hint(&self) -> Option<usize> {
        None
    }
}

/// Replays fixes from a JSON-lines file, one fix per line
///
/// Lines that fail to parse are logged and skipped, matching the tracker's
/// tolerance for malformed device input.
pub struct FileFixSource {
    reader: BufReader<File>,
    line_buffer: String,
    fixes_read: usize,
}

impl FileFixSource {
    /// Open a fix recording from a file path
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .await
            .with_context(|| format!("failed to open fix recording {}", path.as_ref().display()))?;

        debug!("opened fix recording from: {:?}", path.as_ref());

        Ok(Self {
            reader: BufReader::new(file),
            line_buffer: String::new(),
            fixes_read: 0,
        })
    }

    /// Number of fixes successfully read so far
    pub fn fixes_read(&self) -> usize {
        self.fixes_read
    }
}

#[async_trait]
impl FixSource for FileFixSource {
    async fn next_fix(&mut self) -> Result<Option<PositionFix>> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(None); // End of file
            }

            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<PositionFix>(line) {
                Ok(fix) => {
                    self.fixes_read += 1;
                    return Ok(Some(fix));
                }
                Err(e) => {
                    warn!("skipping unparseable fix line: {}", e);
                }
            }
        }
    }
}
