// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for an export run
//!
//! The exporter reports what it is doing; the binary turns the updates into
//! a spinner.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    /// A category started fetching
    CategoryStarted { category: String },
    /// One document written to disk
    ObjectWritten { kind: String, path: String },
    /// A category finished
    CategoryComplete {
        category: String,
        written: usize,
        elapsed_ms: u64,
    },
}

pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressUpdate>,
    /// Documents written across the whole run
    objects_written: AtomicUsize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            objects_written: AtomicUsize::new(0),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    pub fn category_started(&self, category: &str) {
        let _ = self.sender.send(ProgressUpdate::CategoryStarted {
            category: category.to_string(),
        });
    }

    pub fn object_written(&self, kind: &str, path: &str) {
        self.objects_written.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::ObjectWritten {
            kind: kind.to_string(),
            path: path.to_string(),
        });
    }

    pub fn category_complete(&self, category: &str, written: usize, elapsed_ms: u64) {
        let _ = self.sender.send(ProgressUpdate::CategoryComplete {
            category: category.to_string(),
            written,
            elapsed_ms,
        });
    }

    /// Documents written so far
    pub fn written(&self) -> usize {
        self.objects_written.load(Ordering::SeqCst)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type ProgressHandle = Arc<ProgressReporter>;

/// Create a new progress reporter handle
pub fn create_progress_handle() -> ProgressHandle {
    Arc::new(ProgressReporter::new())
}
