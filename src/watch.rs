//! Watch mode: reload when spreadsheets in the data folder change.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, unbounded};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::fs::is_spreadsheet;

#[derive(Debug, Clone)]
pub enum WatchEvent {
    Changed(PathBuf),
    Removed(PathBuf),
    Error(String),
}

/// Watches a data folder for spreadsheet changes.
///
/// Office lock files (`~$Book.xlsx`) and anything that is not a spreadsheet
/// never produce an event.
pub struct SurveyWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<WatchEvent>,
}

impl SurveyWatcher {
    pub fn new(path: &Path, recursive: bool) -> Result<Self> {
        let (tx, rx) = unbounded();

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    for path in event.paths {
                        if !is_watched(&path) {
                            continue;
                        }
                        let watch_event = match event.kind {
                            EventKind::Create(_) | EventKind::Modify(_) => {
                                WatchEvent::Changed(path)
                            }
                            EventKind::Remove(_) => WatchEvent::Removed(path),
                            _ => continue,
                        };
                        let _ = tx.send(watch_event);
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(path, mode)
            .with_context(|| format!("Failed to watch {}", path.display()))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    pub fn receiver(&self) -> &Receiver<WatchEvent> {
        &self.receiver
    }

    /// All pending events (non-blocking)
    pub fn pending_events(&self) -> Vec<WatchEvent> {
        self.receiver.try_iter().collect()
    }
}

fn is_watched(path: &Path) -> bool {
    let lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$") || n.starts_with('.'));
    !lock_file && is_spreadsheet(path)
}

/// Drops repeat events for the same file inside `delay`.
///
/// Saving a workbook usually fires several modify events in a row.
pub struct Debouncer {
    last_events: HashMap<PathBuf, Instant>,
    delay: Duration,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            last_events: HashMap::new(),
            delay,
        }
    }

    pub fn should_process(&mut self, path: &Path) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_events.get(path)
            && now.duration_since(*last) < self.delay
        {
            return false;
        }
        self.last_events.insert(path.to_path_buf(), now);
        true
    }

    /// True when any event in `events` survives debouncing.
    pub fn any_relevant(&mut self, events: &[WatchEvent]) -> bool {
        let mut relevant = false;
        for event in events {
            if let WatchEvent::Changed(path) | WatchEvent::Removed(path) = event {
                relevant |= self.should_process(path);
            }
        }
        relevant
    }

    pub fn cleanup(&mut self) {
        let now = Instant::now();
        self.last_events
            .retain(|_, last| now.duration_since(*last) < self.delay * 10);
    }
}
