//! Terminal progress bars driven by queue events.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use dlq_download::{ItemId, QueueEvent, QueueObserverPort};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// One progress bar per started item, stacked in a `MultiProgress`.
///
/// Bars are created on the item's first `started` event. Labels can be
/// registered before or after that; a bar without a label shows the item ID.
pub struct ProgressBoard {
    multi: MultiProgress,
    bars: Mutex<HashMap<ItemId, ProgressBar>>,
    labels: Mutex<HashMap<ItemId, String>>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            labels: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a display label to an item.
    pub fn register(&self, item: ItemId, label: &str) {
        lock(&self.labels).insert(item, label.to_string());
        if let Some(bar) = lock(&self.bars).get(&item) {
            bar.set_prefix(label.to_string());
        }
    }

    /// Print a line above the bars.
    pub fn println(&self, line: impl AsRef<str>) {
        if self.multi.println(line.as_ref()).is_err() {
            println!("{}", line.as_ref());
        }
    }

    fn create_bar(&self, item: ItemId) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:20!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        let label = lock(&self.labels)
            .get(&item)
            .cloned()
            .unwrap_or_else(|| item.to_string());
        bar.set_prefix(label);
        bar
    }

    fn with_bar(&self, item: ItemId, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = lock(&self.bars).get(&item) {
            f(bar);
        }
    }

    fn finish(&self, item: ItemId, message: String, success: bool) {
        if let Some(bar) = lock(&self.bars).remove(&item) {
            if success {
                bar.finish_with_message(message);
            } else {
                bar.abandon_with_message(message);
            }
        }
    }
}

impl Default for ProgressBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueObserverPort for ProgressBoard {
    fn notify(&self, event: &QueueEvent) {
        match event {
            QueueEvent::ItemStarted { item, .. } => {
                let mut bars = lock(&self.bars);
                match bars.get(item) {
                    Some(bar) => bar.set_message(""),
                    None => {
                        let bar = self.create_bar(*item);
                        bars.insert(*item, bar);
                    }
                }
            }
            QueueEvent::ItemProgress {
                item,
                bytes_read,
                bytes_expected,
                ..
            } => self.with_bar(*item, |bar| {
                if let Some(total) = bytes_expected {
                    bar.set_length(*total);
                }
                bar.set_position(*bytes_read);
            }),
            QueueEvent::ItemPaused { item, .. } => {
                self.with_bar(*item, |bar| bar.set_message("paused"));
            }
            QueueEvent::ItemResumed { item, .. } => {
                self.with_bar(*item, |bar| bar.set_message(""));
            }
            QueueEvent::ItemCompleted { item, .. } => {
                self.finish(*item, "done".to_string(), true);
            }
            QueueEvent::ItemFailed { item, error, .. } => {
                self.finish(*item, format!("failed: {error}"), false);
            }
            QueueEvent::ItemCancelled { item, .. } => {
                self.finish(*item, "cancelled".to_string(), false);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
