//! Terminal progress bars for download runs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use iadl_core::{ProgressObserver, TaskStatus};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const BYTES_TEMPLATE: &str =
    "{spinner} {msg:30!} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})";
const UNKNOWN_SIZE_TEMPLATE: &str = "{spinner} {msg:30!} {bytes} ({bytes_per_sec})";
const OVERALL_TEMPLATE: &str = "[{pos}/{len}] {msg}";

/// One bar per in-flight file plus an overall counter.
pub(crate) struct BarProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    bars: Mutex<HashMap<usize, ProgressBar>>,
}

impl BarProgress {
    pub(crate) fn new(total_files: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_files as u64));
        overall.set_style(
            ProgressStyle::with_template(OVERALL_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        overall.set_message("files done");
        Self {
            multi,
            overall,
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// Removes every bar from the terminal.
    pub(crate) fn finish(&self) {
        let mut bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, bar) in bars.drain() {
            bar.finish_and_clear();
        }
        self.overall.finish_and_clear();
    }

    fn file_bar(total_bytes: Option<u64>) -> ProgressBar {
        match total_bytes {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(BYTES_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(UNKNOWN_SIZE_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        }
    }
}

impl ProgressObserver for BarProgress {
    fn attempt_started(&self, index: usize, file_name: &str, attempt: u32, total_bytes: Option<u64>) {
        let bar = self.multi.add(Self::file_bar(total_bytes));
        if attempt > 1 {
            bar.set_message(format!("{file_name} (attempt {attempt})"));
        } else {
            bar.set_message(file_name.to_string());
        }
        let mut bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = bars.insert(index, bar) {
            previous.finish_and_clear();
        }
    }

    fn bytes_written(&self, index: usize, bytes_written: u64) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = bars.get(&index) {
            bar.set_position(bytes_written);
        }
    }

    fn task_finished(&self, index: usize, _file_name: &str, _status: TaskStatus) {
        let removed = self
            .bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&index);
        if let Some(bar) = removed {
            bar.finish_and_clear();
        }
        self.overall.inc(1);
    }
}
