//! Terminal progress bars for corpus construction.

use indicatif::{ProgressBar, ProgressStyle};
use lsrbench_core::corpus::ConstructionProgress;
use std::cell::RefCell;

const BAR_TEMPLATE: &str = "{msg} [{bar:40}] {pos}/{len}";

/// One progress bar per construction stage, drawn to stderr.
#[derive(Default)]
pub struct BarProgress {
    bar: RefCell<Option<ProgressBar>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConstructionProgress for BarProgress {
    fn start(&self, stage: &str, total: usize) {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            pb.set_style(style);
        }
        pb.set_message(stage.to_string());
        if let Some(previous) = self.bar.replace(Some(pb)) {
            previous.finish_and_clear();
        }
    }

    fn advance(&self) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.inc(1);
        }
    }

    fn finish(&self) {
        if let Some(pb) = self.bar.take() {
            pb.finish();
        }
    }
}
