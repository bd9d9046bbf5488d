//! Per-line progress notifications

use std::fmt;

/// Short status label carried by a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    LoadingFirstLine,
    BuildingSchema,
    ReadingHeader,
    LineProcessed,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProgressStatus::LoadingFirstLine => "Loading first line",
            ProgressStatus::BuildingSchema => "Building schema",
            ProgressStatus::ReadingHeader => "Reading header row",
            ProgressStatus::LineProcessed => "Processed line",
        };
        f.write_str(label)
    }
}

/// One notification: the 1-based line number and what was done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub line_number: usize,
    pub status: ProgressStatus,
}

/// Receives progress events synchronously on the parsing thread
pub trait ProgressSink {
    fn on_progress(&mut self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent),
{
    fn on_progress(&mut self, event: ProgressEvent) {
        self(event)
    }
}
