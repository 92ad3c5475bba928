//! Window generation over the query
//!
//! Windows start at `(1, length)` and advance both bounds by `step`. As soon as
//! the next window's end would reach or pass the query end, a final window
//! anchored at the query end is emitted instead and generation stops. The
//! final window may overlap its predecessor by more or less than `step`.

use serde::{Deserialize, Serialize};

use crate::scan::{ScanError, ScanResult};
use crate::types::Window;

/// Placement of the last window, which is always pinned to the query end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalWindow {
    /// `(query_length - length + 1, query_length)`: exactly `length` residues.
    #[default]
    Anchored,
    /// `(query_length - length, query_length)`: the legacy arithmetic, one
    /// residue longer than `length`. Start is clamped to 1.
    Reference,
}

impl FinalWindow {
    fn place(self, length: usize, query_length: usize) -> Window {
        let start = match self {
            FinalWindow::Anchored => query_length + 1 - length,
            FinalWindow::Reference => (query_length - length).max(1),
        };
        Window::new(start, query_length)
    }
}

/// Restartable description of the windows for one length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGenerator {
    length: usize,
    query_length: usize,
    step: usize,
    final_window: FinalWindow,
}

impl WindowGenerator {
    pub fn new(length: usize, query_length: usize, step: usize) -> ScanResult<Self> {
        if length == 0 {
            return Err(ScanError::InvalidParams(
                "window length must be at least 1".to_string(),
            ));
        }
        if step == 0 {
            return Err(ScanError::InvalidParams(
                "step size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            length,
            query_length,
            step,
            final_window: FinalWindow::default(),
        })
    }

    /// Generator for parameters already checked by [`ScanParams::validate`](crate::ScanParams::validate).
    pub(crate) fn from_validated(
        length: usize,
        query_length: usize,
        step: usize,
        final_window: FinalWindow,
    ) -> Self {
        debug_assert!(length > 0 && step > 0);
        Self {
            length,
            query_length,
            step,
            final_window,
        }
    }

    pub fn with_final_window(mut self, final_window: FinalWindow) -> Self {
        self.final_window = final_window;
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Fresh iterator from the first window.
    pub fn iter(&self) -> Windows {
        Windows {
            spec: *self,
            start: 1,
            end: self.length,
            done: self.length > self.query_length,
        }
    }

    /// Upper bound on the number of windows, `ceil(query_length / step) + 1`.
    pub fn max_windows(&self) -> usize {
        self.query_length.div_ceil(self.step) + 1
    }
}

impl IntoIterator for WindowGenerator {
    type Item = Window;
    type IntoIter = Windows;

    fn into_iter(self) -> Windows {
        self.iter()
    }
}

impl IntoIterator for &WindowGenerator {
    type Item = Window;
    type IntoIter = Windows;

    fn into_iter(self) -> Windows {
        self.iter()
    }
}

/// Iterator state for [`WindowGenerator`].
#[derive(Debug, Clone)]
pub struct Windows {
    spec: WindowGenerator,
    start: usize,
    end: usize,
    done: bool,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.done || self.end > self.spec.query_length {
            self.done = true;
            return None;
        }

        // An end past usize::MAX is past the query end too.
        match self.end.checked_add(self.spec.step) {
            Some(next_end) if next_end < self.spec.query_length => {
                let window = Window::new(self.start, self.end);
                self.start += self.spec.step;
                self.end = next_end;
                Some(window)
            }
            _ => {
                self.done = true;
                Some(
                    self.spec
                        .final_window
                        .place(self.spec.length, self.spec.query_length),
                )
            }
        }
    }
}

impl std::iter::FusedIterator for Windows {}
