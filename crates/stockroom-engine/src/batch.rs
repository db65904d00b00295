use serde::Serialize;

/// Outcome of one item in a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchLine {
    pub index: usize,
    pub applied: bool,
    pub message: String,
}

/// Per-item outcomes of a batch, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub lines: Vec<BatchLine>,
}

impl BatchReport {
    pub(crate) fn applied(&mut self, index: usize, message: String) {
        self.lines.push(BatchLine { index, applied: true, message });
    }

    pub(crate) fn failed(&mut self, index: usize, message: String) {
        self.lines.push(BatchLine { index, applied: false, message });
    }

    pub fn applied_count(&self) -> usize {
        self.lines.iter().filter(|l| l.applied).count()
    }

    pub fn failed_count(&self) -> usize {
        self.lines.len() - self.applied_count()
    }

    pub fn any_applied(&self) -> bool {
        self.lines.iter().any(|l| l.applied)
    }

    /// Messages of the failed items.
    pub fn failures(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| !l.applied)
            .map(|l| l.message.as_str())
            .collect()
    }

    /// Every line's message, in request order, joined with `" | "`.
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.message.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
