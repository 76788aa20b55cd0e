//! Running token accounting for one assembly call.
//!
//! The tracker only ever grows. Inclusion decisions are final, so there is
//! no way to release tokens once charged.

/// Token usage against a fixed limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetTracker {
    limit: usize,
    usage: usize,
}

impl BudgetTracker {
    pub fn new(limit: usize) -> Self {
        Self { limit, usage: 0 }
    }

    /// The nominal limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Tokens charged so far.
    pub fn usage(&self) -> usize {
        self.usage
    }

    /// Tokens still available once `reserved_margin` is held back.
    pub fn remaining(&self, reserved_margin: usize) -> usize {
        self.limit
            .saturating_sub(reserved_margin)
            .saturating_sub(self.usage)
    }

    /// Whether `usage + tokens <= limit - reserved_margin`.
    pub fn fits(&self, tokens: usize, reserved_margin: usize) -> bool {
        self.usage.saturating_add(tokens) <= self.limit.saturating_sub(reserved_margin)
    }

    /// How far `tokens` would overshoot `limit - reserved_margin`.
    pub fn overflow(&self, tokens: usize, reserved_margin: usize) -> usize {
        self.usage
            .saturating_add(tokens)
            .saturating_sub(self.limit.saturating_sub(reserved_margin))
    }

    /// Record `tokens` as used and return the new usage.
    pub fn charge(&mut self, tokens: usize) -> usize {
        self.usage = self.usage.saturating_add(tokens);
        self.usage
    }

    /// Usage as a percentage of the limit.
    pub fn utilization_pct(&self) -> f32 {
        if self.limit == 0 {
            return 0.0;
        }
        (self.usage as f32 / self.limit as f32) * 100.0
    }
}
