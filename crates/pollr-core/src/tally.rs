//! Per-option vote counts for one poll.

use crate::model::VoteCount;

/// Vote counts in poll option order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoteTally {
    entries: Vec<(String, u64)>,
    total: u64,
}

impl VoteTally {
    /// All options at zero.
    pub fn empty(options: &[String]) -> Self {
        Self {
            entries: options.iter().map(|o| (o.clone(), 0)).collect(),
            total: 0,
        }
    }

    /// Builds a tally from grouped counts. Counts for values that are not
    /// poll options are dropped.
    pub fn from_counts(options: &[String], counts: &[VoteCount]) -> Self {
        let mut tally = Self::empty(options);
        for row in counts {
            if let Some(entry) = tally
                .entries
                .iter_mut()
                .find(|(option, _)| *option == row.option_value)
            {
                entry.1 += row.count;
                tally.total += row.count;
            }
        }
        tally
    }

    /// Adds one vote. Returns false (and changes nothing) for an unknown
    /// option.
    pub fn record(&mut self, option: &str) -> bool {
        match self.entries.iter_mut().find(|(o, _)| o == option) {
            Some(entry) => {
                entry.1 += 1;
                self.total += 1;
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, option: &str) -> u64 {
        self.entries
            .iter()
            .find(|(o, _)| o == option)
            .map_or(0, |(_, n)| *n)
    }

    /// Share of the total, rounded half up. Zero when nobody has voted.
    pub fn percentage(&self, option: &str) -> u64 {
        if self.total == 0 {
            return 0;
        }
        (200 * self.count(option) + self.total) / (2 * self.total)
    }

    /// `(option, count, percentage)` in option order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, u64, u64)> {
        self.entries
            .iter()
            .map(|(option, count)| (option.as_str(), *count, self.percentage(option)))
    }
}
