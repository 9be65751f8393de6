use crate::statistics::Statistics;
use std::collections::BTreeSet;
use std::fmt;

/// Statistic dimension that went up between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cause {
    Min,
    Max,
    Avg,
    Std,
}

impl Cause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cause::Min => "min",
            Cause::Max => "max",
            Cause::Avg => "avg",
            Cause::Std => "std",
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceChange {
    pub increased: bool,
    pub causes: BTreeSet<Cause>,
}

impl PriceChange {
    /// Text sent to the chat webhook.
    pub fn message(&self, previous: &Statistics, current: &Statistics) -> String {
        let causes: Vec<&str> = self.causes.iter().map(Cause::as_str).collect();
        format!(
            "Fuel price up: {}\nprevious: {}\ncurrent: {}\n",
            causes.join(", "),
            stats_tuple(previous),
            stats_tuple(current)
        )
    }
}

fn stats_tuple(stats: &Statistics) -> String {
    format!(
        "({}, {}, {}, {:.3}, {:.3})",
        stats.count, stats.min, stats.max, stats.mean, stats.stddev
    )
}

pub fn detect_price_increase(previous: &Statistics, current: &Statistics) -> PriceChange {
    let dimensions = [
        (Cause::Min, previous.min, current.min),
        (Cause::Max, previous.max, current.max),
        (Cause::Avg, previous.mean, current.mean),
        (Cause::Std, previous.stddev, current.stddev),
    ];

    let causes: BTreeSet<Cause> = dimensions
        .into_iter()
        .filter(|(_, prev, curr)| curr > prev)
        .map(|(cause, _, _)| cause)
        .collect();

    PriceChange {
        increased: !causes.is_empty(),
        causes,
    }
}
