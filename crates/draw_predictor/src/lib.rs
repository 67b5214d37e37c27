use serde::Serialize;

pub mod heuristics;
mod stats;

pub const WAITING_LABEL: &str = "Waiting…";

/// Prefix sizes reported by the big/small block table.
pub const BLOCK_WINDOWS: [usize; 10] = [1, 5, 7, 9, 11, 13, 15, 17, 19, 21];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Wait,
    Low,
    Mid,
    High,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Prediction {
    pub label: String,
    pub tier: Tier,
}

impl Prediction {
    pub fn new(label: impl Into<String>, tier: Tier) -> Self {
        Self {
            label: label.into(),
            tier,
        }
    }

    pub fn waiting() -> Self {
        Self::new(WAITING_LABEL, Tier::Wait)
    }

    pub fn is_waiting(&self) -> bool {
        self.tier == Tier::Wait
    }
}

pub struct Heuristic {
    pub name: &'static str,
    pub min_history: usize,
    pub run: fn(&[u8]) -> Prediction,
}

pub const HEURISTICS: [Heuristic; 10] = [
    Heuristic {
        name: "avg_crossover",
        min_history: heuristics::AVG_CROSSOVER_MIN,
        run: heuristics::avg_crossover,
    },
    Heuristic {
        name: "offset_blend",
        min_history: heuristics::OFFSET_BLEND_MIN,
        run: heuristics::offset_blend,
    },
    Heuristic {
        name: "sticky_mode",
        min_history: heuristics::STICKY_MODE_MIN,
        run: heuristics::sticky_mode,
    },
    Heuristic {
        name: "momentum",
        min_history: heuristics::MOMENTUM_MIN,
        run: heuristics::momentum,
    },
    Heuristic {
        name: "median",
        min_history: heuristics::MEDIAN_MIN,
        run: heuristics::median,
    },
    Heuristic {
        name: "swing_or_mean",
        min_history: heuristics::SWING_OR_MEAN_MIN,
        run: heuristics::swing_or_mean,
    },
    Heuristic {
        name: "parity_vote",
        min_history: heuristics::PARITY_VOTE_MIN,
        run: heuristics::parity_vote,
    },
    Heuristic {
        name: "range_invert",
        min_history: heuristics::RANGE_INVERT_MIN,
        run: heuristics::range_invert,
    },
    Heuristic {
        name: "mode_offset",
        min_history: heuristics::MODE_OFFSET_MIN,
        run: heuristics::mode_offset,
    },
    Heuristic {
        name: "weighted_average",
        min_history: heuristics::WEIGHTED_AVERAGE_MIN,
        run: heuristics::weighted_average,
    },
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicReport {
    pub name: &'static str,
    pub min_history: usize,
    pub label: String,
    pub tier: Tier,
}

/// Run every heuristic over a newest-first digit history.
pub fn evaluate_all(history: &[u8]) -> Vec<HeuristicReport> {
    HEURISTICS
        .iter()
        .map(|h| {
            let Prediction { label, tier } = (h.run)(history);
            HeuristicReport {
                name: h.name,
                min_history: h.min_history,
                label,
                tier,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WindowBlock {
    pub block: usize,
    pub window: usize,
    pub ready: bool,
    pub prediction: String,
    pub big: usize,
    pub small: usize,
}

/// Big/small tally over the newest `window` draws (or all of them when fewer).
pub fn window_block(history: &[u8], block: usize, window: usize) -> WindowBlock {
    let prefix = &history[..history.len().min(window)];
    let big = prefix.iter().filter(|d| **d >= 5).count();
    let small = prefix.len() - big;
    let ready = window > 0 && history.len() >= window;
    let prediction = if !ready {
        WAITING_LABEL.to_string()
    } else {
        match big.cmp(&small) {
            std::cmp::Ordering::Greater => "BIG",
            std::cmp::Ordering::Less => "SMALL",
            std::cmp::Ordering::Equal => "TIE",
        }
        .to_string()
    };
    WindowBlock {
        block,
        window,
        ready,
        prediction,
        big,
        small,
    }
}

pub fn window_blocks(history: &[u8]) -> Vec<WindowBlock> {
    BLOCK_WINDOWS
        .iter()
        .enumerate()
        .map(|(i, w)| window_block(history, i + 1, *w))
        .collect()
}
