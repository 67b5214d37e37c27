//! Digit heuristics over a newest-first history. Each one reads exactly its
//! minimum-length prefix and answers "waiting" when the history is shorter.

use core_types::BigSmall;

use crate::stats::{mean, modal_digits, round_digit, stddev};
use crate::{Prediction, Tier};

pub const AVG_CROSSOVER_MIN: usize = 10;
pub const OFFSET_BLEND_MIN: usize = 8;
pub const STICKY_MODE_MIN: usize = 12;
pub const MOMENTUM_MIN: usize = 4;
pub const MEDIAN_MIN: usize = 9;
pub const SWING_OR_MEAN_MIN: usize = 10;
pub const PARITY_VOTE_MIN: usize = 7;
pub const RANGE_INVERT_MIN: usize = 8;
pub const MODE_OFFSET_MIN: usize = 15;
pub const WEIGHTED_AVERAGE_MIN: usize = 21;

const SWING_STDDEV: f64 = 3.0;

fn window(history: &[u8], min: usize) -> Option<&[u8]> {
    (history.len() >= min).then(|| &history[..min])
}

fn digit_with_side(n: u8) -> String {
    format!("{n} {}", BigSmall::of(n))
}

fn margin_tier(margin: usize, high: usize, mid: usize) -> Tier {
    if margin >= high {
        Tier::High
    } else if margin >= mid {
        Tier::Mid
    } else {
        Tier::Low
    }
}

/// Short (5) vs long (10) mean: BIG when the recent half runs at or above the whole.
pub fn avg_crossover(history: &[u8]) -> Prediction {
    let Some(w) = window(history, AVG_CROSSOVER_MIN) else {
        return Prediction::waiting();
    };
    let short = mean(&w[..5]);
    let long = mean(w);
    let side = if short >= long {
        BigSmall::Big
    } else {
        BigSmall::Small
    };
    let gap = (short - long).abs();
    let tier = if gap >= 1.5 {
        Tier::High
    } else if gap >= 0.5 {
        Tier::Mid
    } else {
        Tier::Low
    };
    Prediction::new(side.as_str(), tier)
}

pub fn offset_blend(history: &[u8]) -> Prediction {
    let Some(w) = window(history, OFFSET_BLEND_MIN) else {
        return Prediction::waiting();
    };
    let n = ((2 * u32::from(w[0]) + u32::from(w[3]) + u32::from(w[7])) % 10) as u8;
    Prediction::new(digit_with_side(n), Tier::Mid)
}

/// Most frequent digit of the last 12. A tie keeps the latest draw if it is
/// among the leaders, otherwise the leader seen most recently.
pub fn sticky_mode(history: &[u8]) -> Prediction {
    let Some(w) = window(history, STICKY_MODE_MIN) else {
        return Prediction::waiting();
    };
    let (leaders, top) = modal_digits(w);
    let pick = if leaders.contains(&w[0]) {
        w[0]
    } else {
        w.iter()
            .copied()
            .find(|d| leaders.contains(d))
            .unwrap_or(w[0])
    };
    let tier = match top {
        n if n >= 4 => Tier::High,
        3 => Tier::Mid,
        _ => Tier::Low,
    };
    Prediction::new(pick.to_string(), tier)
}

pub fn momentum(history: &[u8]) -> Prediction {
    let Some(w) = window(history, MOMENTUM_MIN) else {
        return Prediction::waiting();
    };
    Prediction::new(round_digit(mean(w)).to_string(), Tier::Mid)
}

pub fn median(history: &[u8]) -> Prediction {
    let Some(w) = window(history, MEDIAN_MIN) else {
        return Prediction::waiting();
    };
    let mut sorted = w.to_vec();
    sorted.sort_unstable();
    let mid = sorted[sorted.len() / 2];
    let spread = sorted[sorted.len() - 1] - sorted[0];
    let tier = match spread {
        0..=4 => Tier::High,
        5..=6 => Tier::Mid,
        _ => Tier::Low,
    };
    Prediction::new(mid.to_string(), tier)
}

/// Volatile windows mirror the last draw (9 - n); calm ones follow the mean.
pub fn swing_or_mean(history: &[u8]) -> Prediction {
    let Some(w) = window(history, SWING_OR_MEAN_MIN) else {
        return Prediction::waiting();
    };
    if stddev(w) > SWING_STDDEV {
        Prediction::new((9 - w[0].min(9)).to_string(), Tier::Low)
    } else {
        Prediction::new(round_digit(mean(w)).to_string(), Tier::Mid)
    }
}

pub fn parity_vote(history: &[u8]) -> Prediction {
    let Some(w) = window(history, PARITY_VOTE_MIN) else {
        return Prediction::waiting();
    };
    let evens = w.iter().filter(|d| *d % 2 == 0).count();
    let odds = w.len() - evens;
    let label = if evens > odds { "EVEN" } else { "ODD" };
    Prediction::new(label, margin_tier(evens.abs_diff(odds), 5, 3))
}

/// Bets against the dominant range: a run of lows suggests BIG and vice versa.
pub fn range_invert(history: &[u8]) -> Prediction {
    let Some(w) = window(history, RANGE_INVERT_MIN) else {
        return Prediction::waiting();
    };
    let lows = w.iter().filter(|d| **d < 5).count();
    let highs = w.len() - lows;
    let side = match lows.cmp(&highs) {
        std::cmp::Ordering::Greater => BigSmall::Big,
        std::cmp::Ordering::Less => BigSmall::Small,
        std::cmp::Ordering::Equal => match BigSmall::of(w[0]) {
            BigSmall::Big => BigSmall::Small,
            BigSmall::Small => BigSmall::Big,
        },
    };
    Prediction::new(side.as_str(), margin_tier(lows.abs_diff(highs), 4, 2))
}

pub fn mode_offset(history: &[u8]) -> Prediction {
    let Some(w) = window(history, MODE_OFFSET_MIN) else {
        return Prediction::waiting();
    };
    let (leaders, _) = modal_digits(w);
    let mode = leaders.first().copied().unwrap_or(0);
    Prediction::new(((mode + 3) % 10).to_string(), Tier::Low)
}

/// Linearly weighted mean over 21 draws, newest weighted 21 down to 1.
pub fn weighted_average(history: &[u8]) -> Prediction {
    let Some(w) = window(history, WEIGHTED_AVERAGE_MIN) else {
        return Prediction::waiting();
    };
    let n = w.len();
    let (num, den) = w
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, d)| {
            let weight = (n - i) as f64;
            (num + weight * f64::from(*d), den + weight)
        });
    let wma = num / den;
    let sd = stddev(w);
    let tier = if sd < 2.0 {
        Tier::High
    } else if sd < 3.5 {
        Tier::Mid
    } else {
        Tier::Low
    };
    Prediction::new(digit_with_side(round_digit(wma)), tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(label: &str, tier: Tier) -> Prediction {
        Prediction::new(label, tier)
    }

    #[test]
    fn avg_crossover_compares_halves() {
        let h = [9, 9, 9, 9, 9, 0, 0, 0, 0, 0];
        assert_eq!(avg_crossover(&h), p("BIG", Tier::High));
        let h = [4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 9, 9];
        assert_eq!(avg_crossover(&h), p("SMALL", Tier::Mid));
    }

    #[test]
    fn offset_blend_uses_fixed_offsets() {
        let h = [3, 0, 0, 4, 0, 0, 0, 5];
        assert_eq!(offset_blend(&h), p("5 BIG", Tier::Mid));
        let h = [1, 9, 9, 1, 9, 9, 9, 0];
        assert_eq!(offset_blend(&h), p("3 SMALL", Tier::Mid));
    }

    #[test]
    fn sticky_mode_prefers_latest_draw_on_tie() {
        let h = [2, 3, 3, 2, 5, 6, 7, 8, 9, 0, 4, 1];
        assert_eq!(sticky_mode(&h), p("2", Tier::Low));
        let h = [5, 3, 3, 2, 2, 6, 7, 8, 9, 0, 4, 1];
        assert_eq!(sticky_mode(&h), p("3", Tier::Low));
        let h = [1, 7, 7, 7, 7, 2, 3, 4, 5, 6, 8, 9];
        assert_eq!(sticky_mode(&h), p("7", Tier::High));
    }

    #[test]
    fn momentum_rounds_mean() {
        assert_eq!(momentum(&[1, 2, 3, 4]), p("3", Tier::Mid));
        assert_eq!(momentum(&[9, 9, 9, 9, 0]), p("9", Tier::Mid));
    }

    #[test]
    fn median_of_nine() {
        let h = [9, 1, 8, 2, 7, 3, 6, 4, 5];
        assert_eq!(median(&h), p("5", Tier::Low));
        let h = [4, 5, 6, 4, 5, 6, 4, 5, 6];
        assert_eq!(median(&h), p("5", Tier::High));
    }

    #[test]
    fn swing_or_mean_switches_on_volatility() {
        let h = [0, 9, 0, 9, 0, 9, 0, 9, 0, 9];
        assert_eq!(swing_or_mean(&h), p("9", Tier::Low));
        let h = [5, 5, 4, 6, 5, 5, 4, 6, 5, 5];
        assert_eq!(swing_or_mean(&h), p("5", Tier::Mid));
    }

    #[test]
    fn parity_vote_majority() {
        assert_eq!(parity_vote(&[2, 4, 6, 8, 0, 1, 3]), p("EVEN", Tier::Mid));
        assert_eq!(parity_vote(&[1, 3, 5, 7, 9, 1, 3]), p("ODD", Tier::High));
        assert_eq!(parity_vote(&[1, 3, 5, 7, 2, 4, 6]), p("ODD", Tier::Low));
    }

    #[test]
    fn range_invert_bets_against_majority() {
        assert_eq!(range_invert(&[0, 1, 2, 3, 4, 0, 1, 9]), p("BIG", Tier::High));
        assert_eq!(range_invert(&[9, 8, 7, 1, 6, 5, 2, 3]), p("SMALL", Tier::Mid));
        // Tie flips the latest draw's bucket.
        assert_eq!(range_invert(&[0, 1, 2, 3, 5, 6, 7, 8]), p("BIG", Tier::Low));
        assert_eq!(range_invert(&[7, 1, 2, 3, 5, 6, 8, 0]), p("SMALL", Tier::Low));
    }

    #[test]
    fn mode_offset_shifts_by_three() {
        let h = [7, 7, 7, 1, 2, 3, 4, 5, 6, 8, 9, 0, 7, 1, 2];
        assert_eq!(mode_offset(&h), p("0", Tier::Low));
        // Ties resolve to the smallest digit.
        let h = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 1, 2, 3, 4];
        assert_eq!(mode_offset(&h), p("3", Tier::Low));
    }

    #[test]
    fn weighted_average_tiers_follow_stddev() {
        assert_eq!(weighted_average(&[5; 21]), p("5 BIG", Tier::High));

        let h: Vec<u8> = (0..21).map(|i| if i % 2 == 0 { 9 } else { 0 }).collect();
        assert_eq!(weighted_average(&h), p("5 BIG", Tier::Low));

        let h: Vec<u8> = (0..21).map(|i| if i % 2 == 0 { 3 } else { 6 }).collect();
        // mean 4.43, sd 1.5, WMA leans to the newest (3)
        assert_eq!(weighted_average(&h), p("4 SMALL", Tier::High));
    }
}
