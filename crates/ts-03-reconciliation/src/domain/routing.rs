//! # Contribution Routing

use shared_types::Timestamp;

use super::entities::Step;

/// Where a contributor lands when entering the contribution flow.
///
/// Certified contributors go straight to `Contribute`. Uncertified ones are
/// sent to the certification terms, unless fewer than `late_window_secs`
/// remain before `end_time` (or the sale already ended).
pub fn route_contribution(
    certified: bool,
    now: Timestamp,
    end_time: Timestamp,
    late_window_secs: u64,
) -> Step {
    if certified {
        Step::Contribute
    } else if end_time.saturating_sub(now) < late_window_secs {
        Step::LateUncertified
    } else {
        Step::PicopsTerms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3_600;

    #[test]
    fn test_certified_always_contributes() {
        assert_eq!(route_contribution(true, 100, 110, HOUR), Step::Contribute);
    }

    #[test]
    fn test_uncertified_routing() {
        let end = 1_000_000;
        assert_eq!(
            route_contribution(false, end - 2 * HOUR, end, HOUR),
            Step::PicopsTerms
        );
        assert_eq!(
            route_contribution(false, end - HOUR + 1, end, HOUR),
            Step::LateUncertified
        );
        assert_eq!(
            route_contribution(false, end + 5, end, HOUR),
            Step::LateUncertified
        );
    }
}
