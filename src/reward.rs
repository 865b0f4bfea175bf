//! Reward calculator.
//!
//! Pure functions mapping a lock duration (in clock ticks) to an annualized
//! rate and an absolute reward. Nothing here touches account state.

/// Rate paid on every vault regardless of duration (5%)
pub const BASE_RATE_BPS: u64 = 500;

/// Extra rate earned per full month locked (0.5%)
pub const BONUS_PER_MONTH_BPS: u64 = 50;

/// Upper bound on any vault's rate (20%)
pub const RATE_CAP_BPS: u64 = 2000;

/// Ticks in a ~30 day month
pub const BLOCKS_PER_MONTH: u64 = 4320;

/// Ticks in a ~365 day year
pub const BLOCKS_PER_YEAR: u64 = 52560;

pub const BASIS_POINTS: u64 = 10_000;

/// Annualized rate in basis points for a lock of `duration` ticks.
///
/// Grows by [`BONUS_PER_MONTH_BPS`] per whole month and saturates at
/// [`RATE_CAP_BPS`].
pub fn calculate_reward_rate(duration: u64) -> u64 {
    let months = duration / BLOCKS_PER_MONTH;
    let bonus = months.saturating_mul(BONUS_PER_MONTH_BPS);
    BASE_RATE_BPS.saturating_add(bonus).min(RATE_CAP_BPS)
}

/// Absolute reward owed on `amount` locked for `duration` ticks.
///
/// Locks shorter than a year earn the prorated share of one year's reward.
/// Longer locks earn one annual reward per *whole* year; the fractional
/// year is dropped, so 1.9 years pays the same as 1 year.
pub fn calculate_rewards(amount: u64, duration: u64) -> u64 {
    let rate = calculate_reward_rate(duration) as u128;
    let annual_reward = (amount as u128) * rate / (BASIS_POINTS as u128);
    let years = (duration / BLOCKS_PER_YEAR) as u128;

    let reward = if years == 0 {
        annual_reward * (duration as u128) / (BLOCKS_PER_YEAR as u128)
    } else {
        annual_reward.saturating_mul(years)
    };

    u64::try_from(reward).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MAX_LOCK_DURATION, MIN_LOCK_DURATION};

    #[test]
    fn test_rate_for_one_month() {
        assert_eq!(calculate_reward_rate(4320), 550);
    }

    #[test]
    fn test_rate_below_one_month_is_base() {
        assert_eq!(calculate_reward_rate(0), BASE_RATE_BPS);
        assert_eq!(calculate_reward_rate(BLOCKS_PER_MONTH - 1), BASE_RATE_BPS);
    }

    #[test]
    fn test_rate_saturates_at_cap() {
        // 30 months puts base + bonus exactly on the cap
        assert_eq!(calculate_reward_rate(30 * BLOCKS_PER_MONTH), RATE_CAP_BPS);
        assert_eq!(calculate_reward_rate(31 * BLOCKS_PER_MONTH), RATE_CAP_BPS);
        assert_eq!(calculate_reward_rate(u64::MAX), RATE_CAP_BPS);
    }

    #[test]
    fn test_rate_monotonic_over_valid_range() {
        let mut previous = calculate_reward_rate(MIN_LOCK_DURATION);
        let mut duration = MIN_LOCK_DURATION;
        while duration <= MAX_LOCK_DURATION {
            let rate = calculate_reward_rate(duration);
            assert!(rate >= previous, "rate dropped at duration {}", duration);
            assert!(rate <= RATE_CAP_BPS);
            previous = rate;
            duration += 36;
        }
        assert!(calculate_reward_rate(MAX_LOCK_DURATION) >= previous);
    }

    #[test]
    fn test_one_month_reward_is_prorated() {
        // 1000 units at 6 decimals, 550 bp, 4320 / 52560 of a year
        let amount = 1_000_000_000;
        let annual = amount * 550 / 10_000;
        assert_eq!(annual, 55_000_000);
        assert_eq!(calculate_rewards(amount, 4320), annual * 4320 / 52560);
        assert_eq!(calculate_rewards(amount, 4320), 4_520_547);
    }

    #[test]
    fn test_exactly_one_year() {
        let amount = 1_000_000;
        let rate = calculate_reward_rate(BLOCKS_PER_YEAR);
        // 52560 / 4320 = 12 whole months
        assert_eq!(rate, 500 + 12 * 50);
        assert_eq!(calculate_rewards(amount, BLOCKS_PER_YEAR), amount * rate / 10_000);
    }

    #[test]
    fn test_multi_year_drops_fractional_year() {
        let amount = 10_000_000;
        let one_year = calculate_rewards(amount, BLOCKS_PER_YEAR);
        let almost_two = BLOCKS_PER_YEAR * 2 - 1;

        let annual = amount * calculate_reward_rate(almost_two) / 10_000;
        assert_eq!(calculate_rewards(amount, almost_two), annual);
        assert!(calculate_rewards(amount, almost_two) > one_year);

        let two_years = BLOCKS_PER_YEAR * 2;
        let annual = amount * calculate_reward_rate(two_years) / 10_000;
        assert_eq!(calculate_rewards(amount, two_years), annual * 2);
    }

    #[test]
    fn test_zero_amount_earns_nothing() {
        assert_eq!(calculate_rewards(0, BLOCKS_PER_YEAR * 3), 0);
    }

    #[test]
    fn test_huge_inputs_do_not_overflow() {
        let reward = calculate_rewards(u64::MAX, u64::MAX);
        assert_eq!(reward, u64::MAX);
        assert!(calculate_rewards(u64::MAX, BLOCKS_PER_YEAR) < u64::MAX);
    }
}
