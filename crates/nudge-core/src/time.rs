use std::time::{SystemTime, UNIX_EPOCH};

pub type EpochMillis = u64;

pub fn now_epoch_millis() -> EpochMillis {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as EpochMillis
}

/// Milliseconds between `earlier` and `now`; zero when the clock went backwards.
pub fn age_ms(earlier: EpochMillis, now: EpochMillis) -> u64 {
    now.saturating_sub(earlier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_saturates_on_clock_skew() {
        assert_eq!(age_ms(1_000, 1_250), 250);
        assert_eq!(age_ms(2_000, 1_000), 0);
    }
}
