//! 백오프 정책 속성 테스트.

use std::time::Duration;

use archiver_exchange::{Backoff, ExchangeError, RetryConfig};
use proptest::prelude::*;

fn error_strategy() -> impl Strategy<Value = ExchangeError> {
    prop_oneof![
        Just(ExchangeError::RateLimited),
        Just(ExchangeError::Disconnected("eof".into())),
        Just(ExchangeError::NetworkError("reset".into())),
        Just(ExchangeError::Timeout("slow".into())),
        Just(ExchangeError::Unknown("?".into())),
    ]
}

proptest! {
    #[test]
    fn delays_never_decrease_and_never_exceed_cap(
        initial in 0u64..5_000,
        extra in 0u64..120_000,
        multiplier in 1.0f64..4.0,
        attempts in 1usize..80,
    ) {
        let max = initial + extra;
        let mut backoff = Backoff::new(RetryConfig {
            initial_delay_ms: initial,
            max_delay_ms: max,
            multiplier,
        });

        let mut previous = Duration::ZERO;
        for _ in 0..attempts {
            let delay = backoff.next_delay();
            prop_assert!(delay >= previous);
            prop_assert!(delay <= Duration::from_millis(max));
            previous = delay;
        }
        prop_assert_eq!(backoff.attempt() as usize, attempts);
    }

    #[test]
    fn error_hint_is_bounded_by_cap(
        max in 0u64..120_000,
        error in error_strategy(),
    ) {
        let mut backoff = Backoff::new(RetryConfig {
            initial_delay_ms: 0,
            max_delay_ms: max,
            multiplier: 2.0,
        });

        let delay = backoff.next_delay_for(&error);
        prop_assert!(delay <= Duration::from_millis(max));
        if let Some(hint) = error.retry_delay_ms() {
            prop_assert_eq!(delay, Duration::from_millis(hint.min(max)));
        }
    }
}
