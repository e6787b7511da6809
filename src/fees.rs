//! Fee-per-gas state and the one-shot underpriced retry driver.

use crate::error::{FeeErrorClassifier, Result};
use crate::types::TxOptions;
use ethers::types::U256;
use std::future::Future;
use std::sync::Mutex;

/// Mutable fee-per-gas state owned by one wallet session.
///
/// The mutex makes each read-modify-write atomic, but two operations racing
/// on the same session still interleave logically; callers serialize
/// operations per wallet instance.
#[derive(Debug, Default)]
pub struct FeeState {
    inner: Mutex<Fees>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Fees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl FeeState {
    /// Sets both fee fields to `fee`. The priority fee mirrors the base fee;
    /// this is a deliberate simplification, not a real EIP-1559 split.
    pub fn set_fees(&self, fee: U256) {
        let mut fees = self.inner.lock().expect("fee state poisoned");
        fees.max_fee_per_gas = fee;
        fees.max_priority_fee_per_gas = fee;
    }

    pub fn get(&self) -> Fees {
        *self.inner.lock().expect("fee state poisoned")
    }
}

/// `fee + floor(fee * pct / 100)` in integer arithmetic.
///
/// `U256` division floors, so no float ever enters the computation.
pub fn increase_fee_by_percentage(fee: U256, pct: u64) -> U256 {
    fee + fee * U256::from(pct) / U256::from(100u64)
}

/// Runs `attempt` with the configured fee; if it fails with an error the
/// classifier recognizes as fee-too-low and retry is enabled, bumps the fee
/// once and re-runs. Exactly one retry; a second failure (any cause)
/// propagates unchanged.
pub async fn retry_on_underpriced<T, F, Fut>(
    opts: &TxOptions,
    classify: &FeeErrorClassifier,
    fees: &FeeState,
    initial_fee: U256,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(U256) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    fees.set_fees(initial_fee);
    match attempt(initial_fee).await {
        Ok(out) => Ok(out),
        Err(err) if opts.with_retry && classify(&err) => {
            let bumped = increase_fee_by_percentage(initial_fee, opts.fee_increment_percentage);
            tracing::warn!(
                error = %err,
                fee = %initial_fee,
                bumped_fee = %bumped,
                "user operation rejected as underpriced; retrying once with bumped fee"
            );
            fees.set_fees(bumped);
            attempt(bumped).await
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{default_fee_classifier, SdkError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fee_increase_is_integer_exact() {
        let cases = [
            (1_000_000u64, 10u64, 1_100_000u64),
            (1_000_000, 0, 1_000_000),
            (0, 50, 0),
            (99, 1, 99), // floor(99 * 1 / 100) == 0
            (101, 1, 102),
            (7, 33, 9), // floor(7 * 33 / 100) == 2
        ];
        for (fee, pct, expected) in cases {
            assert_eq!(
                increase_fee_by_percentage(U256::from(fee), pct),
                U256::from(expected),
                "fee={fee} pct={pct}"
            );
        }
    }

    #[test]
    fn fee_increase_does_not_overflow_realistic_values() {
        // 10k gwei at 100% increase stays well inside U256.
        let fee = U256::from(10_000_000_000_000u64);
        assert_eq!(
            increase_fee_by_percentage(fee, 100),
            U256::from(20_000_000_000_000u64)
        );
    }

    #[test]
    fn set_fees_mirrors_priority_fee() {
        let state = FeeState::default();
        state.set_fees(U256::from(42));
        let fees = state.get();
        assert_eq!(fees.max_fee_per_gas, U256::from(42));
        assert_eq!(fees.max_priority_fee_per_gas, U256::from(42));
    }

    fn underpriced() -> SdkError {
        SdkError::Rpc("replacement transaction underpriced".to_string())
    }

    #[tokio::test]
    async fn retry_disabled_propagates_immediately() {
        let opts = TxOptions {
            with_retry: false,
            ..TxOptions::default()
        };
        let classify = default_fee_classifier();
        let fees = FeeState::default();
        let attempts = AtomicUsize::new(0);

        let out: Result<(), _> = retry_on_underpriced(
            &opts,
            &classify,
            &fees,
            U256::from(1_000_000),
            |_fee| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(underpriced()) }
            },
        )
        .await;

        assert!(matches!(out, Err(SdkError::Rpc(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn underpriced_error_triggers_exactly_one_bumped_retry() {
        let opts = TxOptions::default(); // retry enabled, 10%
        let classify = default_fee_classifier();
        let fees = FeeState::default();
        let seen = std::sync::Mutex::new(Vec::<U256>::new());

        let out = retry_on_underpriced(
            &opts,
            &classify,
            &fees,
            U256::from(1_000_000),
            |fee| {
                seen.lock().unwrap().push(fee);
                async move {
                    if fee == U256::from(1_000_000) {
                        Err(underpriced())
                    } else {
                        Ok(fee)
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(out, U256::from(1_100_000));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![U256::from(1_000_000), U256::from(1_100_000)]
        );
        assert_eq!(fees.get().max_fee_per_gas, U256::from(1_100_000));
    }

    #[tokio::test]
    async fn second_failure_propagates_without_further_retry() {
        let opts = TxOptions::default();
        let classify = default_fee_classifier();
        let fees = FeeState::default();
        let attempts = AtomicUsize::new(0);

        let out: Result<(), _> = retry_on_underpriced(
            &opts,
            &classify,
            &fees,
            U256::from(100),
            |_fee| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(underpriced()) }
            },
        )
        .await;

        assert!(out.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_fee_errors_are_not_retried() {
        let opts = TxOptions::default();
        let classify = default_fee_classifier();
        let fees = FeeState::default();
        let attempts = AtomicUsize::new(0);

        let out: Result<(), _> = retry_on_underpriced(
            &opts,
            &classify,
            &fees,
            U256::from(100),
            |_fee| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(SdkError::Rpc("nonce too low".to_string())) }
            },
        )
        .await;

        assert!(out.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
