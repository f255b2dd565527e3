//! Cross-crate unit checks: fixed-point scaling, order sides, results and retry

use dexbridge_core::fixed;
use dexbridge_core::prelude::*;
use dexbridge_exchanges::prelude::*;
use dexbridge_exchanges::retry::{query_retry, retry};
use proptest::prelude::*;
use rstest::*;
use std::cell::Cell;

// ============================================================================
// BASE-UNIT SCALING
// ============================================================================

#[cfg(test)]
mod base_units {
    use super::*;

    #[rstest]
    #[case("0.5", 4, 5000)]
    #[case("3024.66", 2, 302466)]
    #[case("0.00005", 4, 1)]
    #[case("-0.00005", 4, -1)]
    #[case("0.000049", 4, 0)]
    #[case("1.25", 1, 13)]
    #[case("-1.25", 1, -13)]
    #[case("42", 0, 42)]
    fn test_encode_rounds_half_away_from_zero(#[case] value: &str, #[case] decimals: u32, #[case] raw: i64) {
        let value = Fixed::from_str_exact(value).unwrap();
        assert_eq!(value.to_base_units(decimals), Ok(raw));
    }

    #[rstest]
    #[case("5000", 4, "0.5")]
    #[case("302466", 2, "3024.66")]
    #[case("-1", 4, "-0.0001")]
    #[case(" 12 ", 0, "12")]
    fn test_decode_divides(#[case] raw: &str, #[case] decimals: u32, #[case] expected: &str) {
        let expected = Fixed::from_str_exact(expected).unwrap();
        assert_eq!(Fixed::from_base_str(raw, decimals), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1e400")]
    fn test_decode_rejects_garbage(#[case] raw: &str) {
        assert!(Fixed::from_base_str(raw, 4).is_err());
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(units in -1_000_000_000i64..1_000_000_000i64, scale in 0u32..9, decimals in 0u32..9) {
            let value = Fixed::from_base_units(units, scale).unwrap();
            let raw = value.to_base_units(decimals).unwrap();
            let back = Fixed::from_base_str(&raw.to_string(), decimals).unwrap();

            let tolerance = Fixed::from_base_units(1, decimals).unwrap();
            prop_assert!((back - value).abs() <= tolerance, "{} -> {} -> {}", value, raw, back);
        }

        #[test]
        fn prop_base_units_exact_when_precision_fits(raw in -1_000_000_000i64..1_000_000_000i64, decimals in 0u32..9) {
            let value = Fixed::from_base_units(raw, decimals).unwrap();
            prop_assert_eq!(value.to_base_units(decimals).unwrap(), raw);
        }
    }
}

// ============================================================================
// ORDER MODEL
// ============================================================================

#[cfg(test)]
mod order_model {
    use super::*;

    #[rstest]
    #[case("sell", OrderSide::Sell)]
    #[case("SELL", OrderSide::Sell)]
    #[case("Sell", OrderSide::Sell)]
    #[case("buy", OrderSide::Buy)]
    #[case("short", OrderSide::Buy)]
    #[case(" sell", OrderSide::Buy)]
    fn test_direction_parsing(#[case] direction: &str, #[case] side: OrderSide) {
        assert_eq!(OrderSide::from_direction(direction), side);
        assert_eq!(side.is_ask(), side == OrderSide::Sell);
    }

    #[test]
    fn test_failed_result_always_has_message() {
        let result = OrderResult::failed("");
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("unknown error"));
        assert!(result.order_id.is_none());
    }

    #[test]
    fn test_pending_result() {
        let result = OrderResult::pending("0xabc", OrderSide::Sell.as_str(), fixed!(1.5), Some(fixed!(3000)));
        assert!(result.success);
        assert_eq!(result.status.as_deref(), Some("pending"));
        assert_eq!(result.side.as_deref(), Some("sell"));
        assert!(result.error_message.is_none());
    }
}

// ============================================================================
// CLIENT ORDER INDICES
// ============================================================================

#[cfg(test)]
mod ids {
    use super::*;
    use dexbridge_core::id_gen::CLIENT_ORDER_INDEX_MAX;
    use std::collections::HashSet;

    #[test]
    fn test_client_order_indices_fit_48_bits_and_differ() {
        let indices: HashSet<i64> = (0..200).map(|_| next_client_order_index()).collect();
        assert_eq!(indices.len(), 200);
        assert!(indices.iter().all(|i| (0..=CLIENT_ORDER_INDEX_MAX).contains(i)));
    }
}

// ============================================================================
// RETRY
// ============================================================================

#[cfg(test)]
mod retrying {
    use super::*;

    #[rstest]
    #[case(ExchangeError::NetworkError("reset".into()), 3)]
    #[case(ExchangeError::HttpError(503, "busy".into()), 3)]
    #[case(ExchangeError::RateLimitExceeded, 3)]
    #[case(ExchangeError::HttpError(400, "bad".into()), 1)]
    #[case(ExchangeError::SymbolNotFound("X".into()), 1)]
    #[monoio::test(enable_timer = true)]
    async fn test_only_transient_errors_retry(#[case] error: ExchangeError, #[case] expected_calls: u32) {
        let calls = Cell::new(0);
        let result: Result<()> = retry(&RetryPolicy::immediate(3), "op", || {
            calls.set(calls.get() + 1);
            let error = error.clone();
            async move { Err(error) }
        })
        .await;

        assert_eq!(result, Err(error));
        assert_eq!(calls.get(), expected_calls);
    }

    #[monoio::test(enable_timer = true)]
    async fn test_query_retry_returns_default() {
        let value = query_retry(&RetryPolicy::none(), "positions", Fixed::ZERO, || async {
            Err::<Fixed, _>(ExchangeError::Timeout("slow".into()))
        })
        .await;

        assert_eq!(value, Fixed::ZERO);
    }
}
