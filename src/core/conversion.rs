//! Commission, receive amount and remainder for a prospective conversion.
//!
//! Everything here is a pure function of its inputs. All amounts leaving this
//! module are rounded up (away from zero) to two decimal places.
use crate::core::currency::{Currency, RateSnapshot};
use crate::core::error::{ExchangeError, ExchangeResult};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Commission charged once the free conversions are used up, in percent.
pub const DEFAULT_COMMISSION_PERCENT: Decimal = Decimal::from_parts(7, 0, 0, false, 1);

const AMOUNT_DECIMALS: u32 = 2;

/// Rounds up to two decimals and fixes the scale so that `110` is carried as
/// `110.00`.
pub fn round_up(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(AMOUNT_DECIMALS, RoundingStrategy::AwayFromZero);
    rounded.rescale(AMOUNT_DECIMALS);
    rounded
}

/// Parses a typed amount. Empty input means "no amount".
pub fn parse_amount(text: &str) -> ExchangeResult<Option<Decimal>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Decimal = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| ExchangeError::validation(text, "not a number"))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ExchangeError::validation(text, "must not be negative"));
    }
    Ok(Some(round_up(value.abs())))
}

/// Inputs for a single preview.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub sell_currency: Currency,
    pub receive_currency: Currency,
    pub sell_amount: Decimal,
    pub sell_balance: Decimal,
    pub free_conversions: u32,
    pub commission_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub commission: Decimal,
    pub receive_amount: Decimal,
    /// Sell balance left after the amount and the commission are taken.
    pub remainder: Decimal,
    pub affordable: bool,
}

/// Computes what converting `request.sell_amount` would cost and yield.
pub fn preview(rates: &RateSnapshot, request: &ConversionRequest) -> ExchangeResult<Preview> {
    let amount = request.sell_amount;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ExchangeError::validation(
            amount.to_string(),
            "must not be negative",
        ));
    }
    if request.sell_currency == request.receive_currency {
        return Err(ExchangeError::InvalidSelection(format!(
            "cannot convert {} into itself",
            request.sell_currency
        )));
    }

    let sell_rate = rates.rate(&request.sell_currency)?;
    let receive_rate = rates.rate(&request.receive_currency)?;
    let overflow = || ExchangeError::validation(amount.to_string(), "amount is too large");

    let commission = if request.free_conversions > 0 {
        Decimal::ZERO
    } else {
        amount
            .checked_mul(request.commission_percent)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .map(round_up)
            .ok_or_else(overflow)?
    };

    let receive_amount = amount
        .checked_mul(receive_rate)
        .and_then(|v| v.checked_div(sell_rate))
        .map(round_up)
        .ok_or_else(overflow)?;

    let remainder = request
        .sell_balance
        .checked_sub(amount)
        .and_then(|v| v.checked_sub(commission))
        .ok_or_else(overflow)?;

    Ok(Preview {
        commission: round_up(commission),
        receive_amount,
        remainder: round_up(remainder),
        affordable: remainder >= Decimal::ZERO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn rates() -> RateSnapshot {
        RateSnapshot::new(
            Currency::eur(),
            HashMap::from([
                (Currency::usd(), dec!(1.10)),
                ("JPY".parse().unwrap(), dec!(129.53)),
            ]),
        )
    }

    fn request(amount: Decimal, free_conversions: u32) -> ConversionRequest {
        ConversionRequest {
            sell_currency: Currency::eur(),
            receive_currency: Currency::usd(),
            sell_amount: amount,
            sell_balance: dec!(1000.00),
            free_conversions,
            commission_percent: DEFAULT_COMMISSION_PERCENT,
        }
    }

    #[test]
    fn test_round_up_goes_away_from_zero() {
        assert_eq!(round_up(dec!(1.001)), dec!(1.01));
        assert_eq!(round_up(dec!(1.009)), dec!(1.01));
        assert_eq!(round_up(dec!(-0.001)), dec!(-0.01));
        assert_eq!(round_up(dec!(110)).to_string(), "110.00");
        assert_eq!(round_up(dec!(2.5)).to_string(), "2.50");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("").unwrap(), None);
        assert_eq!(parse_amount("   ").unwrap(), None);
        assert_eq!(parse_amount("100").unwrap(), Some(dec!(100.00)));
        assert_eq!(parse_amount("12,345").unwrap(), Some(dec!(12.35)));
        assert_eq!(parse_amount("0").unwrap(), Some(dec!(0)));
    }

    #[test]
    fn test_parse_amount_rejects_bad_input() {
        let err = parse_amount("-5").unwrap_err();
        assert_eq!(err.to_string(), "Invalid amount '-5': must not be negative");
        assert!(matches!(
            parse_amount("ten"),
            Err(ExchangeError::Validation { .. })
        ));
        assert!(parse_amount("1.2.3").is_err());
    }

    #[test]
    fn test_free_conversion_has_no_commission() {
        let preview = preview(&rates(), &request(dec!(100), 5)).unwrap();

        assert_eq!(preview.commission, dec!(0));
        assert_eq!(preview.receive_amount, dec!(110.00));
        assert_eq!(preview.remainder, dec!(900.00));
        assert!(preview.affordable);
    }

    #[test]
    fn test_commission_after_free_conversions() {
        let preview = preview(&rates(), &request(dec!(100), 0)).unwrap();

        assert_eq!(preview.commission, dec!(0.70));
        assert_eq!(preview.remainder, dec!(899.30));
        assert_eq!(preview.receive_amount, dec!(110.00));
        assert!(preview.affordable);
    }

    #[test]
    fn test_commission_rounds_up_to_cents() {
        let preview = preview(&rates(), &request(dec!(1.01), 0)).unwrap();
        // 1.01 * 0.7% = 0.00707
        assert_eq!(preview.commission, dec!(0.01));
        assert_eq!(preview.remainder, dec!(998.98));
    }

    #[test]
    fn test_overspending_is_not_affordable() {
        let preview = preview(&rates(), &request(dec!(1000), 0)).unwrap();
        assert_eq!(preview.commission, dec!(7.00));
        assert_eq!(preview.remainder, dec!(-7.00));
        assert!(!preview.affordable);

        let exact = super::preview(&rates(), &request(dec!(1000), 1)).unwrap();
        assert_eq!(exact.remainder, dec!(0));
        assert!(exact.affordable);
    }

    #[test]
    fn test_cross_rate_between_non_base_currencies() {
        let mut req = request(dec!(50), 5);
        req.sell_currency = Currency::usd();
        req.receive_currency = "JPY".parse().unwrap();

        let preview = preview(&rates(), &req).unwrap();
        // 50 * 129.53 / 1.10 = 5887.7272...
        assert_eq!(preview.receive_amount, dec!(5887.73));
    }

    #[test]
    fn test_missing_receive_rate_is_lookup_error() {
        let mut req = request(dec!(10), 5);
        req.receive_currency = "GBP".parse().unwrap();

        let err = preview(&rates(), &req).unwrap_err();
        assert!(matches!(err, ExchangeError::Lookup(ref c) if c.code() == "GBP"));
        assert_eq!(err.to_string(), "No rate available for GBP");
    }

    #[test]
    fn test_same_currency_is_rejected() {
        let mut req = request(dec!(10), 5);
        req.receive_currency = Currency::eur();
        assert!(matches!(
            preview(&rates(), &req),
            Err(ExchangeError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_zero_amount() {
        let preview = preview(&rates(), &request(dec!(0), 0)).unwrap();
        assert_eq!(preview.commission, dec!(0));
        assert_eq!(preview.receive_amount, dec!(0));
        assert_eq!(preview.remainder, dec!(1000.00));
        assert!(preview.affordable);
    }

    #[test]
    fn test_receive_amount_matches_ratio_within_a_cent() {
        for amount in [dec!(0.01), dec!(3.33), dec!(19.99), dec!(250), dec!(999.99)] {
            let preview = preview(&rates(), &request(amount, 5)).unwrap();
            let exact = amount * dec!(1.10);
            let diff = preview.receive_amount - exact;
            assert!(diff >= dec!(0) && diff < dec!(0.01), "{amount}: {diff}");
        }
    }
}
