//! Validation utilities

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::config::LedgerConfig;
use crate::types::*;

/// Most fractional digits an amount may carry once trailing zeros are dropped
pub const MAX_AMOUNT_SCALE: i64 = 18;

/// Most integer digits an amount may carry
pub const MAX_AMOUNT_INTEGER_DIGITS: i64 = 30;

/// Parse a decimal amount supplied as text for `field`
///
/// Exponent notation is accepted, but the value must fit the
/// [`MAX_AMOUNT_SCALE`] and [`MAX_AMOUNT_INTEGER_DIGITS`] bounds.
pub fn parse_amount(field: &str, value: &str) -> LedgerResult<BigDecimal> {
    let invalid = || LedgerError::InvalidAmount {
        field: field.to_string(),
        value: value.to_string(),
    };
    let amount = BigDecimal::from_str(value).map_err(|_| invalid())?;
    if !amount_in_range(&amount) {
        return Err(invalid());
    }
    Ok(amount)
}

/// Check an already-decoded amount against the same bounds as [`parse_amount`]
pub fn check_amount(field: &str, amount: &BigDecimal) -> LedgerResult<()> {
    if amount_in_range(amount) {
        return Ok(());
    }
    let (digits, scale) = amount.as_bigint_and_exponent();
    Err(LedgerError::InvalidAmount {
        field: field.to_string(),
        value: format!("{digits}e{}", -scale),
    })
}

fn amount_in_range(amount: &BigDecimal) -> bool {
    // Normalizing only strips zeros from the parsed mantissa, never expands it
    let normalized = amount.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    let integer_digits = normalized.digits() as i64 - scale;
    scale <= MAX_AMOUNT_SCALE && integer_digits <= MAX_AMOUNT_INTEGER_DIGITS
}

/// Render an amount in canonical form: no trailing fractional zeros and no
/// exponent, so `300.00` becomes `300` and `0.50` becomes `0.5`
pub fn format_amount(amount: &BigDecimal) -> String {
    let normalized = amount.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    if scale < 0 {
        normalized.with_scale(0).to_string()
    } else {
        normalized.to_string()
    }
}

/// Apply the optional transfer checks enabled in `config`
///
/// With the default configuration every amount is accepted, including
/// negative amounts and transfers that overdraw the sender.
pub fn validate_transfer(
    config: &LedgerConfig,
    sender: &Wallet,
    amount: &BigDecimal,
) -> LedgerResult<()> {
    if !config.allow_negative_amount && *amount < BigDecimal::from(0) {
        return Err(LedgerError::NegativeAmount);
    }

    if !config.allow_overdraft && sender.balance < *amount {
        return Err(LedgerError::InsufficientFunds {
            wallet: sender.wallet_id.clone(),
            balance: sender.balance.clone(),
            amount: amount.clone(),
        });
    }

    Ok(())
}

/// Validate that a ledger key is usable
pub fn validate_key(kind: EntityKind, key: &str) -> LedgerResult<()> {
    if key.trim().is_empty() {
        return Err(LedgerError::InvalidArguments(format!(
            "{kind} ID cannot be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(balance: i64) -> Wallet {
        Wallet::new(
            "w1".to_string(),
            "owner".to_string(),
            "standard".to_string(),
            BigDecimal::from(balance),
        )
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("amount", "100").unwrap(), BigDecimal::from(100));
        assert_eq!(parse_amount("amount", "-5").unwrap(), BigDecimal::from(-5));

        match parse_amount("senderPreBalance", "abc") {
            Err(LedgerError::InvalidAmount { field, value }) => {
                assert_eq!(field, "senderPreBalance");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(parse_amount("amount", "").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_extreme_exponents() {
        for value in ["1e-100000", "1e100000", "1e-19", "1e31"] {
            match parse_amount("amount", value) {
                Err(LedgerError::InvalidAmount { field, value: rejected }) => {
                    assert_eq!(field, "amount");
                    assert_eq!(rejected, value);
                }
                other => panic!("{value} accepted: {other:?}"),
            }
        }

        assert_eq!(
            parse_amount("amount", "1e-18").unwrap(),
            BigDecimal::from_str("0.000000000000000001").unwrap()
        );
        assert!(parse_amount("amount", "1.50000000000000000000000").is_ok());
        assert!(parse_amount("amount", "1e29").is_ok());
    }

    #[test]
    fn test_check_amount() {
        assert!(check_amount("balance", &BigDecimal::from(500)).is_ok());

        let tiny = BigDecimal::new(1.into(), 100_000);
        match check_amount("balance", &tiny) {
            Err(LedgerError::InvalidAmount { field, value }) => {
                assert_eq!(field, "balance");
                assert_eq!(value, "1e-100000");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_format_amount_is_canonical() {
        assert_eq!(format_amount(&BigDecimal::from(300)), "300");
        assert_eq!(format_amount(&parse_amount("a", "300.00").unwrap()), "300");
        assert_eq!(format_amount(&parse_amount("a", "0.50").unwrap()), "0.5");
        assert_eq!(format_amount(&parse_amount("a", "-12.340").unwrap()), "-12.34");
        assert_eq!(format_amount(&parse_amount("a", "1e3").unwrap()), "1000");
        assert_eq!(format_amount(&BigDecimal::from(0)), "0");
    }

    #[test]
    fn test_default_policy_accepts_everything() {
        let config = LedgerConfig::default();
        assert!(validate_transfer(&config, &wallet(10), &BigDecimal::from(-50)).is_ok());
        assert!(validate_transfer(&config, &wallet(10), &BigDecimal::from(500)).is_ok());
    }

    #[test]
    fn test_strict_policy() {
        let config = LedgerConfig {
            allow_negative_amount: false,
            allow_overdraft: false,
            ..LedgerConfig::default()
        };

        assert!(matches!(
            validate_transfer(&config, &wallet(10), &BigDecimal::from(-1)),
            Err(LedgerError::NegativeAmount)
        ));
        assert!(matches!(
            validate_transfer(&config, &wallet(10), &BigDecimal::from(11)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(validate_transfer(&config, &wallet(10), &BigDecimal::from(10)).is_ok());
    }
}
