//! Payment and allocation arithmetic for posted documents.

use rust_decimal::Decimal;

use super::types::DocumentStatus;
use crate::ledger::{LedgerError, MONEY_SCALE, fits_money_scale};

/// Settlement state of a document after a payment is applied or reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementUpdate {
    /// Cumulative settled amount.
    pub paid_amount: Decimal,
    /// Outstanding balance.
    pub balance_due: Decimal,
    /// Resulting status.
    pub status: DocumentStatus,
}

/// Status of a posted document given its total and settled amount.
#[must_use]
pub fn status_for(total_amount: Decimal, paid_amount: Decimal) -> DocumentStatus {
    if paid_amount <= Decimal::ZERO {
        DocumentStatus::Posted
    } else if paid_amount >= total_amount {
        DocumentStatus::Paid
    } else {
        DocumentStatus::PartiallyPaid
    }
}

/// Rejects amounts that money columns would have to round.
///
/// # Errors
///
/// `InvalidDocument` when `amount` has more than [`MONEY_SCALE`] decimal
/// places.
pub fn ensure_money_scale(amount: Decimal) -> Result<(), LedgerError> {
    if fits_money_scale(amount) {
        Ok(())
    } else {
        Err(LedgerError::InvalidDocument(format!(
            "amount {amount} has more than {MONEY_SCALE} decimal places"
        )))
    }
}

/// Applies a payment (or a receipt allocation) to an open document.
///
/// # Errors
///
/// - `PaymentNotAllowed` unless the document is POSTED or PARTIALLY_PAID
/// - `NonPositiveAmount` if `amount <= 0`
/// - `InvalidDocument` if `amount` has more than [`MONEY_SCALE`] decimals
/// - `ExceedsBalance` if `amount` is larger than the outstanding balance
pub fn apply_payment(
    status: DocumentStatus,
    total_amount: Decimal,
    paid_amount: Decimal,
    amount: Decimal,
) -> Result<SettlementUpdate, LedgerError> {
    if !status.is_open() {
        return Err(LedgerError::PaymentNotAllowed(status.to_string()));
    }
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }
    ensure_money_scale(amount)?;

    let balance = total_amount - paid_amount;
    if amount > balance {
        return Err(LedgerError::ExceedsBalance { amount, balance });
    }

    let paid_amount = paid_amount + amount;
    Ok(SettlementUpdate {
        paid_amount,
        balance_due: total_amount - paid_amount,
        status: status_for(total_amount, paid_amount),
    })
}

/// Removes a previously applied allocation, e.g. when its receipt is voided.
///
/// # Errors
///
/// Returns `Internal` if more is reversed than was settled.
pub fn reverse_payment(
    total_amount: Decimal,
    paid_amount: Decimal,
    amount: Decimal,
) -> Result<SettlementUpdate, LedgerError> {
    let remaining = paid_amount - amount;
    if remaining < Decimal::ZERO {
        return Err(LedgerError::Internal(format!(
            "cannot reverse {amount}, only {paid_amount} was settled"
        )));
    }

    Ok(SettlementUpdate {
        paid_amount: remaining,
        balance_due: total_amount - remaining,
        status: status_for(total_amount, remaining),
    })
}

/// Checks the allocations of a receipt and returns their sum.
///
/// # Errors
///
/// - `InvalidDocument` when there are no allocations
/// - `NonPositiveAmount` when an allocation is not positive
/// - `OverAllocated` when the sum exceeds the receipt amount
pub fn validate_allocations(
    receipt_amount: Decimal,
    allocations: &[Decimal],
) -> Result<Decimal, LedgerError> {
    if allocations.is_empty() {
        return Err(LedgerError::InvalidDocument(
            "Receipt must have at least one allocation".to_string(),
        ));
    }
    if allocations.iter().any(|a| *a <= Decimal::ZERO) {
        return Err(LedgerError::NonPositiveAmount);
    }

    let allocated: Decimal = allocations.iter().copied().sum();
    if allocated > receipt_amount {
        return Err(LedgerError::OverAllocated {
            allocated,
            amount: receipt_amount,
        });
    }
    Ok(allocated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_partial_then_full_payment() {
        let first = apply_payment(DocumentStatus::Posted, dec!(500), dec!(0), dec!(200)).unwrap();
        assert_eq!(first.status, DocumentStatus::PartiallyPaid);
        assert_eq!(first.balance_due, dec!(300));

        let second =
            apply_payment(first.status, dec!(500), first.paid_amount, dec!(300)).unwrap();
        assert_eq!(second.status, DocumentStatus::Paid);
        assert_eq!(second.balance_due, dec!(0));
    }

    #[test]
    fn test_payment_cannot_exceed_balance() {
        let err = apply_payment(DocumentStatus::PartiallyPaid, dec!(500), dec!(400), dec!(100.01))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ExceedsBalance { amount, balance } if amount == dec!(100.01) && balance == dec!(100)
        ));
    }

    #[test]
    fn test_payment_requires_open_document() {
        for status in [DocumentStatus::Draft, DocumentStatus::Paid, DocumentStatus::Void] {
            assert!(matches!(
                apply_payment(status, dec!(10), dec!(0), dec!(1)),
                Err(LedgerError::PaymentNotAllowed(_))
            ));
        }
    }

    #[test]
    fn test_payment_beyond_stored_scale_rejected() {
        let err = apply_payment(DocumentStatus::Posted, dec!(10), dec!(0), dec!(1.00001))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDocument(_)));
        assert!(ensure_money_scale(dec!(1.2500)).is_ok());
    }

    #[test]
    fn test_reverse_restores_status() {
        let update = reverse_payment(dec!(500), dec!(500), dec!(500)).unwrap();
        assert_eq!(update.status, DocumentStatus::Posted);
        assert_eq!(update.balance_due, dec!(500));

        let update = reverse_payment(dec!(500), dec!(500), dec!(100)).unwrap();
        assert_eq!(update.status, DocumentStatus::PartiallyPaid);

        assert!(reverse_payment(dec!(500), dec!(50), dec!(100)).is_err());
    }

    #[test]
    fn test_allocations() {
        assert_eq!(
            validate_allocations(dec!(300), &[dec!(100), dec!(200)]).unwrap(),
            dec!(300)
        );
        assert!(matches!(
            validate_allocations(dec!(300), &[dec!(100), dec!(201)]),
            Err(LedgerError::OverAllocated { .. })
        ));
        assert!(matches!(
            validate_allocations(dec!(300), &[]),
            Err(LedgerError::InvalidDocument(_))
        ));
        assert!(matches!(
            validate_allocations(dec!(300), &[dec!(0)]),
            Err(LedgerError::NonPositiveAmount)
        ));
    }
}
