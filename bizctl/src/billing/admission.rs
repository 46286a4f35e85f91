//! Admission control for paid predictions.
//!
//! Checks run in a fixed order and stop at the first failure: known tier, any ledger at all,
//! tier unlocked, balance sufficient. Entitlement is checked before balance because unlocking
//! is the purchase a user has to make first.

use super::{BillingError, ledger::LedgerRow, tiers::ModelTier};

/// Proof that a request passed admission. Settlement only accepts requests carrying one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admitted {
    pub tier: ModelTier,
    pub cost: i64,
}

/// Resolve a requested model name to a tier.
///
/// This runs before any ledger lookup so that unknown names never touch storage.
pub fn resolve_tier(model_name: &str) -> Result<ModelTier, BillingError> {
    model_name.parse().map_err(|_| BillingError::InvalidTier {
        value: model_name.to_string(),
        expected: "model name",
    })
}

/// Decide whether `row` may run one prediction on `tier`.
pub fn authorize(row: Option<&LedgerRow>, tier: ModelTier) -> Result<Admitted, BillingError> {
    let Some(row) = row else {
        return Err(BillingError::PaymentRequired { tier: None });
    };
    if !row.is_unlocked(tier) {
        return Err(BillingError::PaymentRequired { tier: Some(tier) });
    }
    if !row.has_sufficient(tier) {
        return Err(BillingError::InsufficientCredits {
            tier,
            required: tier.inference_cost(),
            available: row.credits,
        });
    }
    Ok(Admitted {
        tier,
        cost: tier.inference_cost(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn row(unlocked: [bool; 3], credits: i64) -> LedgerRow {
        LedgerRow {
            user_id: Uuid::new_v4(),
            unlocked,
            credits,
        }
    }

    #[test]
    fn test_unknown_model_name() {
        let err = resolve_tier("model9").unwrap_err();
        assert!(matches!(err, BillingError::InvalidTier { ref value, .. } if value == "model9"));
    }

    #[test]
    fn test_missing_row_is_generic_payment_required() {
        let err = authorize(None, ModelTier::Model1).unwrap_err();
        assert!(matches!(err, BillingError::PaymentRequired { tier: None }));
    }

    #[test]
    fn test_locked_tier_with_zero_credits_reports_entitlement() {
        let row = row([false, false, false], 0);
        let err = authorize(Some(&row), ModelTier::Model2).unwrap_err();
        assert!(matches!(
            err,
            BillingError::PaymentRequired {
                tier: Some(ModelTier::Model2)
            }
        ));
    }

    #[test]
    fn test_locked_tier_with_plenty_of_credits() {
        let row = row([true, false, false], 500);
        let err = authorize(Some(&row), ModelTier::Model3).unwrap_err();
        assert!(matches!(
            err,
            BillingError::PaymentRequired {
                tier: Some(ModelTier::Model3)
            }
        ));
    }

    #[test]
    fn test_unlocked_but_underfunded() {
        let row = row([false, false, true], 2);
        let err = authorize(Some(&row), ModelTier::Model3).unwrap_err();
        assert!(matches!(
            err,
            BillingError::InsufficientCredits {
                tier: ModelTier::Model3,
                required: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn test_admitted_at_exact_balance() {
        let row = row([false, true, false], 2);
        let admitted = authorize(Some(&row), ModelTier::Model2).unwrap();
        assert_eq!(admitted.tier, ModelTier::Model2);
        assert_eq!(admitted.cost, 2);
    }
}
