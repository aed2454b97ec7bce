//! Price calculation over the static catalog. Pure functions; the same
//! math backs the wizard's quote display and the payment handler's
//! balance reporting.

use crate::domain::catalog::{self, PREMIUM_PLAN_ID};

/// Total price of a plan plus selected addons, in the minor units of
/// `currency`.
///
/// An unknown plan id prices to 0 rather than erroring: it signals a
/// data/config mismatch upstream and must not take the request down.
/// Premium absorbs every addon, so addon selection is ignored for it.
/// Unknown addon ids are skipped (tolerated catalog drift).
pub fn calculate_total(plan_id: &str, addon_ids: &[String], currency: &str) -> i64 {
    let Some(plan) = catalog::plan(plan_id) else {
        tracing::warn!(plan_id, "pricing requested for unknown plan");
        return 0;
    };

    let plan_price = catalog::price_in(plan.prices, currency).unwrap_or_else(|| {
        tracing::warn!(plan_id, currency, "plan has no price in currency");
        0
    });

    if plan.id == PREMIUM_PLAN_ID {
        return plan_price;
    }

    let addon_total: i64 = addon_ids
        .iter()
        .filter_map(|id| catalog::addon(id))
        .filter_map(|addon| catalog::price_in(addon.prices, currency))
        .sum();

    plan_price + addon_total
}

/// Remaining amount owed. Floors at zero; overpayment never produces a
/// negative balance.
pub fn balance_due(total: i64, paid: i64) -> i64 {
    (total - paid).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_base_plan_sums_addons() {
        // base $4.00 + extra-media $2.00 + custom-url $1.00
        let total = calculate_total("base", &ids(&["extra-media", "custom-url"]), "USD");
        assert_eq!(total, 700);
    }

    #[test]
    fn test_premium_ignores_addon_selection() {
        let premium = calculate_total("premium", &[], "USD");
        for subset in [
            ids(&[]),
            ids(&["extra-media"]),
            ids(&["extra-media", "custom-url", "remove-branding", "extended-hosting"]),
        ] {
            assert_eq!(calculate_total("premium", &subset, "USD"), premium);
        }
    }

    #[test]
    fn test_unknown_plan_prices_to_zero() {
        assert_eq!(calculate_total("enterprise", &ids(&["extra-media"]), "USD"), 0);
    }

    #[test]
    fn test_unknown_addons_are_skipped() {
        let with_junk = calculate_total("base", &ids(&["extra-media", "confetti"]), "USD");
        let without = calculate_total("base", &ids(&["extra-media"]), "USD");
        assert_eq!(with_junk, without);
    }

    #[test]
    fn test_totals_in_ngn() {
        let total = calculate_total("base", &ids(&["extra-media"]), "NGN");
        assert_eq!(total, 600_000 + 300_000);
    }

    #[test]
    fn test_total_never_negative() {
        for plan in ["base", "premium", "nope"] {
            assert!(calculate_total(plan, &ids(&["extra-media"]), "USD") >= 0);
            assert!(calculate_total(plan, &[], "XXX") >= 0);
        }
    }

    #[test]
    fn test_balance_due_floors_at_zero() {
        assert_eq!(balance_due(4, 10), 0);
        assert_eq!(balance_due(700, 0), 700);
        assert_eq!(balance_due(700, 400), 300);
        assert_eq!(balance_due(700, 700), 0);
    }

    #[test]
    fn test_balance_due_non_increasing_in_paid() {
        let total = 700;
        let mut last = balance_due(total, 0);
        for paid in [100, 250, 400, 700, 900] {
            let due = balance_due(total, paid);
            assert!(due <= last);
            last = due;
        }
    }
}
