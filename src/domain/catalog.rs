//! Static pricing catalog: plans, addons, and per-currency prices.
//!
//! The catalog is deploy-time data. Everything else in the system treats
//! the currency set as open-ended and goes through the lookup functions
//! here; adding a currency or plan is an edit to these tables, not to
//! business logic.

use serde::Serialize;

/// Currency used when neither an override nor geolocation yields one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Plan id that implicitly includes every addon.
pub const PREMIUM_PLAN_ID: &str = "premium";

/// A price in the minor units of one currency (cents, kobo).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Price {
    pub currency: &'static str,
    pub amount: i64,
}

// =============================================================================
// Plans
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub tagline: &'static str,
    pub prices: &'static [Price],
    pub features: &'static [&'static str],
}

/// Fixed ordered list of plans, cheapest first.
pub const PLANS: &[Plan] = &[
    Plan {
        id: "base",
        name: "Base",
        tagline: "Everything you need for one unforgettable surprise",
        prices: &[
            Price { currency: "USD", amount: 400 },
            Price { currency: "NGN", amount: 600_000 },
        ],
        features: &[
            "Up to 10 photos, videos or voice notes",
            "All celebration themes",
            "30 days of hosting",
        ],
    },
    Plan {
        id: "premium",
        name: "Premium",
        tagline: "Every addon included, nothing held back",
        prices: &[
            Price { currency: "USD", amount: 1_000 },
            Price { currency: "NGN", amount: 1_500_000 },
        ],
        features: &[
            "Up to 50 photos, videos or voice notes",
            "All addons included",
            "A full year of hosting",
            "No Supriseal branding",
        ],
    },
];

// =============================================================================
// Addons
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Addon {
    pub id: &'static str,
    pub name: &'static str,
    pub badge: Option<&'static str>,
    pub prices: &'static [Price],
    /// Extra media slots granted on top of the plan base.
    pub media_bonus: u32,
    /// Extra hosting days granted on top of the plan base.
    pub hosting_bonus_days: u32,
    pub grants_custom_url: bool,
    pub removes_branding: bool,
}

pub const ADDONS: &[Addon] = &[
    Addon {
        id: "extra-media",
        name: "Extra media",
        badge: Some("Popular"),
        prices: &[
            Price { currency: "USD", amount: 200 },
            Price { currency: "NGN", amount: 300_000 },
        ],
        media_bonus: 25,
        hosting_bonus_days: 0,
        grants_custom_url: false,
        removes_branding: false,
    },
    Addon {
        id: "custom-url",
        name: "Custom URL",
        badge: None,
        prices: &[
            Price { currency: "USD", amount: 100 },
            Price { currency: "NGN", amount: 150_000 },
        ],
        media_bonus: 0,
        hosting_bonus_days: 0,
        grants_custom_url: true,
        removes_branding: false,
    },
    Addon {
        id: "remove-branding",
        name: "Remove branding",
        badge: None,
        prices: &[
            Price { currency: "USD", amount: 150 },
            Price { currency: "NGN", amount: 200_000 },
        ],
        media_bonus: 0,
        hosting_bonus_days: 0,
        grants_custom_url: false,
        removes_branding: true,
    },
    Addon {
        id: "extended-hosting",
        name: "Extended hosting",
        badge: Some("Best value"),
        prices: &[
            Price { currency: "USD", amount: 250 },
            Price { currency: "NGN", amount: 350_000 },
        ],
        media_bonus: 0,
        hosting_bonus_days: 60,
        grants_custom_url: false,
        removes_branding: false,
    },
];

// =============================================================================
// Currency data
// =============================================================================

/// Country code → currency. Countries absent here quote in the default.
pub const COUNTRY_CURRENCIES: &[(&str, &str)] = &[("NG", "NGN")];

// =============================================================================
// Lookups
// =============================================================================

pub fn plan(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|p| p.id == id)
}

pub fn addon(id: &str) -> Option<&'static Addon> {
    ADDONS.iter().find(|a| a.id == id)
}

/// Price of a plan or addon in `currency`, if that currency is listed.
pub fn price_in(prices: &[Price], currency: &str) -> Option<i64> {
    prices.iter().find(|p| p.currency == currency).map(|p| p.amount)
}

/// Canonical form of a supported currency code, if we price in it.
/// Support is derived from the plan tables rather than a separate list.
pub fn supported_currency(code: &str) -> Option<&'static str> {
    let upper = code.to_uppercase();
    PLANS
        .iter()
        .flat_map(|p| p.prices.iter())
        .map(|p| p.currency)
        .find(|c| *c == upper)
}

pub fn currency_for_country(country_code: &str) -> Option<&'static str> {
    let upper = country_code.to_uppercase();
    COUNTRY_CURRENCIES
        .iter()
        .find(|(cc, _)| *cc == upper)
        .map(|(_, cur)| *cur)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_plan_priced_in_every_supported_currency() {
        for plan in PLANS {
            assert!(price_in(plan.prices, "USD").is_some(), "{} lacks USD", plan.id);
            assert!(price_in(plan.prices, "NGN").is_some(), "{} lacks NGN", plan.id);
        }
        for addon in ADDONS {
            assert!(price_in(addon.prices, "USD").is_some(), "{} lacks USD", addon.id);
            assert!(price_in(addon.prices, "NGN").is_some(), "{} lacks NGN", addon.id);
        }
    }

    #[test]
    fn test_supported_currency_is_case_insensitive() {
        assert_eq!(supported_currency("usd"), Some("USD"));
        assert_eq!(supported_currency("NGN"), Some("NGN"));
        assert_eq!(supported_currency("EUR"), None);
    }

    #[test]
    fn test_country_mapping() {
        assert_eq!(currency_for_country("NG"), Some("NGN"));
        assert_eq!(currency_for_country("ng"), Some("NGN"));
        assert_eq!(currency_for_country("US"), None);
    }

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(plan("base").unwrap().name, "Base");
        assert_eq!(addon("extra-media").unwrap().media_bonus, 25);
        assert!(plan("enterprise").is_none());
        assert!(addon("confetti").is_none());
    }
}
