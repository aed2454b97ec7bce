//! Effective limits derived from plan + addons. Pure over the catalog,
//! so the wizard's limit display and server-side enforcement at upload
//! time compute from the same code and cannot diverge.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::catalog::{self, Addon, PREMIUM_PLAN_ID};
use crate::domain::Moment;

const BASE_MEDIA_LIMIT: u32 = 10;
const PREMIUM_MEDIA_LIMIT: u32 = 50;
const BASE_HOSTING_DAYS: u32 = 30;
const PREMIUM_HOSTING_DAYS: u32 = 365;

/// The limits a moment is entitled to. Serialized as-is into the owner
/// dashboard payload.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Entitlements {
    pub media_limit: u32,
    pub hosting_days: u32,
    pub custom_url: bool,
    pub branding_removed: bool,
}

/// Addons that count toward entitlements: premium includes the whole
/// catalog implicitly, every other plan gets the ids it carries.
fn counted_addons(plan_id: &str, addon_ids: &[String]) -> Vec<&'static Addon> {
    if plan_id == PREMIUM_PLAN_ID {
        catalog::ADDONS.iter().collect()
    } else {
        addon_ids.iter().filter_map(|id| catalog::addon(id)).collect()
    }
}

pub fn media_limit(plan_id: &str, addon_ids: &[String]) -> u32 {
    let base = if plan_id == PREMIUM_PLAN_ID {
        PREMIUM_MEDIA_LIMIT
    } else {
        BASE_MEDIA_LIMIT
    };
    // Addon bonuses are additive and stack independently.
    base + counted_addons(plan_id, addon_ids)
        .iter()
        .map(|a| a.media_bonus)
        .sum::<u32>()
}

pub fn hosting_days(plan_id: &str, addon_ids: &[String]) -> u32 {
    let base = if plan_id == PREMIUM_PLAN_ID {
        PREMIUM_HOSTING_DAYS
    } else {
        BASE_HOSTING_DAYS
    };
    base + counted_addons(plan_id, addon_ids)
        .iter()
        .map(|a| a.hosting_bonus_days)
        .sum::<u32>()
}

pub fn custom_url_allowed(plan_id: &str, addon_ids: &[String]) -> bool {
    counted_addons(plan_id, addon_ids)
        .iter()
        .any(|a| a.grants_custom_url)
}

pub fn branding_removed(plan_id: &str, addon_ids: &[String]) -> bool {
    counted_addons(plan_id, addon_ids)
        .iter()
        .any(|a| a.removes_branding)
}

/// Entitlements from a moment's plan and its selected-or-paid addons.
pub fn for_moment(moment: &Moment) -> Entitlements {
    let addons = moment.effective_addons();
    Entitlements {
        media_limit: media_limit(&moment.plan, &addons),
        hosting_days: hosting_days(&moment.plan, &addons),
        custom_url: custom_url_allowed(&moment.plan, &addons),
        branding_removed: branding_removed(&moment.plan, &addons),
    }
}

/// Whether the hosting window of a published moment has elapsed.
/// Derived on read, never stored, so there is no stale stored status to
/// reconcile against clock skew.
pub fn is_expired(moment: &Moment, now: DateTime<Utc>) -> bool {
    let Some(published_at) = moment.published_at else {
        return false;
    };
    let days = hosting_days(&moment.plan, &moment.effective_addons());
    now > published_at + Duration::days(i64::from(days))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_base_media_limit() {
        assert_eq!(media_limit("base", &[]), 10);
    }

    #[test]
    fn test_extra_media_is_additive() {
        assert_eq!(media_limit("base", &ids(&["extra-media"])), 35);
    }

    #[test]
    fn test_premium_includes_all_addons() {
        // 50 base + 25 from extra-media, regardless of selection.
        assert_eq!(media_limit("premium", &[]), 75);
        assert_eq!(media_limit("premium", &ids(&["extra-media"])), 75);
        assert!(custom_url_allowed("premium", &[]));
        assert!(branding_removed("premium", &[]));
    }

    #[test]
    fn test_hosting_days_stack() {
        assert_eq!(hosting_days("base", &[]), 30);
        assert_eq!(hosting_days("base", &ids(&["extended-hosting"])), 90);
        assert_eq!(hosting_days("premium", &[]), 365 + 60);
    }

    #[test]
    fn test_base_plan_gates_custom_url() {
        assert!(!custom_url_allowed("base", &[]));
        assert!(custom_url_allowed("base", &ids(&["custom-url"])));
    }

    #[test]
    fn test_unknown_addons_grant_nothing() {
        assert_eq!(media_limit("base", &ids(&["confetti"])), 10);
    }
}
