// Translates the roles picked for an expedition into the numeric effects the
// scorer and the search apply.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::challenge_consts::{
    GATHERER_RESOURCE_MULTIPLIER, HEALER_STEP_DENOMINATOR, HEALER_STEP_NUMERATOR,
};
use crate::grid::ResourceKind;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Role {
    /// Halves the travel part of the score.
    Scout,
    /// Regenerates health and stretches the step allowance.
    Healer,
    /// Doubles every resource amount collected.
    Gatherer,
}

impl Role {
    /// Exact, case-sensitive match on the role name. Surrounding whitespace
    /// is ignored.
    pub fn from_tag(tag: &str) -> Option<Role> {
        match tag.trim() {
            "Scout" => Some(Role::Scout),
            "Healer" => Some(Role::Healer),
            "Gatherer" => Some(Role::Gatherer),
            _ => None,
        }
    }
}

#[derive(Serialize, Debug, PartialEq, Eq, Copy, Clone)]
pub struct PartyEffects {
    pub scout_active: bool,
    pub healer_present: bool,
    pub gatherer_present: bool,
    /// Multiplies the map's step allowance. Always >= 1.
    pub step_multiplier: u32,
    /// Multiplies every resource amount collected. Always >= 1.
    pub resource_multiplier: u32,
}

impl Default for PartyEffects {
    fn default() -> Self {
        PartyEffects {
            scout_active: false,
            healer_present: false,
            gatherer_present: false,
            step_multiplier: 1,
            resource_multiplier: 1,
        }
    }
}

// ceil(value * 1.2) without going through floats.
fn stretch_steps(value: u32) -> u32 {
    (value * HEALER_STEP_NUMERATOR + HEALER_STEP_DENOMINATOR - 1) / HEALER_STEP_DENOMINATOR
}

impl PartyEffects {
    /// Effects of a party. Only the presence of a role matters, listing it
    /// twice changes nothing.
    pub fn derive<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        let mut effects = PartyEffects::default();
        for role in roles {
            match role {
                Role::Scout => effects.scout_active = true,
                Role::Healer => {
                    if !effects.healer_present {
                        effects.healer_present = true;
                        effects.step_multiplier = stretch_steps(effects.step_multiplier);
                    }
                },
                Role::Gatherer => {
                    effects.gatherer_present = true;
                    effects.resource_multiplier = GATHERER_RESOURCE_MULTIPLIER;
                },
            }
        }
        effects
    }

    /// Same as `derive`, from free-form tags. Tags that don't name a role are
    /// skipped.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        let roles = tags.iter().filter_map(|tag| {
            let role = Role::from_tag(tag.as_ref());
            if role.is_none() {
                debug!("Ignoring unknown role tag {:?}", tag.as_ref());
            }
            role
        });
        PartyEffects::derive(roles)
    }

    /// Multiplier applied to amounts of `kind`. Uniform for now, kept per kind
    /// so that role effects can target a single resource.
    #[inline]
    pub fn resource_multiplier_for(&self, _kind: ResourceKind) -> u32 {
        self.resource_multiplier
    }

    #[inline]
    pub fn effective_allowance(&self, step_allowance: u32) -> u32 {
        step_allowance.saturating_mul(self.step_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_party_is_neutral() {
        let effects = PartyEffects::derive(std::iter::empty());
        assert_eq!(effects, PartyEffects::default());
        assert_eq!(effects.step_multiplier, 1);
        assert_eq!(effects.resource_multiplier, 1);
        assert!(!effects.scout_active);
    }

    #[test]
    fn test_role_effects() {
        let effects = PartyEffects::derive([Role::Healer]);
        assert!(effects.healer_present);
        assert_eq!(effects.step_multiplier, 2);  // ceil(1.2)

        let effects = PartyEffects::derive([Role::Gatherer]);
        assert_eq!(effects.resource_multiplier, 2);
        assert_eq!(effects.resource_multiplier_for(ResourceKind::Fish), 2);

        let effects = PartyEffects::derive([Role::Scout]);
        assert!(effects.scout_active);
        assert_eq!(effects.step_multiplier, 1);
    }

    #[test]
    fn test_duplicates_are_idempotent() {
        let once = PartyEffects::derive([Role::Healer, Role::Gatherer]);
        let twice = PartyEffects::derive(
            [Role::Healer, Role::Gatherer, Role::Healer, Role::Gatherer]);
        assert_eq!(once, twice);
        assert_eq!(twice.step_multiplier, 2);
    }

    #[test]
    fn test_order_does_not_matter() {
        let a = PartyEffects::derive([Role::Scout, Role::Healer, Role::Gatherer]);
        let b = PartyEffects::derive([Role::Gatherer, Role::Scout, Role::Healer]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_tags_ignored() {
        let effects = PartyEffects::from_tags(&["Scout", "Wizard", " Gatherer", ""]);
        assert_eq!(effects, PartyEffects::derive([Role::Scout, Role::Gatherer]));
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        let effects = PartyEffects::from_tags(&["scout", "HEALER", "gatherer"]);
        assert_eq!(effects, PartyEffects::default());
        assert_eq!(Role::from_tag("Healer"), Some(Role::Healer));
        assert_eq!(Role::from_tag("healer"), None);
    }

    #[test]
    fn test_effective_allowance() {
        let effects = PartyEffects::derive([Role::Healer]);
        assert_eq!(effects.effective_allowance(7), 14);
        assert_eq!(PartyEffects::default().effective_allowance(7), 7);
    }
}
