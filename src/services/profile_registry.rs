//! Read-mostly registry of weight profiles.
//!
//! Profiles are loaded once at start-up and only ever replaced wholesale:
//! readers clone an `Arc` of the current map and never observe a partially
//! applied update.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use crate::domain::errors::{GovernorError, GovernorResult};
use crate::domain::models::{ProfileConfig, WeightProfile};

type ProfileMap = HashMap<String, Arc<WeightProfile>>;

/// A profile looked up for a domain.
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub profile: Arc<WeightProfile>,
    /// True when the domain had no profile and the default was substituted.
    pub degraded: bool,
}

/// Registry of profiles keyed by domain/persona name.
#[derive(Debug)]
pub struct ProfileRegistry {
    profiles: RwLock<Arc<ProfileMap>>,
    fallback: Arc<WeightProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self {
            profiles: RwLock::new(Arc::new(HashMap::new())),
            fallback: Arc::new(WeightProfile::builtin_default()),
        }
    }
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from validated profiles. Names must be unique.
    pub fn from_profiles(profiles: Vec<WeightProfile>) -> GovernorResult<Self> {
        let registry = Self::new();
        registry.replace_all(profiles)?;
        Ok(registry)
    }

    /// Build a registry from configuration entries.
    pub fn from_config(configs: &[ProfileConfig]) -> GovernorResult<Self> {
        let profiles = configs
            .iter()
            .map(ProfileConfig::to_profile)
            .collect::<GovernorResult<Vec<_>>>()?;
        Self::from_profiles(profiles)
    }

    /// Swap in a complete new set of profiles.
    ///
    /// Live sessions keep the capacity they were created with.
    pub fn replace_all(&self, profiles: Vec<WeightProfile>) -> GovernorResult<()> {
        let mut next = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            let name = profile.name().to_string();
            if next.insert(name.clone(), Arc::new(profile)).is_some() {
                return Err(GovernorError::InvalidProfile {
                    name,
                    reason: "duplicate profile name".to_string(),
                });
            }
        }

        let count = next.len();
        *self.profiles.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        info!(profiles = count, "weight profiles loaded");
        Ok(())
    }

    /// Profile registered for `domain`, if any.
    pub fn get(&self, domain: &str) -> Option<Arc<WeightProfile>> {
        self.snapshot().get(domain).cloned()
    }

    /// Profile for `domain`, or the built-in default flagged as degraded.
    pub fn resolve(&self, domain: &str) -> ResolvedProfile {
        match self.get(domain) {
            Some(profile) => ResolvedProfile {
                profile,
                degraded: false,
            },
            None => {
                warn!(domain_id = %domain, "no weight profile for domain, using built-in default");
                ResolvedProfile {
                    profile: Arc::clone(&self.fallback),
                    degraded: true,
                }
            }
        }
    }

    /// Sorted profile names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    /// All profiles, sorted by name.
    pub fn profiles(&self) -> Vec<Arc<WeightProfile>> {
        let mut profiles: Vec<_> = self.snapshot().values().cloned().collect();
        profiles.sort_by(|a, b| a.name().cmp(b.name()));
        profiles
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<ProfileMap> {
        let guard = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }
}
