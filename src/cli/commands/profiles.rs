//! `loadgate profiles`: list configured weight profiles.

use anyhow::{bail, Context, Result};
use clap::Args;
use comfy_table::{presets, Cell, ContentArrangement, Table};
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Config, WeightProfile};
use crate::services::ProfileRegistry;

#[derive(Args, Debug, Default)]
pub struct ProfilesArgs {
    /// Only show these profiles (default: all)
    pub names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileOutput {
    pub name: String,
    pub capacity: u8,
    pub overload_threshold: f64,
    pub weights: BTreeMap<String, f64>,
}

impl From<&WeightProfile> for ProfileOutput {
    fn from(profile: &WeightProfile) -> Self {
        Self {
            name: profile.name().to_string(),
            capacity: profile.capacity(),
            overload_threshold: profile.overload_threshold(),
            weights: profile.weights().clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileListOutput {
    pub profiles: Vec<ProfileOutput>,
    pub total: usize,
}

impl CommandOutput for ProfileListOutput {
    fn to_human(&self) -> String {
        if self.profiles.is_empty() {
            return "No weight profiles configured. Units are scored with the built-in default \
                    (capacity 7, every feature weighted 1.0)."
                .to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["NAME", "CAPACITY", "THRESHOLD", "WEIGHTS"]);

        for profile in &self.profiles {
            let weights = profile
                .weights
                .iter()
                .map(|(feature, weight)| format!("{feature}={weight}"))
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec![
                Cell::new(&profile.name),
                Cell::new(profile.capacity),
                Cell::new(format!("{:.1}", profile.overload_threshold)),
                Cell::new(truncate(&weights, 60)),
            ]);
        }

        format!("{} profile(s):\n{table}", style(self.total).bold())
    }
}

pub fn execute(args: ProfilesArgs, config: &Config, json_mode: bool) -> Result<()> {
    let registry = ProfileRegistry::from_config(&config.profiles)
        .context("Invalid weight profiles in configuration")?;

    let out = list_profiles(&registry, &args.names)?;
    output(&out, json_mode);
    Ok(())
}

fn list_profiles(registry: &ProfileRegistry, requested: &[String]) -> Result<ProfileListOutput> {
    let available = registry.names();
    let selected: Vec<&String> = if requested.is_empty() {
        available.iter().collect()
    } else {
        requested.iter().collect()
    };

    let mut profiles = Vec::with_capacity(selected.len());
    for name in selected {
        let Some(profile) = registry.get(name) else {
            bail!(
                "Unknown profile '{name}'. Available: {}",
                if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                }
            );
        };
        profiles.push(ProfileOutput::from(profile.as_ref()));
    }

    Ok(ProfileListOutput {
        total: profiles.len(),
        profiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_mentions_default() {
        let out = ProfileListOutput {
            profiles: vec![],
            total: 0,
        };
        assert!(out.to_human().contains("built-in default"));
    }

    #[test]
    fn test_profile_output_from_profile() {
        let mut weights = BTreeMap::new();
        weights.insert("questions".to_string(), 1.5);
        let profile = WeightProfile::new("support", 6, weights).unwrap();

        let out = ProfileOutput::from(&profile);
        assert_eq!(out.capacity, 6);
        assert!((out.overload_threshold - 6.0).abs() < f64::EPSILON);

        let list = ProfileListOutput {
            profiles: vec![out],
            total: 1,
        };
        let json = list.to_json();
        assert_eq!(json["profiles"][0]["name"], "support");
        assert!(list.to_human().contains("questions=1.5"));
    }

    fn registry() -> ProfileRegistry {
        let profiles = ["support", "installer"]
            .into_iter()
            .map(|name| {
                let mut weights = BTreeMap::new();
                weights.insert("steps".to_string(), 1.0);
                WeightProfile::new(name, 7, weights).unwrap()
            })
            .collect();
        ProfileRegistry::from_profiles(profiles).unwrap()
    }

    #[test]
    fn test_list_all_is_sorted_by_name() {
        let out = list_profiles(&registry(), &[]).unwrap();
        let names: Vec<_> = out.profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["installer", "support"]);
        assert_eq!(out.total, 2);
    }

    #[test]
    fn test_list_selected_profiles() {
        let out = list_profiles(&registry(), &["support".to_string()]).unwrap();
        assert_eq!(out.total, 1);
        assert_eq!(out.profiles[0].name, "support");
    }

    #[test]
    fn test_unknown_profile_lists_available() {
        let err = list_profiles(&registry(), &["billing".to_string()]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown profile 'billing'. Available: installer, support"
        );
    }
}
