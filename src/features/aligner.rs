//! Alignment of a synthesized feature mapping to a bundle's feature order
//!
//! Bundles trained at different times expect slightly different feature
//! sets. Expected features the synthesizer did not produce are resolved by an
//! ordered rule table; synthesized features the bundle does not expect are
//! dropped.

use strum::Display;
use tracing::{debug, warn};

use super::FeatureMap;
use crate::ml::FeatureVector;

/// Category labels that mark one-hot weather features
pub const WEATHER_MARKERS: &[&str] = &["Clear", "Sunny", "Cloudy", "Overcast", "Rainy"];

/// Names of features older bundles were trained with that are no longer synthesized
pub const LEGACY_FEATURES: &[&str] = &[
    "is_holiday",
    "cloud_cover",
    "visibility",
    "dew_point",
    "precipitation",
    "generation_lag_1",
    "generation_lag_24",
];

/// Identifies which rule produced a default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DefaultRule {
    Optimal,
    Rolling,
    Weather,
    Legacy,
    Unrecognized,
}

/// Which feature names a rule applies to
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    Contains(&'static str),
    ContainsAny(&'static [&'static str]),
    OneOf(&'static [&'static str]),
    Any,
}

impl Matcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Contains(marker) => name.contains(marker),
            Matcher::ContainsAny(markers) => markers.iter().any(|m| name.contains(m)),
            Matcher::OneOf(names) => names.contains(&name),
            Matcher::Any => true,
        }
    }
}

/// How a matched feature gets its value
#[derive(Debug, Clone, Copy)]
pub enum DefaultStrategy {
    Zero,
    /// Take the feature named by the prefix before `marker`, 0 if absent
    BaseFeature { marker: &'static str },
}

impl DefaultStrategy {
    fn value(&self, name: &str, features: &FeatureMap) -> f64 {
        match self {
            DefaultStrategy::Zero => 0.0,
            DefaultStrategy::BaseFeature { marker } => name
                .find(marker)
                .and_then(|idx| features.get(&name[..idx]))
                .copied()
                .unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PolicyRule {
    pub rule: DefaultRule,
    pub matcher: Matcher,
    pub strategy: DefaultStrategy,
}

/// Ordered default-resolution table; the first matching rule wins
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
    rules: Vec<PolicyRule>,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::new(vec![
            PolicyRule {
                rule: DefaultRule::Optimal,
                matcher: Matcher::Contains("optimal"),
                strategy: DefaultStrategy::Zero,
            },
            PolicyRule {
                rule: DefaultRule::Rolling,
                matcher: Matcher::Contains("rolling"),
                strategy: DefaultStrategy::BaseFeature { marker: "_rolling" },
            },
            PolicyRule {
                rule: DefaultRule::Weather,
                matcher: Matcher::ContainsAny(WEATHER_MARKERS),
                strategy: DefaultStrategy::Zero,
            },
            PolicyRule {
                rule: DefaultRule::Legacy,
                matcher: Matcher::OneOf(LEGACY_FEATURES),
                strategy: DefaultStrategy::Zero,
            },
        ])
    }
}

impl DefaultPolicy {
    /// Build a policy from `rules`. An `Unrecognized` catch-all resolving to
    /// zero is always appended.
    pub fn new(mut rules: Vec<PolicyRule>) -> Self {
        rules.push(PolicyRule {
            rule: DefaultRule::Unrecognized,
            matcher: Matcher::Any,
            strategy: DefaultStrategy::Zero,
        });
        Self { rules }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Resolve a feature missing from `features`
    pub fn resolve(&self, name: &str, features: &FeatureMap) -> (f64, DefaultRule) {
        self.rules
            .iter()
            .find(|r| r.matcher.matches(name))
            .map(|r| (r.strategy.value(name, features), r.rule))
            .unwrap_or((0.0, DefaultRule::Unrecognized))
    }
}

/// An expected feature that was filled by a default rule
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDefault {
    pub feature: String,
    pub rule: DefaultRule,
    pub value: f64,
}

/// Result of aligning one mapping to an expected feature order
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Values in exactly the expected order
    pub vector: FeatureVector,
    pub defaults: Vec<AppliedDefault>,
    /// Synthesized features the bundle did not ask for
    pub dropped: usize,
}

impl Alignment {
    /// Number of expected features that were actually synthesized
    pub fn matched(&self) -> usize {
        self.vector.len() - self.defaults.len()
    }

    pub fn defaulted_names(&self) -> Vec<String> {
        self.defaults.iter().map(|d| d.feature.clone()).collect()
    }
}

/// Aligns feature mappings to an expected order
#[derive(Debug, Clone, Default)]
pub struct FeatureAligner {
    policy: DefaultPolicy,
}

impl FeatureAligner {
    pub fn new(policy: DefaultPolicy) -> Self {
        Self { policy }
    }

    /// Produce a vector with one value per name in `expected`, in order.
    /// Never fails on missing keys.
    pub fn align(&self, features: &FeatureMap, expected: &[String]) -> Alignment {
        let mut values = Vec::with_capacity(expected.len());
        let mut defaults = Vec::new();

        for name in expected {
            match features.get(name) {
                Some(value) => values.push(*value),
                None => {
                    let (value, rule) = self.policy.resolve(name, features);
                    if rule == DefaultRule::Unrecognized {
                        warn!(feature = %name, "Unrecognized model feature, defaulting to 0");
                    }
                    values.push(value);
                    defaults.push(AppliedDefault {
                        feature: name.clone(),
                        rule,
                        value,
                    });
                }
            }
        }

        let dropped = features
            .keys()
            .filter(|name| !expected.contains(*name))
            .count();

        debug!(
            expected = expected.len(),
            synthesized = features.len(),
            defaulted = defaults.len(),
            dropped,
            "Aligned features to model schema"
        );

        Alignment {
            vector: FeatureVector::from_parts(values, expected.to_vec()),
            defaults,
            dropped,
        }
    }
}

/// Number of names in `expected` present in `features`
pub fn overlap(features: &FeatureMap, expected: &[String]) -> usize {
    expected.iter().filter(|name| features.contains_key(*name)).count()
}
