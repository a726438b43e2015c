#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Every knob has a default and can also be set
//! from the environment via [`EngineConfig::from_env`]:
//!
//! | Variable | Values | Field |
//! |----------|--------|-------|
//! | `FIELDWIRE_DELEGATED_VALIDATION` | `when-filled`, `always`, `never` | [`EngineConfig::delegated_validation`] |
//! | `FIELDWIRE_VALIDATE_ON_CHANGE` | `1`/`true`/`yes`/`on` or anything else | [`EngineConfig::validate_on_change`] |
//! | `FIELDWIRE_FORCE_VALIDATION` | same as above | [`EngineConfig::force_validation`] |
//!
//! Unset or unrecognized values leave the default in place.

pub const ENV_DELEGATED_VALIDATION: &str = "FIELDWIRE_DELEGATED_VALIDATION";
pub const ENV_VALIDATE_ON_CHANGE: &str = "FIELDWIRE_VALIDATE_ON_CHANGE";
pub const ENV_FORCE_VALIDATION: &str = "FIELDWIRE_FORCE_VALIDATION";

/// Whether a delegated binding validates the subscriber when its target
/// field finally registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelegatedValidation {
    /// Validate only if the subscriber already holds a non-empty value, so a
    /// freshly mounted empty field is not flagged prematurely.
    #[default]
    WhenSubscriberHasValue,
    /// Always validate after the first recomputation.
    Always,
    /// Never validate on delegated promotion.
    Never,
}

impl DelegatedValidation {
    /// Parse the `FIELDWIRE_DELEGATED_VALIDATION` spelling.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "when-filled" | "when_filled" | "filled" => Some(Self::WhenSubscriberHasValue),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

/// Configuration for [`ReactiveEngine`](crate::ReactiveEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Validation policy when a delegated binding is promoted.
    /// Default: [`DelegatedValidation::WhenSubscriberHasValue`].
    pub delegated_validation: DelegatedValidation,

    /// `shouldValidate` used for change events that carry no preference.
    /// Default: true.
    pub validate_on_change: bool,

    /// Ask the validator to bypass its debounce and short-circuit paths
    /// (`force` and `force_props`). Default: true.
    pub force_validation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delegated_validation: DelegatedValidation::default(),
            validate_on_change: true,
            force_validation: true,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `FIELDWIRE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(policy) = get_env(ENV_DELEGATED_VALIDATION)
            .as_deref()
            .and_then(DelegatedValidation::parse)
        {
            config.delegated_validation = policy;
        }
        if let Some(value) = get_env(ENV_VALIDATE_ON_CHANGE) {
            config.validate_on_change = env_flag(&value);
        }
        if let Some(value) = get_env(ENV_FORCE_VALIDATION) {
            config.force_validation = env_flag(&value);
        }
        config
    }

    #[must_use]
    pub fn with_delegated_validation(mut self, policy: DelegatedValidation) -> Self {
        self.delegated_validation = policy;
        self
    }

    #[must_use]
    pub fn with_validate_on_change(mut self, enabled: bool) -> Self {
        self.validate_on_change = enabled;
        self
    }

    #[must_use]
    pub fn with_force_validation(mut self, enabled: bool) -> Self {
        self.force_validation = enabled;
        self
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
