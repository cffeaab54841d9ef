use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A named calendar configuration: upstream source, module pipeline and the
/// admin tokens allowed to edit it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub immutable_past: bool,
    /// Tokens currently owned by this profile. Filled on read; ignored by `write`.
    #[serde(default)]
    pub tokens: Vec<AdminToken>,
    /// Module pipeline in execution order. Filled on read; ignored by `write`.
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Profile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn token_values(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.token.as_str())
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t.token == token)
    }
}

/// Bearer credential granting administrative access to a profile.
///
/// Tokens are unique across the whole store, not per profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminToken {
    pub token: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl AdminToken {
    pub const LENGTH: usize = 64;

    pub fn new(token: impl Into<String>, note: Option<String>) -> Result<Self, StoreError> {
        let token = token.into();
        Self::validate(&token)?;
        Ok(Self { token, note })
    }

    /// Fresh random token: 32 random bytes, hex encoded.
    pub fn generate(note: Option<String>) -> Self {
        let mut bytes = [0u8; Self::LENGTH / 2];
        rand::rng().fill_bytes(&mut bytes);
        let token = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self { token, note }
    }

    pub fn validate(token: &str) -> Result<(), StoreError> {
        let length = token.chars().count();
        if length != Self::LENGTH {
            return Err(StoreError::InvalidTokenFormat { length });
        }
        Ok(())
    }
}

/// One step of a profile's transformation pipeline.
///
/// Legacy callers pass modules as a flat map whose `"name"` entry names the
/// module and whose other entries are its parameters; [`Module::from_flat_map`]
/// and [`Module::to_flat_map`] convert between both shapes without touching
/// the caller's map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Module {
    /// Reserved key carrying the module name in the flat representation.
    pub const NAME_KEY: &'static str = "name";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != Self::NAME_KEY {
            self.parameters.insert(key, value.into());
        }
        self
    }

    pub fn from_flat_map<I, K, V>(entries: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut name = None;
        let mut parameters = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            if key == Self::NAME_KEY {
                name = Some(value.into());
            } else {
                parameters.insert(key, value.into());
            }
        }

        let name = name.ok_or_else(|| {
            StoreError::InvalidModule(format!("missing reserved {:?} key", Self::NAME_KEY))
        })?;
        Ok(Self { name, parameters })
    }

    /// Flat map with the name reinjected under [`Module::NAME_KEY`].
    pub fn to_flat_map(&self) -> BTreeMap<String, String> {
        let mut map = self.parameters.clone();
        map.insert(Self::NAME_KEY.to_string(), self.name.clone());
        map
    }

    /// Canonical stored form of the parameters: sorted keys, reserved key
    /// stripped. Existence checks compare this text byte for byte.
    pub(crate) fn encode_parameters(&self) -> Result<String, serde_json::Error> {
        let canonical: BTreeMap<&str, &str> = self
            .parameters
            .iter()
            .filter(|(k, _)| k.as_str() != Self::NAME_KEY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        serde_json::to_string(&canonical)
    }

    pub(crate) fn decode(name: String, parameters: &str) -> Result<Self, serde_json::Error> {
        let mut parameters: BTreeMap<String, String> = serde_json::from_str(parameters)?;
        parameters.remove(Self::NAME_KEY);
        Ok(Self { name, parameters })
    }
}
