use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PresenceError;

/// Embedded service registry.
const EMBEDDED_REGISTRY: &str = include_str!("../data/services.toml");

/// Which extractor variant handles a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Nicovideo,
    Nicolive,
    PrimeVideo,
}

/// DOM locations an extractor reads for a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selectors {
    /// Element whose text is the product (series) name.
    pub product: String,
    /// Genre or tag elements used for the anime check.
    pub classification: String,
    /// Label telling official broadcasts apart from user ones.
    #[serde(default)]
    pub provider: Option<String>,
    /// The `<video>` element.
    pub player: String,
    /// Subtree that changes when the episode switches without a reload.
    #[serde(default)]
    pub identity_root: Option<String>,
    /// Subtree that loses the player when the player is torn down.
    #[serde(default)]
    pub player_container: Option<String>,
}

/// A supported streaming service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Display name sent to the relay (e.g., "Prime Video").
    pub name: String,
    /// Substring matched against the page address.
    pub match_token: String,
    /// Small-image asset key shown next to the presence.
    pub small_image_key: String,
    pub kind: ServiceKind,
    #[serde(default)]
    pub selectors: Selectors,
    /// Whether this service is considered during resolution.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Wrapper for TOML deserialization.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(rename = "service", default)]
    services: Vec<ServiceDescriptor>,
}

/// Ordered table of supported services.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    /// Load the embedded registry.
    pub fn embedded() -> Self {
        Self::from_toml(EMBEDDED_REGISTRY).expect("embedded services.toml should be valid")
    }

    /// Load a registry from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let file: RegistryFile = toml::from_str(toml_str)?;
        Ok(Self {
            services: file.services,
        })
    }

    /// Load a user registry file.
    pub fn from_file(path: &Path) -> Result<Self, PresenceError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| PresenceError::Config(e.to_string()))
    }

    /// The embedded registry with an optional user file merged over it.
    pub fn with_user_file(path: Option<&Path>) -> Result<Self, PresenceError> {
        let mut registry = Self::embedded();
        if let Some(path) = path {
            let user = Self::from_file(path)?;
            registry.merge_user(&user);
            tracing::debug!(path = %path.display(), services = registry.len(), "Merged user service registry");
        }
        Ok(registry)
    }

    /// Merge a user registry into this one.
    /// Services with matching names are replaced in place; new services are appended.
    pub fn merge_user(&mut self, user: &ServiceRegistry) {
        for user_service in &user.services {
            match self.services.iter().position(|s| s.name == user_service.name) {
                Some(pos) => self.services[pos] = user_service.clone(),
                None => self.services.push(user_service.clone()),
            }
        }
    }

    /// Find the first enabled service whose match token occurs in `address`.
    pub fn resolve(&self, address: &str) -> Option<&ServiceDescriptor> {
        self.services
            .iter()
            .find(|s| s.enabled && address.contains(&s.match_token))
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::embedded()
    }
}
