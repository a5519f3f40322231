//! Configuration for the Overpass plugin
//!
//! Options deserialize from the same camelCase keys the plugin has always
//! accepted (`enabled`, `query`, `style`, `showButton`, `QueryOverpass`).
//! Every key is optional; missing keys fall back to the defaults below.

use crate::style::document::StyleLayer;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_SOURCE_NAME: &str = "overpass";
pub const DEFAULT_REFERENCE_LAYER: &str = "road";

/// What to do when the style has no layer to insert the overlay after
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingReferencePolicy {
    /// Leave the style untouched and retry on the next render
    #[default]
    Skip,
    /// Append the overlay layers at the top of the layer list
    Append,
    /// Fail the render with `MapError::MissingReferenceLayer`
    Error,
}

/// Visual options for the injected layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleOptions {
    /// Label template for the symbol layer, e.g. `{name}`
    pub label: String,
    pub label_size: f64,
    pub color: String,
    /// Line width and circle radius
    pub size: f64,
    pub opacity: f64,
    /// Replaces the generated layers entirely when set
    pub layers: Option<Vec<StyleLayer>>,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            label: "{name}".to_string(),
            label_size: 10.0,
            color: "#ff00ed".to_string(),
            size: 5.0,
            opacity: 0.5,
            layers: None,
        }
    }
}

/// Settings for the remote Overpass client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    pub overpass_url: String,
    /// Flatten OSM tags and metadata into the feature properties
    pub flat_properties: bool,
    /// Request timeout; `None` waits indefinitely
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            flat_properties: true,
            timeout_secs: None,
            user_agent: concat!("maplet-overpass/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Constructor options of the plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverpassOptions {
    /// Initial toggle state
    pub enabled: bool,
    /// Initial query template
    pub query: Option<String>,
    pub style: StyleOptions,
    /// Initial visibility of the control container
    pub show_button: bool,
    #[serde(rename = "QueryOverpass")]
    pub client: ClientOptions,
    /// Name of the injected GeoJSON source
    pub source_name: String,
    /// `source-layer` the overlay is inserted after
    pub reference_layer: String,
    pub missing_reference: MissingReferencePolicy,
}

impl Default for OverpassOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            query: None,
            style: StyleOptions::default(),
            show_button: true,
            client: ClientOptions::default(),
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            reference_layer: DEFAULT_REFERENCE_LAYER.to_string(),
            missing_reference: MissingReferencePolicy::default(),
        }
    }
}

impl OverpassOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from JSON and validates them
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_style(mut self, style: StyleOptions) -> Self {
        self.style = style;
        self
    }

    pub fn with_show_button(mut self, show: bool) -> Self {
        self.show_button = show;
        self
    }

    pub fn with_client(mut self, client: ClientOptions) -> Self {
        self.client = client;
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_reference_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.reference_layer = source_layer.into();
        self
    }

    pub fn with_missing_reference(mut self, policy: MissingReferencePolicy) -> Self {
        self.missing_reference = policy;
        self
    }

    /// Rejects values the style renderer or the client could not use
    pub fn validate(&self) -> Result<()> {
        if self.source_name.trim().is_empty() {
            return Err(Error::Config("sourceName must not be empty".to_string()));
        }
        if self.client.overpass_url.trim().is_empty() {
            return Err(Error::Config("overpassUrl must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.style.opacity) {
            return Err(Error::Config(format!(
                "style.opacity must be within [0, 1], got {}",
                self.style.opacity
            )));
        }
        if self.style.size <= 0.0 || self.style.label_size <= 0.0 {
            return Err(Error::Config(
                "style.size and style.labelSize must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
