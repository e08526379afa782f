use anyhow::Result;
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_min_target_chars() -> usize {
    2
}

fn default_max_components() -> usize {
    10
}

fn default_primary_canvas() -> f32 {
    24.0
}

fn default_secondary_canvas() -> f32 {
    8.0
}

fn default_pixels_per_inch() -> f32 {
    100.0
}

fn default_label_node_limit() -> usize {
    1000
}

fn default_layout_iterations() -> usize {
    50
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    format!("massograph/{}", env!("CARGO_PKG_VERSION"))
}

/// Analysis configuration: resolution switches, graph filtering, rendering
/// and fetch politeness. Loaded from YAML; every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub rendering: RenderingConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionConfig {
    /// Drop links containing `@` (email addresses)
    #[serde(default = "default_true")]
    pub drop_email_links: bool,
    /// Map resolved targets back to URLs through the inverse alias table
    #[serde(default = "default_true")]
    pub map_target_links: bool,
    /// Scan fulltext for corpus titles
    #[serde(default = "default_true")]
    pub title_mentions: bool,
    /// Scan fulltext for corpus identifiers
    #[serde(default = "default_true")]
    pub identifier_mentions: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            drop_email_links: true,
            map_target_links: true,
            title_mentions: true,
            identifier_mentions: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphConfig {
    /// Targets shorter than this (in chars) are treated as noise
    #[serde(default = "default_min_target_chars")]
    pub min_target_chars: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_target_chars: default_min_target_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderingConfig {
    /// Only the largest N components are rendered
    #[serde(default = "default_max_components")]
    pub max_components: usize,
    /// Canvas edge (inches) for the largest component
    #[serde(default = "default_primary_canvas")]
    pub primary_canvas_inches: f32,
    /// Canvas edge (inches) for every other rendered component
    #[serde(default = "default_secondary_canvas")]
    pub secondary_canvas_inches: f32,
    #[serde(default = "default_pixels_per_inch")]
    pub pixels_per_inch: f32,
    /// Labels are drawn only for components smaller than this
    #[serde(default = "default_label_node_limit")]
    pub label_node_limit: usize,
    #[serde(default = "default_layout_iterations")]
    pub layout_iterations: usize,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            max_components: default_max_components(),
            primary_canvas_inches: default_primary_canvas(),
            secondary_canvas_inches: default_secondary_canvas(),
            pixels_per_inch: default_pixels_per_inch(),
            label_node_limit: default_label_node_limit(),
            layout_iterations: default_layout_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Fixed pause between two requests
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl AnalysisConfig {
    /// Load config from file path (functional approach)
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
