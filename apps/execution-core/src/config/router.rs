//! Smart order router configuration.

use serde::{Deserialize, Serialize};

use crate::models::RoutingStrategy;
use crate::router::RoutingRule;

/// Router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Default venue selection strategy.
    #[serde(default = "default_strategy")]
    pub strategy: RoutingStrategy,
    /// Maximum venues a single slice may be split across.
    #[serde(default = "default_max_venues_per_order")]
    pub max_venues_per_order: usize,
    /// Routing rules evaluated before venue selection (priority order,
    /// first match wins).
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

const fn default_strategy() -> RoutingStrategy {
    RoutingStrategy::Balanced
}

const fn default_max_venues_per_order() -> usize {
    3
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_venues_per_order: default_max_venues_per_order(),
            rules: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.strategy, RoutingStrategy::Balanced);
        assert_eq!(config.max_venues_per_order, 3);
        assert!(config.rules.is_empty());
    }
}
