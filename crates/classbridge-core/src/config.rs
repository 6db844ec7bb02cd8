//! Bridge configuration.

/// Configuration shared by the registry and the pairing protocol.
///
/// # Example
///
/// ```
/// use classbridge_core::BridgeConfig;
///
/// let config = BridgeConfig::default()
///     .with_binding_suffix("Meta")
///     .with_linkage_overhead(16);
/// assert_eq!(config.binding_class_name("app.Widget"), "app.WidgetMeta");
/// assert_eq!(config.external_cost(100), 116);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// The abstract root class, the only class allowed to register without
    /// a base.
    pub root_class: String,
    /// Suffix appended to a canonical name to find its binding provider.
    pub binding_suffix: String,
    /// Report native memory to the script engine's collector.
    pub account_external_memory: bool,
    /// Bytes added to each instance footprint for the linkage field.
    pub linkage_overhead: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            root_class: "classbridge.NativeObject".to_string(),
            binding_suffix: "$Bindings".to_string(),
            account_external_memory: true,
            linkage_overhead: std::mem::size_of::<usize>(),
        }
    }
}

impl BridgeConfig {
    /// Set the root class name.
    pub fn with_root_class(mut self, name: impl Into<String>) -> Self {
        self.root_class = name.into();
        self
    }

    /// Set the binding provider suffix.
    pub fn with_binding_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.binding_suffix = suffix.into();
        self
    }

    /// Enable or disable external memory accounting.
    pub fn with_external_memory(mut self, enabled: bool) -> Self {
        self.account_external_memory = enabled;
        self
    }

    /// Set the per-instance linkage overhead.
    pub fn with_linkage_overhead(mut self, bytes: usize) -> Self {
        self.linkage_overhead = bytes;
        self
    }

    /// Name of the binding provider class for `canonical_name`.
    pub fn binding_class_name(&self, canonical_name: &str) -> String {
        format!("{canonical_name}{}", self.binding_suffix)
    }

    /// External memory reported for an instance of the given footprint.
    pub fn external_cost(&self, footprint: usize) -> usize {
        if self.account_external_memory {
            footprint + self.linkage_overhead
        } else {
            0
        }
    }

    /// Check if `canonical_name` is the root class.
    pub fn is_root(&self, canonical_name: &str) -> bool {
        self.root_class == canonical_name
    }
}
