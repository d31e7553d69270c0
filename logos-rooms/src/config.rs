//! Registry configuration.

/// Tunables for a namespace and its membership registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Namespace name stamped onto every broadcast packet
    pub namespace: String,
    /// Buffered packets per `ChannelConnection` before it reports `Full`
    pub connection_buffer: usize,
    /// Initial capacity of the connection and room maps
    pub initial_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace: "/".to_string(),
            connection_buffer: 256,
            initial_capacity: 64,
        }
    }
}

impl RegistryConfig {
    /// Default config under a different namespace name.
    pub fn for_namespace(name: impl Into<String>) -> Self {
        Self {
            namespace: name.into(),
            ..Self::default()
        }
    }
}
