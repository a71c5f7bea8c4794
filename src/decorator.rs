//! URL rewriting at the system boundary
//!
//! A decorator maps cache-relative paths to public URLs (`outbound`) and
//! back (`inbound`). It is applied once per public operation and never to
//! paths the orchestrator recomputes internally.

/// Bidirectional URL rewrite hook
pub trait Decorator: Send + Sync {
    /// Rewrite a cache-relative path into the URL handed to clients
    fn outbound(&self, url: &str) -> String;

    /// Rewrite a client URL back into a cache-relative path
    fn inbound(&self, url: &str) -> String;
}

/// Mounts the cache under a fixed public prefix such as `/media`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixDecorator {
    prefix: String,
}

impl PrefixDecorator {
    /// Create a decorator for `prefix`; a missing leading slash is added
    /// and trailing slashes are dropped
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let trimmed = prefix.as_ref().trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        Self { prefix }
    }

    /// The normalized prefix, empty when mounted at the root
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Decorator for PrefixDecorator {
    fn outbound(&self, url: &str) -> String {
        format!("{}{}", self.prefix, url)
    }

    fn inbound(&self, url: &str) -> String {
        match url.strip_prefix(self.prefix.as_str()) {
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => url.to_string(),
        }
    }
}
