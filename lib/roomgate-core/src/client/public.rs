//! Public endpoints exempt from bearer-token injection.

/// Paths on the gateway that must be callable without a service token.
///
/// Membership is a prefix match on the request path. The set is assembled by
/// [`GatewayClientBuilder`](super::GatewayClientBuilder) and fixed for the lifetime
/// of the client; login and registration are always members.
#[derive(Debug, Clone)]
pub struct PublicEndpoints {
    prefixes: Vec<String>,
}

impl Default for PublicEndpoints {
    fn default() -> Self {
        Self {
            prefixes: vec!["/auth/login".to_string(), "/auth/register".to_string()],
        }
    }
}

impl PublicEndpoints {
    pub(crate) fn push(&mut self, prefix: impl Into<String>) {
        self.prefixes.push(Self::normalize(prefix.into()));
    }

    /// Tests whether a request path is exempt from authorization.
    pub fn matches(&self, path: &str) -> bool {
        let normalized = Self::normalize(path.to_string());
        self.prefixes
            .iter()
            .any(|prefix| normalized.starts_with(prefix.as_str()))
    }

    fn normalize(path: String) -> String {
        if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        }
    }
}
