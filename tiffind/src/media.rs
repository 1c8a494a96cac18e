//! Media URL resolution.
//!
//! Entities store opaque media references; the API resolves them to
//! fetchable URLs against the configured public base.

use tiffin_domain::MediaRef;

/// Port for the media storage collaborator.
pub trait MediaResolver: Send + Sync {
    /// Resolve a stored reference to a fetchable URL.
    fn url(&self, media: &MediaRef) -> String;
}

/// Resolver that joins references onto a public base URL.
pub struct PublicMediaResolver {
    base_url: String,
}

impl PublicMediaResolver {
    /// Create a resolver over `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }
}

impl MediaResolver for PublicMediaResolver {
    fn url(&self, media: &MediaRef) -> String {
        format!("{}/{}", self.base_url, media.key().trim_start_matches('/'))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_against_base() {
        let resolver = PublicMediaResolver::new("http://media.localhost");
        let media = MediaRef::new("logos/masala.png").unwrap();
        assert_eq!(resolver.url(&media), "http://media.localhost/logos/masala.png");
    }

    #[test]
    fn test_normalizes_slashes() {
        let resolver = PublicMediaResolver::new("http://media.localhost/");
        let media = MediaRef::new("/logos/masala.png").unwrap();
        assert_eq!(resolver.url(&media), "http://media.localhost/logos/masala.png");
    }
}
