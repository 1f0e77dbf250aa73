//! Host name to provider lookup.
//!
//! Hosts are matched exactly against [`Url::host_str`](url::Url::host_str),
//! so `www.newgrounds.com` and `newgrounds.com` are distinct keys.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    EHentaiProvider, NHentaiProvider, NewgroundsProvider, PageRenderer, UriProvider, VcpProvider,
    VmpProvider,
};
use crate::download::HttpClient;

/// Immutable-after-setup map from host to provider.
///
/// Providers are stored behind `Arc`, so [`resolve`](Self::resolve) hands out
/// the same instance on every call and provider-level state such as a
/// request gate is shared by every page of that host.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn UriProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("hosts", &self.hosts())
            .finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from host/provider pairs. Later duplicates win.
    #[must_use]
    pub fn from_providers(providers: impl IntoIterator<Item = (String, Arc<dyn UriProvider>)>) -> Self {
        let mut registry = Self::new();
        for (host, provider) in providers {
            registry.register(host, provider);
        }
        registry
    }

    /// Builds the registry of every built-in provider.
    ///
    /// The Newgrounds provider needs a scripted browser and is only
    /// registered when `renderer` is given.
    #[must_use]
    pub fn with_defaults(client: HttpClient, renderer: Option<Arc<dyn PageRenderer>>) -> Self {
        let mut registry = Self::new();
        registry.register(VcpProvider::HOST, Arc::new(VcpProvider::new(client.clone())));
        registry.register(VmpProvider::HOST, Arc::new(VmpProvider::new(client.clone())));
        registry.register(
            EHentaiProvider::HOST,
            Arc::new(EHentaiProvider::new(client.clone())),
        );
        registry.register(NHentaiProvider::HOST, Arc::new(NHentaiProvider::new(client)));

        match renderer {
            Some(renderer) => registry.register(
                NewgroundsProvider::HOST,
                Arc::new(NewgroundsProvider::new(renderer)),
            ),
            None => warn!(
                host = NewgroundsProvider::HOST,
                "no page renderer configured; host will be reported as unsupported"
            ),
        }
        registry
    }

    /// Registers `provider` for `host`, replacing any previous provider.
    #[tracing::instrument(level = "debug", skip(self, host, provider), fields(host))]
    pub fn register(&mut self, host: impl Into<String>, provider: Arc<dyn UriProvider>) {
        let host = host.into();
        tracing::Span::current().record("host", host.as_str());
        debug!(provider = provider.name(), "registering provider");
        if self.providers.insert(host, provider).is_some() {
            debug!("replaced previously registered provider");
        }
    }

    /// Returns the provider registered for `host`.
    #[must_use]
    pub fn resolve(&self, host: &str) -> Option<Arc<dyn UriProvider>> {
        self.providers.get(host).cloned()
    }

    /// Returns the registered hosts, sorted.
    #[must_use]
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }

    /// Returns the number of registered hosts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::provider::{DescriptorSink, ResolutionError};

    struct Fixed(&'static str);

    #[async_trait]
    impl UriProvider for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn number_of_items(&self, _page: &Url) -> Result<usize, ResolutionError> {
            Ok(0)
        }

        async fn get_uris(
            &self,
            _page: &Url,
            _output_root: &Path,
            _sink: &DescriptorSink,
        ) -> Result<(), ResolutionError> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_returns_same_instance() {
        let provider: Arc<dyn UriProvider> = Arc::new(Fixed("a"));
        let registry =
            ProviderRegistry::from_providers(vec![("a.example".to_string(), Arc::clone(&provider))]);

        let first = registry.resolve("a.example").unwrap();
        let second = registry.resolve("a.example").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &provider));
    }

    #[test]
    fn test_resolve_is_exact_host_match() {
        let mut registry = ProviderRegistry::new();
        registry.register("www.newgrounds.com", Arc::new(Fixed("ng")));
        assert!(registry.resolve("www.newgrounds.com").is_some());
        assert!(registry.resolve("newgrounds.com").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn test_register_replaces_existing_host() {
        let mut registry = ProviderRegistry::new();
        registry.register("h", Arc::new(Fixed("old")));
        registry.register("h", Arc::new(Fixed("new")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("h").unwrap().name(), "new");
    }

    #[test]
    fn test_defaults_without_renderer_skip_newgrounds() {
        let registry = ProviderRegistry::with_defaults(HttpClient::new(), None);
        assert_eq!(
            registry.hosts(),
            vec![
                "e-hentai.org",
                "nhentai.net",
                "vercomicsporno.com",
                "vermangasporno.com"
            ]
        );
        assert!(!registry.is_empty());
    }
}
