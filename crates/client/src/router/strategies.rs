//! The three caching strategies.

use mks_sw_core::{Error, RequestDescriptor, ResponseSnapshot, ResponseSource};

use super::{CacheRouter, RoutedResponse, Strategy};

impl CacheRouter {
    /// Live first; cache on network failure; otherwise the error propagates.
    pub async fn network_first_external(&self, request: &RequestDescriptor) -> Result<RoutedResponse, Error> {
        let strategy = Strategy::NetworkFirstExternal;
        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_if_ok(request, &response).await;
                Ok(RoutedResponse { response, source: ResponseSource::Network, strategy })
            }
            Err(err) => {
                tracing::debug!("network failed for {}: {}", request, err);
                match self.lookup(request).await {
                    Some(response) => Ok(RoutedResponse { response, source: ResponseSource::Cache, strategy }),
                    None => Err(err),
                }
            }
        }
    }

    /// Cache hit returns immediately without touching the network.
    pub async fn cache_first(&self, request: &RequestDescriptor) -> RoutedResponse {
        let strategy = Strategy::CacheFirst;
        if let Some(response) = self.lookup(request).await {
            tracing::debug!("cache hit for {}", request);
            return RoutedResponse { response, source: ResponseSource::Cache, strategy };
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_if_ok(request, &response).await;
                RoutedResponse { response, source: ResponseSource::Network, strategy }
            }
            Err(err) => {
                tracing::debug!("asset unavailable {}: {}", request, err);
                RoutedResponse { response: ResponseSnapshot::unavailable(), source: ResponseSource::Synthetic, strategy }
            }
        }
    }

    /// Live first; then cache; then the app shell for navigations; then 503.
    pub async fn network_first(&self, request: &RequestDescriptor) -> RoutedResponse {
        let strategy = Strategy::NetworkFirst;
        let err = match self.network.fetch(request).await {
            Ok(response) => {
                self.store_if_ok(request, &response).await;
                return RoutedResponse { response, source: ResponseSource::Network, strategy };
            }
            Err(err) => err,
        };
        tracing::debug!("network failed for {}: {}", request, err);

        if let Some(response) = self.lookup(request).await {
            return RoutedResponse { response, source: ResponseSource::Cache, strategy };
        }

        if request.is_navigation() {
            let shell = RequestDescriptor::get(self.shell_url.clone());
            if let Some(response) = self.lookup(&shell).await {
                tracing::debug!("serving app shell for {}", request);
                return RoutedResponse { response, source: ResponseSource::Shell, strategy };
            }
        }

        RoutedResponse { response: ResponseSnapshot::unavailable(), source: ResponseSource::Synthetic, strategy }
    }

    /// A failed read is treated as a miss.
    async fn lookup(&self, request: &RequestDescriptor) -> Option<ResponseSnapshot> {
        match self.db.match_entry(&self.store, request).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("cache read failed for {}: {}", request, err);
                None
            }
        }
    }

    /// A failed write is logged and swallowed.
    async fn store_if_ok(&self, request: &RequestDescriptor, response: &ResponseSnapshot) {
        if !response.is_ok() {
            return;
        }
        if let Err(err) = self.db.put_entry(&self.store, request, response).await {
            tracing::warn!("cache write failed for {}: {}", request, err);
        }
    }
}
