// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::{CacheStore, Error, FileRead, HttpSend, MemoryCache, Result};
use bytes::Bytes;
use std::fmt::Debug;
use std::sync::Arc;

/// Context carries the collaborators every vendor client needs: an HTTP
/// transport, a file reader for key material, and a cache store.
///
/// ## Important
///
/// No default transport or file reader is provided. Any unconfigured
/// component uses a no-op implementation that returns errors when
/// called. The cache defaults to an in-process [`MemoryCache`].
///
/// ## Example
///
/// ```
/// use bridge_core::Context;
///
/// let ctx = Context::new();
/// // Configure the components you need:
/// // ctx.with_http_send(my_transport)
/// //    .with_file_read(my_file_reader)
/// //    .with_cache(my_cache);
/// ```
#[derive(Clone)]
pub struct Context {
    fs: Arc<dyn FileRead>,
    http: Arc<dyn HttpSend>,
    cache: Arc<dyn CacheStore>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("fs", &self.fs)
            .field("http", &self.http)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a new Context.
    ///
    /// File reading and HTTP sending start as no-ops, the cache as an
    /// in-process map. Use the `with_*` methods to swap in real
    /// implementations.
    pub fn new() -> Self {
        Self {
            fs: Arc::new(NoopFileRead),
            http: Arc::new(NoopHttpSend),
            cache: Arc::new(MemoryCache::new()),
        }
    }

    /// Replace the file reader implementation.
    pub fn with_file_read(mut self, fs: impl FileRead) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Replace the HTTP client implementation.
    pub fn with_http_send(mut self, http: impl HttpSend) -> Self {
        self.http = Arc::new(http);
        self
    }

    /// Replace the cache store implementation.
    pub fn with_cache(mut self, cache: impl CacheStore) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Read the file content entirely in `Vec<u8>`.
    #[inline]
    pub async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        self.fs.file_read(path).await
    }

    /// Read the file content entirely in `String`.
    pub async fn file_read_as_string(&self, path: &str) -> Result<String> {
        let bytes = self.file_read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Send http request and return the response.
    #[inline]
    pub async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.http.http_send(req).await
    }

    /// Send http request and return the response as string.
    pub async fn http_send_as_string(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<String>> {
        let (parts, body) = self.http.http_send(req).await?.into_parts();
        let body = String::from_utf8_lossy(&body).to_string();
        Ok(http::Response::from_parts(parts, body))
    }

    /// Fetch a cached value.
    #[inline]
    pub async fn cache_get(&self, key: &str) -> Result<Option<String>> {
        self.cache.get(key).await
    }

    /// Store a cached value with a TTL in seconds.
    ///
    /// `0` never expires, a negative TTL is already expired.
    #[inline]
    pub async fn cache_set(&self, key: &str, value: &str, ttl: i64) -> Result<()> {
        self.cache.set(key, value, ttl).await
    }

    /// Remove a cached value.
    #[inline]
    pub async fn cache_del(&self, key: &str) -> Result<()> {
        self.cache.del(key).await
    }
}

/// NoopFileRead is a no-op implementation that always returns an error.
///
/// This is used when no file reader is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFileRead;

#[async_trait::async_trait]
impl FileRead for NoopFileRead {
    async fn file_read(&self, _path: &str) -> Result<Vec<u8>> {
        Err(Error::unexpected(
            "file reading not supported: no file reader configured",
        ))
    }
}

/// NoopHttpSend is a no-op implementation that always returns an error.
///
/// This is used when no HTTP client is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHttpSend;

#[async_trait::async_trait]
impl HttpSend for NoopHttpSend {
    async fn http_send(&self, _req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::unexpected(
            "HTTP sending not supported: no HTTP client configured",
        ))
    }
}
