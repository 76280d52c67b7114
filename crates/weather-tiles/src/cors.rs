// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Registry of hosts allowed for cross-origin tile and inventory requests.
//!
//! Registration is explicit: the composing application registers the tile
//! server once at startup. Nothing in this crate registers as a side effect
//! of building catalogs or layers.

use std::collections::BTreeSet;
use std::sync::Mutex;

use lazy_static::lazy_static;
use log::info;

lazy_static! {
    static ref CORS_ENABLED_SERVERS: CorsRegistry = CorsRegistry::new();
}

/// The process-wide registry.
#[must_use]
pub fn global() -> &'static CorsRegistry {
    &CORS_ENABLED_SERVERS
}

/// Set of CORS-enabled hosts.
#[derive(Debug, Default)]
pub struct CorsRegistry {
    hosts: Mutex<BTreeSet<String>>,
}

impl CorsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host. Returns `false` if it was already registered.
    pub fn register(&self, host: &str) -> bool {
        let Ok(mut hosts) = self.hosts.lock() else {
            return false;
        };
        if hosts.contains(host) {
            return false;
        }
        info!("Registered CORS-enabled server {}", host);
        hosts.insert(host.to_string())
    }

    #[must_use]
    pub fn contains(&self, host: &str) -> bool {
        self.hosts
            .lock()
            .map(|hosts| hosts.contains(host))
            .unwrap_or(false)
    }

    /// Registered hosts in sorted order.
    #[must_use]
    pub fn hosts(&self) -> Vec<String> {
        self.hosts
            .lock()
            .map(|hosts| hosts.iter().cloned().collect())
            .unwrap_or_default()
    }
}
