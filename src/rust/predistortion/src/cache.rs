// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use crate::Result;
use crate::filters::ChannelFilter;

/// Append-only cache of parsed channel filters, keyed by a source identifier
/// (typically the coefficient table's path or content digest).
///
/// Entries are never invalidated: a source identifier whose underlying
/// contents change after first load keeps serving the first parse. Callers
/// that need fresh coefficients must use a new identifier. The cache is an
/// explicit object handed to whoever assembles distortion maps; there is no
/// process-global instance.
#[derive(Debug, Default)]
pub struct KernelCache {
    entries: HashMap<String, Arc<ChannelFilter>>,
}

impl KernelCache {
    pub fn new() -> Self {
        KernelCache {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, source_id: &str) -> Option<Arc<ChannelFilter>> {
        self.entries.get(source_id).map(Arc::clone)
    }

    /// Return the cached filter for `source_id`, loading it with `load` on
    /// the first request. A failed load caches nothing.
    pub fn get_or_load<F>(&mut self, source_id: &str, load: F) -> Result<Arc<ChannelFilter>>
    where
        F: FnOnce() -> Result<ChannelFilter>,
    {
        if let Some(filter) = self.entries.get(source_id) {
            return Ok(Arc::clone(filter));
        }
        let filter = Arc::new(load()?);
        self.entries
            .insert(source_id.to_string(), Arc::clone(&filter));
        Ok(filter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
