// Copyright 2024 The Kubernetes Authors.
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

//! Base admission handler implementation.

use super::interfaces::Operation;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

/// How long `wait_for_ready` blocks before giving up.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// ReadyFunc reports whether a plugin's dependencies are usable.
pub type ReadyFunc = Arc<dyn Fn() -> bool + Send + Sync>;

/// Handler is a base struct for admission plugins.
/// It answers `handles` from a fixed set of operations and tracks readiness.
pub struct Handler {
    operations: HashSet<Operation>,
    ready_func: RwLock<Option<ReadyFunc>>,
    ready_timeout: Duration,
}

impl Handler {
    /// Create a new Handler that handles the given operations.
    pub fn new(operations: &[Operation]) -> Self {
        Self {
            operations: operations.iter().cloned().collect(),
            ready_func: RwLock::new(None),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    /// Override how long `wait_for_ready` blocks.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn handles(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    /// Install the function consulted by `wait_for_ready`.
    pub fn set_ready_func(&self, ready: ReadyFunc) {
        *self.ready_func.write().expect("ready func lock poisoned") = Some(ready);
    }

    /// Blocks until the ready func reports true or the timeout expires.
    /// A handler without a ready func is always ready.
    pub fn wait_for_ready(&self) -> bool {
        let ready = match self.ready_func.read().expect("ready func lock poisoned").clone() {
            Some(ready) => ready,
            None => return true,
        };

        let deadline = Instant::now() + self.ready_timeout;
        loop {
            if ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(READY_POLL_INTERVAL.min(deadline - now));
        }
    }
}
