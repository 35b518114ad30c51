//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Caller identity and liveness supplied by the environment hosting a lock.

use crate::request::OwnerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Environment services a [`RotationLock`](crate::RotationLock) depends on.
///
/// The lock asks the host who is calling whenever a request is created or released by the calling
/// context, and asks whether an owner is still alive before each rotation update so that locks
/// held by dead owners are reclaimed.
pub trait Host: Send + Sync {
    /// Identity of the calling context.
    fn current_owner(&self) -> OwnerId;

    /// Returns false once `owner` can no longer release its locks.
    fn is_owner_alive(&self, owner: OwnerId) -> bool;
}

impl<H: Host + ?Sized> Host for Arc<H> {
    fn current_owner(&self) -> OwnerId {
        (**self).current_owner()
    }

    fn is_owner_alive(&self, owner: OwnerId) -> bool {
        (**self).is_owner_alive(owner)
    }
}

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

fn next_owner() -> OwnerId {
    OwnerId(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
}

struct Heartbeat {
    owner: OwnerId,
    pulse: Arc<()>,
}

thread_local! {
    static HEARTBEAT: Heartbeat = Heartbeat {
        owner: next_owner(),
        pulse: Arc::new(()),
    };
}

/// A [`Host`] where every OS thread is an owner.
///
/// Each thread gets an identity on first use. The identity stays alive until the thread exits and
/// its thread-local storage is torn down.
///
/// # Examples
///
/// ```rust
/// use rotlock::{Host, ThreadHost};
///
/// let host = ThreadHost::new();
/// let me = host.current_owner();
/// assert_eq!(me, host.current_owner());
/// assert!(host.is_owner_alive(me));
///
/// let other = std::thread::spawn({
///     let host = ThreadHost::new();
///     move || host.current_owner()
/// })
/// .join()
/// .unwrap();
/// assert_ne!(me, other);
/// ```
#[derive(Debug, Default)]
pub struct ThreadHost {
    pulses: Mutex<HashMap<OwnerId, Weak<()>>>,
}

impl ThreadHost {
    /// Creates a host with no known threads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Host for ThreadHost {
    fn current_owner(&self) -> OwnerId {
        // during thread teardown the caller gets a fresh identity that is never alive
        let Ok((owner, pulse)) =
            HEARTBEAT.try_with(|beat| (beat.owner, Arc::downgrade(&beat.pulse)))
        else {
            return next_owner();
        };
        let mut pulses = self.pulses.lock();
        if !pulses.contains_key(&owner) {
            // forget threads that have exited since the last newcomer
            pulses.retain(|_, pulse| pulse.strong_count() > 0);
            pulses.insert(owner, pulse);
        }
        owner
    }

    fn is_owner_alive(&self, owner: OwnerId) -> bool {
        let mut pulses = self.pulses.lock();
        match pulses.get(&owner) {
            Some(pulse) if pulse.strong_count() > 0 => true,
            Some(_) => {
                pulses.remove(&owner);
                false
            }
            None => false,
        }
    }
}
