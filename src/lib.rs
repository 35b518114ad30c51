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

//! # Rotlock
//!
//! A Rust library providing a read-write lock over arcs of a rotation circle. Instead of locking
//! a whole resource, callers lock the part of the circle that matters to them, and a lock is only
//! granted while the current device rotation lies inside the requested arc.
//!
//! ## Key Features
//!
//! - **Arc-based Access Control**: Lock `degree ± range` on a 360 degree circle, wrapping at 0
//! - **Rotation Gating**: Requests are granted only once the shared rotation enters their arc
//! - **Shared Readers, Exclusive Writers**: Readers coexist on any arcs, writers exclude every
//!   overlapping arc
//! - **Writer Starvation Guard**: A writer queued at the current rotation stops further readers
//!   from being admitted there
//! - **Dead Owner Reclamation**: Locks held by owners that died are reclaimed on the next rotation
//!   update
//! - **RAII Guards**: Automatic lock release through guard pattern
//!
//! ## Usage Examples
//!
//! ### Blocking Calls
//!
//! ```rust
//! use rotlock::RotationLock;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let lock = Arc::new(RotationLock::new());
//!
//! // A reader for 90 ± 10 blocks until the rotation enters [80, 100]
//! let reader = {
//!     let lock = Arc::clone(&lock);
//!     thread::spawn(move || {
//!         lock.lock_read(90, 10).unwrap();
//!         lock.unlock_read(90, 10).unwrap();
//!     })
//! };
//!
//! while lock.waiting_len() == 0 {
//!     thread::yield_now();
//! }
//! assert_eq!(lock.set_rotation(95).unwrap(), 1);
//! reader.join().unwrap();
//! ```
//!
//! ### Guards
//!
//! ```rust
//! use rotlock::RotationLock;
//!
//! let lock = RotationLock::new();
//! lock.set_rotation(0).unwrap();
//!
//! // 330 ± 60 covers [270, 360) and [0, 30]
//! let guard = lock.try_write(330, 60).unwrap();
//!
//! // The rotation is inside an exclusive zone, so nothing else is admitted here
//! assert!(lock.try_read(0, 10).is_err());
//! drop(guard);
//!
//! let reader = lock.try_read(0, 10).unwrap();
//! let another_reader = lock.try_read(0, 30).unwrap();
//! ```
//!
//! ## Lock Semantics
//!
//! At any time the held locks satisfy:
//!
//! - No two writers hold overlapping arcs
//! - No reader holds an arc overlapping a held writer's arc
//! - Readers may hold overlapping arcs
//!
//! Arcs that only touch at their boundary, such as `45 ± 15` and `75 ± 15`, count as overlapping.
//!
//! ## Owners
//!
//! Every request belongs to the owner reported by the lock's [`Host`] when it is made. Only that
//! owner can release it. [`ThreadHost`], the default, treats each OS thread as an owner and
//! reports it dead once the thread has exited. Implement [`Host`] to plug in other notions of
//! identity, such as processes.
//!
//! ## Error Handling
//!
//! Operations return `RotlockResult<T>` which can contain the following errors:
//!
//! - `RotlockError::InvalidDegree` / `RotlockError::InvalidRange`: Arguments outside `[0, 360)`
//!   and `(0, 180)`; nothing is changed
//! - `RotlockError::AllocationFailure`: The request could not be queued
//! - `RotlockError::NotFound`: A release matched no lock held by the caller
//! - `RotlockError::WouldBlock`: A `try_*` call could not be granted immediately
//! - `RotlockError::Reaped`: A blocked request was reclaimed because its owner died first
//!
//! ## Logging
//!
//! Grants, releases and reclamations are reported through [`tracing`]. The library never installs
//! a subscriber.
//!
//! ## License
//!
//! Licensed under the Apache License, Version 2.0.

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod config;
mod engine;
mod host;
mod ranges;
mod registry;
mod request;
mod result;
mod rwlock;

pub use self::config::RotationLockConfig;
pub use self::host::{Host, ThreadHost};
pub use self::ranges::{
    FULL_CIRCLE, HALF_CIRCLE, RotationRange, arcs_equal, arcs_overlap, circular_distance,
    is_valid_degree, is_valid_range, point_in_arc,
};
pub use self::request::{LockKind, LockRequest, OwnerId, RequestId};
pub use self::result::{RotlockError, RotlockResult};
pub use self::rwlock::{RotationLock, RotationReadGuard, RotationWriteGuard};
