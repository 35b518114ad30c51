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

//! Admission policy deciding which waiting requests are granted at the current rotation.
//!
//! The policy runs in four steps, in order:
//!
//! 1. If a held writer covers the rotation, nothing is granted.
//! 2. If a held reader covers the rotation while a waiting writer also covers it, nothing is
//!    granted. Readers could coexist, but admitting more of them would starve the writer.
//! 3. If no waiting writer covers the rotation, every waiter that covers it and does not
//!    conflict with the held set is granted, scanning in submission order.
//! 4. Otherwise only the first such waiter is granted, which lets the queued writer win once the
//!    readers in its way drain.

use crate::registry::{Holders, Waiters, promote};
use crate::request::{LockKind, LockRequest};

/// Grants every waiting request the policy admits at `rotation` and returns how many were granted.
///
/// Calling it again without changing the rotation, the waiters or the holders grants nothing.
pub(crate) fn assign(rotation: i32, waiters: &mut Waiters, holders: &mut Holders) -> usize {
    if is_occupied_by(holders, rotation, LockKind::Writer) {
        tracing::trace!(rotation, "rotation occupied by a writer");
        return 0;
    }

    let writer_waiting = is_waited_by_writer(waiters, rotation);
    if writer_waiting && is_occupied_by(holders, rotation, LockKind::Reader) {
        tracing::trace!(rotation, "readers held while a writer waits");
        return 0;
    }

    if writer_waiting {
        let first = waiters
            .iter()
            .position(|candidate| is_admissible(candidate, rotation, holders));
        return match first {
            Some(index) => {
                grant(waiters, index, holders, rotation);
                1
            }
            None => 0,
        };
    }

    let mut granted = 0;
    let mut index = 0;
    while let Some(candidate) = waiters.get(index) {
        if is_admissible(candidate, rotation, holders) {
            grant(waiters, index, holders, rotation);
            granted += 1;
        } else {
            index += 1;
        }
    }
    granted
}

fn grant(waiters: &mut Waiters, index: usize, holders: &mut Holders, rotation: i32) {
    let id = promote(waiters, index, holders);
    if let Some(request) = holders.iter().find(|r| r.id == id) {
        tracing::debug!(
            rotation,
            kind = %request.kind,
            arc = %request.arc,
            owner = %request.owner,
            "lock granted"
        );
    }
}

/// A waiter may be granted when its arc covers the rotation and it conflicts with no holder.
fn is_admissible(candidate: &LockRequest, rotation: i32, holders: &Holders) -> bool {
    candidate.arc.contains(rotation) && !holders.conflicts_with(candidate)
}

fn is_occupied_by(holders: &Holders, rotation: i32, kind: LockKind) -> bool {
    holders
        .iter()
        .any(|r| r.kind == kind && r.arc.contains(rotation))
}

fn is_waited_by_writer(waiters: &Waiters, rotation: i32) -> bool {
    waiters
        .iter()
        .any(|r| r.is_writer() && r.arc.contains(rotation))
}
