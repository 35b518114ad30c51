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

//! The waiting and held request collections.
//!
//! Each request value lives in exactly one of the two collections. Granting moves the value
//! from [`Waiters`] to [`Holders`], so a request can never be in both or in neither.

use crate::request::{LockKind, LockRequest, OwnerId, RequestId};
use crate::result::{RotlockError, RotlockResult};

/// Requests not yet granted, in submission order.
#[derive(Debug, Default)]
pub(crate) struct Waiters {
    queue: Vec<LockRequest>,
}

impl Waiters {
    /// Appends a request at the tail.
    pub(crate) fn push(&mut self, request: LockRequest) -> RotlockResult<()> {
        debug_assert!(!request.granted);
        self.queue
            .try_reserve(1)
            .map_err(|_| RotlockError::AllocationFailure)?;
        self.queue.push(request);
        Ok(())
    }

    /// Removes the request with the given handle, keeping the order of the rest.
    pub(crate) fn remove(&mut self, id: RequestId) -> Option<LockRequest> {
        let index = self.queue.iter().position(|r| r.id == id)?;
        Some(self.queue.remove(index))
    }

    /// Removes every request whose owner fails `is_alive`, returning them.
    pub(crate) fn reap<F>(&mut self, mut is_alive: F) -> Vec<LockRequest>
    where
        F: FnMut(OwnerId) -> bool,
    {
        let mut dead = Vec::new();
        let mut index = 0;
        while index < self.queue.len() {
            if is_alive(self.queue[index].owner) {
                index += 1;
            } else {
                dead.push(self.queue.remove(index));
            }
        }
        dead
    }

    pub(crate) fn contains(&self, id: RequestId) -> bool {
        self.queue.iter().any(|r| r.id == id)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&LockRequest> {
        self.queue.get(index)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &LockRequest> {
        self.queue.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Granted requests, in grant order.
#[derive(Debug, Default)]
pub(crate) struct Holders {
    held: Vec<LockRequest>,
}

impl Holders {
    /// Returns true if the request with the given handle has been granted.
    pub(crate) fn contains(&self, id: RequestId) -> bool {
        self.held.iter().any(|r| r.id == id)
    }

    /// Removes the first held request matching the arc, kind and owner of a release call.
    pub(crate) fn remove_matching(
        &mut self,
        kind: LockKind,
        degree: i32,
        range: i32,
        owner: OwnerId,
    ) -> Option<LockRequest> {
        let index = self
            .held
            .iter()
            .position(|r| r.is_released_by(kind, degree, range, owner))?;
        Some(self.held.remove(index))
    }

    /// Removes every request whose owner fails `is_alive`, returning them.
    pub(crate) fn reap<F>(&mut self, mut is_alive: F) -> Vec<LockRequest>
    where
        F: FnMut(OwnerId) -> bool,
    {
        let mut dead = Vec::new();
        let mut index = 0;
        while index < self.held.len() {
            if is_alive(self.held[index].owner) {
                index += 1;
            } else {
                dead.push(self.held.remove(index));
            }
        }
        dead
    }

    /// Returns true if any held request would conflict with `candidate`.
    pub(crate) fn conflicts_with(&self, candidate: &LockRequest) -> bool {
        self.held.iter().any(|held| candidate.conflicts_with(held))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &LockRequest> {
        self.held.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.held.len()
    }
}

/// Moves the waiter at `index` to the tail of `holders`, marking it granted.
pub(crate) fn promote(waiters: &mut Waiters, index: usize, holders: &mut Holders) -> RequestId {
    let mut request = waiters.queue.remove(index);
    request.granted = true;
    let id = request.id;
    holders.held.push(request);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranges::RotationRange;

    fn request(id: u64, degree: i32, kind: LockKind, owner: u64) -> LockRequest {
        LockRequest::new(
            RequestId(id),
            RotationRange::new(degree, 10).unwrap(),
            kind,
            OwnerId(owner),
        )
    }

    #[test]
    fn test_waiters_keep_submission_order() {
        let mut waiters = Waiters::default();
        for id in 1..=4 {
            waiters
                .push(request(id, 90, LockKind::Reader, 1))
                .unwrap();
        }
        assert_eq!(waiters.remove(RequestId(2)).unwrap().id, RequestId(2));
        assert!(waiters.remove(RequestId(2)).is_none());
        let ids: Vec<_> = waiters.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn test_promote_moves_exactly_once() {
        let mut waiters = Waiters::default();
        let mut holders = Holders::default();
        waiters.push(request(1, 90, LockKind::Writer, 1)).unwrap();
        waiters.push(request(2, 180, LockKind::Reader, 1)).unwrap();

        let id = promote(&mut waiters, 0, &mut holders);
        assert_eq!(id, RequestId(1));
        assert!(holders.contains(RequestId(1)));
        assert!(!holders.contains(RequestId(2)));
        assert_eq!(waiters.len(), 1);
        assert_eq!(holders.len(), 1);
        assert!(holders.iter().all(|r| r.granted));
        assert!(waiters.iter().all(|r| !r.granted));
    }

    #[test]
    fn test_remove_matching_checks_owner_and_kind() {
        let mut waiters = Waiters::default();
        let mut holders = Holders::default();
        waiters.push(request(1, 90, LockKind::Reader, 7)).unwrap();
        promote(&mut waiters, 0, &mut holders);

        assert!(
            holders
                .remove_matching(LockKind::Reader, 90, 10, OwnerId(8))
                .is_none()
        );
        assert!(
            holders
                .remove_matching(LockKind::Writer, 90, 10, OwnerId(7))
                .is_none()
        );
        assert!(
            holders
                .remove_matching(LockKind::Reader, 90, 10, OwnerId(7))
                .is_some()
        );
        assert_eq!(holders.len(), 0);
    }

    #[test]
    fn test_reap_removes_dead_owners_only() {
        let mut waiters = Waiters::default();
        let mut holders = Holders::default();
        for id in 1..=3 {
            waiters.push(request(id, 90, LockKind::Reader, id)).unwrap();
            promote(&mut waiters, 0, &mut holders);
        }
        waiters.push(request(4, 90, LockKind::Writer, 2)).unwrap();

        let dead = holders.reap(|owner| owner != OwnerId(2));
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].owner, OwnerId(2));
        assert_eq!(holders.len(), 2);

        let dead = waiters.reap(|owner| owner != OwnerId(2));
        assert_eq!(dead.len(), 1);
        assert_eq!(waiters.len(), 0);
    }
}
