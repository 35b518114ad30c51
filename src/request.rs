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

//! Lock requests and the identities that own them.

use crate::ranges::RotationRange;
use std::fmt;

/// Whether a request wants shared or exclusive access to its arc.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// Shared access. Readers never conflict with one another.
    Reader,
    /// Exclusive access over the whole arc.
    Writer,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Reader => write!(f, "read"),
            LockKind::Writer => write!(f, "write"),
        }
    }
}

/// Opaque identity of the caller that owns a lock request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable handle of a lock request, unique within one lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

/// One reader's or writer's claim on an arc.
///
/// A request is owned by exactly one of the waiting or held collections. It is created
/// ungranted and flips to granted once, when the admission engine moves it to held.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRequest {
    pub(crate) id: RequestId,
    pub(crate) arc: RotationRange,
    pub(crate) kind: LockKind,
    pub(crate) owner: OwnerId,
    pub(crate) granted: bool,
}

impl LockRequest {
    pub(crate) fn new(id: RequestId, arc: RotationRange, kind: LockKind, owner: OwnerId) -> Self {
        Self {
            id,
            arc,
            kind,
            owner,
            granted: false,
        }
    }

    /// Handle of this request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Arc this request locks.
    #[must_use]
    pub fn arc(&self) -> RotationRange {
        self.arc
    }

    /// Reader or writer.
    #[must_use]
    pub fn kind(&self) -> LockKind {
        self.kind
    }

    /// Identity that may release this request.
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Returns true once the request has been moved to the held collection.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.granted
    }

    /// Returns true if this request is a writer.
    #[must_use]
    pub fn is_writer(&self) -> bool {
        self.kind == LockKind::Writer
    }

    /// Returns true if holding this request would conflict with holding `other`.
    ///
    /// Writers conflict with any overlapping arc. Readers conflict only with overlapping writers.
    #[must_use]
    pub fn conflicts_with(&self, other: &LockRequest) -> bool {
        (self.is_writer() || other.is_writer()) && self.arc.overlaps(&other.arc)
    }

    /// Returns true if this request is the one a release call names.
    pub(crate) fn is_released_by(
        &self,
        kind: LockKind,
        degree: i32,
        range: i32,
        owner: OwnerId,
    ) -> bool {
        self.kind == kind && self.owner == owner && self.arc.matches(degree, range)
    }
}
