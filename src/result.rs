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

//! Error types and results for the Rotlock library.

use crate::request::LockKind;
use thiserror::Error;

/// A specialized Result type for Rotlock operations.
pub type RotlockResult<T> = Result<T, RotlockError>;

/// Errors that can occur during Rotlock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RotlockError {
    /// The degree lies outside `[0, 360)`.
    #[error("degree {0} is outside [0, 360)")]
    InvalidDegree(i32),
    /// The range lies outside `(0, 180)`.
    #[error("range {0} is outside (0, 180)")]
    InvalidRange(i32),
    /// The request could not be queued because memory was exhausted.
    #[error("failed to allocate a lock request")]
    AllocationFailure,
    /// No held lock matches the arc, kind and owner of a release call.
    #[error("no held {kind} lock at {degree}±{range} owned by the caller")]
    NotFound {
        /// Kind named by the release call.
        kind: LockKind,
        /// Arc center named by the release call.
        degree: i32,
        /// Arc half-width named by the release call.
        range: i32,
    },
    /// A blocked request was reclaimed because its owner was declared dead before it returned.
    #[error("{kind} request at {degree}±{range} was reaped before it could be taken")]
    Reaped {
        /// Kind of the reaped request.
        kind: LockKind,
        /// Arc center of the reaped request.
        degree: i32,
        /// Arc half-width of the reaped request.
        range: i32,
    },
    /// A non-blocking acquisition could not be granted immediately.
    #[error("{kind} lock at {degree}±{range} cannot be granted at rotation {rotation}")]
    WouldBlock {
        /// Kind of the rejected request.
        kind: LockKind,
        /// Arc center of the rejected request.
        degree: i32,
        /// Arc half-width of the rejected request.
        range: i32,
        /// Rotation at the time of the attempt.
        rotation: i32,
    },
}

impl RotlockError {
    /// Returns true for the argument validation errors, which never mutate lock state.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            RotlockError::InvalidDegree(_) | RotlockError::InvalidRange(_)
        )
    }
}
