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

//! Construction-time settings of a [`RotationLock`](crate::RotationLock).

/// Settings applied when a [`RotationLock`](crate::RotationLock) is created.
///
/// # Examples
///
/// ```rust
/// use rotlock::RotationLockConfig;
///
/// let config = RotationLockConfig::default()
///     .with_initial_rotation(90)
///     .with_reap_dead_waiters(true);
/// assert_eq!(config.initial_rotation, 90);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RotationLockConfig {
    /// Rotation the lock starts at. Must lie in `[0, 360)`.
    pub initial_rotation: i32,
    /// Also drop waiting requests of dead owners on each rotation update.
    ///
    /// Off by default: a dead owner's waiting request keeps its place in the queue and, if it is a
    /// writer, keeps throttling readers at its arc.
    pub reap_dead_waiters: bool,
}

impl RotationLockConfig {
    /// Sets the starting rotation.
    #[must_use]
    pub fn with_initial_rotation(mut self, degree: i32) -> Self {
        self.initial_rotation = degree;
        self
    }

    /// Enables or disables reaping of waiting requests whose owner died.
    #[must_use]
    pub fn with_reap_dead_waiters(mut self, enabled: bool) -> Self {
        self.reap_dead_waiters = enabled;
        self
    }
}
