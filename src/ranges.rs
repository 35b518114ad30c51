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

//! Arithmetic over arcs of the `[0, 360)` rotation circle.

use crate::result::{RotlockError, RotlockResult};
use std::fmt;

/// Number of degrees in a full rotation. Valid degrees are `0..FULL_CIRCLE`.
pub const FULL_CIRCLE: i32 = 360;

/// Half a rotation. Valid ranges are strictly between 0 and `HALF_CIRCLE`.
pub const HALF_CIRCLE: i32 = 180;

/// Returns true if `degree` lies in `[0, 360)`.
#[must_use]
pub fn is_valid_degree(degree: i32) -> bool {
    (0..FULL_CIRCLE).contains(&degree)
}

/// Returns true if `range` lies in `(0, 180)`.
#[must_use]
pub fn is_valid_range(range: i32) -> bool {
    range > 0 && range < HALF_CIRCLE
}

/// Returns true if both arcs have the same center and the same half-width.
#[must_use]
pub fn arcs_equal(degree1: i32, range1: i32, degree2: i32, range2: i32) -> bool {
    degree1 == degree2 && range1 == range2
}

/// The minimal angular separation between two degrees, going either way around the circle.
///
/// Any `i32` is accepted; degrees outside `[0, 360)` are taken modulo 360.
///
/// # Examples
///
/// ```rust
/// use rotlock::circular_distance;
///
/// assert_eq!(circular_distance(10, 50), 40);
/// assert_eq!(circular_distance(350, 10), 20);
/// assert_eq!(circular_distance(-10, 370), 20);
/// ```
#[must_use]
pub fn circular_distance(a: i32, b: i32) -> i32 {
    let full = FULL_CIRCLE.unsigned_abs();
    let diff = a.abs_diff(b) % full;
    // at most half a circle
    i32::try_from(diff.min(full - diff)).unwrap_or(HALF_CIRCLE)
}

/// Returns true if `point` lies inside the arc `center ± range`, bounds included.
#[must_use]
pub fn point_in_arc(point: i32, center: i32, range: i32) -> bool {
    circular_distance(point, center) <= range
}

/// Returns true if the arcs `center1 ± range1` and `center2 ± range2` share at least one degree.
///
/// Arcs that merely touch, such as `[30, 60]` and `[60, 90]`, overlap.
#[must_use]
pub fn arcs_overlap(center1: i32, range1: i32, center2: i32, range2: i32) -> bool {
    circular_distance(center1, center2) <= range1.saturating_add(range2)
}

/// A validated arc of the rotation circle: every degree within `range` of `degree`.
///
/// The arc may wrap through 0. `330 ± 60` covers `[270, 360)` and `[0, 30]`.
///
/// # Examples
///
/// ```rust
/// use rotlock::RotationRange;
///
/// let arc = RotationRange::new(330, 60).unwrap();
/// assert!(arc.contains(0));
/// assert!(arc.contains(270));
/// assert!(!arc.contains(90));
///
/// assert!(RotationRange::new(400, 10).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RotationRange {
    degree: i32,
    range: i32,
}

impl RotationRange {
    /// Creates an arc, rejecting a degree outside `[0, 360)` or a range outside `(0, 180)`.
    pub fn new(degree: i32, range: i32) -> RotlockResult<Self> {
        if !is_valid_degree(degree) {
            return Err(RotlockError::InvalidDegree(degree));
        }
        if !is_valid_range(range) {
            return Err(RotlockError::InvalidRange(range));
        }
        Ok(Self { degree, range })
    }

    /// Center of the arc.
    #[must_use]
    pub fn degree(&self) -> i32 {
        self.degree
    }

    /// Half-width of the arc.
    #[must_use]
    pub fn range(&self) -> i32 {
        self.range
    }

    /// Returns true if the rotation `position` lies inside this arc.
    #[must_use]
    pub fn contains(&self, position: i32) -> bool {
        point_in_arc(position, self.degree, self.range)
    }

    /// Returns true if this arc and `other` share at least one degree.
    #[must_use]
    pub fn overlaps(&self, other: &RotationRange) -> bool {
        arcs_overlap(self.degree, self.range, other.degree, other.range)
    }

    /// Returns true if this arc has exactly the given center and half-width.
    #[must_use]
    pub fn matches(&self, degree: i32, range: i32) -> bool {
        arcs_equal(self.degree, self.range, degree, range)
    }
}

impl fmt::Display for RotationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}±{}", self.degree, self.range)
    }
}
