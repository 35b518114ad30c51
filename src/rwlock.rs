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

//! Implementation of the rotation-range Read-Write Lock.

use crate::config::RotationLockConfig;
use crate::engine;
use crate::host::{Host, ThreadHost};
use crate::ranges::{RotationRange, is_valid_degree};
use crate::registry::{Holders, Waiters};
use crate::request::{LockKind, LockRequest, OwnerId, RequestId};
use crate::result::{RotlockError, RotlockResult};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// A read-write lock over arcs of a rotation circle, gated by the current device rotation.
///
/// Callers lock an arc `degree ± range`. A request is only granted while the current rotation,
/// set through [`RotationLock::set_rotation`], lies inside its arc. Readers on overlapping arcs
/// share, writers are exclusive over their whole arc, and a waiting writer at the current rotation
/// holds back further readers there so it is not starved.
///
/// Blocking calls (`lock_read`, `lock_write`, `read`, `write`) wait until granted. They never time
/// out; use the `try_*` family to fail fast instead.
///
/// # Features
///
/// - Readers on any arcs can hold simultaneously
/// - Writers on non-overlapping arcs can hold simultaneously
/// - Locks held by owners that died are reclaimed on the next rotation update
/// - RAII-style guards release automatically
///
/// # Examples
///
/// ```rust
/// use rotlock::RotationLock;
///
/// let lock = RotationLock::new();
/// lock.set_rotation(90).unwrap();
///
/// // The rotation lies in 90 ± 90, so this is granted immediately
/// lock.lock_write(90, 90).unwrap();
/// assert_eq!(lock.held_len(), 1);
///
/// lock.unlock_write(90, 90).unwrap();
/// assert_eq!(lock.held_len(), 0);
///
/// // Nothing matches any more
/// assert!(lock.unlock_write(90, 90).is_err());
/// ```
pub struct RotationLock<H: Host = ThreadHost> {
    rotation: Mutex<i32>,
    waiters: Mutex<Waiters>,
    holders: Mutex<Holders>,
    granted: Condvar,
    next_id: AtomicU64,
    config: RotationLockConfig,
    host: H,
}

impl RotationLock<ThreadHost> {
    /// Creates a lock at rotation 0 where each OS thread is a distinct owner.
    #[must_use]
    pub fn new() -> Self {
        Self::build(RotationLockConfig::default(), ThreadHost::new())
    }
}

impl Default for RotationLock<ThreadHost> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> RotationLock<H> {
    /// Creates a lock with explicit settings and host.
    ///
    /// Fails with [`RotlockError::InvalidDegree`] if the initial rotation is outside `[0, 360)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rotlock::{RotationLock, RotationLockConfig, ThreadHost};
    ///
    /// let config = RotationLockConfig::default().with_initial_rotation(180);
    /// let lock = RotationLock::with_config(config, ThreadHost::new()).unwrap();
    /// assert_eq!(lock.rotation(), 180);
    /// ```
    pub fn with_config(config: RotationLockConfig, host: H) -> RotlockResult<Self> {
        if !is_valid_degree(config.initial_rotation) {
            return Err(RotlockError::InvalidDegree(config.initial_rotation));
        }
        Ok(Self::build(config, host))
    }

    fn build(config: RotationLockConfig, host: H) -> Self {
        Self {
            rotation: Mutex::new(config.initial_rotation),
            waiters: Mutex::default(),
            holders: Mutex::default(),
            granted: Condvar::new(),
            next_id: AtomicU64::new(1),
            config,
            host,
        }
    }

    /// The host supplying owner identity and liveness.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The current rotation.
    pub fn rotation(&self) -> i32 {
        *self.rotation.lock()
    }

    /// Number of requests waiting to be granted.
    pub fn waiting_len(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Number of requests currently held.
    pub fn held_len(&self) -> usize {
        self.holders.lock().len()
    }

    /// Snapshot of the waiting requests in submission order.
    pub fn waiting(&self) -> Vec<LockRequest> {
        self.waiters.lock().iter().cloned().collect()
    }

    /// Snapshot of the held requests in grant order.
    pub fn held(&self) -> Vec<LockRequest> {
        self.holders.lock().iter().cloned().collect()
    }

    /// Updates the current rotation and grants whatever the new rotation admits.
    ///
    /// Locks held by owners the host reports dead are dropped first. Returns the number of
    /// requests granted by this update.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rotlock::RotationLock;
    ///
    /// let lock = RotationLock::new();
    /// assert_eq!(lock.set_rotation(45).unwrap(), 0);
    /// assert!(lock.set_rotation(360).is_err());
    /// assert_eq!(lock.rotation(), 45);
    /// ```
    pub fn set_rotation(&self, degree: i32) -> RotlockResult<usize> {
        if !is_valid_degree(degree) {
            return Err(RotlockError::InvalidDegree(degree));
        }

        let mut locked = self.lock_all();
        *locked.rotation = degree;

        let mut reaped = locked.holders.reap(|owner| self.host.is_owner_alive(owner));
        if self.config.reap_dead_waiters {
            reaped.extend(locked.waiters.reap(|owner| self.host.is_owner_alive(owner)));
        }
        for request in &reaped {
            tracing::debug!(
                kind = %request.kind,
                arc = %request.arc,
                owner = %request.owner,
                granted = request.granted,
                "reaped request of dead owner"
            );
        }

        let granted = locked.assign(&self.granted);
        if !reaped.is_empty() && granted == 0 {
            // reaped waiters learn of it only by waking
            self.granted.notify_all();
        }
        tracing::debug!(rotation = degree, granted, "rotation updated");
        Ok(granted)
    }

    /// Acquires a read lock on `degree ± range`, blocking until granted.
    ///
    /// Fails on invalid arguments or if the request cannot be allocated. Fails with
    /// [`RotlockError::Reaped`] if the host declares the caller dead before the call returns,
    /// either while the request waits (with dead waiter reaping enabled) or after it was granted
    /// but before the caller woke up to take it. The lock is not held in either case.
    pub fn lock_read(&self, degree: i32, range: i32) -> RotlockResult<()> {
        self.acquire(LockKind::Reader, degree, range).map(|_| ())
    }

    /// Acquires a write lock on `degree ± range`, blocking until granted.
    ///
    /// Same failure modes as [`RotationLock::lock_read`].
    pub fn lock_write(&self, degree: i32, range: i32) -> RotlockResult<()> {
        self.acquire(LockKind::Writer, degree, range).map(|_| ())
    }

    /// Acquires a read lock only if it can be granted right away.
    ///
    /// Fails with [`RotlockError::WouldBlock`] otherwise, leaving no request behind.
    pub fn try_lock_read(&self, degree: i32, range: i32) -> RotlockResult<()> {
        self.try_acquire(LockKind::Reader, degree, range).map(|_| ())
    }

    /// Acquires a write lock only if it can be granted right away.
    ///
    /// Fails with [`RotlockError::WouldBlock`] otherwise, leaving no request behind.
    pub fn try_lock_write(&self, degree: i32, range: i32) -> RotlockResult<()> {
        self.try_acquire(LockKind::Writer, degree, range).map(|_| ())
    }

    /// Releases a read lock on exactly `degree ± range` held by the calling owner.
    pub fn unlock_read(&self, degree: i32, range: i32) -> RotlockResult<()> {
        self.release(LockKind::Reader, degree, range, self.host.current_owner())
    }

    /// Releases a write lock on exactly `degree ± range` held by the calling owner.
    pub fn unlock_write(&self, degree: i32, range: i32) -> RotlockResult<()> {
        self.release(LockKind::Writer, degree, range, self.host.current_owner())
    }

    /// Acquires a read lock and returns a guard that releases it when dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rotlock::RotationLock;
    ///
    /// let lock = RotationLock::new();
    /// {
    ///     let guard = lock.read(0, 30).unwrap();
    ///     assert_eq!(guard.arc().to_string(), "0±30");
    ///     assert_eq!(lock.held_len(), 1);
    /// }
    /// assert_eq!(lock.held_len(), 0);
    /// ```
    pub fn read(&self, degree: i32, range: i32) -> RotlockResult<RotationReadGuard<'_, H>> {
        let request = self.acquire(LockKind::Reader, degree, range)?;
        Ok(RotationReadGuard::new(self, &request))
    }

    /// Acquires a write lock and returns a guard that releases it when dropped.
    pub fn write(&self, degree: i32, range: i32) -> RotlockResult<RotationWriteGuard<'_, H>> {
        let request = self.acquire(LockKind::Writer, degree, range)?;
        Ok(RotationWriteGuard::new(self, &request))
    }

    /// Like [`RotationLock::read`], but fails with [`RotlockError::WouldBlock`] instead of waiting.
    pub fn try_read(&self, degree: i32, range: i32) -> RotlockResult<RotationReadGuard<'_, H>> {
        let request = self.try_acquire(LockKind::Reader, degree, range)?;
        Ok(RotationReadGuard::new(self, &request))
    }

    /// Like [`RotationLock::write`], but fails with [`RotlockError::WouldBlock`] rather than wait.
    pub fn try_write(&self, degree: i32, range: i32) -> RotlockResult<RotationWriteGuard<'_, H>> {
        let request = self.try_acquire(LockKind::Writer, degree, range)?;
        Ok(RotationWriteGuard::new(self, &request))
    }

    /// Takes the position, waiting and held locks, always in that order.
    fn lock_all(&self) -> Locked<'_> {
        let rotation = self.rotation.lock();
        let waiters = self.waiters.lock();
        let holders = self.holders.lock();
        Locked {
            rotation,
            waiters,
            holders,
        }
    }

    fn enqueue(
        &self,
        kind: LockKind,
        degree: i32,
        range: i32,
    ) -> RotlockResult<(Locked<'_>, LockRequest)> {
        let arc = RotationRange::new(degree, range)?;
        let owner = self.host.current_owner();
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let request = LockRequest::new(id, arc, kind, owner);

        let mut locked = self.lock_all();
        locked.waiters.push(request.clone())?;
        tracing::debug!(
            rotation = *locked.rotation,
            kind = %kind,
            arc = %arc,
            owner = %owner,
            "lock requested"
        );
        Ok((locked, request))
    }

    fn acquire(&self, kind: LockKind, degree: i32, range: i32) -> RotlockResult<LockRequest> {
        let (mut locked, request) = self.enqueue(kind, degree, range)?;
        locked.assign(&self.granted);
        let mut holders = locked.into_holders();

        while !holders.contains(request.id) {
            self.granted.wait(&mut holders);
            drop(holders);

            let mut locked = self.lock_all();
            locked.assign(&self.granted);
            if !locked.holders.contains(request.id) && !locked.waiters.contains(request.id) {
                return Err(RotlockError::Reaped {
                    kind,
                    degree,
                    range,
                });
            }
            holders = locked.into_holders();
        }
        Ok(request)
    }

    fn try_acquire(&self, kind: LockKind, degree: i32, range: i32) -> RotlockResult<LockRequest> {
        let (mut locked, request) = self.enqueue(kind, degree, range)?;
        locked.assign(&self.granted);
        if locked.holders.contains(request.id) {
            return Ok(request);
        }

        locked.waiters.remove(request.id);
        // the withdrawn request may have been the writer holding readers back
        locked.assign(&self.granted);
        Err(RotlockError::WouldBlock {
            kind,
            degree,
            range,
            rotation: *locked.rotation,
        })
    }

    fn release(
        &self,
        kind: LockKind,
        degree: i32,
        range: i32,
        owner: OwnerId,
    ) -> RotlockResult<()> {
        RotationRange::new(degree, range)?;

        let mut locked = self.lock_all();
        match locked.holders.remove_matching(kind, degree, range, owner) {
            Some(request) => {
                tracing::debug!(kind = %kind, arc = %request.arc, owner = %owner, "lock released");
                locked.assign(&self.granted);
                Ok(())
            }
            None => {
                tracing::warn!(
                    kind = %kind,
                    degree,
                    range,
                    owner = %owner,
                    "release matched no held lock"
                );
                Err(RotlockError::NotFound {
                    kind,
                    degree,
                    range,
                })
            }
        }
    }
}

impl<H: Host> std::fmt::Debug for RotationLock<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RotationLock {{ .. }}")
    }
}

/// All three protected regions, taken in the global lock order.
struct Locked<'a> {
    rotation: MutexGuard<'a, i32>,
    waiters: MutexGuard<'a, Waiters>,
    holders: MutexGuard<'a, Holders>,
}

impl<'a> Locked<'a> {
    /// Runs the admission policy, waking every blocked acquirer if anything was granted.
    fn assign(&mut self, granted: &Condvar) -> usize {
        let count = engine::assign(*self.rotation, &mut self.waiters, &mut self.holders);
        if count > 0 {
            granted.notify_all();
        }
        count
    }

    /// Drops the position and waiting locks, keeping only the held list.
    fn into_holders(self) -> MutexGuard<'a, Holders> {
        let Locked {
            rotation,
            waiters,
            holders,
        } = self;
        drop(rotation);
        drop(waiters);
        holders
    }
}

/// A RAII guard for a read lock held on a [`RotationLock`].
///
/// Created by [`RotationLock::read`] and [`RotationLock::try_read`]. The lock is released on
/// behalf of the owner that acquired it when the guard is dropped.
///
/// A guard stays on the thread that acquired it. Once that thread exits its locks are reclaimed,
/// so a guard sent elsewhere could outlive the lock it stands for:
///
/// ```compile_fail
/// use rotlock::RotationLock;
///
/// let lock = RotationLock::new();
/// std::thread::scope(|s| {
///     let guard = lock.read(0, 10).unwrap();
///     s.spawn(move || drop(guard));
/// });
/// ```
#[must_use = "the read lock is released as soon as the guard is dropped"]
pub struct RotationReadGuard<'a, H: Host> {
    lock: &'a RotationLock<H>,
    arc: RotationRange,
    owner: OwnerId,
    // the owner is the acquiring thread, so the guard must not leave it
    _not_send: PhantomData<*const ()>,
}

impl<'a, H: Host> RotationReadGuard<'a, H> {
    fn new(lock: &'a RotationLock<H>, request: &LockRequest) -> Self {
        Self {
            lock,
            arc: request.arc,
            owner: request.owner,
            _not_send: PhantomData,
        }
    }

    /// The arc this guard holds.
    pub fn arc(&self) -> RotationRange {
        self.arc
    }

    /// The owner the lock was granted to.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }
}

impl<H: Host> std::fmt::Debug for RotationReadGuard<'_, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RotationReadGuard {{ arc: {}, owner: {} }}", self.arc, self.owner)
    }
}

impl<H: Host> Drop for RotationReadGuard<'_, H> {
    fn drop(&mut self) {
        // a reaped lock has nothing left to release
        let _ = self
            .lock
            .release(LockKind::Reader, self.arc.degree(), self.arc.range(), self.owner);
    }
}

/// A RAII guard for a write lock held on a [`RotationLock`].
///
/// Created by [`RotationLock::write`] and [`RotationLock::try_write`]. While it exists no other
/// reader or writer holds an arc overlapping this one.
///
/// Like [`RotationReadGuard`], it cannot be moved off the acquiring thread:
///
/// ```compile_fail
/// use rotlock::RotationLock;
///
/// let lock = RotationLock::new();
/// let guard = std::thread::scope(|s| s.spawn(|| lock.write(0, 45).unwrap()).join().unwrap());
/// ```
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct RotationWriteGuard<'a, H: Host> {
    lock: &'a RotationLock<H>,
    arc: RotationRange,
    owner: OwnerId,
    // the owner is the acquiring thread, so the guard must not leave it
    _not_send: PhantomData<*const ()>,
}

impl<'a, H: Host> RotationWriteGuard<'a, H> {
    fn new(lock: &'a RotationLock<H>, request: &LockRequest) -> Self {
        Self {
            lock,
            arc: request.arc,
            owner: request.owner,
            _not_send: PhantomData,
        }
    }

    /// The arc this guard holds.
    pub fn arc(&self) -> RotationRange {
        self.arc
    }

    /// The owner the lock was granted to.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }
}

impl<H: Host> std::fmt::Debug for RotationWriteGuard<'_, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RotationWriteGuard {{ arc: {}, owner: {} }}", self.arc, self.owner)
    }
}

impl<H: Host> Drop for RotationWriteGuard<'_, H> {
    fn drop(&mut self) {
        let _ = self
            .lock
            .release(LockKind::Writer, self.arc.degree(), self.arc.range(), self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::{Duration, Instant};

    thread_local! {
        static ACTING_AS: Cell<u64> = const { Cell::new(0) };
    }

    /// Host whose threads pick their identity and whose owners die on command.
    #[derive(Default)]
    struct ScriptedHost {
        dead: Mutex<HashSet<OwnerId>>,
    }

    impl ScriptedHost {
        fn act_as(owner: u64) {
            ACTING_AS.with(|cell| cell.set(owner));
        }

        fn kill(&self, owner: u64) {
            self.dead.lock().insert(OwnerId(owner));
        }
    }

    impl Host for ScriptedHost {
        fn current_owner(&self) -> OwnerId {
            OwnerId(ACTING_AS.with(Cell::get))
        }

        fn is_owner_alive(&self, owner: OwnerId) -> bool {
            !self.dead.lock().contains(&owner)
        }
    }

    fn scripted(config: RotationLockConfig) -> Arc<RotationLock<ScriptedHost>> {
        Arc::new(RotationLock::with_config(config, ScriptedHost::default()).unwrap())
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_write_granted_immediately_and_released() {
        let lock = RotationLock::new();
        assert_eq!(lock.set_rotation(90).unwrap(), 0);
        lock.lock_write(90, 90).unwrap();
        assert_eq!(lock.held_len(), 1);
        assert_eq!(lock.waiting_len(), 0);
        lock.unlock_write(90, 90).unwrap();
        assert_eq!(lock.held_len(), 0);
    }

    #[test]
    fn test_reader_waits_for_writer_release() {
        let lock = Arc::new(RotationLock::new());
        lock.set_rotation(90).unwrap();
        lock.lock_write(90, 90).unwrap();

        let reader = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                lock.lock_read(90, 90).unwrap();
                lock.unlock_read(90, 90).unwrap();
            })
        };
        wait_until(|| lock.waiting_len() == 1);
        assert_eq!(lock.held_len(), 1);

        lock.unlock_write(90, 90).unwrap();
        reader.join().unwrap();
        assert_eq!(lock.set_rotation(90).unwrap(), 0);
        assert_eq!(lock.held_len(), 0);
        assert_eq!(lock.waiting_len(), 0);
    }

    #[test]
    fn test_rotation_update_wakes_waiter() {
        let lock = Arc::new(RotationLock::new());
        let reader = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let guard = lock.read(90, 10).unwrap();
                assert_eq!(guard.arc().degree(), 90);
            })
        };
        wait_until(|| lock.waiting_len() == 1);
        assert_eq!(lock.set_rotation(270).unwrap(), 0);
        assert_eq!(lock.set_rotation(85).unwrap(), 1);
        reader.join().unwrap();
        assert_eq!(lock.held_len(), 0);
    }

    #[test]
    fn test_rotation_update_wakes_every_waiter() {
        let lock = Arc::new(RotationLock::new());
        lock.set_rotation(270).unwrap();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    lock.lock_read(90, 10).unwrap();
                    lock.unlock_read(90, 10).unwrap();
                })
            })
            .collect();
        wait_until(|| lock.waiting_len() == 4);

        assert_eq!(lock.set_rotation(90).unwrap(), 4);
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(lock.held_len(), 0);
        assert_eq!(lock.waiting_len(), 0);
    }

    #[test]
    fn test_live_guard_survives_rotation_update() {
        let lock = RotationLock::new();
        let guard = lock.write(0, 45).unwrap();
        lock.set_rotation(0).unwrap();
        assert_eq!(lock.held_len(), 1);
        assert!(lock.try_write(0, 45).is_err());
        assert!(lock.try_read(0, 10).is_err());
        drop(guard);
        assert!(lock.try_write(0, 45).is_ok());
    }

    #[test]
    fn test_waiting_writer_blocks_new_readers() {
        let lock = Arc::new(RotationLock::new());
        lock.set_rotation(0).unwrap();
        lock.lock_read(0, 30).unwrap();

        // 330 ± 60 covers [270, 360) and [0, 30]
        let writer = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                lock.lock_write(330, 60).unwrap();
                lock.unlock_write(330, 60).unwrap();
            })
        };
        wait_until(|| lock.waiting_len() == 1);
        let queued = lock.waiting();
        assert_eq!(queued[0].kind(), LockKind::Writer);
        assert_eq!(queued[0].arc().to_string(), "330±60");
        assert!(!queued[0].is_granted());
        assert!(lock.held().iter().all(LockRequest::is_granted));

        assert!(matches!(
            lock.try_lock_read(0, 30),
            Err(RotlockError::WouldBlock { rotation: 0, .. })
        ));
        assert_eq!(lock.waiting_len(), 1);
        assert_eq!(lock.held_len(), 1);

        lock.unlock_read(0, 30).unwrap();
        writer.join().unwrap();
        assert_eq!(lock.held_len(), 0);
        assert_eq!(lock.waiting_len(), 0);
    }

    #[test]
    fn test_invalid_arguments_leave_no_trace() {
        let lock = RotationLock::new();
        assert_eq!(lock.lock_read(400, 10), Err(RotlockError::InvalidDegree(400)));
        assert_eq!(lock.lock_write(-1, 10), Err(RotlockError::InvalidDegree(-1)));
        assert_eq!(lock.lock_write(90, 0), Err(RotlockError::InvalidRange(0)));
        assert_eq!(lock.lock_read(90, 180), Err(RotlockError::InvalidRange(180)));
        assert_eq!(lock.set_rotation(360), Err(RotlockError::InvalidDegree(360)));
        assert_eq!(lock.unlock_read(90, 200), Err(RotlockError::InvalidRange(200)));
        assert_eq!(lock.rotation(), 0);
        assert_eq!(lock.waiting_len(), 0);
        assert_eq!(lock.held_len(), 0);
    }

    #[test]
    fn test_release_without_acquire_is_not_found() {
        let lock = RotationLock::new();
        assert_eq!(
            lock.unlock_write(90, 90),
            Err(RotlockError::NotFound {
                kind: LockKind::Writer,
                degree: 90,
                range: 90
            })
        );
    }

    #[test]
    fn test_release_requires_exact_arc_and_kind() {
        let lock = RotationLock::new();
        lock.set_rotation(90).unwrap();
        lock.lock_read(90, 45).unwrap();
        assert!(matches!(lock.unlock_read(90, 44), Err(RotlockError::NotFound { .. })));
        assert!(matches!(lock.unlock_read(91, 45), Err(RotlockError::NotFound { .. })));
        assert!(matches!(lock.unlock_write(90, 45), Err(RotlockError::NotFound { .. })));
        lock.unlock_read(90, 45).unwrap();
        assert!(matches!(lock.unlock_read(90, 45), Err(RotlockError::NotFound { .. })));
    }

    #[test]
    fn test_release_by_other_owner_is_not_found() {
        let lock = scripted(RotationLockConfig::default().with_initial_rotation(90));
        ScriptedHost::act_as(1);
        lock.lock_read(90, 90).unwrap();

        ScriptedHost::act_as(2);
        assert!(matches!(lock.unlock_read(90, 90), Err(RotlockError::NotFound { .. })));

        ScriptedHost::act_as(1);
        lock.unlock_read(90, 90).unwrap();
    }

    #[test]
    fn test_dead_holder_reaped_on_rotation_update() {
        let lock = scripted(RotationLockConfig::default().with_initial_rotation(90));
        ScriptedHost::act_as(1);
        lock.lock_write(90, 90).unwrap();

        let writer = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                ScriptedHost::act_as(2);
                lock.lock_write(90, 90).unwrap();
            })
        };
        wait_until(|| lock.waiting_len() == 1);

        lock.host().kill(1);
        assert_eq!(lock.set_rotation(90).unwrap(), 1);
        writer.join().unwrap();
        assert_eq!(lock.held_len(), 1);
    }

    #[test]
    fn test_exited_thread_reaped_with_thread_host() {
        let lock = Arc::new(RotationLock::new());
        {
            let lock = Arc::clone(&lock);
            thread::spawn(move || lock.lock_write(0, 45).unwrap())
                .join()
                .unwrap();
        }
        assert_eq!(lock.held_len(), 1);
        assert!(lock.try_lock_write(0, 45).is_err());

        lock.set_rotation(0).unwrap();
        assert_eq!(lock.held_len(), 0);
        lock.try_lock_write(0, 45).unwrap();
    }

    #[test]
    fn test_dead_waiter_kept_by_default() {
        let lock = scripted(RotationLockConfig::default());
        let _parked = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                ScriptedHost::act_as(1);
                // 180 ± 10 is never entered below
                let _ = lock.lock_write(180, 10);
            })
        };
        wait_until(|| lock.waiting_len() == 1);

        lock.host().kill(1);
        lock.set_rotation(0).unwrap();
        assert_eq!(lock.waiting_len(), 1);
    }

    #[test]
    fn test_dead_waiter_reaped_when_enabled() {
        let lock = scripted(RotationLockConfig::default().with_reap_dead_waiters(true));
        let waiter = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                ScriptedHost::act_as(1);
                lock.lock_write(180, 10)
            })
        };
        wait_until(|| lock.waiting_len() == 1);

        lock.host().kill(1);
        assert_eq!(lock.set_rotation(0).unwrap(), 0);
        assert_eq!(lock.waiting_len(), 0);
        assert!(matches!(
            waiter.join().unwrap(),
            Err(RotlockError::Reaped { kind: LockKind::Writer, .. })
        ));
    }

    #[test]
    fn test_guards_release_on_drop() {
        let lock = RotationLock::new();
        lock.set_rotation(10).unwrap();
        {
            let write = lock.write(0, 20).unwrap();
            assert_eq!(write.arc().to_string(), "0±20");
            assert!(lock.try_read(10, 5).is_err());
            let elsewhere = lock.try_write(180, 10);
            assert!(elsewhere.is_err());
        }
        assert_eq!(lock.held_len(), 0);
        let first = lock.try_read(10, 5).unwrap();
        let second = lock.try_read(10, 5).unwrap();
        assert_eq!(first.owner(), second.owner());
        assert_eq!(lock.held_len(), 2);
        drop(first);
        drop(second);
        assert_eq!(lock.held_len(), 0);
    }

    #[test]
    fn test_try_write_leaves_no_waiter() {
        let lock = RotationLock::new();
        lock.set_rotation(0).unwrap();
        let err = lock.try_lock_write(180, 30).unwrap_err();
        assert_eq!(
            err,
            RotlockError::WouldBlock {
                kind: LockKind::Writer,
                degree: 180,
                range: 30,
                rotation: 0
            }
        );
        assert_eq!(lock.waiting_len(), 0);
    }

    #[test]
    fn test_invalid_initial_rotation() {
        let config = RotationLockConfig::default().with_initial_rotation(360);
        assert!(matches!(
            RotationLock::with_config(config, ThreadHost::new()),
            Err(RotlockError::InvalidDegree(360))
        ));
    }

    #[test]
    fn test_concurrent_readers_and_writers_exclude() {
        let lock = Arc::new(RotationLock::new());
        let readers = Arc::new(AtomicUsize::new(0));
        let writers = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for i in 0..6 {
            let lock = Arc::clone(&lock);
            let readers = Arc::clone(&readers);
            let writers = Arc::clone(&writers);
            handles.push(thread::spawn(move || {
                for _ in 0..20 {
                    if i % 3 == 0 {
                        let _guard = lock.write(90, 90).unwrap();
                        assert_eq!(writers.fetch_add(1, Ordering::SeqCst), 0);
                        assert_eq!(readers.load(Ordering::SeqCst), 0);
                        thread::yield_now();
                        writers.fetch_sub(1, Ordering::SeqCst);
                    } else {
                        let _guard = lock.read(90, 90).unwrap();
                        readers.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(writers.load(Ordering::SeqCst), 0);
                        thread::yield_now();
                        readers.fetch_sub(1, Ordering::SeqCst);
                    }
                }
            }));
        }

        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let rotator = {
            let lock = Arc::clone(&lock);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut degree = 0;
                while !done.load(Ordering::SeqCst) {
                    lock.set_rotation(degree).unwrap();
                    degree = (degree + 30) % 360;
                    thread::sleep(Duration::from_micros(200));
                }
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        done.store(true, Ordering::SeqCst);
        rotator.join().unwrap();
        assert_eq!(lock.held_len(), 0);
        assert_eq!(lock.waiting_len(), 0);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RotationLock>();
    }
}
