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

//! Runs a rotating device, a selector and several trial readers against one rotation lock.
//!
//! The selector takes a write lock on `90 ± 90`, writes an incrementing integer to a file and
//! releases. Each trial takes a read lock on the same arc, reads the integer and prints its prime
//! factorization. Both only make progress while the swept rotation lies in `[0, 180]`.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use rotlock::RotationLock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const DEGREE: i32 = 90;
const RANGE: i32 = 90;

#[derive(Debug, Parser)]
#[command(
    name = "rotation-demo",
    version,
    about = "Selector and trial readers sharing a rotation lock"
)]
struct Args {
    /// Number of trial reader threads
    #[arg(long, default_value_t = 2)]
    readers: usize,

    /// First integer the selector writes
    #[arg(long, default_value_t = 2020)]
    start: u64,

    /// File the selector writes and the trials read
    #[arg(long)]
    file: Option<PathBuf>,

    /// Degrees the rotation advances per tick
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(i32).range(1..360))]
    step: i32,

    /// Milliseconds between rotation ticks
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Seconds to run before stopping
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let path = args
        .file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("rotlock-integer"));

    let lock = Arc::new(RotationLock::new());
    let stop_workers = Arc::new(AtomicBool::new(false));
    let stop_rotator = Arc::new(AtomicBool::new(false));

    let rotator = spawn_rotator(
        Arc::clone(&lock),
        Arc::clone(&stop_rotator),
        args.step,
        Duration::from_millis(args.interval_ms),
    );

    let mut workers = vec![spawn_selector(
        Arc::clone(&lock),
        Arc::clone(&stop_workers),
        path.clone(),
        args.start,
    )];
    for id in 1..=args.readers {
        workers.push(spawn_trial(
            Arc::clone(&lock),
            Arc::clone(&stop_workers),
            path.clone(),
            id,
        ));
    }

    thread::sleep(Duration::from_secs(args.duration_secs));
    tracing::info!("stopping workers");
    stop_workers.store(true, Ordering::SeqCst);

    // workers blocked on the lock need the rotation to keep moving to finish
    let mut outcome = Ok(());
    for worker in workers {
        let result = join(worker);
        if outcome.is_ok() {
            outcome = result;
        }
    }

    stop_rotator.store(true, Ordering::SeqCst);
    join(rotator)?;
    outcome
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn join(handle: JoinHandle<Result<()>>) -> Result<()> {
    handle
        .join()
        .map_err(|_| anyhow!("worker thread panicked"))?
}

fn spawn_rotator(
    lock: Arc<RotationLock>,
    stop: Arc<AtomicBool>,
    step: i32,
    interval: Duration,
) -> JoinHandle<Result<()>> {
    thread::spawn(move || {
        let mut degree = 0;
        while !stop.load(Ordering::SeqCst) {
            let granted = lock.set_rotation(degree)?;
            tracing::debug!(degree, granted, "rotation set");
            degree = (degree + step) % rotlock::FULL_CIRCLE;
            thread::sleep(interval);
        }
        Ok(())
    })
}

fn spawn_selector(
    lock: Arc<RotationLock>,
    stop: Arc<AtomicBool>,
    path: PathBuf,
    start: u64,
) -> JoinHandle<Result<()>> {
    thread::spawn(move || {
        let mut counter = start;
        while !stop.load(Ordering::SeqCst) {
            let _guard = lock.write(DEGREE, RANGE)?;
            fs::write(&path, counter.to_string())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("selector: {counter}");
            counter = next_integer(counter)?;
        }
        Ok(())
    })
}

fn spawn_trial(
    lock: Arc<RotationLock>,
    stop: Arc<AtomicBool>,
    path: PathBuf,
    id: usize,
) -> JoinHandle<Result<()>> {
    thread::spawn(move || {
        while !stop.load(Ordering::SeqCst) {
            let guard = lock.read(DEGREE, RANGE)?;
            let value = read_integer(&path)?;
            drop(guard);

            match value {
                Some(n) => println!("trial-{id}: {}", describe(n)),
                None => thread::yield_now(),
            }
        }
        Ok(())
    })
}

fn next_integer(n: u64) -> Result<u64> {
    n.checked_add(1)
        .ok_or_else(|| anyhow!("selector ran out of integers after {n}"))
}

/// Reads the integer the selector wrote, or `None` if there is nothing usable yet.
fn read_integer(path: &Path) -> Result<Option<u64>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text.trim().parse().ok()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn describe(n: u64) -> String {
    let factors = prime_factors(n);
    match factors.as_slice() {
        [] => n.to_string(),
        [_] => format!("{n} = Prime Number"),
        _ => {
            let product = factors
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(" * ");
            format!("{n} = {product}")
        }
    }
}

/// Prime factors of `n` in ascending order, with multiplicity. Empty for 0 and 1.
fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    if n < 2 {
        return factors;
    }
    let mut divisor = 2;
    while divisor <= n / divisor {
        while n % divisor == 0 {
            factors.push(divisor);
            n /= divisor;
        }
        divisor += if divisor == 2 { 1 } else { 2 };
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}
