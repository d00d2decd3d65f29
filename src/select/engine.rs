//! The select algorithm.
//!
//! 1. Poll every case in random order, locking one channel at a time.
//! 2. Run the default if nothing was ready.
//! 3. Lock every distinct channel in global lock order, poll again, then register every case.
//! 4. Park until a partner claims one registration.
//! 5. Retract the losing registrations in lock order and complete the winner.
//!
//! Locking in increasing [Case::lock_id] order everywhere is what keeps
//! concurrent selects over shared channels from deadlocking.

use super::case::{Case, Locked};
use crate::runtime::tls;

/// Case indices are reported through the goroutine's claim slot.
pub const MAX_CASES: usize = u16::MAX as usize;

pub(crate) type Cases<'a, R> = Vec<Box<dyn Case<R> + 'a>>;
pub(crate) type DefaultCase<'a, R> = Box<dyn FnOnce() -> R + 'a>;

pub(crate) fn select<'a, R>(mut cases: Cases<'a, R>, default: Option<DefaultCase<'a, R>>) -> R {
    if cases.len() > MAX_CASES {
        panic!("select with {} cases, at most {MAX_CASES} are supported", cases.len());
    }

    if cases.is_empty() {
        match default {
            Some(default) => return default(),
            None => park_forever(),
        }
    }

    // fast path
    let poll_order = tls::with_rand(|rand| rand.permutation(cases.len()));
    for &index in &poll_order {
        let mut locked = cases[index].lock();
        if cases[index].poll(&mut locked) {
            drop(locked);
            return cases.swap_remove(index).complete();
        }
    }

    if let Some(default) = default {
        return default();
    }

    // slow path
    let mut lock_order: Vec<usize> = (0..cases.len()).collect();
    lock_order.sort_by_key(|&index| cases[index].lock_id());

    let goroutine = tls::current();
    {
        let (mut locks, lock_of) = lock_all(&cases, &lock_order);

        for &index in &poll_order {
            if cases[index].poll(&mut locks[lock_of[index]]) {
                drop(locks);
                return cases.swap_remove(index).complete();
            }
        }

        goroutine.reset_claim();
        for &index in &poll_order {
            cases[index].register(&mut locks[lock_of[index]], &goroutine, index);
        }
        tracing::trace!(goroutine = goroutine.id(), cases = cases.len(), "select registered");
    }

    // woken by whichever partner claimed a case
    goroutine.suspend();

    for &index in &lock_order {
        let case = &mut cases[index];
        if !case.is_registered() {
            continue;
        }

        let mut locked = case.lock();
        case.unregister(&mut locked);
    }

    let winner = match goroutine.claimed() {
        Some(winner) => winner,
        None => unreachable!("select resumed without a claimed case"),
    };
    tracing::trace!(goroutine = goroutine.id(), winner, "select completed");

    cases.swap_remove(winner).complete()
}

/// Locks each distinct channel once, in `lock_order`.
/// Returns the locks and, per case, the position of its channel's lock.
fn lock_all<R>(cases: &Cases<'_, R>, lock_order: &[usize]) -> (Vec<Locked>, Vec<usize>) {
    let mut locks: Vec<Locked> = Vec::with_capacity(cases.len());
    let mut lock_of = vec![0; cases.len()];
    let mut previous = None;

    for &index in lock_order {
        let lock_id = cases[index].lock_id();
        if previous != Some(lock_id) {
            locks.push(cases[index].lock());
            previous = Some(lock_id);
        }
        lock_of[index] = locks.len() - 1;
    }

    (locks, lock_of)
}

/// Nothing can ever claim this park.
fn park_forever() -> ! {
    let goroutine = tls::current();
    tracing::debug!(goroutine = goroutine.id(), "select without cases parks forever");
    goroutine.reset_claim();

    loop {
        goroutine.suspend();
    }
}
