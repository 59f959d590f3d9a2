// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PDU buffer pool: a thread-local free list per worker, refilled from
//! a short-lived-locked global pool so workers never contend on the
//! common case.

use std::{cell::RefCell, sync::Mutex};

use once_cell::sync::Lazy;

use crate::pdu::buffer::PduBuffer;

/// How many buffers a worker keeps locally before it starts returning
/// them to the global pool on release.
const LOCAL_CAP: usize = 64;
/// How many buffers one refill from the global pool pulls at once.
const REFILL_BATCH: usize = 16;

struct GlobalPool {
    capacity: usize,
    buffers: Vec<PduBuffer>,
}

static GLOBAL_POOL: Lazy<Mutex<GlobalPool>> =
    Lazy::new(|| Mutex::new(GlobalPool { capacity: 2_200, buffers: Vec::new() }));

thread_local! {
    static LOCAL_FREE: RefCell<Vec<PduBuffer>> = const { RefCell::new(Vec::new()) };
}

/// Locks the global pool, recovering the inner state if a prior holder
/// panicked while holding the lock rather than poisoning every caller
/// after it.
fn lock_global() -> std::sync::MutexGuard<'static, GlobalPool> {
    GLOBAL_POOL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sets the capacity new buffers are allocated with. Intended to be
/// called once at start-up from the engine configuration; subsequent
/// calls only affect buffers allocated afterwards.
pub fn set_buffer_capacity(capacity: usize) {
    lock_global().capacity = capacity;
}

/// Returns a cleared buffer, preferring the calling worker's local free
/// list, then the global pool, then a fresh allocation.
pub fn acquire() -> PduBuffer {
    if let Some(buf) = LOCAL_FREE.with(|local| local.borrow_mut().pop()) {
        return buf;
    }

    let mut global = lock_global();
    if global.buffers.is_empty() {
        let capacity = global.capacity;
        drop(global);
        let mut buf = PduBuffer::with_capacity(capacity);
        buf.reset();
        return buf;
    }

    let take = REFILL_BATCH.min(global.buffers.len());
    let capacity = global.capacity;
    let drained: Vec<PduBuffer> = global.buffers.split_off(global.buffers.len() - take);
    drop(global);

    let mut drained = drained;
    let mut buf = drained.pop().unwrap_or_else(|| {
        let mut b = PduBuffer::with_capacity(capacity);
        b.reset();
        b
    });
    LOCAL_FREE.with(|local| local.borrow_mut().extend(drained));
    buf.reset();
    buf
}

/// Returns a buffer to the pool, resetting it first so the next
/// `acquire()` sees a clean slate.
pub fn release(mut buf: PduBuffer) {
    buf.reset();
    let overflow = LOCAL_FREE.with(|local| {
        let mut local = local.borrow_mut();
        local.push(buf);
        if local.len() > LOCAL_CAP {
            local.split_off(local.len() - REFILL_BATCH.min(local.len()))
        } else {
            Vec::new()
        }
    });
    if !overflow.is_empty() {
        lock_global().buffers.extend(overflow);
    }
}
