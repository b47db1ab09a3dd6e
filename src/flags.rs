//! Event flag sets
//!
//! A small bit set that one task can wait on while any number of producers,
//! including interrupt handlers, raise bits. Setting is a single atomic
//! `fetch_or` followed by a waker notification, so it never blocks and is
//! safe to call from interrupt context. Clearing is left to the waiting task.
//!
//! Only one task may wait on a given flag set at a time; a second waiter
//! would replace the first one's waker.

use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::waitqueue::AtomicWaker;
use embassy_time::{with_timeout, Duration};
use portable_atomic::{AtomicU8, Ordering};

/// Mask covering every channel / selection bit
pub const ALL_BITS: u8 = 0b1111;

pub struct EventFlags {
    bits: AtomicU8,
    waker: AtomicWaker,
}

impl EventFlags {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
            waker: AtomicWaker::new(),
        }
    }

    /// Raise `mask` and wake the waiting task. Returns the bits set before the call,
    /// so callers can detect a bit that was raised again before it was cleared.
    pub fn set(&self, mask: u8) -> u8 {
        let previous = self.bits.fetch_or(mask, Ordering::AcqRel);
        self.waker.wake();
        previous
    }

    /// Lower `mask`, returning the bits set before the call
    pub fn clear(&self, mask: u8) -> u8 {
        self.bits.fetch_and(!mask, Ordering::AcqRel)
    }

    pub fn get(&self) -> u8 {
        self.bits.load(Ordering::Acquire)
    }

    /// Wait until at least one bit of `mask` is set and return the set bits of `mask`.
    /// Bits are left set.
    pub async fn wait_any(&self, mask: u8) -> u8 {
        poll_fn(|cx| {
            // Register before checking so a set() racing with this poll is not missed
            self.waker.register(cx.waker());
            let bits = self.get() & mask;
            if bits != 0 {
                Poll::Ready(bits)
            } else {
                Poll::Pending
            }
        })
        .await
    }

    /// Like [`wait_any`](Self::wait_any) but gives up after `timeout`, returning `None`
    pub async fn wait_any_timeout(&self, mask: u8, timeout: Duration) -> Option<u8> {
        with_timeout(timeout, self.wait_any(mask)).await.ok()
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}
