//! Completion signal returned by `join` and `leave`.
//!
//! The membership mutation has already happened by the time a
//! [`Completion`] exists. Awaiting it only yields to the executor once,
//! so callers that chain work after a join observe it on the next
//! scheduling turn. Dropping it is fine.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future that resolves on its second poll.
#[derive(Debug, Default)]
pub struct Completion {
    yielded: bool,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self { yielded: false }
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
