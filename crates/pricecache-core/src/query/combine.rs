use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Fuse, FusedStream, Stream, StreamExt};

/// Stream of `(latest a, latest b)` pairs.
///
/// Emits once both inputs have produced a value, then again every time
/// either input produces one. Ends when both inputs have ended. Dropping it
/// drops both inputs.
#[must_use = "streams do nothing unless polled"]
pub struct CombineLatest<A: Stream, B: Stream> {
    a: Fuse<A>,
    b: Fuse<B>,
    latest_a: Option<A::Item>,
    latest_b: Option<B::Item>,
}

pub fn combine_latest<A, B>(a: A, b: B) -> CombineLatest<A, B>
where
    A: Stream + Unpin,
    B: Stream + Unpin,
{
    CombineLatest {
        a: a.fuse(),
        b: b.fuse(),
        latest_a: None,
        latest_b: None,
    }
}

// Items are stored by value and never pinned.
impl<A: Stream + Unpin, B: Stream + Unpin> Unpin for CombineLatest<A, B> {}

impl<A, B> Stream for CombineLatest<A, B>
where
    A: Stream + Unpin,
    B: Stream + Unpin,
    A::Item: Clone,
    B::Item: Clone,
{
    type Item = (A::Item, B::Item);

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            let mut progressed = false;

            if let Poll::Ready(Some(value)) = this.a.poll_next_unpin(cx) {
                this.latest_a = Some(value);
                progressed = true;
            }
            if let Poll::Ready(Some(value)) = this.b.poll_next_unpin(cx) {
                this.latest_b = Some(value);
                progressed = true;
            }

            if progressed {
                if let (Some(a), Some(b)) = (&this.latest_a, &this.latest_b) {
                    return Poll::Ready(Some((a.clone(), b.clone())));
                }
                // Still waiting for the other side's first value.
                continue;
            }

            if this.a.is_terminated() && this.b.is_terminated() {
                return Poll::Ready(None);
            }
            return Poll::Pending;
        }
    }
}
