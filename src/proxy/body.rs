//! Size-bounded body stream.
//!
//! Chunks are passed through as they arrive while a running total is kept.
//! The first chunk that takes the total over the ceiling ends the stream with
//! [`BodyError::TooLarge`]; nothing is buffered beyond the current chunk.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;

use crate::observability::metrics;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced while streaming a proxied body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body exceeded {max} bytes")]
    TooLarge { max: u64 },

    #[error("upstream body error: {0}")]
    Source(BoxError),
}

/// Stream adapter enforcing a byte ceiling.
pub struct BoundedStream<S> {
    inner: S,
    seen: u64,
    max: u64,
    finished: bool,
}

impl<S> BoundedStream<S> {
    pub fn new(inner: S, max: u64) -> Self {
        Self {
            inner,
            seen: 0,
            max,
            finished: false,
        }
    }

    /// Bytes passed through so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl<S, E> Stream for BoundedStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    type Item = Result<Bytes, BodyError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.seen += chunk.len() as u64;
                if self.seen > self.max {
                    self.finished = true;
                    tracing::warn!(
                        seen = self.seen,
                        max = self.max,
                        "Aborting proxied body over size limit"
                    );
                    metrics::record_image_rejected("too_large_streamed");
                    return Poll::Ready(Some(Err(BodyError::TooLarge { max: self.max })));
                }
                metrics::record_image_bytes(chunk.len() as u64);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                self.finished = true;
                Poll::Ready(Some(Err(BodyError::Source(err.into()))))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{stream, StreamExt};

    fn chunks(sizes: &[usize]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        let items: Vec<_> = sizes.iter().map(|n| Ok(Bytes::from(vec![7u8; *n]))).collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn passes_bodies_within_limit() {
        let mut body = BoundedStream::new(chunks(&[4, 4, 2]), 10);
        let mut total = 0;
        while let Some(chunk) = body.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, 10);
        assert_eq!(body.seen(), 10);
    }

    #[tokio::test]
    async fn aborts_once_limit_is_crossed() {
        let mut body = BoundedStream::new(chunks(&[6, 6, 6]), 10);
        assert!(body.next().await.unwrap().is_ok());
        assert!(matches!(
            body.next().await.unwrap(),
            Err(BodyError::TooLarge { max: 10 })
        ));
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn ceiling_reached_exactly_at_chunk_boundary() {
        let mut body = BoundedStream::new(chunks(&[5, 5]), 10);
        assert_eq!(body.next().await.unwrap().unwrap().len(), 5);
        assert_eq!(body.next().await.unwrap().unwrap().len(), 5);
        assert!(body.next().await.is_none());
        assert_eq!(body.seen(), 10);

        let mut body = BoundedStream::new(chunks(&[5, 5, 1]), 10);
        assert!(body.next().await.unwrap().is_ok());
        assert!(body.next().await.unwrap().is_ok());
        assert!(matches!(
            body.next().await.unwrap(),
            Err(BodyError::TooLarge { max: 10 })
        ));
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn source_errors_end_the_stream() {
        let items = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(std::io::Error::other("reset")),
            Ok(Bytes::from_static(b"cd")),
        ];
        let mut body = BoundedStream::new(stream::iter(items), 10);
        assert!(body.next().await.unwrap().is_ok());
        assert!(matches!(body.next().await.unwrap(), Err(BodyError::Source(_))));
        assert!(body.next().await.is_none());
    }
}
