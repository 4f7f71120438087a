//! Newline-delimited JSON decoding over a [`ByteStream`].
//!
//! [`NdjsonStream`] turns the chunked body of a streaming `GET` into a lazy
//! sequence of typed records. Blank lines are keep-alives and are skipped.
//! The first decode or transport error ends the sequence.

use std::marker::PhantomData;
use std::time::Duration;

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::{LichessError, Result};
use crate::transport::ByteStream;

/// Lazy, finite sequence of records decoded from a newline-delimited JSON body.
///
/// Each call to [`next_record`](Self::next_record) returns:
/// - `Some(Ok(record))`: the next well-formed record
/// - `Some(Err(e))`: a malformed line, a transport error or a read timeout;
///   the sequence is fused afterwards
/// - `None`: the stream ended cleanly (or after an error was reported)
///
/// # Cancel Safety
///
/// `next_record` is cancel-safe: partially received lines are buffered inside
/// the decoder, so dropping the future before it completes loses no data.
pub struct NdjsonStream<T> {
    stream: ByteStream,
    buffer: Vec<u8>,
    read_timeout: Option<Duration>,
    finished: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> NdjsonStream<T> {
    /// Wrap a byte stream.
    pub fn new(stream: ByteStream) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            read_timeout: None,
            finished: false,
            _record: PhantomData,
        }
    }

    /// Fail a read with [`LichessError::Timeout`] when no chunk arrives in time.
    ///
    /// Keep-alive newlines count as activity.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Decode the next record.
    pub async fn next_record(&mut self) -> Option<Result<T>> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(line) = self.take_line() {
                if line.iter().all(u8::is_ascii_whitespace) {
                    trace!("skipping keep-alive line");
                    continue;
                }
                return Some(self.decode(&line));
            }

            match self.read_chunk().await {
                Ok(Some(chunk)) => self.buffer.extend_from_slice(&chunk),
                Ok(None) => {
                    self.finished = true;
                    let rest = std::mem::take(&mut self.buffer);
                    if rest.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    return Some(self.decode(&rest));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Remove and return the first complete line (without its newline).
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        Some(line)
    }

    async fn read_chunk(&mut self) -> Result<Option<bytes::Bytes>> {
        let next = match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.stream.next())
                .await
                .map_err(|_| LichessError::Timeout)?,
            None => self.stream.next().await,
        };
        next.transpose()
    }

    fn decode(&mut self, line: &[u8]) -> Result<T> {
        serde_json::from_slice(line).map_err(|source| {
            self.finished = true;
            LichessError::StreamDecode {
                line: String::from_utf8_lossy(line).into_owned(),
                source,
            }
        })
    }
}

impl<T> std::fmt::Debug for NdjsonStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdjsonStream")
            .field("buffered", &self.buffer.len())
            .field("read_timeout", &self.read_timeout)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Rec {
        n: u32,
    }

    fn stream_of(chunks: Vec<Result<&'static str>>) -> ByteStream {
        Box::pin(futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    async fn collect(mut s: NdjsonStream<Rec>) -> (Vec<u32>, Option<LichessError>) {
        let mut out = Vec::new();
        while let Some(item) = s.next_record().await {
            match item {
                Ok(rec) => out.push(rec.n),
                Err(e) => return (out, Some(e)),
            }
        }
        (out, None)
    }

    #[tokio::test]
    async fn yields_all_records_then_ends() {
        let s = NdjsonStream::new(stream_of(vec![Ok("{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n")]));
        let (recs, err) = collect(s).await;
        assert_eq!(recs, vec![1, 2, 3]);
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn reassembles_records_split_across_chunks() {
        let s = NdjsonStream::new(stream_of(vec![
            Ok("{\"n\""),
            Ok(":1}\n{\"n\":"),
            Ok("2}\n"),
        ]));
        let (recs, err) = collect(s).await;
        assert_eq!(recs, vec![1, 2]);
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn skips_keep_alive_lines() {
        let s = NdjsonStream::new(stream_of(vec![Ok("\n\n{\"n\":7}\n \r\n\n{\"n\":8}\n\n")]));
        let (recs, err) = collect(s).await;
        assert_eq!(recs, vec![7, 8]);
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn decodes_trailing_record_without_newline() {
        let s = NdjsonStream::new(stream_of(vec![Ok("{\"n\":1}\n{\"n\":2}")]));
        let (recs, err) = collect(s).await;
        assert_eq!(recs, vec![1, 2]);
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn malformed_line_stops_the_sequence() {
        let mut s: NdjsonStream<Rec> = NdjsonStream::new(stream_of(vec![Ok(
            "{\"n\":1}\n{\"n\":2}\n{not json\n{\"n\":4}\n",
        )]));
        assert_eq!(s.next_record().await.unwrap().unwrap().n, 1);
        assert_eq!(s.next_record().await.unwrap().unwrap().n, 2);
        match s.next_record().await {
            Some(Err(LichessError::StreamDecode { line, .. })) => assert_eq!(line, "{not json"),
            other => panic!("expected StreamDecode, got {other:?}"),
        }
        assert!(s.next_record().await.is_none());
        assert!(s.next_record().await.is_none());
    }

    #[tokio::test]
    async fn transport_error_is_surfaced_once() {
        let s = NdjsonStream::new(stream_of(vec![
            Ok("{\"n\":1}\n"),
            Err(LichessError::Transport("connection reset".into())),
            Ok("{\"n\":2}\n"),
        ]));
        let (recs, err) = collect(s).await;
        assert_eq!(recs, vec![1]);
        assert!(matches!(err, Some(LichessError::Transport(_))));
    }

    #[tokio::test]
    async fn empty_stream_ends_cleanly() {
        let mut s: NdjsonStream<Rec> = NdjsonStream::new(stream_of(vec![]));
        assert!(s.next_record().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn read_timeout_fails_a_silent_stream() {
        let pending: ByteStream = Box::pin(futures_util::stream::pending::<Result<Bytes>>());
        let mut s: NdjsonStream<Rec> =
            NdjsonStream::new(pending).with_read_timeout(Some(Duration::from_secs(5)));
        assert!(matches!(
            s.next_record().await,
            Some(Err(LichessError::Timeout))
        ));
        assert!(s.next_record().await.is_none());
    }
}
