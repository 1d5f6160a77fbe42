// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed result streams.
//!
//! Multi-object operations hand back an [`ObjectStream`] while a spawned
//! producer task fills it through the matching [`ObjectSink`]. The stream
//! carries three kinds of events:
//!
//! - `Some(Ok(object))`: one hydrated object,
//! - `Some(Err(error))`: a terminal failure, after which nothing else arrives,
//! - `None`: the producer finished (or gave up after a failure).
//!
//! Objects delivered before a failure stay valid; they are never retracted.
//! The buffer is bounded, so a slow consumer suspends the producer, and
//! dropping the stream makes the producer stop at its next send.

use tokio::sync::mpsc;

use crate::error::{RepositoryError, Result};
use crate::object::GeometryObject;

/// Create a connected sink/stream pair with the given buffer capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel(capacity: usize) -> (ObjectSink, ObjectStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        ObjectSink { tx, sent: 0 },
        ObjectStream { rx, finished: false },
    )
}

/// Consumer half of a result stream.
#[derive(Debug)]
pub struct ObjectStream {
    rx: mpsc::Receiver<Result<GeometryObject>>,
    finished: bool,
}

/// Everything a stream produced, drained to completion.
#[derive(Debug, Default)]
pub struct Collected {
    /// Objects received before the stream ended.
    pub objects: Vec<GeometryObject>,
    /// The terminal error, if the stream failed.
    pub error: Option<RepositoryError>,
}

impl Collected {
    /// Turn into a `Result`, discarding partial results on failure.
    pub fn into_result(self) -> Result<Vec<GeometryObject>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.objects),
        }
    }
}

impl ObjectStream {
    /// A stream that is already closed: no objects, no error.
    pub fn empty() -> Self {
        let (_, stream) = channel(1);
        stream
    }

    /// A stream that yields a single error and closes.
    pub fn failed(err: RepositoryError) -> Self {
        let (sink, mut stream) = channel(1);
        if sink.tx.try_send(Err(err)).is_err() {
            // A fresh channel of capacity one always has room.
            stream.finished = true;
        }
        stream
    }

    /// Receive the next event. Returns `None` once the stream is exhausted.
    pub async fn next(&mut self) -> Option<Result<GeometryObject>> {
        if self.finished {
            return None;
        }
        let item = self.rx.recv().await;
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
            self.rx.close();
        }
        item
    }

    /// Drain the stream.
    pub async fn collect(mut self) -> Collected {
        let mut out = Collected::default();
        while let Some(item) = self.next().await {
            match item {
                Ok(obj) => out.objects.push(obj),
                Err(err) => out.error = Some(err),
            }
        }
        out
    }
}

/// Producer half of a result stream.
///
/// A sink can emit any number of objects and at most one error: [`fail`](Self::fail)
/// consumes it. Dropping the sink closes the stream cleanly.
#[derive(Debug)]
pub struct ObjectSink {
    tx: mpsc::Sender<Result<GeometryObject>>,
    sent: usize,
}

impl ObjectSink {
    /// Deliver one object, waiting for buffer space.
    ///
    /// Returns `false` when the consumer has gone away; the producer should stop.
    pub async fn send(&mut self, obj: GeometryObject) -> bool {
        if self.tx.send(Ok(obj)).await.is_err() {
            return false;
        }
        self.sent += 1;
        true
    }

    /// Deliver the terminal error and close the stream.
    pub async fn fail(self, err: RepositoryError) {
        if self.tx.send(Err(err)).await.is_err() {
            tracing::debug!("result stream dropped before its error could be delivered");
        }
    }

    /// Number of objects delivered so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Whether the consumer has dropped its stream.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
