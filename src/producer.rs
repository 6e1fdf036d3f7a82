//! Producers and the callback they report through.
//!
//! A [`Producer`] is an opaque unit of work. It is started at most once and
//! handed a [`Reporter`], which it may call any number of times (including
//! zero), from any thread, for as long as it likes. Reports issued by one
//! producer are observed in the order it issues them; there is no ordering
//! across producers.
//!
//! [`Producer::new`] runs its body on its own named thread, so starting a
//! set never blocks the caller. Only the fixed-list constructors
//! ([`Producer::reporting`], [`Producer::silent`]) run on the starting
//! thread.
//!
//! A [`ProducerSet`] is an ordered, immutable collection of producers built
//! once per invocation.

use core::fmt;
use std::sync::Arc;
use std::thread;

pub(crate) type Sink<V> = Arc<dyn Fn(usize, V) + Send + Sync>;

/// The callback handed to a started producer.
///
/// Cloning is cheap; every clone reports on behalf of the same producer.
pub struct Reporter<V> {
    index: usize,
    sink: Sink<V>,
}

impl<V> Reporter<V> {
    pub(crate) fn new(index: usize, sink: Sink<V>) -> Self {
        Self { index, sink }
    }

    /// A reporter that drops every value.
    #[must_use]
    pub fn noop(index: usize) -> Self {
        Self::new(index, Arc::new(|_, _| {}))
    }

    /// Reports one value.
    pub fn report(&self, value: V) {
        (self.sink)(self.index, value);
    }

    /// Position of the owning producer within its set.
    #[must_use]
    pub const fn producer_index(&self) -> usize {
        self.index
    }
}

impl<V> Clone for Reporter<V> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<V> fmt::Debug for Reporter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

type StartFn<V> = Box<dyn FnOnce(Reporter<V>) + Send>;

enum Launch {
    /// Body runs on its own named thread.
    Task,
    /// Body runs to completion on the starting thread. Only for bodies
    /// that cannot block.
    Synchronous,
}

/// An independent unit of work that reports values through a [`Reporter`].
pub struct Producer<V> {
    start: StartFn<V>,
    launch: Launch,
}

impl<V: 'static> Producer<V> {
    /// A producer whose body runs concurrently on its own OS thread.
    ///
    /// Starting it never blocks the invoking thread, so a body that sleeps
    /// or blocks cannot stretch the caller's timeout or delay.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Reporter<V>) + Send + 'static,
    {
        Self {
            start: Box::new(f),
            launch: Launch::Task,
        }
    }

    /// A producer that synchronously reports each value in order.
    ///
    /// Reporting a fixed list cannot block, so it runs on the invoking
    /// thread while the producer set is started.
    pub fn reporting<I>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Send,
    {
        let values: Vec<V> = values.into_iter().collect();
        Self {
            start: Box::new(move |reporter: Reporter<V>| {
                for value in values {
                    reporter.report(value);
                }
            }),
            launch: Launch::Synchronous,
        }
    }

    /// A producer that never reports.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            start: Box::new(|_reporter: Reporter<V>| {}),
            launch: Launch::Synchronous,
        }
    }
}

impl<V> Producer<V> {
    /// Returns true if the body runs on its own thread.
    #[must_use]
    pub const fn is_concurrent(&self) -> bool {
        matches!(self.launch, Launch::Task)
    }

    pub(crate) fn start(self, reporter: Reporter<V>)
    where
        V: 'static,
    {
        let body = self.start;
        match self.launch {
            Launch::Synchronous => body(reporter),
            Launch::Task => {
                let index = reporter.producer_index();
                let spawned = thread::Builder::new()
                    .name(format!("fanout-producer-{index}"))
                    .spawn(move || body(reporter));
                if let Err(err) = spawned {
                    tracing::error!(producer = index, error = %err, "failed to spawn producer thread");
                }
            }
        }
    }
}

impl<V> fmt::Debug for Producer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("concurrent", &self.is_concurrent())
            .finish_non_exhaustive()
    }
}

/// An ordered collection of producers.
pub struct ProducerSet<V> {
    producers: Vec<Producer<V>>,
}

impl<V> ProducerSet<V> {
    /// An empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            producers: Vec::new(),
        }
    }

    /// Starts a builder.
    #[must_use]
    pub const fn builder() -> ProducerSetBuilder<V> {
        ProducerSetBuilder {
            producers: Vec::new(),
        }
    }

    /// Number of producers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Returns true if the set has no producers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    pub(crate) fn into_producers(self) -> Vec<Producer<V>> {
        self.producers
    }
}

impl<V> Default for ProducerSet<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> From<Vec<Producer<V>>> for ProducerSet<V> {
    fn from(producers: Vec<Producer<V>>) -> Self {
        Self { producers }
    }
}

impl<V> FromIterator<Producer<V>> for ProducerSet<V> {
    fn from_iter<I: IntoIterator<Item = Producer<V>>>(iter: I) -> Self {
        Self {
            producers: iter.into_iter().collect(),
        }
    }
}

impl<V> fmt::Debug for ProducerSet<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerSet")
            .field("len", &self.producers.len())
            .finish()
    }
}

/// Builder for [`ProducerSet`].
#[derive(Debug)]
pub struct ProducerSetBuilder<V> {
    producers: Vec<Producer<V>>,
}

impl<V: 'static> ProducerSetBuilder<V> {
    /// Appends a producer.
    #[must_use]
    pub fn producer(mut self, producer: Producer<V>) -> Self {
        self.producers.push(producer);
        self
    }

    /// Appends a producer whose body runs on its own thread.
    #[must_use]
    pub fn task<F>(self, f: F) -> Self
    where
        F: FnOnce(Reporter<V>) + Send + 'static,
    {
        self.producer(Producer::new(f))
    }

    /// Appends a producer that synchronously reports `values`.
    #[must_use]
    pub fn reporting<I>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Send,
    {
        self.producer(Producer::reporting(values))
    }

    /// Finishes the set.
    #[must_use]
    pub fn build(self) -> ProducerSet<V> {
        ProducerSet {
            producers: self.producers,
        }
    }
}
