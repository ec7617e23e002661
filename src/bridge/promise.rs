// src/bridge/promise.rs

//! Exactly-once result handle.
//!
//! [`pending`] returns a [`ResultHandle`] the caller awaits and a
//! [`Resolver`] the worker side settles. The first `fulfill`/`reject` wins a
//! compare-and-swap on a tri-state flag; every later attempt is a silent
//! no-op that returns `false`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::ExecError;
use crate::runner::CommandResult;

const PENDING: u8 = 0;
const FULFILLED: u8 = 1;
const REJECTED: u8 = 2;

pub type Settlement = Result<CommandResult, ExecError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Pending,
    Fulfilled,
    Rejected,
}

impl HandleState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            FULFILLED => HandleState::Fulfilled,
            REJECTED => HandleState::Rejected,
            _ => HandleState::Pending,
        }
    }
}

/// Settlement flag, shared by the handle and every resolver clone.
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
}

impl Shared {
    fn state(&self) -> HandleState {
        HandleState::from_raw(self.state.load(Ordering::Acquire))
    }
}

/// Sending half, owned by resolvers only. Dropping the last resolver drops
/// the sender and closes the channel.
#[derive(Debug)]
struct ResolverInner {
    shared: Arc<Shared>,
    tx: Mutex<Option<oneshot::Sender<Settlement>>>,
}

/// Create a pending handle and its resolver.
pub fn pending() -> (ResultHandle, Resolver) {
    let (tx, rx) = oneshot::channel();
    let shared = Arc::new(Shared {
        state: AtomicU8::new(PENDING),
    });
    let inner = Arc::new(ResolverInner {
        shared: Arc::clone(&shared),
        tx: Mutex::new(Some(tx)),
    });
    (ResultHandle { rx, shared }, Resolver { inner })
}

/// Settling side of a [`ResultHandle`].
///
/// Cloneable so that several code paths may race to settle; only one wins.
/// Dropping every clone without settling leaves the handle to resolve as
/// [`ExecError::Abandoned`].
#[derive(Debug, Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

impl Resolver {
    /// Fulfil the handle. Returns `false` if it was already settled.
    pub fn fulfill(&self, value: CommandResult) -> bool {
        self.settle(FULFILLED, Ok(value))
    }

    /// Reject the handle. Returns `false` if it was already settled.
    pub fn reject(&self, err: ExecError) -> bool {
        self.settle(REJECTED, Err(err))
    }

    pub fn settle_with(&self, settlement: Settlement) -> bool {
        match settlement {
            Ok(value) => self.fulfill(value),
            Err(err) => self.reject(err),
        }
    }

    pub fn state(&self) -> HandleState {
        self.inner.shared.state()
    }

    fn settle(&self, target: u8, value: Settlement) -> bool {
        if let Err(current) = self.inner.shared.state.compare_exchange(
            PENDING,
            target,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            debug!(
                state = ?HandleState::from_raw(current),
                "handle already settled; ignoring settlement"
            );
            return false;
        }

        let tx = self
            .inner
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            if tx.send(value).is_err() {
                debug!("result handle dropped before settlement was delivered");
            }
        }
        true
    }
}

/// Deferred result of one execution.
///
/// Resolves to the [`CommandResult`] on fulfilment, or to the fault that
/// rejected it.
#[derive(Debug)]
#[must_use = "a result handle does nothing unless awaited or inspected"]
pub struct ResultHandle {
    rx: oneshot::Receiver<Settlement>,
    shared: Arc<Shared>,
}

impl ResultHandle {
    pub fn state(&self) -> HandleState {
        self.shared.state()
    }

    pub fn is_settled(&self) -> bool {
        self.state() != HandleState::Pending
    }
}

impl Future for ResultHandle {
    type Output = Settlement;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(settlement)) => Poll::Ready(settlement),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ExecError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}
