// src/bridge/event_loop.rs

//! Cooperative, single-threaded caller loop.
//!
//! Work that finishes elsewhere hands a callback back to the loop through a
//! [`CallbackTicket`]. Tickets are taken out at dispatch time and the loop
//! keeps running until every outstanding ticket has been redeemed or
//! dropped, so a result is never lost because the calling script returned
//! early.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, trace};

type Callback = Box<dyn FnOnce() -> Result<()> + Send>;

enum LoopMessage {
    /// Run this on the loop thread.
    Run(Callback),
    /// Ticket dropped without being redeemed.
    Release,
}

/// Single-threaded event loop owned by the caller.
pub struct EventLoop {
    tx: mpsc::UnboundedSender<LoopMessage>,
    rx: mpsc::UnboundedReceiver<LoopMessage>,
    outstanding: Arc<AtomicUsize>,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle used by producers to take out tickets.
    pub fn registrar(&self) -> LoopRegistrar {
        LoopRegistrar {
            tx: self.tx.clone(),
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    /// Number of tickets neither redeemed nor released yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Drive `script` to completion while running callbacks, then keep
    /// running callbacks until no ticket is outstanding.
    ///
    /// An error from the script or from any callback stops the loop.
    pub async fn start<F, T>(&mut self, script: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::pin!(script);

        let value = loop {
            tokio::select! {
                res = &mut script => break res?,
                Some(msg) = self.rx.recv() => self.dispatch(msg)?,
            }
        };

        self.run_until_idle().await?;
        Ok(value)
    }

    /// Run callbacks until no ticket is outstanding.
    pub async fn run_until_idle(&mut self) -> Result<()> {
        while self.outstanding() > 0 {
            match self.rx.recv().await {
                Some(msg) => self.dispatch(msg)?,
                None => break,
            }
        }
        debug!("event loop idle");
        Ok(())
    }

    fn dispatch(&mut self, msg: LoopMessage) -> Result<()> {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        match msg {
            LoopMessage::Run(callback) => {
                trace!("running loop callback");
                callback()
            }
            LoopMessage::Release => {
                debug!("ticket released without a callback");
                Ok(())
            }
        }
    }
}

/// Cloneable, `Send` handle for taking out [`CallbackTicket`]s.
#[derive(Clone)]
pub struct LoopRegistrar {
    tx: mpsc::UnboundedSender<LoopMessage>,
    outstanding: Arc<AtomicUsize>,
}

impl std::fmt::Debug for LoopRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopRegistrar")
            .field("outstanding", &self.outstanding.load(Ordering::SeqCst))
            .finish()
    }
}

impl LoopRegistrar {
    /// Take out a ticket. The loop will not go idle until it is redeemed or
    /// dropped.
    pub fn register_callback(&self) -> CallbackTicket {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        CallbackTicket {
            tx: Some(self.tx.clone()),
        }
    }
}

/// Single-use notifier handed out by [`LoopRegistrar::register_callback`].
#[must_use = "dropping a ticket releases it without running anything"]
pub struct CallbackTicket {
    tx: Option<mpsc::UnboundedSender<LoopMessage>>,
}

impl std::fmt::Debug for CallbackTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTicket").finish_non_exhaustive()
    }
}

impl CallbackTicket {
    /// Queue `callback` to run on the loop thread.
    ///
    /// If the loop is already gone the callback is dropped unrun.
    pub fn redeem<F>(mut self, callback: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        if let Some(tx) = self.tx.take() {
            if tx.send(LoopMessage::Run(Box::new(callback))).is_err() {
                debug!("event loop gone; callback dropped");
            }
        }
    }
}

impl Drop for CallbackTicket {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(LoopMessage::Release);
        }
    }
}
