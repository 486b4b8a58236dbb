use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tmonbus_transport::BusLink;
use tracing::{debug, info};

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::source::ReadingSource;

/// Sleep granularity while waiting between pushes, so a cleared run flag
/// is noticed promptly.
const PUSH_TICK: Duration = Duration::from_millis(50);

/// Counters kept by a running node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// Bursts taken off the link.
    pub received: u64,
    /// REPLY frames transmitted (answers and pushes).
    pub replied: u64,
    /// Bursts that produced no reply.
    pub ignored: u64,
}

/// A sensor node attached to a bus link.
///
/// Owns the link; the dispatcher decides, the node transmits.
pub struct Node<L, S> {
    link: L,
    dispatcher: Dispatcher<S>,
    stats: NodeStats,
}

impl<L: BusLink, S: ReadingSource> Node<L, S> {
    pub fn new(link: L, dispatcher: Dispatcher<S>) -> Self {
        Self {
            link,
            dispatcher,
            stats: NodeStats::default(),
        }
    }

    /// Receive at most one burst and answer it if warranted.
    ///
    /// Returns `true` when a REPLY was transmitted. A quiet bus is not an
    /// error: `Ok(false)` is returned after `timeout`.
    pub fn serve_once(&mut self, timeout: Duration) -> Result<bool> {
        let Some(inbound) = self.link.receive(timeout)? else {
            return Ok(false);
        };
        self.stats.received += 1;

        let reply = self.dispatcher.process(&inbound);
        if reply.is_empty() {
            self.stats.ignored += 1;
            return Ok(false);
        }

        self.link.send(&reply)?;
        self.stats.replied += 1;
        debug!(
            address = self.dispatcher.address(),
            len = reply.len(),
            "answered POLL"
        );
        Ok(true)
    }

    /// Serve until `running` is cleared.
    ///
    /// `timeout` bounds each receive, and so bounds how long a cleared flag
    /// goes unnoticed.
    pub fn run(&mut self, running: &AtomicBool, timeout: Duration) -> Result<NodeStats> {
        info!(
            address = self.dispatcher.address(),
            promiscuous = self.dispatcher.is_promiscuous(),
            "node serving"
        );
        while running.load(Ordering::SeqCst) {
            self.serve_once(timeout)?;
        }
        info!(stats = ?self.stats, "node stopped");
        Ok(self.stats)
    }

    /// Transmit one unsolicited REPLY with the current readings.
    pub fn push_once(&mut self) -> Result<()> {
        let reply = self.dispatcher.build_reply()?;
        self.link.send(&reply)?;
        self.stats.replied += 1;
        debug!(address = self.dispatcher.address(), "pushed REPLY");
        Ok(())
    }

    /// Push a REPLY every `interval` until `running` is cleared.
    pub fn run_push(&mut self, running: &AtomicBool, interval: Duration) -> Result<NodeStats> {
        info!(
            address = self.dispatcher.address(),
            interval_ms = interval.as_millis() as u64,
            "node pushing"
        );
        while running.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.push_once()?;
            while running.load(Ordering::SeqCst) {
                let elapsed = started.elapsed();
                if elapsed >= interval {
                    break;
                }
                std::thread::sleep((interval - elapsed).min(PUSH_TICK));
            }
        }
        info!(stats = ?self.stats, "node stopped");
        Ok(self.stats)
    }

    /// Counters so far.
    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    /// Borrow the link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consume the node and return its link.
    pub fn into_link(self) -> L {
        self.link
    }
}
