//! Fixed-period tick loop.
//!
//! Every registered component is ticked once per period, in registration
//! order, on the calling thread. The loop runs until its running flag is
//! cleared.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::link::{LinkStateMachine, Transceiver};
use crate::notify::{NotificationCenter, StatusIndicator};

/// A component driven by the scheduler.
pub trait Tick {
    fn tick(&mut self);
}

impl<T: Transceiver> Tick for LinkStateMachine<T> {
    fn tick(&mut self) {
        LinkStateMachine::tick(self);
    }
}

impl<I: StatusIndicator> Tick for NotificationCenter<I> {
    fn tick(&mut self) {
        NotificationCenter::tick(self);
    }
}

pub struct Scheduler {
    period: Duration,
    components: Vec<(String, Box<dyn Tick>)>,
    running: Arc<AtomicBool>,
    ticks: u64,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            components: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            ticks: 0,
        }
    }

    pub fn add(&mut self, name: &str, component: Box<dyn Tick>) -> &mut Self {
        debug!("Scheduling {name}");
        self.components.push((name.to_string(), component));
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of completed rounds.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Flag shared with whoever needs to stop the loop (e.g. a signal
    /// handler).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Ticks every component once.
    pub fn tick_once(&mut self) {
        for (_, component) in self.components.iter_mut() {
            component.tick();
        }
        self.ticks += 1;
    }

    /// Runs until stopped.
    pub fn run(&mut self) {
        self.run_until(None);
    }

    /// Runs until stopped or `duration` has elapsed.
    pub fn run_for(&mut self, duration: Duration) {
        self.run_until(Some(Instant::now() + duration));
    }

    fn run_until(&mut self, deadline: Option<Instant>) {
        info!(
            "Scheduler running {} components every {}ms",
            self.components.len(),
            self.period.as_millis()
        );

        while self.is_running() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let started = Instant::now();
            self.tick_once();
            if let Some(rest) = self.period.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        info!("Scheduler stopped after {} ticks", self.ticks);
    }
}
