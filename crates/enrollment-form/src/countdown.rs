//! Resend countdown.
//!
//! At most one tick task runs at a time. Each start bumps the generation so
//! ticks still queued from a cancelled run are ignored.

use crate::event::FormEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

/// Result of applying one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick belongs to a cancelled run
    Stale,
    Running(u32),
    Expired,
}

#[derive(Debug)]
pub struct Countdown {
    duration: u32,
    seconds_left: u32,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    /// A zero-second countdown would never expire, so it runs for at least one tick.
    pub fn new(duration: u32) -> Self {
        Self {
            duration: duration.max(1),
            seconds_left: 0,
            generation: 0,
            task: None,
        }
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a tick task is currently scheduled.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel any running countdown and start a fresh one from `duration`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, events: &UnboundedSender<FormEvent>) {
        self.cancel();

        self.generation += 1;
        self.seconds_left = self.duration;

        let generation = self.generation;
        let ticks = self.duration;
        let events = events.clone();

        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            for _ in 0..ticks {
                interval.tick().await;
                if events.send(FormEvent::Tick { generation }).is_err() {
                    break;
                }
            }
        }));

        debug!("Countdown {} started at {}s", generation, self.duration);
    }

    /// Apply one tick from run `generation`.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if generation != self.generation || self.seconds_left == 0 {
            return TickOutcome::Stale;
        }

        self.seconds_left -= 1;

        if self.seconds_left == 0 {
            self.cancel();
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.seconds_left)
        }
    }

    /// Stop the tick task. The remaining seconds are left as they are.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_start_sets_full_duration() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(60);

        countdown.start(&tx);

        assert_eq!(countdown.seconds_left(), 60);
        assert!(countdown.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_still_expires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(0);
        countdown.start(&tx);

        assert_eq!(countdown.seconds_left(), 1);

        let Some(FormEvent::Tick { generation }) = rx.recv().await else {
            panic!("expected a tick");
        };
        assert_eq!(countdown.tick(generation), TickOutcome::Expired);
    }

    #[tokio::test]
    async fn test_sixty_ticks_expire() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(60);
        countdown.start(&tx);
        let generation = countdown.generation();

        for expected in (1..60).rev() {
            assert_eq!(countdown.tick(generation), TickOutcome::Running(expected));
        }
        assert_eq!(countdown.tick(generation), TickOutcome::Expired);
        assert_eq!(countdown.seconds_left(), 0);
        assert!(countdown.task.is_none());

        // Nothing left to count down
        assert_eq!(countdown.tick(generation), TickOutcome::Stale);
    }

    #[tokio::test]
    async fn test_restart_ignores_stale_ticks() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(60);

        countdown.start(&tx);
        let first = countdown.generation();
        countdown.tick(first);
        countdown.tick(first);
        assert_eq!(countdown.seconds_left(), 58);

        countdown.start(&tx);
        assert_eq!(countdown.seconds_left(), 60);
        assert_eq!(countdown.tick(first), TickOutcome::Stale);
        assert_eq!(countdown.seconds_left(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_emits_one_tick_per_second() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(3);
        countdown.start(&tx);
        let generation = countdown.generation();

        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(FormEvent::Tick { generation }));
        }
        drop(tx);

        // Task finished after three ticks and released its sender
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_leaves_single_tick_source() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(5);

        countdown.start(&tx);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        countdown.start(&tx);
        let current = countdown.generation();
        drop(tx);

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            received.push(event);
        }

        let stale = received
            .iter()
            .filter(|e| !matches!(e, FormEvent::Tick { generation } if *generation == current))
            .count();
        let fresh = received.len() - stale;

        // Two ticks from the first run landed before it was aborted
        assert_eq!(stale, 2);
        assert_eq!(fresh, 5);
    }
}
