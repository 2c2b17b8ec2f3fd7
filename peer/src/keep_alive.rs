use crate::helpers::random::random_fraction;
use bitflags::bitflags;
use common::{
    messages::cops::{KeepAlive, Packet},
    sync::JoinOnDrop,
};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use io::{Closer, CopsWriter};
use log::{debug, warn};
use std::{
    thread,
    time::{Duration, Instant},
};

bitflags! {
    pub struct LivenessActions: u8 {
        const SEND_KEEP_ALIVE = 0x01;
        const SEND_ACCOUNTING = 0x02;
        const DEAD = 0x04;
    }
}

/// Delay before the next keep-alive check: a random point between 1/4 and 3/4 of `interval`.
pub fn keep_alive_delay(interval: Duration, fraction: f64) -> Duration {
    interval.mul_f64(0.25 + 0.5 * fraction.clamp(0.0, 1.0))
}

/// Traffic bookkeeping for one connection. Time is passed in so the schedule can be driven
/// without a clock.
#[derive(Debug)]
pub struct Liveness {
    ka_interval: Option<Duration>,
    acct_interval: Option<Duration>,
    last_rx: Instant,
    last_tx: Instant,
    period_start: Instant,
    next_ka: Option<Instant>,
    next_acct: Option<Instant>,
}

impl Liveness {
    /// The PEP sends keep-alives and accounting reports.
    pub fn pep(ka_interval: u16, acct_interval: u16, now: Instant, fraction: f64) -> Self {
        Self::new(ka_interval, acct_interval, true, now, fraction)
    }

    /// The PDP only watches for silence.
    pub fn pdp(ka_interval: u16, now: Instant) -> Self {
        Self::new(ka_interval, 0, false, now, 0.0)
    }

    fn new(
        ka_interval: u16,
        acct_interval: u16,
        sends_keep_alives: bool,
        now: Instant,
        fraction: f64,
    ) -> Self {
        let ka_interval = seconds(ka_interval);
        let acct_interval = seconds(acct_interval);

        Self {
            ka_interval,
            acct_interval,
            last_rx: now,
            last_tx: now,
            period_start: now,
            next_ka: ka_interval
                .filter(|_| sends_keep_alives)
                .map(|interval| now + keep_alive_delay(interval, fraction)),
            next_acct: acct_interval.map(|interval| now + accounting_period(interval)),
        }
    }

    pub fn record_rx(&mut self, now: Instant) {
        self.last_rx = now;
    }

    pub fn record_tx(&mut self, now: Instant) {
        self.last_tx = now;
    }

    pub fn is_enabled(&self) -> bool {
        self.ka_interval.is_some() || self.acct_interval.is_some()
    }

    /// Earliest instant at which [`poll`](Self::poll) may have something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let dead_at = self.ka_interval.map(|interval| self.last_rx + interval);
        [self.next_ka, self.next_acct, dead_at]
            .into_iter()
            .flatten()
            .min()
    }

    pub fn poll(&mut self, now: Instant, fraction: f64) -> LivenessActions {
        let mut actions = LivenessActions::empty();

        if let Some(interval) = self.ka_interval {
            if now.saturating_duration_since(self.last_rx) >= interval {
                return LivenessActions::DEAD;
            }

            if let Some(next_ka) = self.next_ka {
                if now >= next_ka {
                    // Anything sent during the period already proves we are alive
                    if self.last_tx <= self.period_start {
                        actions |= LivenessActions::SEND_KEEP_ALIVE;
                    }
                    self.period_start = now;
                    self.next_ka = Some(now + keep_alive_delay(interval, fraction));
                }
            }
        }

        if let (Some(interval), Some(next_acct)) = (self.acct_interval, self.next_acct) {
            if now >= next_acct {
                actions |= LivenessActions::SEND_ACCOUNTING;
                self.next_acct = Some(now + accounting_period(interval));
            }
        }

        actions
    }
}

fn seconds(value: u16) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(u64::from(value)))
}

fn accounting_period(interval: Duration) -> Duration {
    interval.mul_f64(0.75)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Received,
    Sent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Accounting,
    /// Nothing arrived for a whole keep-alive interval. The connection has been shut down.
    Dead,
}

/// Runs a [`Liveness`] schedule on its own thread. The thread writes keep-alives itself and
/// reports everything else back to the session through [`try_event`](Self::try_event).
pub struct KeepAliveTimer {
    activity: Sender<Activity>,
    stop: Option<Sender<()>>,
    events: Receiver<TimerEvent>,
    handle: Option<JoinOnDrop<()>>,
}

impl KeepAliveTimer {
    pub fn start(
        liveness: Liveness,
        client_type: u16,
        writer: CopsWriter,
        closer: Closer,
    ) -> std::io::Result<Self> {
        let (activity_tx, activity_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let handle = thread::Builder::new()
            .name("cops-keep-alive".to_owned())
            .spawn(move || {
                run_timer(liveness, TimerContext {
                    client_type,
                    writer,
                    closer,
                    activity: activity_rx,
                    stop: stop_rx,
                    events: event_tx,
                })
            })?;

        Ok(Self {
            activity: activity_tx,
            stop: Some(stop_tx),
            events: event_rx,
            handle: Some(JoinOnDrop::new(handle)),
        })
    }

    pub fn received(&self) {
        let _ = self.activity.send(Activity::Received);
    }

    pub fn sent(&self) {
        let _ = self.activity.send(Activity::Sent);
    }

    pub fn try_event(&self) -> Option<TimerEvent> {
        self.events.try_recv().ok()
    }

    pub fn stop(&mut self) {
        self.stop.take();
        self.handle.take();
    }
}

impl Drop for KeepAliveTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Wake {
    Stop,
    Activity(Activity),
    Deadline,
}

struct TimerContext {
    client_type: u16,
    writer: CopsWriter,
    closer: Closer,
    activity: Receiver<Activity>,
    stop: Receiver<()>,
    events: Sender<TimerEvent>,
}

fn run_timer(mut liveness: Liveness, ctx: TimerContext) {
    loop {
        let timeout = liveness
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));

        let wake = match timeout {
            Some(timeout) => select! {
                recv(ctx.stop) -> _ => Wake::Stop,
                recv(ctx.activity) -> msg => msg.map(Wake::Activity).unwrap_or(Wake::Stop),
                default(timeout) => Wake::Deadline,
            },
            None => select! {
                recv(ctx.stop) -> _ => Wake::Stop,
                recv(ctx.activity) -> msg => msg.map(Wake::Activity).unwrap_or(Wake::Stop),
            },
        };

        let now = Instant::now();
        match wake {
            Wake::Stop => break,
            Wake::Activity(Activity::Received) => liveness.record_rx(now),
            Wake::Activity(Activity::Sent) => liveness.record_tx(now),
            Wake::Deadline => {}
        }

        let actions = liveness.poll(now, random_fraction().unwrap_or(0.5));
        if actions.contains(LivenessActions::DEAD) {
            warn!("no traffic for a whole keep-alive interval, closing");
            let _ = ctx.events.send(TimerEvent::Dead);
            ctx.closer.close();
            break;
        }
        if actions.contains(LivenessActions::SEND_KEEP_ALIVE) {
            if ctx
                .writer
                .send(&Packet::new(ctx.client_type, KeepAlive::default()))
                .is_err()
            {
                break;
            }
            liveness.record_tx(now);
        }
        if actions.contains(LivenessActions::SEND_ACCOUNTING)
            && ctx.events.send(TimerEvent::Accounting).is_err()
        {
            break;
        }
    }

    debug!("keep-alive timer finished");
}
