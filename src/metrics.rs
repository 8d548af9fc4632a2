//! Process-wide counters for connections and commands.
//! Read with [`snapshot`] and [`command_counters_snapshot`]; logged at shutdown.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Instant;

static CONNECTIONS_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static CONNECTIONS_ACTIVE: AtomicU64 = AtomicU64::new(0);
static CONNECTIONS_PEAK: AtomicU64 = AtomicU64::new(0);
static FRAMING_ERRORS: AtomicU64 = AtomicU64::new(0);
static UNKNOWN_COMMANDS: AtomicU64 = AtomicU64::new(0);
static OVERSIZE_RESPONSES: AtomicU64 = AtomicU64::new(0);
static PERSIST_FAILURES: AtomicU64 = AtomicU64::new(0);
static COMMAND_LATENCY_SUM_US: AtomicU64 = AtomicU64::new(0);
static COMMAND_LATENCY_COUNT: AtomicU64 = AtomicU64::new(0);

static COMMAND_COUNTERS: OnceLock<Mutex<HashMap<&'static str, CommandCounter>>> = OnceLock::new();

pub fn inc_connections_accepted() {
    CONNECTIONS_ACCEPTED.fetch_add(1, Ordering::Relaxed);
    let active = CONNECTIONS_ACTIVE.fetch_add(1, Ordering::Relaxed) + 1;
    CONNECTIONS_PEAK.fetch_max(active, Ordering::Relaxed);
}

pub fn dec_connections_active() {
    let _ = CONNECTIONS_ACTIVE.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
}

pub fn inc_framing_errors() {
    FRAMING_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_unknown_commands() {
    UNKNOWN_COMMANDS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_oversize_responses() {
    OVERSIZE_RESPONSES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_persist_failures() {
    PERSIST_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommandCounter {
    pub handled: u64,
    pub rejected: u64,
}

fn command_counter_lock() -> MutexGuard<'static, HashMap<&'static str, CommandCounter>> {
    COMMAND_COUNTERS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Count one handled command; `ok` is false when it answered with an error.
pub fn record_command(name: &'static str, ok: bool, started: Instant) -> CommandCounter {
    let us = started.elapsed().as_micros().min(u128::from(u64::MAX)) as u64;
    COMMAND_LATENCY_SUM_US.fetch_add(us, Ordering::Relaxed);
    COMMAND_LATENCY_COUNT.fetch_add(1, Ordering::Relaxed);

    let mut guard = command_counter_lock();
    let counter = guard.entry(name).or_default();
    counter.handled = counter.handled.saturating_add(1);
    if !ok {
        counter.rejected = counter.rejected.saturating_add(1);
    }
    *counter
}

pub fn command_counters_snapshot() -> HashMap<&'static str, CommandCounter> {
    command_counter_lock().clone()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    pub connections_peak: u64,
    pub framing_errors: u64,
    pub unknown_commands: u64,
    pub oversize_responses: u64,
    pub persist_failures: u64,
    pub commands_handled: u64,
    pub command_latency_avg_us: Option<u64>,
}

pub fn snapshot() -> Snapshot {
    let sum = COMMAND_LATENCY_SUM_US.load(Ordering::Relaxed);
    let count = COMMAND_LATENCY_COUNT.load(Ordering::Relaxed);
    Snapshot {
        connections_accepted: CONNECTIONS_ACCEPTED.load(Ordering::Relaxed),
        connections_active: CONNECTIONS_ACTIVE.load(Ordering::Relaxed),
        connections_peak: CONNECTIONS_PEAK.load(Ordering::Relaxed),
        framing_errors: FRAMING_ERRORS.load(Ordering::Relaxed),
        unknown_commands: UNKNOWN_COMMANDS.load(Ordering::Relaxed),
        oversize_responses: OVERSIZE_RESPONSES.load(Ordering::Relaxed),
        persist_failures: PERSIST_FAILURES.load(Ordering::Relaxed),
        commands_handled: count,
        command_latency_avg_us: if count > 0 { Some(sum / count) } else { None },
    }
}
