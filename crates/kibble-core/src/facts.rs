//! Fact storage, payload extraction and display ordering.

mod json;

pub use json::extract_facts;

use heapless::{String, Vec};
use log::debug;

use crate::time::has_elapsed;

pub const MAX_FACTS: usize = 64;
pub const FACT_BYTES: usize = 280;
pub const FACT_REFRESH_INTERVAL_MS: u32 = 3_600_000;
pub const API_RETRY_DELAY_MS: u32 = 10_000;

pub type Fact = String<FACT_BYTES>;
pub type FactList = Vec<Fact, MAX_FACTS>;

/// Why a fact fetch produced nothing usable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchError {
    InvalidUrl,
    Network,
    Http(u16),
    MalformedResponse,
    ResponseTooLarge,
    Parse,
    Empty,
}

/// In-place Fisher-Yates shuffle.
///
/// `next_random` supplies raw random words; only the low 16 bits are used.
pub fn shuffle<T, R>(items: &mut [T], mut next_random: R)
where
    R: FnMut() -> u32,
{
    for i in (1..items.len()).rev() {
        let j = (next_random() & 0xFFFF) as usize % (i + 1);
        items.swap(i, j);
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CycleStep {
    /// Fetch a fresh list, then report back with [`FactCycle::refreshed`].
    Refresh,
    Show(usize),
}

/// Walks the fact list in a fresh random order on every pass and decides
/// when the list is due for a refresh.
#[derive(Debug)]
pub struct FactCycle {
    order: Vec<u8, MAX_FACTS>,
    position: usize,
    last_refresh_ms: u32,
    refresh_requested: bool,
}

impl FactCycle {
    pub fn new(now_ms: u32) -> Self {
        Self {
            order: Vec::new(),
            position: 0,
            last_refresh_ms: now_ms,
            refresh_requested: false,
        }
    }

    pub fn next<R>(&mut self, fact_count: usize, now_ms: u32, next_random: R) -> CycleStep
    where
        R: FnMut() -> u32,
    {
        let fact_count = fact_count.min(MAX_FACTS);
        if fact_count == 0
            || self.refresh_requested
            || has_elapsed(now_ms, self.last_refresh_ms, FACT_REFRESH_INTERVAL_MS)
        {
            return CycleStep::Refresh;
        }

        if self.position == 0 || self.order.len() != fact_count {
            self.reshuffle(fact_count, next_random);
        }

        let index = self.order[self.position] as usize;
        self.position += 1;
        if self.position >= self.order.len() {
            self.position = 0;
        }
        CycleStep::Show(index)
    }

    /// Records the outcome of a refresh.
    ///
    /// Either way the interval restarts; a successful refresh also starts a
    /// new pass over the new list.
    pub fn refreshed(&mut self, now_ms: u32, success: bool) {
        self.last_refresh_ms = now_ms;
        self.refresh_requested = false;
        if success {
            self.position = 0;
            self.order.clear();
        }
    }

    /// Makes the next step a refresh, e.g. after the source changed.
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    fn reshuffle<R>(&mut self, fact_count: usize, next_random: R)
    where
        R: FnMut() -> u32,
    {
        self.order.clear();
        for index in 0..fact_count {
            // fact_count <= MAX_FACTS, which fits in u8.
            let _ = self.order.push(index as u8);
        }
        shuffle(&mut self.order, next_random);
        self.position = 0;
        debug!("facts: new pass over {} facts", fact_count);
    }
}
