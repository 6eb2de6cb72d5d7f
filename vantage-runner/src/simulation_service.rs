//! Background Monte Carlo service with a TTL cache.
//!
//! Simulations run on a private rayon pool, never on the caller's hot path
//! unless the caller explicitly asks to wait. Each key has at most one
//! simulation in flight:
//!
//! - [`RiskSimulationService::request`] never blocks. It returns whatever
//!   is cached and schedules a refresh when the entry is missing or expired.
//! - [`RiskSimulationService::get_or_wait`] returns a fresh result, joining
//!   an in-flight simulation instead of starting a second one.
//!
//! Failures are cached for the same TTL, so a symbol with too little history
//! is not re-simulated on every signal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vantage_core::domain::{Direction, Timeframe};
use vantage_core::AnalyticsError;

use crate::config::AnalyticsConfig;
use crate::monte_carlo::{MonteCarloSimulator, RiskSimulationResult, SimulationRequest};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("build simulation pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("simulation failed: {0}")]
    Simulation(#[from] AnalyticsError),
}

/// Cache key. Direction is part of the key because win probability and
/// VaR are read from the position's side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
}

impl SimulationKey {
    pub fn of(req: &SimulationRequest) -> Self {
        Self {
            symbol: req.symbol.clone(),
            timeframe: req.timeframe,
            direction: req.direction,
        }
    }
}

/// What a non-blocking lookup found.
#[derive(Debug, Clone)]
pub enum SimulationStatus {
    /// Within TTL.
    Ready(Arc<RiskSimulationResult>),
    /// Expired; a refresh is running or was just scheduled.
    Stale(Arc<RiskSimulationResult>),
    /// Nothing cached yet; the first simulation is running.
    Pending,
    /// The latest attempt failed and is still within its cooldown.
    Failed(AnalyticsError),
}

impl SimulationStatus {
    pub fn result(&self) -> Option<&Arc<RiskSimulationResult>> {
        match self {
            SimulationStatus::Ready(r) | SimulationStatus::Stale(r) => Some(r),
            SimulationStatus::Pending | SimulationStatus::Failed(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    last_good: Option<Arc<RiskSimulationResult>>,
    last_error: Option<AnalyticsError>,
    finished_at: Option<Instant>,
    in_flight: bool,
}

impl Slot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.finished_at.is_some_and(|t| t.elapsed() < ttl)
    }

    fn settled(&self) -> Result<Arc<RiskSimulationResult>, AnalyticsError> {
        if let Some(err) = &self.last_error {
            return Err(err.clone());
        }
        self.last_good
            .clone()
            .ok_or_else(|| AnalyticsError::invariant("finished simulation slot holds no result"))
    }
}

struct Shared {
    simulator: MonteCarloSimulator,
    ttl: Duration,
    slots: Mutex<HashMap<SimulationKey, Slot>>,
    finished: Condvar,
    runs: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<SimulationKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, key: &SimulationKey, req: &SimulationRequest) -> Result<Arc<RiskSimulationResult>, AnalyticsError> {
        let started = Instant::now();
        self.runs.fetch_add(1, Ordering::Relaxed);
        let outcome = self.simulator.simulate(req).map(Arc::new);
        tracing::debug!(
            symbol = %key.symbol,
            timeframe = %key.timeframe,
            direction = %key.direction,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "monte carlo simulation finished"
        );

        let mut slots = self.lock();
        let slot = slots.entry(key.clone()).or_default();
        match &outcome {
            Ok(result) => {
                slot.last_good = Some(Arc::clone(result));
                slot.last_error = None;
            }
            Err(err) => slot.last_error = Some(err.clone()),
        }
        slot.finished_at = Some(Instant::now());
        slot.in_flight = false;
        drop(slots);
        self.finished.notify_all();
        outcome
    }
}

pub struct RiskSimulationService {
    shared: Arc<Shared>,
    pool: Arc<rayon::ThreadPool>,
}

impl RiskSimulationService {
    /// `worker_threads == 0` sizes the pool to the machine.
    pub fn new(
        simulator: MonteCarloSimulator,
        ttl: Duration,
        worker_threads: usize,
    ) -> Result<Self, ServiceError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("vantage-mc-{i}"))
            .build()?;
        Ok(Self {
            shared: Arc::new(Shared {
                simulator,
                ttl,
                slots: Mutex::new(HashMap::new()),
                finished: Condvar::new(),
                runs: AtomicU64::new(0),
            }),
            pool: Arc::new(pool),
        })
    }

    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, ServiceError> {
        let simulator = MonteCarloSimulator::new(config.monte_carlo.clone())?;
        Self::new(simulator, config.service.cache_ttl(), config.service.worker_threads)
    }

    pub fn ttl(&self) -> Duration {
        self.shared.ttl
    }

    /// Total simulations started since construction.
    pub fn simulations_run(&self) -> u64 {
        self.shared.runs.load(Ordering::Relaxed)
    }

    /// Non-blocking lookup; schedules a background refresh when needed.
    pub fn request(&self, req: SimulationRequest) -> SimulationStatus {
        let key = SimulationKey::of(&req);
        let mut slots = self.shared.lock();
        let slot = slots.entry(key.clone()).or_default();
        let fresh = slot.is_fresh(self.shared.ttl);

        let status = if fresh {
            match slot.settled() {
                Ok(result) => SimulationStatus::Ready(result),
                Err(err) => SimulationStatus::Failed(err),
            }
        } else {
            match &slot.last_good {
                Some(result) => SimulationStatus::Stale(Arc::clone(result)),
                None => SimulationStatus::Pending,
            }
        };

        if !fresh && !slot.in_flight {
            slot.in_flight = true;
            drop(slots);
            tracing::debug!(symbol = %key.symbol, timeframe = %key.timeframe, "simulation cache miss, scheduling");
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || {
                let _ = shared.run(&key, &req);
            });
        } else {
            tracing::debug!(symbol = %key.symbol, timeframe = %key.timeframe, fresh, "simulation cache hit");
        }
        status
    }

    /// Fresh result for `req`, waiting for an in-flight run or running one
    /// on the private pool.
    pub fn get_or_wait(&self, req: SimulationRequest) -> Result<Arc<RiskSimulationResult>, ServiceError> {
        let key = SimulationKey::of(&req);
        let mut slots = self.shared.lock();
        loop {
            let slot = slots.entry(key.clone()).or_default();
            if slot.in_flight {
                slots = self
                    .shared
                    .finished
                    .wait(slots)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            if slot.is_fresh(self.shared.ttl) {
                tracing::debug!(symbol = %key.symbol, timeframe = %key.timeframe, "simulation cache hit");
                return Ok(slot.settled()?);
            }
            slot.in_flight = true;
            break;
        }
        drop(slots);

        let shared = Arc::clone(&self.shared);
        Ok(self.pool.install(|| shared.run(&key, &req))?)
    }

    /// Cached result regardless of age, without scheduling anything.
    pub fn cached(&self, key: &SimulationKey) -> Option<Arc<RiskSimulationResult>> {
        self.shared.lock().get(key).and_then(|s| s.last_good.clone())
    }
}

impl std::fmt::Debug for RiskSimulationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskSimulationService")
            .field("ttl", &self.shared.ttl)
            .field("threads", &self.pool.current_num_threads())
            .field("simulations_run", &self.simulations_run())
            .finish()
    }
}
