//! Synthetic event feeds.
//!
//! Stand-ins for a real market-data and broker integration. Both generators
//! keep their state private and start from fixed baselines, so a restarted
//! feed never resumes where a previous one stopped.

use std::ops::RangeInclusive;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::messages::{PnlUpdate, ServerEvent, Tick};
use super::source::EventSource;
use crate::config::Instrument;

/// Largest absolute price move per cycle.
const MAX_PRICE_STEP: f64 = 50.0;

/// Range of synthetic traded volume.
const VOLUME_RANGE: RangeInclusive<u64> = 100_000..=5_000_000;

/// Strategy id reported by the synthetic P&L feed.
pub const DEMO_STRATEGY_ID: &str = "test-strategy-1";

/// Rounds to a fixed number of decimal places.
fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone)]
struct PriceState {
    symbol: String,
    last_price: f64,
}

/// Random-walk tick generator.
#[derive(Debug)]
pub struct TickGenerator {
    prices: Vec<PriceState>,
    rng: StdRng,
    interval: Duration,
}

impl TickGenerator {
    /// Creates a generator seeded from the OS.
    #[must_use]
    pub fn new(instruments: &[Instrument], interval: Duration) -> Self {
        Self::with_rng(instruments, interval, StdRng::from_os_rng())
    }

    /// Creates a deterministic generator.
    #[must_use]
    pub fn with_seed(instruments: &[Instrument], interval: Duration, seed: u64) -> Self {
        Self::with_rng(instruments, interval, StdRng::seed_from_u64(seed))
    }

    fn with_rng(instruments: &[Instrument], interval: Duration, rng: StdRng) -> Self {
        Self {
            prices: instruments
                .iter()
                .map(|i| PriceState {
                    symbol: i.symbol.clone(),
                    last_price: i.base_price,
                })
                .collect(),
            rng,
            interval,
        }
    }

    /// Returns the current unrounded price of a symbol.
    #[must_use]
    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.prices
            .iter()
            .find(|p| p.symbol == symbol)
            .map(|p| p.last_price)
    }

    /// Advances every instrument by one random step.
    pub fn step(&mut self) -> Vec<Tick> {
        let timestamp = Utc::now();
        let rng = &mut self.rng;

        self.prices
            .iter_mut()
            .map(|state| {
                let base = state.last_price;
                let change = rng.random_range(-MAX_PRICE_STEP..MAX_PRICE_STEP);
                let price = base + change;
                state.last_price = price;

                Tick {
                    symbol: state.symbol.clone(),
                    ltp: round_to(price, 2),
                    change: round_to(change, 2),
                    change_percent: round_to(change / base * 100.0, 4),
                    volume: rng.random_range(VOLUME_RANGE),
                    timestamp,
                }
            })
            .collect()
    }
}

impl EventSource for TickGenerator {
    fn next_batch(&mut self) -> Vec<ServerEvent> {
        self.step()
            .into_iter()
            .map(|data| ServerEvent::Tick { data })
            .collect()
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Random P&L snapshot generator for a single strategy.
#[derive(Debug)]
pub struct PnlGenerator {
    strategy_id: String,
    rng: StdRng,
    interval: Duration,
}

impl PnlGenerator {
    /// Creates a generator seeded from the OS.
    #[must_use]
    pub fn new(strategy_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            rng: StdRng::from_os_rng(),
            interval,
        }
    }

    /// Creates a deterministic generator.
    #[must_use]
    pub fn with_seed(strategy_id: impl Into<String>, interval: Duration, seed: u64) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            rng: StdRng::seed_from_u64(seed),
            interval,
        }
    }

    /// Produces one snapshot.
    pub fn sample(&mut self) -> PnlUpdate {
        PnlUpdate {
            strategy_id: self.strategy_id.clone(),
            current_pnl: round_to(self.rng.random_range(-1000.0..5000.0), 2),
            total_pnl: round_to(self.rng.random_range(0.0..50_000.0), 2),
            open_positions: self.rng.random_range(0..=5),
            timestamp: Utc::now(),
        }
    }
}

impl EventSource for PnlGenerator {
    fn next_batch(&mut self) -> Vec<ServerEvent> {
        vec![ServerEvent::Pnl {
            data: self.sample(),
        }]
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_instruments;

    fn generator(seed: u64) -> TickGenerator {
        TickGenerator::with_seed(&default_instruments(), Duration::from_secs(1), seed)
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-0.123_456, 4), -0.1235);
    }

    #[test]
    fn test_one_tick_per_instrument_in_order() {
        let mut gen = generator(7);
        let ticks = gen.step();

        let symbols: Vec<&str> = ticks.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, ["NIFTY", "BANKNIFTY", "FINNIFTY"]);
    }

    #[test]
    fn test_first_cycle_starts_from_baseline() {
        let mut gen = generator(11);
        let ticks = gen.step();

        for (tick, base) in ticks.iter().zip([21_500.0, 45_000.0, 19_500.0]) {
            assert!(tick.change.abs() <= MAX_PRICE_STEP);
            assert!((tick.ltp - (base + tick.change)).abs() < 0.011);
            let expected = tick.change / base * 100.0;
            assert!((tick.change_percent - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_change_percent_uses_price_before_update() {
        let mut gen = generator(42);
        gen.step();

        for _ in 0..20 {
            let before = gen.last_price("BANKNIFTY").expect("price");
            let tick = gen
                .step()
                .into_iter()
                .find(|t| t.symbol == "BANKNIFTY")
                .expect("tick");
            let after = gen.last_price("BANKNIFTY").expect("price");

            let change = after - before;
            assert!((tick.change - change).abs() < 0.006);
            assert!((tick.change_percent - change / before * 100.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_volume_within_range() {
        let mut gen = generator(3);
        for _ in 0..50 {
            for tick in gen.step() {
                assert!(VOLUME_RANGE.contains(&tick.volume));
            }
        }
    }

    #[test]
    fn test_same_seed_same_walk() {
        let mut a = generator(99);
        let mut b = generator(99);
        for _ in 0..5 {
            let ta: Vec<f64> = a.step().iter().map(|t| t.ltp).collect();
            let tb: Vec<f64> = b.step().iter().map(|t| t.ltp).collect();
            assert_eq!(ta, tb);
        }
    }

    #[test]
    fn test_fresh_generator_resets_state() {
        let mut walked = generator(5);
        for _ in 0..100 {
            walked.step();
        }
        let fresh = generator(6);
        assert_eq!(fresh.last_price("NIFTY"), Some(21_500.0));
        assert_eq!(fresh.last_price("UNKNOWN"), None);
    }

    #[test]
    fn test_tick_batch_is_tagged() {
        let mut gen = generator(1);
        let batch = gen.next_batch();
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|e| e.kind() == "tick"));
        assert_eq!(gen.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_pnl_sample_ranges() {
        let mut gen = PnlGenerator::with_seed(DEMO_STRATEGY_ID, Duration::from_secs(2), 8);
        for _ in 0..100 {
            let pnl = gen.sample();
            assert_eq!(pnl.strategy_id, DEMO_STRATEGY_ID);
            assert!((-1000.0..=5000.0).contains(&pnl.current_pnl));
            assert!((0.0..=50_000.0).contains(&pnl.total_pnl));
            assert!(pnl.open_positions <= 5);
        }
    }

    #[test]
    fn test_pnl_batch_is_single_event() {
        let mut gen = PnlGenerator::new(DEMO_STRATEGY_ID, Duration::from_secs(2));
        let batch = gen.next_batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind(), "pnl");
        assert_eq!(gen.interval(), Duration::from_secs(2));
    }
}
