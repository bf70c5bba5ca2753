//! Simulated market-data parser
//!
//! Random-walk top-of-book for every subscribed symbol, emitted from a
//! dedicated feed thread at a fixed interval. Stands in for an exchange feed
//! handler in tests and dry runs.
//!
//! Parameters (entry of the `parsers` section):
//! - `symbols`: symbols to publish besides the ones strategies subscribe to
//! - `tick_interval_us` (1000), `base_price` (100.0), `volatility_bps` (5.0)
//! - `seed`: fixed RNG seed for reproducible runs
//! - `exchange` ("SIM")
//! - `fail_connect`: make `connect` fail, for exercising partial startup

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use yz_core::core::ExchangeCode;
use yz_core::prelude::*;

pub const MODULE: &str = "sim";

#[derive(Debug, Clone, Deserialize)]
struct SimSettings {
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default = "default_tick_interval_us")]
    tick_interval_us: u64,
    #[serde(default = "default_base_price")]
    base_price: f64,
    #[serde(default = "default_volatility_bps")]
    volatility_bps: f64,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default = "default_exchange")]
    exchange: String,
    #[serde(default)]
    fail_connect: bool,
}

fn default_tick_interval_us() -> u64 {
    1_000
}

fn default_base_price() -> f64 {
    100.0
}

fn default_volatility_bps() -> f64 {
    5.0
}

fn default_exchange() -> String {
    "SIM".to_string()
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            tick_interval_us: default_tick_interval_us(),
            base_price: default_base_price(),
            volatility_bps: default_volatility_bps(),
            seed: None,
            exchange: default_exchange(),
            fail_connect: false,
        }
    }
}

/// Random-walk feed
pub struct SimParser {
    ctx: ParserContext,
    settings: Mutex<SimSettings>,
    symbols: Arc<Mutex<Vec<Symbol>>>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    emitted: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl SimParser {
    pub fn new(ctx: ParserContext) -> Self {
        Self {
            ctx,
            settings: Mutex::new(SimSettings::default()),
            symbols: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            emitted: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Ticks handed to the engine
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Ticks dropped because the engine queue stayed full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn subscriptions(&self) -> Vec<Symbol> {
        self.symbols.lock().clone()
    }

    fn add_symbols(&self, symbols: &[Symbol]) {
        let mut current = self.symbols.lock();
        for symbol in symbols {
            if !current.contains(symbol) {
                current.push(*symbol);
            }
        }
    }
}

impl Adapter for SimParser {
    fn id(&self) -> &str {
        &self.ctx.id
    }

    fn init(&self, config: &ConfigNode) -> Result<(), AdapterError> {
        let settings: SimSettings = config
            .deserialize()
            .map_err(|e| AdapterError::Init(format!("{}: {}", self.ctx.id, e)))?;

        if settings.tick_interval_us == 0 {
            return Err(AdapterError::Init(format!(
                "{}: tick_interval_us must be positive",
                self.ctx.id
            )));
        }
        if settings.base_price <= 0.0 {
            return Err(AdapterError::Init(format!(
                "{}: base_price must be positive",
                self.ctx.id
            )));
        }
        if ExchangeCode::new(&settings.exchange).is_none() {
            return Err(AdapterError::Init(format!(
                "{}: exchange code '{}' is too long",
                self.ctx.id, settings.exchange
            )));
        }

        let mut symbols = Vec::with_capacity(settings.symbols.len());
        for name in &settings.symbols {
            let symbol = Symbol::new(name).ok_or_else(|| {
                AdapterError::Init(format!("{}: symbol '{}' is too long", self.ctx.id, name))
            })?;
            symbols.push(symbol);
        }
        self.add_symbols(&symbols);

        *self.settings.lock() = settings;
        Ok(())
    }

    fn connect(&self) -> Result<(), AdapterError> {
        let settings = self.settings.lock().clone();
        if settings.fail_connect {
            return Err(AdapterError::Connect(format!(
                "{}: simulated connect failure",
                self.ctx.id
            )));
        }

        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::Release);
        let feed = Feed {
            ctx: self.ctx.clone(),
            symbols: Arc::clone(&self.symbols),
            running: Arc::clone(&self.running),
            emitted: Arc::clone(&self.emitted),
            dropped: Arc::clone(&self.dropped),
            exchange: ExchangeCode::new(&settings.exchange).unwrap_or_default(),
            rng: match settings.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
            settings,
        };

        let handle = std::thread::Builder::new()
            .name(format!("sim-{}", self.ctx.id))
            .spawn(move || feed.run())
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                AdapterError::Connect(format!("{}: feed thread: {}", self.ctx.id, e))
            })?;

        *worker = Some(handle);
        self.ctx.logger.info(&format!("sim parser '{}' connected", self.ctx.id));
        Ok(())
    }

    fn disconnect(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                self.ctx
                    .logger
                    .error(&format!("sim parser '{}' feed thread panicked", self.ctx.id));
            }
            self.ctx.logger.info(&format!(
                "sim parser '{}' disconnected after {} ticks ({} dropped)",
                self.ctx.id,
                self.emitted(),
                self.dropped()
            ));
        }
    }
}

impl ParserAdapter for SimParser {
    fn subscribe(&self, symbols: &[Symbol]) -> Result<(), AdapterError> {
        self.add_symbols(symbols);
        self.ctx.logger.debug(&format!(
            "sim parser '{}' now publishing {} symbols",
            self.ctx.id,
            self.symbols.lock().len()
        ));
        Ok(())
    }
}

impl Drop for SimParser {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// State owned by the feed thread
struct Feed {
    ctx: ParserContext,
    symbols: Arc<Mutex<Vec<Symbol>>>,
    running: Arc<AtomicBool>,
    emitted: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    exchange: ExchangeCode,
    rng: StdRng,
    settings: SimSettings,
}

impl Feed {
    fn run(mut self) {
        let interval = Duration::from_micros(self.settings.tick_interval_us);
        let mut prices: HashMap<Symbol, f64> = HashMap::new();
        let mut sequence = 0u64;
        let mut batch: Vec<Symbol> = Vec::new();

        while self.running.load(Ordering::Acquire) {
            batch.clear();
            batch.extend(self.symbols.lock().iter().copied());

            for symbol in &batch {
                sequence += 1;
                let price = prices
                    .entry(*symbol)
                    .or_insert(self.settings.base_price);
                let step = self.rng.gen_range(-1.0..=1.0) * self.settings.volatility_bps / 10_000.0;
                *price = (*price * (1.0 + step)).max(0.01);

                let event = quote(*symbol, self.exchange, *price, sequence);
                match self.ctx.emit_timeout(event, interval) {
                    Ok(()) => {
                        self.emitted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(AdapterError::Rejected(_)) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        // Engine side is gone
                        self.running.store(false, Ordering::Release);
                        return;
                    }
                }
            }

            std::thread::sleep(interval);
        }
    }
}

/// One-basis-point wide quote around `mid`
fn quote(symbol: Symbol, exchange: ExchangeCode, mid: f64, sequence: u64) -> MarketEvent {
    let half_spread = mid * 0.5 / 10_000.0;
    let ts = now_ns();
    MarketEvent {
        symbol,
        exchange,
        sequence,
        exchange_ts_ns: ts,
        local_ts_ns: 0,
        bid_price: fixed_point::from_f64(mid - half_spread),
        bid_qty: fixed_point::from_f64(10.0),
        ask_price: fixed_point::from_f64(mid + half_spread),
        ask_qty: fixed_point::from_f64(10.0),
        last_price: fixed_point::from_f64(mid),
        volume: 1,
    }
}
