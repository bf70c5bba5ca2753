//! Fixed-size value types shared by every layer
//!
//! Identifiers and instrument codes live inline (no heap) so that events can be
//! `Copy` and sit in pool slots without owning allocations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum instrument code length in bytes
pub const MAX_INSTRUMENT_LENGTH: usize = 32;

/// Maximum exchange code length in bytes
pub const MAX_EXCHANGE_LENGTH: usize = 16;

/// Inline UTF-8 string of at most `N` bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InlineStr<const N: usize> {
    len: u8,
    bytes: [u8; N],
}

impl<const N: usize> InlineStr<N> {
    /// Empty value
    pub const EMPTY: Self = Self {
        len: 0,
        bytes: [0; N],
    };

    /// Copy `s` inline; `None` if it does not fit
    pub fn new(s: &str) -> Option<Self> {
        if s.len() > N || s.len() > u8::MAX as usize {
            return None;
        }
        let mut bytes = [0u8; N];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Some(Self {
            len: s.len() as u8,
            bytes,
        })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // Only ever filled from a &str, at a char boundary
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }
}

impl<const N: usize> Default for InlineStr<N> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<const N: usize> fmt::Debug for InlineStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<const N: usize> fmt::Display for InlineStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> PartialEq<str> for InlineStr<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<const N: usize> PartialEq<&str> for InlineStr<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Instrument code, e.g. "rb2410" or "BTC-USD"
pub type Symbol = InlineStr<MAX_INSTRUMENT_LENGTH>;

/// Exchange code, e.g. "SHFE"
pub type ExchangeCode = InlineStr<MAX_EXCHANGE_LENGTH>;

/// Identifier of a strategy or executer instance carried on events
pub type UnitId = InlineStr<MAX_INSTRUMENT_LENGTH>;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Severity levels of the logging capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of an adapter as tracked by its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterState {
    /// Added, no lifecycle call made yet
    Registered,
    /// `init` succeeded, not connected yet
    Initialized,
    /// Ready for dispatch
    Connected,
    /// `init` or `connect` failed
    Error,
    /// Disconnected at shutdown
    Disconnected,
}

impl AdapterState {
    /// Ready adapters receive broadcast dispatch
    #[inline]
    pub fn is_ready(self) -> bool {
        matches!(self, AdapterState::Connected)
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Fixed-point helpers (9 decimal places)
pub mod fixed_point {
    /// Scale factor for 9 decimal places
    pub const SCALE: i64 = 1_000_000_000;

    #[inline(always)]
    pub fn from_f64(value: f64) -> i64 {
        (value * SCALE as f64).round() as i64
    }

    #[inline(always)]
    pub fn to_f64(value: i64) -> f64 {
        value as f64 / SCALE as f64
    }
}
