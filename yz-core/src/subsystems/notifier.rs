//! Event notifier - fans engine events out to operators

use crate::config::NotifierConfig;
use crate::core::{fixed_point, OrderEvent, OrderStatus, Signal};
use crate::subsystems::PolicyViolation;
use crate::utils::Logger;

/// Receives order and signal outcomes from the event loop
pub trait EventNotifier: Send + Sync {
    fn on_order(&self, event: &OrderEvent);

    fn on_rejected(&self, signal: &Signal, violation: &PolicyViolation);

    /// Free-form operator message
    fn notify(&self, message: &str);
}

/// Notifier that writes through the engine logger
#[derive(Debug, Clone)]
pub struct LogNotifier {
    logger: Logger,
    enabled: bool,
}

impl LogNotifier {
    pub fn new(logger: Logger, config: &NotifierConfig) -> Self {
        Self {
            logger,
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl EventNotifier for LogNotifier {
    fn on_order(&self, event: &OrderEvent) {
        if !self.enabled {
            return;
        }
        let message = format!(
            "order {} {} {} via {}: {:?} (filled {} @ {})",
            event.order_id,
            event.side,
            event.symbol,
            event.trader,
            event.status,
            fixed_point::to_f64(event.filled_qty),
            fixed_point::to_f64(event.fill_price),
        );
        match event.status {
            OrderStatus::Rejected => self.logger.warn(&message),
            _ => self.logger.info(&message),
        }
    }

    fn on_rejected(&self, signal: &Signal, violation: &PolicyViolation) {
        if self.enabled {
            self.logger.debug(&format!(
                "signal from {} on {} rejected: {}",
                signal.strategy, signal.symbol, violation
            ));
        }
    }

    fn notify(&self, message: &str) {
        if self.enabled {
            self.logger.info(message);
        }
    }
}
