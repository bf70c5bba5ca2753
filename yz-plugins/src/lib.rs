//! YZ Plugins - stand-in adapters, executers and strategies
//!
//! Concrete modules the `yz-runner` binary links into its module catalog.
//! None of them speaks an exchange protocol; they exist so the core can be
//! run end to end and exercised in tests.
//!
//! | Kind     | Name       | Type                                   |
//! |----------|------------|----------------------------------------|
//! | parser   | `sim`      | [`SimParser`] - random-walk quotes     |
//! | trader   | `paper`    | [`PaperTrader`] - fills at limit price |
//! | executer | `direct`   | [`DirectExecuter`] - one order/signal  |
//! | strategy | `momentum` | [`Momentum`] - mid-price momentum      |
//!
//! ```rust,ignore
//! let mut catalog = ModuleCatalog::new();
//! yz_plugins::register(&mut catalog)?;
//! let mut runner = EngineRunner::new(catalog);
//! ```

pub mod direct_executer;
pub mod momentum;
pub mod paper_trader;
pub mod sim_parser;

pub use direct_executer::DirectExecuter;
pub use momentum::Momentum;
pub use paper_trader::{PaperStats, PaperTrader};
pub use sim_parser::SimParser;

use std::sync::Arc;
use yz_core::core::RegistryError;
use yz_core::registry::{ModuleCatalog, ParserAdapter, TraderAdapter};

/// Add every module of this crate to `catalog`
pub fn register(catalog: &mut ModuleCatalog) -> Result<(), RegistryError> {
    catalog.register_parser(sim_parser::MODULE, |ctx| {
        Ok(Arc::new(SimParser::new(ctx)) as Arc<dyn ParserAdapter>)
    })?;
    catalog.register_trader(paper_trader::MODULE, |ctx| {
        Ok(Arc::new(PaperTrader::new(ctx)) as Arc<dyn TraderAdapter>)
    })?;
    catalog.register_executer(direct_executer::TYPE, direct_executer::creator())?;
    catalog.register_strategy(momentum::TYPE, momentum::creator())?;
    Ok(())
}

/// Catalog holding exactly this crate's modules
pub fn catalog() -> Result<ModuleCatalog, RegistryError> {
    let mut catalog = ModuleCatalog::new();
    register(&mut catalog)?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all_modules() {
        let catalog = catalog().unwrap();
        assert!(catalog.parser("sim").is_ok());
        assert!(catalog.trader("paper").is_ok());
        assert!(catalog.strategy("momentum").is_ok());
        assert_eq!(catalog.executer_types().len(), 1);
    }

    #[test]
    fn test_register_twice_fails() {
        let mut catalog = catalog().unwrap();
        assert!(matches!(
            register(&mut catalog),
            Err(RegistryError::DuplicateIdentifier(_))
        ));
    }
}
