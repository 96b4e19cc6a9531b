//! Observers notified after every successful calculation
//!
//! The engine calls [`HistoryObserver::update`] on each registered observer,
//! in registration order, once the new calculation is in the history. New
//! reactions are added by implementing the trait; the engine is unchanged.

use crate::calculation::Calculation;
use crate::calculator::Calculator;
use crate::error::Result;
use tracing::info;

/// A trait for calculation observers.
pub trait HistoryObserver: Send + Sync {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Reacts to `calculation`, which is already the last history entry
    fn update(&self, calculator: &Calculator, calculation: &Calculation) -> Result<()>;
}

/// Writes one structured log line per calculation
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl HistoryObserver for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    fn update(&self, _calculator: &Calculator, calculation: &Calculation) -> Result<()> {
        info!(
            operation = calculation.operation(),
            operand1 = %calculation.operand1(),
            operand2 = %calculation.operand2(),
            result = %calculation.result(),
            "calc: {}({}, {}) = {}",
            calculation.operation(),
            calculation.operand1(),
            calculation.operand2(),
            calculation.result()
        );
        Ok(())
    }
}

/// Saves the whole history after each calculation when auto-save is enabled
#[derive(Debug, Default)]
pub struct AutoSaveObserver;

impl HistoryObserver for AutoSaveObserver {
    fn name(&self) -> &str {
        "auto_save"
    }

    fn update(&self, calculator: &Calculator, _calculation: &Calculation) -> Result<()> {
        if calculator.config().auto_save {
            let path = calculator.save_history()?;
            info!(path = %path.display(), "Auto-saved history");
        }
        Ok(())
    }
}
