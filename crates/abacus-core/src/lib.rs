#![deny(warnings)]
//! Calculator session engine for Abacus.
//!
//! The [`Calculator`] validates operands, dispatches to the arithmetic
//! [`Operation`]s, records each result as a [`Calculation`], keeps a bounded
//! history with snapshot-based undo/redo, and notifies registered
//! [`HistoryObserver`]s. History is persisted through a [`HistoryStore`].
//!
//! ```no_run
//! use abacus_core::{Calculator, CalculatorConfig};
//!
//! let mut calc = Calculator::new(CalculatorConfig::new("/tmp/abacus")).unwrap();
//! let sum = calc.perform("add", "2", "3").unwrap();
//! assert_eq!(sum.to_string(), "5");
//! assert!(calc.undo());
//! ```

/// Completed calculation records and their flat form
pub mod calculation;
/// Session engine
pub mod calculator;
/// Configuration defaults, files and environment overrides
pub mod config;
/// Error types
pub mod error;
/// History snapshots for undo/redo
pub mod memento;
/// Calculation observers
pub mod observer;
/// Operation registry
pub mod operations;
/// History storage adapters
pub mod persistence;

pub use calculation::{Calculation, CalculationRecord};
pub use calculator::{Calculator, SharedCalculator};
pub use config::CalculatorConfig;
pub use error::{CalculatorError, OperationFailure, Result};
pub use memento::HistorySnapshot;
pub use observer::{AutoSaveObserver, HistoryObserver, LoggingObserver};
pub use operations::{Operation, operation_names, resolve};
pub use persistence::{CsvHistoryStore, HistoryStore};
pub use rust_decimal::Decimal;
