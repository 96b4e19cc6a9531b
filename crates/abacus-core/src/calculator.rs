use crate::calculation::{Calculation, CalculationRecord};
use crate::config::{CalculatorConfig, parse_decimal_text};
use crate::error::{CalculatorError, Result};
use crate::memento::HistorySnapshot;
use crate::observer::HistoryObserver;
use crate::operations;
use crate::persistence::{CsvHistoryStore, HistoryStore};
use chrono::Utc;
use rust_decimal::Decimal;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Engine shared between threads; the lock guards history and both stacks as one unit
pub type SharedCalculator = Arc<Mutex<Calculator>>;

/// Calculator session engine - owns the history and its undo/redo stacks
pub struct Calculator {
    config: CalculatorConfig,
    history: Vec<Calculation>,
    undo_stack: Vec<HistorySnapshot>,
    redo_stack: Vec<HistorySnapshot>,
    observers: Vec<Box<dyn HistoryObserver>>,
    store: Box<dyn HistoryStore>,
}

impl Calculator {
    /// Create an engine backed by the CSV history file from `config`, in its
    /// configured encoding
    #[instrument(skip_all)]
    pub fn new(mut config: CalculatorConfig) -> Result<Self> {
        config.validate()?;
        let store = CsvHistoryStore::with_encoding(config.history_file(), config.history_encoding()?);
        Self::assemble(config, Box::new(store))
    }

    /// Create an engine with a custom history store
    pub fn with_store(mut config: CalculatorConfig, store: Box<dyn HistoryStore>) -> Result<Self> {
        config.validate()?;
        Self::assemble(config, store)
    }

    fn assemble(config: CalculatorConfig, store: Box<dyn HistoryStore>) -> Result<Self> {
        info!(
            history_file = %store.location().display(),
            max_history_size = config.max_history_size,
            precision = config.precision,
            "Creating calculator engine"
        );
        Ok(Self {
            history: Vec::with_capacity(config.max_history_size.min(1024)),
            config,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            observers: Vec::new(),
            store,
        })
    }

    /// Wrap the engine for use from several threads
    pub fn into_shared(self) -> SharedCalculator {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Register an observer; notification follows registration order
    pub fn add_observer(&mut self, observer: Box<dyn HistoryObserver>) {
        info!(observer = observer.name(), "Observer added");
        self.observers.push(observer);
    }

    /// Resolve, validate, execute and record one calculation.
    ///
    /// Operands are taken in their text form, so strings, integers and
    /// decimals are all accepted. On any validation or arithmetic failure the
    /// history and both stacks are left untouched. An observer failure is
    /// returned after the calculation has been recorded.
    #[instrument(skip(self, a, b))]
    pub fn perform(
        &mut self,
        op_name: &str,
        a: impl fmt::Display,
        b: impl fmt::Display,
    ) -> Result<Decimal> {
        let operation = operations::resolve(op_name)?;
        let operand1 = self.validate_operand(&a.to_string())?;
        let operand2 = self.validate_operand(&b.to_string())?;

        let result = operation
            .execute(operand1, operand2, self.config.precision)
            .map_err(|source| CalculatorError::Operation {
                operation: operation.name().to_string(),
                source,
            })?;

        self.checkpoint();
        let calculation = Calculation::new(op_name, operand1, operand2, result, Utc::now());
        self.history.push(calculation.clone());
        self.enforce_bound();
        debug!(
            operation = %operation,
            %result,
            history_len = self.history.len(),
            "Recorded calculation"
        );

        self.notify(&calculation)?;
        Ok(result)
    }

    /// Restore the history before the last action; false when there is nothing to undo
    #[instrument(skip(self))]
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            debug!("Nothing to undo");
            return false;
        };
        self.redo_stack.push(self.snapshot());
        self.history = snapshot.into_history();
        info!(history_len = self.history.len(), "Undo applied");
        true
    }

    /// Reapply the last undone action; false when there is nothing to redo
    #[instrument(skip(self))]
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            debug!("Nothing to redo");
            return false;
        };
        self.undo_stack.push(self.snapshot());
        self.history = snapshot.into_history();
        info!(history_len = self.history.len(), "Redo applied");
        true
    }

    /// Empty the history and both stacks
    #[instrument(skip(self))]
    pub fn clear(&mut self) {
        self.history.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        info!("History cleared");
    }

    /// Write the full history to the configured store
    #[instrument(skip(self))]
    pub fn save_history(&self) -> Result<PathBuf> {
        let path = self.store.save(&self.history)?;
        info!(path = %path.display(), records = self.history.len(), "History saved");
        Ok(path)
    }

    /// Replace the history with the stored one.
    ///
    /// A missing history file is not an error. Only the most recent
    /// `max_history_size` records are kept, and the replacement can be undone.
    #[instrument(skip(self))]
    pub fn load_history(&mut self) -> Result<()> {
        let Some(mut loaded) = self.store.load()? else {
            info!(path = %self.store.location().display(), "No history file");
            return Ok(());
        };

        let limit = self.config.max_history_size;
        if loaded.len() > limit {
            warn!(
                records = loaded.len(),
                max_history_size = limit,
                "Stored history exceeds bound, keeping most recent records"
            );
            let excess = loaded.len() - limit;
            loaded.drain(..excess);
        }

        self.checkpoint();
        self.history = loaded;
        info!(records = self.history.len(), "Loaded history records");
        Ok(())
    }

    /// Read-only projection of the history, one record per calculation
    pub fn history_view(&self) -> Vec<CalculationRecord> {
        self.history.iter().map(Calculation::to_record).collect()
    }

    pub fn history(&self) -> &[Calculation] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Most recent calculation
    pub fn last(&self) -> Option<&Calculation> {
        self.history.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    fn validate_operand(&self, raw: &str) -> Result<Decimal> {
        let value = parse_decimal_text(raw)
            .ok_or_else(|| CalculatorError::validation(raw, format!("Invalid number: {raw}")))?;
        if value.abs() > self.config.max_input_value {
            return Err(CalculatorError::validation(raw, format!("Value out of bounds: {raw}")));
        }
        Ok(value)
    }

    fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::capture(&self.history)
    }

    /// Save the current history for undo; a new action invalidates redo
    fn checkpoint(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
    }

    /// Evict oldest entries first until the history fits the bound
    fn enforce_bound(&mut self) {
        let excess = self.history.len().saturating_sub(self.config.max_history_size);
        if excess > 0 {
            self.history.drain(..excess);
            debug!(evicted = excess, "Evicted oldest calculations");
        }
    }

    fn notify(&self, calculation: &Calculation) -> Result<()> {
        for observer in &self.observers {
            observer.update(self, calculation).inspect_err(|e| {
                warn!(observer = observer.name(), error = %e, "Observer failed");
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculator")
            .field("history_len", &self.history.len())
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("observers", &self.observers.iter().map(|o| o.name()).collect::<Vec<_>>())
            .field("store", &self.store.location())
            .finish()
    }
}
