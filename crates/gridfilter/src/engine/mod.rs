//! The filter engine: owned filter state over a data source.
//!
//! [`FilterEngine`] holds the current [`FilterModel`] and quick filter, and
//! every mutation returns the rows that now match. A mutation is committed
//! (history entry, new state, event) only after its rows were produced, so a
//! failed evaluation leaves the engine unchanged.
//!
//! Results go through two cache tiers keyed by [`CacheKey`]: an in-memory
//! [`ResultCache`] and, when configured, a persistent [`ResultStore`]. Writes
//! to the persistent tier run as detached tasks and never fail the caller.
//!
//! Mutating methods take `&mut self`. To share an engine between tasks wrap
//! it in [`SharedEngine`].
//!
//! # Example
//!
//! ```
//! use gridfilter::dataset::Dataset;
//! use gridfilter::engine::FilterEngine;
//! use gridfilter::model::{ColumnFilter, Filter, NumberOperator};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> gridfilter::Result<()> {
//! let data = Dataset::new(vec![
//!     json!({ "name": "Jon", "age": 30 }),
//!     json!({ "name": "Jane", "age": 25 }),
//! ]);
//! let mut engine = FilterEngine::new().with_data_source(data);
//!
//! let rows = engine
//!     .apply_filter(
//!         "age",
//!         Some(ColumnFilter::new(Filter::number(NumberOperator::Equals, 30.0))),
//!     )
//!     .await?;
//! assert_eq!(rows.len(), 1);
//!
//! let rows = engine.undo().await?;
//! assert_eq!(rows.len(), 2);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::dataset::DataSource;
use crate::dispatcher::{Dispatcher, Strategy};
use crate::error::{EngineError, Result};
use crate::events::{EventBus, EventSource, FilterEvent};
use crate::filter::{EvalContext, PredicateRegistry, QuickFilter, RowFilter};
use crate::fingerprint::CacheKey;
use crate::history::{HistoryAction, HistoryEntry, HistoryManager};
use crate::metrics::{MetricsRecorder, PerformanceMetrics, PerformanceSample, ResultSource};
use crate::model::{ColumnFilter, Filter, FilterModel};
use crate::preset::{Preset, PresetStore, PresetUpdate};
use crate::store::ResultStore;
use crate::value::Row;

/// Version written into exported filter models.
pub const EXPORT_VERSION: &str = "1.0";

/// An engine shared between tasks.
pub type SharedEngine = Arc<Mutex<FilterEngine>>;

/// Exported filter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub filter_model: FilterModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_filter: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Filter state, caches, history and presets over one data source.
pub struct FilterEngine {
    config: EngineConfig,
    source: Option<Arc<dyn DataSource>>,
    model: FilterModel,
    quick_filter: Option<String>,
    predicates: PredicateRegistry,
    cache: ResultCache,
    result_store: Option<ResultStore>,
    dispatcher: Dispatcher,
    history: HistoryManager,
    presets: PresetStore,
    metrics: MetricsRecorder,
    events: EventBus,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEngine {
    /// Creates an engine with default settings, in-memory presets and no
    /// persistent result store.
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), None, PresetStore::in_memory())
    }

    /// Creates an engine from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, or if the configured preset
    /// file cannot be loaded.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let result_store = config.persistent.result_store()?;
        let presets = match &config.presets.path {
            Some(path) => PresetStore::open(path)?,
            None => PresetStore::in_memory(),
        };
        Ok(Self::build(config, result_store, presets))
    }

    fn build(config: EngineConfig, result_store: Option<ResultStore>, presets: PresetStore) -> Self {
        Self {
            cache: ResultCache::new(config.cache.max_entries, config.cache.ttl()),
            dispatcher: Dispatcher::from_config(&config.worker),
            history: HistoryManager::new(config.history.max_entries),
            metrics: MetricsRecorder::new(config.metrics.capacity, config.metrics.hit_rate_window),
            events: EventBus::default(),
            source: None,
            model: FilterModel::new(),
            quick_filter: None,
            predicates: PredicateRegistry::new(),
            result_store,
            presets,
            config,
        }
    }

    /// Sets the data source (builder style).
    pub fn with_data_source<S: DataSource + 'static>(mut self, source: S) -> Self {
        self.set_data_source(source);
        self
    }

    /// Attaches a persistent result store.
    pub fn with_result_store(mut self, store: ResultStore) -> Self {
        self.result_store = Some(store);
        self
    }

    /// Replaces the preset store.
    pub fn with_preset_store(mut self, presets: PresetStore) -> Self {
        self.presets = presets;
        self
    }

    /// Wraps the engine for sharing between tasks.
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current filter model.
    pub fn filter_model(&self) -> &FilterModel {
        &self.model
    }

    /// The current quick filter text, if any.
    pub fn quick_filter(&self) -> Option<&str> {
        self.quick_filter.as_deref()
    }

    /// Presets in creation order.
    pub fn presets(&self) -> &[Preset] {
        self.presets.list()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Undo entries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.entries()
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.metrics.summary()
    }

    /// Subscribes to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<FilterEvent> {
        self.events.subscribe()
    }

    // ==================== Data ====================

    /// Replaces the data source and drops in-memory cached results.
    pub fn set_data_source<S: DataSource + 'static>(&mut self, source: S) {
        self.source = Some(Arc::new(source));
        self.cache.clear();
    }

    /// Registers a custom predicate for `custom` filters named `name`.
    ///
    /// Models with custom filters are keyed by the registry generation and
    /// never go through the persistent store, so a re-registered predicate is
    /// never answered from a result of the one it replaced.
    pub fn register_predicate<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Value, &Row) -> bool + Send + Sync + 'static,
    {
        self.predicates.register(name, predicate);
    }

    fn rows(&self) -> Arc<Vec<Row>> {
        match &self.source {
            Some(source) => source.rows(),
            None => Arc::new(Vec::new()),
        }
    }

    fn quick(&self) -> Option<QuickFilter> {
        let text = self.quick_filter.as_deref()?;
        let columns = self
            .source
            .as_ref()
            .map(|source| source.visible_column_ids())
            .unwrap_or_default();
        QuickFilter::new(text, columns)
    }

    fn eval_context(&self) -> EvalContext {
        EvalContext::new(self.config.text.case_sensitive, self.config.text.fuzzy_threshold)
            .with_predicates(self.predicates.clone())
    }

    // ==================== Evaluation ====================

    /// Returns the rows matching `model` and the current quick filter.
    ///
    /// Does not change the engine's model. Rows keep dataset order.
    ///
    /// # Errors
    ///
    /// - `EngineError::MalformedFilter` if the model fails validation
    /// - `EngineError::Worker` if parallel evaluation failed or timed out
    pub async fn apply_filters(&mut self, model: &FilterModel) -> Result<Vec<Row>> {
        model.validate()?;
        self.warn_about(model);

        let started = Instant::now();
        let rows = self.rows();
        let quick = self.quick();

        if model.is_empty() && quick.is_none() {
            self.record(started, rows.len(), rows.len(), ResultSource::Passthrough, false);
            return Ok(rows.to_vec());
        }

        let key = CacheKey::compute(
            model,
            quick.as_ref(),
            self.predicates.generation(),
            &rows,
            self.config.cache.sample_size,
        )?;
        // custom predicates are process-local; their results stay in memory
        let persistable = !model.has_custom_filters();

        let (indices, source) = match self.lookup(&key, rows.len(), persistable).await {
            Some(hit) => hit,
            None => {
                debug!(%key, "cache miss");
                let filter = RowFilter::new(model.clone(), self.eval_context()).with_quick_filter(quick);
                let evaluation = self.dispatcher.dispatch(&rows, filter).await?;

                self.cache.insert(key.as_str(), evaluation.indices.clone());
                if persistable {
                    self.persist(&key, &evaluation.indices);
                }

                let source = match evaluation.strategy {
                    Strategy::Inline => ResultSource::Inline,
                    Strategy::Worker => ResultSource::Worker,
                };
                (evaluation.indices, source)
            }
        };

        let matched: Vec<Row> = indices
            .iter()
            .filter_map(|&i| rows.get(i).cloned())
            .collect();
        let store_used =
            persistable && self.result_store.is_some() && source != ResultSource::Cache;
        self.record(started, rows.len(), matched.len(), source, store_used);
        Ok(matched)
    }

    /// Returns the rows matching the current model and quick filter.
    pub async fn current_rows(&mut self) -> Result<Vec<Row>> {
        let model = self.model.clone();
        self.apply_filters(&model).await
    }

    async fn lookup(
        &mut self,
        key: &CacheKey,
        row_count: usize,
        persistable: bool,
    ) -> Option<(Vec<usize>, ResultSource)> {
        if let Some(indices) = self.cache.get(key.as_str()) {
            if in_bounds(&indices, row_count) {
                debug!(%key, "cache hit");
                return Some((indices, ResultSource::Cache));
            }
            debug!(%key, "discarding cached result beyond dataset length");
            self.cache.remove(key.as_str());
        }

        if !persistable {
            return None;
        }
        let store = self.result_store.as_ref()?;
        match store.get(key.as_str()).await {
            Ok(Some(indices)) if in_bounds(&indices, row_count) => {
                debug!(%key, "persistent cache hit");
                self.cache.insert(key.as_str(), indices.clone());
                Some((indices, ResultSource::PersistentCache))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "persistent cache read failed");
                None
            }
        }
    }

    fn persist(&self, key: &CacheKey, indices: &[usize]) {
        let Some(store) = self.result_store.clone() else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            debug!("no runtime, skipping persistent cache write");
            return;
        };

        let key = key.to_string();
        let indices = indices.to_vec();
        handle.spawn(async move {
            if let Err(e) = store.put(key, indices).await {
                warn!(error = %e, "failed to persist filter result");
            }
        });
    }

    fn record(
        &mut self,
        started: Instant,
        row_count: usize,
        result_count: usize,
        source: ResultSource,
        persistent_store_used: bool,
    ) {
        self.metrics.record(PerformanceSample {
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            row_count,
            result_count,
            source,
            persistent_store_used,
            cache_hit_rate: 0.0,
            timestamp: Utc::now(),
        });
    }

    fn warn_about(&self, model: &FilterModel) {
        for diagnostic in model.diagnostics() {
            warn!(column = %diagnostic.column, "{}", diagnostic.message);
        }
        for (column, column_filter) in model.iter() {
            for condition in column_filter.conditions() {
                if let Filter::Custom(custom) = condition {
                    if !self.predicates.contains(&custom.name) {
                        warn!(
                            column = %column,
                            predicate = %custom.name,
                            "custom predicate is not registered, condition always passes"
                        );
                    }
                }
            }
        }
    }

    // ==================== Mutations ====================

    fn commit(&mut self, model: FilterModel, action: HistoryAction) {
        let previous = std::mem::replace(&mut self.model, model);
        self.history.record(previous, action);
    }

    fn emit_changed(&self, column_id: Option<&str>, source: EventSource) {
        self.events.emit(FilterEvent::FilterChanged {
            column_id: column_id.map(str::to_string),
            model: self.model.clone(),
            source,
        });
    }

    /// Sets (`Some`) or removes (`None`) the filter for one column.
    ///
    /// # Errors
    ///
    /// Same as [`apply_filters`](Self::apply_filters); on error nothing changes.
    pub async fn apply_filter(
        &mut self,
        column_id: &str,
        filter: Option<ColumnFilter>,
    ) -> Result<Vec<Row>> {
        let removing = filter.is_none();
        let mut next = self.model.clone();
        match filter {
            Some(filter) => next.insert(column_id, filter),
            None => {
                next.remove(column_id);
            }
        }

        let rows = self.apply_filters(&next).await?;
        let action = if removing {
            HistoryAction::ClearFilter {
                column_id: column_id.to_string(),
            }
        } else {
            HistoryAction::ApplyFilter {
                column_id: column_id.to_string(),
            }
        };
        self.commit(next, action);

        if removing {
            self.events.emit(FilterEvent::FilterCleared {
                column_id: Some(column_id.to_string()),
                source: EventSource::Api,
            });
        } else {
            self.emit_changed(Some(column_id), EventSource::Api);
        }
        Ok(rows)
    }

    /// Removes the filter for one column.
    pub async fn clear_filter(&mut self, column_id: &str) -> Result<Vec<Row>> {
        self.apply_filter(column_id, None).await
    }

    /// Removes every column filter and the quick filter.
    pub async fn clear_all_filters(&mut self) -> Result<Vec<Row>> {
        let previous_quick = self.quick_filter.take();
        let rows = match self.apply_filters(&FilterModel::new()).await {
            Ok(rows) => rows,
            Err(e) => {
                self.quick_filter = previous_quick;
                return Err(e);
            }
        };

        self.commit(FilterModel::new(), HistoryAction::ClearAllFilters);
        self.events.emit(FilterEvent::FilterCleared {
            column_id: None,
            source: EventSource::Api,
        });
        Ok(rows)
    }

    /// Replaces the whole filter model.
    pub async fn set_filter_model(&mut self, model: FilterModel) -> Result<Vec<Row>> {
        let rows = self.apply_filters(&model).await?;
        self.commit(model, HistoryAction::SetFilterModel);
        self.emit_changed(None, EventSource::Api);
        Ok(rows)
    }

    /// Sets the free-text quick filter; blank text clears it.
    ///
    /// The quick filter searches the data source's visible columns and is not
    /// part of undo history.
    pub async fn set_quick_filter(&mut self, text: &str) -> Result<Vec<Row>> {
        let next = Some(text.to_string()).filter(|t| !t.trim().is_empty());
        let previous = std::mem::replace(&mut self.quick_filter, next);

        match self.current_rows().await {
            Ok(rows) => {
                self.emit_changed(None, EventSource::QuickFilter);
                Ok(rows)
            }
            Err(e) => {
                self.quick_filter = previous;
                Err(e)
            }
        }
    }

    pub async fn clear_quick_filter(&mut self) -> Result<Vec<Row>> {
        self.set_quick_filter("").await
    }

    // ==================== History ====================

    /// Restores the model before the last mutation.
    ///
    /// With nothing to undo this returns the current rows unchanged.
    pub async fn undo(&mut self) -> Result<Vec<Row>> {
        let Some(previous) = self.history.undo(self.model.clone()) else {
            return self.current_rows().await;
        };

        match self.apply_filters(&previous).await {
            Ok(rows) => {
                self.model = previous;
                self.emit_changed(None, EventSource::History);
                Ok(rows)
            }
            Err(e) => {
                self.history.redo(previous);
                Err(e)
            }
        }
    }

    /// Re-applies the last undone mutation.
    ///
    /// With nothing to redo this returns the current rows unchanged.
    pub async fn redo(&mut self) -> Result<Vec<Row>> {
        let Some(next) = self.history.redo(self.model.clone()) else {
            return self.current_rows().await;
        };

        match self.apply_filters(&next).await {
            Ok(rows) => {
                self.model = next;
                self.emit_changed(None, EventSource::History);
                Ok(rows)
            }
            Err(e) => {
                self.history.undo(next);
                Err(e)
            }
        }
    }

    // ==================== Presets ====================

    /// Saves the current model as a preset.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the preset file cannot be written.
    pub fn save_preset(
        &mut self,
        name: &str,
        description: Option<String>,
        tags: Vec<String>,
    ) -> Result<Preset> {
        let preset = self.presets.save(name, description, tags, &self.model)?;
        self.events.emit(FilterEvent::PresetSaved {
            name: preset.name.clone(),
            source: EventSource::Api,
        });
        Ok(preset)
    }

    /// Installs a preset's model, resolving by id, then by name.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PresetNotFound` (with a suggestion when a similar
    /// name exists) or any evaluation error.
    pub async fn apply_preset(&mut self, id_or_name: &str) -> Result<Vec<Row>> {
        let preset = self.presets.resolve(id_or_name)?.clone();
        let rows = self.apply_filters(&preset.filter_model).await?;

        self.commit(
            preset.filter_model,
            HistoryAction::ApplyPreset {
                name: preset.name.clone(),
            },
        );
        self.emit_changed(None, EventSource::Preset);
        self.events.emit(FilterEvent::PresetApplied {
            name: preset.name,
            source: EventSource::Preset,
        });
        Ok(rows)
    }

    pub fn update_preset(&mut self, id_or_name: &str, update: PresetUpdate) -> Result<Preset> {
        self.presets.update(id_or_name, update)
    }

    /// Deletes a preset. Deleting a missing preset succeeds without an event.
    pub fn delete_preset(&mut self, id_or_name: &str) -> Result<()> {
        if let Some(removed) = self.presets.delete(id_or_name)? {
            self.events.emit(FilterEvent::PresetDeleted {
                name: removed.name,
                source: EventSource::Api,
            });
        }
        Ok(())
    }

    // ==================== Import / export ====================

    /// Serializes the model and quick filter as a JSON envelope.
    pub fn export_filter_model(&self) -> Result<String> {
        let envelope = ExportEnvelope {
            filter_model: self.model.clone(),
            quick_filter: self.quick_filter.clone(),
            timestamp: Utc::now(),
            version: EXPORT_VERSION.to_string(),
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    /// Installs the model (and quick filter) from an exported envelope.
    ///
    /// A version other than the current one is accepted with a warning.
    ///
    /// # Errors
    ///
    /// - `EngineError::ImportFormat` if the text is not JSON, or has no valid `filterModel`
    /// - `EngineError::MalformedFilter` if the model fails validation
    pub async fn import_filter_model(&mut self, json: &str) -> Result<Vec<Row>> {
        let envelope: Value = serde_json::from_str(json)
            .map_err(|e| EngineError::ImportFormat(format!("not valid JSON: {}", e)))?;

        let model_value = envelope
            .get("filterModel")
            .ok_or_else(|| EngineError::ImportFormat("missing 'filterModel'".to_string()))?;
        let model: FilterModel = serde_json::from_value(model_value.clone())
            .map_err(|e| EngineError::ImportFormat(format!("invalid 'filterModel': {}", e)))?;

        match envelope.get("version").and_then(Value::as_str) {
            Some(EXPORT_VERSION) => {}
            other => warn!(
                version = other.unwrap_or("<missing>"),
                expected = EXPORT_VERSION,
                "importing filter model with a different version"
            ),
        }

        let quick = envelope
            .get("quickFilter")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string);
        let previous_quick = std::mem::replace(&mut self.quick_filter, quick);

        let rows = match self.apply_filters(&model).await {
            Ok(rows) => rows,
            Err(e) => {
                self.quick_filter = previous_quick;
                return Err(e);
            }
        };
        self.commit(model, HistoryAction::Import);
        self.emit_changed(None, EventSource::Import);
        Ok(rows)
    }

    // ==================== Cache ====================

    /// Drops in-memory results and deletes the persistent store.
    ///
    /// Failure to delete the persistent store is logged, not returned.
    pub async fn clear_cache(&mut self) {
        self.cache.clear();
        if let Some(store) = &self.result_store {
            if let Err(e) = store.clear().await {
                warn!(error = %e, "failed to clear persistent cache");
            }
        }
    }
}

fn in_bounds(indices: &[usize], row_count: usize) -> bool {
    indices.iter().all(|&i| i < row_count)
}
