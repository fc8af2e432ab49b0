//! Graph runner.
//!
//! Builds the configured feature graph, then pulls events from a source and
//! runs one cascade per event, forwarding the resulting snapshot to a sink.

use crate::sink::ReportSink;
use openbook_core::{Config, Error, MarketEvent, ReportMode, Result, Snapshot};
use openbook_features::{BuilderRegistry, Cascade, FeatureGraph};
use openbook_ingestion::{EventSource, TradeLog};
use tracing::{debug, error, info, warn};

/// Counters of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Events pulled from the source.
    pub events: u64,
    /// Events whose cascade changed at least one feature.
    pub cascades: u64,
    /// Feature records forwarded to the sink.
    pub records: u64,
    /// Events dropped on a malformed payload or a failed recompute.
    pub errors: u64,
}

/// Drives a feature graph from a market-data source.
pub struct GraphRunner {
    config: Config,
    graph: FeatureGraph,
    trade_log: TradeLog,
}

impl GraphRunner {
    /// Validate `config`, prepare the report directory and build the graph.
    pub fn new(config: Config, registry: &BuilderRegistry) -> Result<Self> {
        config.validate()?;

        let dir = &config.report.reports_dir;
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            info!(dir = %dir.display(), "Created reports directory");
        }

        let graph = registry.build_graph(&config.graph.builder, &config.graph.params)?;
        let trade_log = TradeLog::new(config.feed.trade_log_capacity);

        Ok(Self {
            config,
            graph,
            trade_log,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &FeatureGraph {
        &self.graph
    }

    /// Recent trades seen by the runner.
    pub fn trade_log(&self) -> &TradeLog {
        &self.trade_log
    }

    /// Run one event's cascade.
    pub fn process_event(&mut self, event: &MarketEvent) -> Result<Cascade> {
        if let MarketEvent::Trade(trade) = event {
            self.trade_log.push(trade.clone());
        }
        self.graph.on_raw_market_event(event)
    }

    /// Snapshot to report after `cascade`, per the configured report mode.
    ///
    /// `None` when only changed features are reported and nothing changed.
    pub fn snapshot_for(&self, event: &MarketEvent, cascade: &Cascade) -> Option<Snapshot> {
        let mut snapshot = Snapshot::for_event(event);
        match self.config.report.mode {
            ReportMode::Changed if cascade.changed.is_empty() => return None,
            ReportMode::Changed => self.graph.snapshot_cascade(cascade, &mut snapshot),
            ReportMode::All => self.graph.snapshot_all(&mut snapshot),
        }
        Some(snapshot)
    }

    /// Drain `source` into the graph until it is exhausted.
    ///
    /// Malformed events and failed recomputes are logged and skipped unless
    /// `runtime.halt_on_recompute_error` is set. Source I/O errors and sink
    /// errors end the run.
    pub fn run<S>(&mut self, source: &mut S, sink: &mut dyn ReportSink) -> Result<RunStats>
    where
        S: EventSource + ?Sized,
    {
        let halt = self.config.runtime.halt_on_recompute_error;
        let mut stats = RunStats::default();

        source.connect(&self.config.feed.endpoint)?;
        info!(
            endpoint = %self.config.feed.endpoint,
            features = self.graph.len(),
            "Runner started"
        );

        loop {
            let event = match source.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) if e.is_per_event() && !halt => {
                    warn!(error = %e, "Skipping malformed event");
                    stats.errors += 1;
                    continue;
                }
                Err(e) => return Err(self.abort(sink, e)),
            };
            stats.events += 1;

            match self.process_event(&event) {
                Ok(cascade) => {
                    if cascade.is_empty() {
                        debug!(kind = ?event.kind(), "Event changed nothing");
                    } else {
                        stats.cascades += 1;
                    }
                    if let Some(snapshot) = self.snapshot_for(&event, &cascade) {
                        stats.records += snapshot.len() as u64;
                        sink.record(&snapshot)?;
                    }
                }
                Err(e) if e.is_per_event() && !halt => {
                    warn!(error = %e, ts_ms = event.ts_ms(), "Cascade abandoned");
                    stats.errors += 1;
                }
                Err(e) => return Err(self.abort(sink, e)),
            }
        }

        sink.flush()?;
        info!(
            events = stats.events,
            cascades = stats.cascades,
            records = stats.records,
            errors = stats.errors,
            trades = self.trade_log.len(),
            "Runner finished"
        );
        Ok(stats)
    }

    /// Flush what was reported so far before giving up.
    fn abort(&self, sink: &mut dyn ReportSink, e: Error) -> Error {
        error!(error = %e, "Run halted");
        if let Err(flush_err) = sink.flush() {
            warn!(error = %flush_err, "Flushing sink after halt failed");
        }
        e
    }
}
