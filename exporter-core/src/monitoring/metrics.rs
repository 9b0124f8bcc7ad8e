//! Exchange metric model
//!
//! Five instruments partitioned by `(base_currency, quote_currency,
//! exchange_name, operation)`, plus `event` for order book counts:
//! - `{ns}_order_count`: created/canceled orders (counter)
//! - `{ns}_trade_count`: executed orders (counter)
//! - `{ns}_trade_price`: last trade price (gauge)
//! - `{ns}_trade_amount`: last trade amount (gauge)
//! - `{ns}_trade_amount_sum`: cumulative trade amount (counter)
//!
//! Label sets are never removed. A single `RwLock` guards the instrument
//! set: `apply` holds the write side for all of an event's mutations and
//! collection holds the read side, so a scrape never observes half of an
//! `OrderCompleted` update.

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{MetricFamily, MetricType};
use prometheus::{CounterVec, GaugeVec, IntCounterVec, Opts, Registry};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{ExchangeEvent, MarketLabels, OrderEventKind};

/// Label names of `order_count`
pub const ORDER_LABELS: &[&str] = &[
    "base_currency",
    "quote_currency",
    "exchange_name",
    "operation",
    "event",
];

/// Label names of the trade instruments
pub const TRADE_LABELS: &[&str] = &["base_currency", "quote_currency", "exchange_name", "operation"];

/// Instrument type as seen by a scraper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// Static description of one instrument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
}

/// One recorded label-set/value pair
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub kind: MetricKind,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

/// Point-in-time copy of every recorded sample
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub samples: Vec<Sample>,
}

impl MetricsSnapshot {
    /// Value of the first sample named `name` whose labels include all of `labels`
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| {
                s.name == name
                    && labels
                        .iter()
                        .all(|(k, v)| s.labels.get(*k).map(String::as_str) == Some(*v))
            })
            .map(|s| s.value)
    }

    /// Number of label sets recorded for `name`
    pub fn series_count(&self, name: &str) -> usize {
        self.samples.iter().filter(|s| s.name == name).count()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Process-wide metric model shared by feeds and the scrape endpoint
#[derive(Clone)]
pub struct ExchangeMetrics {
    namespace: String,

    // Order book metrics
    order_count: IntCounterVec,

    // Completed order metrics
    trade_count: IntCounterVec,
    trade_price: GaugeVec,
    trade_amount: GaugeVec,
    trade_amount_sum: CounterVec,

    update_lock: Arc<RwLock<()>>,
}

impl ExchangeMetrics {
    /// Create the instrument set scoped to `namespace`
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let order_count = IntCounterVec::new(
            Opts::new("count", "Number of unexecuted/canceled orders.")
                .namespace(namespace)
                .subsystem("order"),
            ORDER_LABELS,
        )?;

        let trade_count = IntCounterVec::new(
            Opts::new("count", "Number of executed orders.")
                .namespace(namespace)
                .subsystem("trade"),
            TRADE_LABELS,
        )?;

        let trade_price = GaugeVec::new(
            Opts::new("price", "Last trade price, in quote currency.")
                .namespace(namespace)
                .subsystem("trade"),
            TRADE_LABELS,
        )?;

        let trade_amount = GaugeVec::new(
            Opts::new("amount", "Last trade amount, in base currency.")
                .namespace(namespace)
                .subsystem("trade"),
            TRADE_LABELS,
        )?;

        let trade_amount_sum = CounterVec::new(
            Opts::new("amount_sum", "Sum of all trade amounts, in base currency.")
                .namespace(namespace)
                .subsystem("trade"),
            TRADE_LABELS,
        )?;

        info!("Exchange metrics initialized (namespace: {:?})", namespace);

        Ok(Self {
            namespace: namespace.to_string(),
            order_count,
            trade_count,
            trade_price,
            trade_amount,
            trade_amount_sum,
            update_lock: Arc::new(RwLock::new(())),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register with a Prometheus registry for scraping
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.clone()))
    }

    /// Apply one normalized event for the feed identified by `market`
    pub fn apply(&self, market: &MarketLabels, event: &ExchangeEvent) {
        let operation = event.operation().as_str();
        let trade_labels = [
            market.base_currency.as_str(),
            market.quote_currency.as_str(),
            market.exchange_name.as_str(),
            operation,
        ];

        let _guard = self.update_lock.write();

        match event {
            ExchangeEvent::OrderCreated { .. } => {
                self.inc_order(&trade_labels, OrderEventKind::Create);
            }
            ExchangeEvent::OrderCanceled { .. } => {
                self.inc_order(&trade_labels, OrderEventKind::Cancel);
            }
            ExchangeEvent::OrderCompleted {
                amount, unit_price, ..
            } => {
                self.trade_count.with_label_values(&trade_labels).inc();
                self.trade_price.with_label_values(&trade_labels).set(*unit_price);
                self.trade_amount.with_label_values(&trade_labels).set(*amount);

                // Counters cannot decrease
                if amount.is_finite() && *amount >= 0.0 {
                    self.trade_amount_sum.with_label_values(&trade_labels).inc_by(*amount);
                } else {
                    warn!(
                        "Not adding invalid trade amount {} to {} sum ({})",
                        amount, market, operation
                    );
                    // Still create the label set so the sum series exists
                    let _ = self.trade_amount_sum.with_label_values(&trade_labels);
                }
            }
        }

        debug!("Applied {} ({}) for {}", event.kind_name(), operation, market);
    }

    fn inc_order(&self, trade_labels: &[&str; 4], kind: OrderEventKind) {
        let [base, quote, exchange, operation] = *trade_labels;
        self.order_count
            .with_label_values(&[base, quote, exchange, operation, kind.as_str()])
            .inc();
    }

    fn instruments(&self) -> [(&dyn Collector, MetricKind); 5] {
        [
            (&self.order_count as &dyn Collector, MetricKind::Counter),
            (&self.trade_count as &dyn Collector, MetricKind::Counter),
            (&self.trade_price as &dyn Collector, MetricKind::Gauge),
            (&self.trade_amount as &dyn Collector, MetricKind::Gauge),
            (&self.trade_amount_sum as &dyn Collector, MetricKind::Counter),
        ]
    }

    /// Static descriptors, available before any data is observed
    pub fn describe(&self) -> Vec<MetricDescriptor> {
        self.instruments()
            .into_iter()
            .flat_map(|(collector, kind)| {
                collector.desc().into_iter().map(move |desc| MetricDescriptor {
                    name: desc.fq_name.clone(),
                    help: desc.help.clone(),
                    kind,
                    label_names: desc.variable_labels.clone(),
                })
            })
            .collect()
    }

    /// Point-in-time copy of every recorded label set
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut samples = Vec::new();

        for family in self.collect() {
            let kind = match family.get_field_type() {
                MetricType::GAUGE => MetricKind::Gauge,
                _ => MetricKind::Counter,
            };

            for metric in family.get_metric() {
                let labels = metric
                    .get_label()
                    .iter()
                    .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
                    .collect();
                let value = match kind {
                    MetricKind::Gauge => metric.get_gauge().get_value(),
                    MetricKind::Counter => metric.get_counter().get_value(),
                };

                samples.push(Sample {
                    name: family.get_name().to_string(),
                    kind,
                    labels,
                    value,
                });
            }
        }

        MetricsSnapshot { samples }
    }
}

impl Collector for ExchangeMetrics {
    fn desc(&self) -> Vec<&Desc> {
        self.instruments()
            .into_iter()
            .flat_map(|(collector, _)| collector.desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let _guard = self.update_lock.read();

        self.instruments()
            .into_iter()
            .flat_map(|(collector, _)| collector.collect())
            .collect()
    }
}
