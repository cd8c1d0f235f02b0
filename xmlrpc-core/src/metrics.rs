//! Prometheus metrics for dispatched calls

use crate::fault::Fault;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Duration;

// Label used for method names that are not registered, to bound cardinality.
const UNREGISTERED_METHOD: &str = "unregistered";

/// Counters and timings recorded by a [`Dispatcher`](crate::Dispatcher).
#[derive(Clone)]
pub struct DispatchMetrics {
    requests_total: IntCounterVec,
    faults_total: IntCounterVec,
    call_duration: HistogramVec,
}

impl DispatchMetrics {
    /// Creates the metrics and registers them with `registry`.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "xmlrpc_requests_total",
                "Total number of XML-RPC calls handled",
            ),
            &["method", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let faults_total = IntCounterVec::new(
            Opts::new("xmlrpc_faults_total", "Total number of faults by fault code"),
            &["code"],
        )?;
        registry.register(Box::new(faults_total.clone()))?;

        let call_duration = HistogramVec::new(
            HistogramOpts::new(
                "xmlrpc_call_duration_seconds",
                "Time spent decoding, running and encoding a call",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["method"],
        )?;
        registry.register(Box::new(call_duration.clone()))?;

        Ok(Self {
            requests_total,
            faults_total,
            call_duration,
        })
    }

    pub(crate) fn observe(
        &self,
        method: Option<&str>,
        fault: Option<&Fault>,
        elapsed: Duration,
    ) {
        let method = method.unwrap_or(UNREGISTERED_METHOD);
        let outcome = if fault.is_some() { "fault" } else { "success" };
        self.requests_total
            .with_label_values(&[method, outcome])
            .inc();
        if let Some(fault) = fault {
            self.faults_total
                .with_label_values(&[fault.code().to_string().as_str()])
                .inc();
        }
        self.call_duration
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
    }
}
