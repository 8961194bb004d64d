//! Scan orchestration engine
//!
//! Expands the target specification, runs the liveness check ahead of any
//! port probe for each host, and fans hosts out over a bounded worker pool.
//! Every worker owns its own transport; the only shared mutables are the
//! session counters and the event sink.

use futures::future::join_all;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::ScanConfig;
use crate::events::{Event, EventSink};
use crate::network::transport::{RawSocketFactory, TransportFactory};
use crate::network::HostState;
use crate::scanner::liveness::LivenessProbe;
use crate::scanner::ports::PortClassifier;
use crate::scanner::{ProbeResult, ScanSummary};
use crate::utils::target_parser::TargetSpec;
use crate::{utils, ScanError};

/// Per-invocation aggregate: evaluated and responding host counts.
///
/// Workers mutate it concurrently; discarded once the summary is out.
#[derive(Default)]
struct ScanSession {
    evaluated: AtomicUsize,
    responding: AtomicUsize,
}

struct EngineInner<F: TransportFactory> {
    config: ScanConfig,
    factory: F,
    sink: Box<dyn EventSink>,
    source_ip: Ipv4Addr,
}

/// Orchestrates one scan invocation.
pub struct ScanEngine<F: TransportFactory> {
    inner: Arc<EngineInner<F>>,
    cancel: CancellationToken,
}

impl ScanEngine<RawSocketFactory> {
    /// Engine over the production raw-socket transport.
    pub fn new(config: ScanConfig, sink: Box<dyn EventSink>) -> Self {
        Self::with_factory(config, RawSocketFactory, sink)
    }
}

impl<F: TransportFactory + 'static> ScanEngine<F> {
    pub fn with_factory(config: ScanConfig, factory: F, sink: Box<dyn EventSink>) -> Self {
        let source_ip = utils::local_source_ip();
        Self {
            inner: Arc::new(EngineInner {
                config,
                factory,
                sink,
                source_ip,
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts in-flight and pending probes when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the scan to completion (or cancellation).
    ///
    /// Errors are fatal configuration or capability problems caught before
    /// any probing; per-probe failures surface as error events instead.
    pub async fn scan(&self) -> crate::Result<ScanSummary> {
        self.inner.config.validate()?;

        let spec = TargetSpec::parse(&self.inner.config.target)
            .map_err(|e| ScanError::InvalidTarget(format!("{:#}", e)))?;

        // Acquire one transport up front so a missing raw-socket capability
        // aborts before the first packet, not mid-range
        let transport = self.inner.factory.create()?;

        let start = Instant::now();
        let session = Arc::new(ScanSession::default());

        match spec {
            TargetSpec::Single(host) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = self.inner.scan_host(&transport, host, &session) => {}
                }
                // Single-address mode never emits a summary event
            }
            TargetSpec::Network { .. } => {
                drop(transport);
                self.scan_range(spec.hosts(), &session).await;

                if !self.cancel.is_cancelled() {
                    self.inner
                        .sink
                        .emit(Event::summary(session.responding.load(Ordering::Relaxed)));
                }
            }
        }

        Ok(ScanSummary {
            target: self.inner.config.target.clone(),
            hosts_evaluated: session.evaluated.load(Ordering::Relaxed),
            hosts_responding: session.responding.load(Ordering::Relaxed),
            duration: start.elapsed(),
            cancelled: self.cancel.is_cancelled(),
        })
    }

    async fn scan_range(&self, hosts: Vec<Ipv4Addr>, session: &Arc<ScanSession>) {
        let semaphore = Arc::new(Semaphore::new(self.inner.config.concurrency));
        let mut handles = Vec::new();

        for host in hosts {
            if self.cancel.is_cancelled() {
                break;
            }

            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let inner = self.inner.clone();
            let cancel = self.cancel.clone();
            let session = session.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;

                let transport = match inner.factory.create() {
                    Ok(transport) => transport,
                    Err(e) => {
                        inner.emit(ProbeResult::error(host, None, &e));
                        return;
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = inner.scan_host(&transport, host, &session) => {}
                }
            }));
        }

        join_all(handles).await;
    }
}

impl<F: TransportFactory> EngineInner<F> {
    /// Liveness first; port probes only once the host resolved to
    /// responding. Failures are isolated per host and per port.
    async fn scan_host(&self, transport: &F::Transport, host: Ipv4Addr, session: &ScanSession) {
        session.evaluated.fetch_add(1, Ordering::Relaxed);

        let liveness = LivenessProbe::new(
            transport,
            self.config.timeout_duration(),
            &self.config.blocking_icmp_codes,
        );

        let state = match liveness.check(host).await {
            Ok(state) => state,
            Err(e) => {
                self.emit(ProbeResult::error(host, None, &e));
                return;
            }
        };

        self.emit(ProbeResult::host_check(host, state));

        if state != HostState::Responding {
            return;
        }
        session.responding.fetch_add(1, Ordering::Relaxed);

        let classifier =
            PortClassifier::new(transport, self.source_ip, self.config.timeout_duration());

        for &port in &self.config.ports {
            match classifier.classify(host, port).await {
                Ok(state) => self.emit(ProbeResult::port_check(host, port, state)),
                Err(e) => self.emit(ProbeResult::error(host, Some(port), &e)),
            }
        }
    }

    fn emit(&self, result: ProbeResult) {
        self.sink.emit(Event::from_result(&result));
    }
}
