//! Workload orchestration: paced session spawning, the join-all barrier,
//! and end-of-run reporting.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use sketches_ddsketch::DDSketch;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use yansi::Paint;

use crate::config::{Config, RunMode};
use crate::fetch::{MESSAGE_LONG, NO_CONTENT_LENGTH, Outcome, TRANSPORT_ERROR};
use crate::pacing::ArrivalProcess;
use crate::popularity::PopularitySelector;
use crate::session::Session;
use crate::sink::RecordSink;

/// Why a session could not be created.
#[derive(Debug, PartialEq)]
pub enum SpawnError {
    /// The in-flight session cap is exhausted.
    Saturated {
        /// The configured cap.
        limit: usize,
    },
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saturated { limit } => write!(f, "session limit reached ({limit} in flight)"),
        }
    }
}

impl std::error::Error for SpawnError {}

/// Aggregate view of a finished run, printed after the final flush.
#[derive(Default)]
pub struct RunSummary {
    /// Complete, well-formed fetches.
    pub ok: u64,
    /// Fetches the server answered with a non-2xx status.
    pub rejected: u64,
    /// Fetches that violated the content-length expectations.
    pub malformed: u64,
    /// Fetches that failed at the transport level.
    pub transport: u64,
    /// Body bytes transferred by successful fetches.
    pub bytes: u64,

    timing: DDSketch,
}

impl fmt::Debug for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunSummary")
            .field("ok", &self.ok)
            .field("rejected", &self.rejected)
            .field("malformed", &self.malformed)
            .field("transport", &self.transport)
            .field("bytes", &self.bytes)
            .finish_non_exhaustive()
    }
}

impl RunSummary {
    fn observe(&mut self, outcome: &Outcome) {
        match outcome.class {
            200 => {
                self.ok += 1;
                self.bytes += outcome.bytes;
                self.timing.add(outcome.elapsed);
            }
            NO_CONTENT_LENGTH..=MESSAGE_LONG => self.malformed += 1,
            TRANSPORT_ERROR => self.transport += 1,
            _ => self.rejected += 1,
        }
    }

    /// Prints the summary to stderr, keeping stdout clean for the record
    /// stream.
    pub fn print(&self, elapsed: Duration) {
        let total = self.ok + self.rejected + self.malformed + self.transport;
        eprintln!(
            "{} ({} sessions in {:.2?})",
            "## RESULTS".bold(),
            total.bold(),
            elapsed
        );
        eprintln!(
            "  ok: {}; rejected: {}; malformed: {}; transport: {}",
            self.ok.bold().green(),
            self.rejected.bold(),
            self.malformed.bold().red(),
            self.transport.bold().red()
        );

        if self.timing.count() > 0 {
            let ops = self.timing.count() as f64 / elapsed.as_secs_f64();
            let throughput = self.bytes as f64 / elapsed.as_secs_f64();
            eprintln!(
                "  {:.2} fetches/s, {:.0} bytes/s",
                ops.bold(),
                throughput.bold()
            );

            let avg = Duration::from_secs_f64(self.timing.sum().unwrap() / self.timing.count() as f64);
            let p50 = Duration::from_secs_f64(self.timing.quantile(0.5).unwrap().unwrap());
            let p90 = Duration::from_secs_f64(self.timing.quantile(0.9).unwrap().unwrap());
            let p99 = Duration::from_secs_f64(self.timing.quantile(0.99).unwrap().unwrap());
            eprintln!(
                "  latency avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
                avg.bold()
            );
        }
    }
}

/// The result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Number of sessions that were spawned.
    pub spawned: u64,
    /// Number of outcome records written to the sink.
    pub recorded: u64,
    /// Wall-clock time from the first spawn to the final flush.
    pub elapsed: Duration,
    /// Aggregate metrics over all outcomes.
    pub summary: RunSummary,
}

/// Drives session creation at the arrival-process cadence and waits for all
/// outstanding sessions before finalizing output.
#[derive(Debug)]
pub struct WorkloadGenerator {
    config: Config,
    selector: Arc<PopularitySelector>,
    arrival: ArrivalProcess,
    rng: SmallRng,
}

impl WorkloadGenerator {
    /// Validates the configuration and precomputes the popularity model.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let selector = Arc::new(PopularitySelector::new(config.files, config.alpha));
        let arrival = ArrivalProcess::new(config.load)?;
        let rng = SmallRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            selector,
            arrival,
            rng,
        })
    }

    /// Runs the workload to completion, writing one record per session to
    /// `out`.
    ///
    /// Returns only after every spawned session has finished and the sink has
    /// been flushed, so the wall-clock time may extend past the nominal spawn
    /// window while the slowest in-flight fetches complete.
    pub async fn run<W: Write>(mut self, out: W) -> Result<RunReport> {
        let mode = self.config.mode()?;
        let (tx, rx) = mpsc::channel(1024);
        let sink = RecordSink::new(out);
        let started = Instant::now();

        let driver = async {
            let mut sessions = JoinSet::new();
            let spawned = match mode {
                RunMode::Total(total) => self.spawn_total(&mut sessions, &tx, total).await,
                RunMode::Duration(bound) => self.spawn_duration(&mut sessions, &tx, bound).await,
            };

            // join-all barrier: every outcome is sent before the channel closes
            while sessions.join_next().await.is_some() {}
            drop(tx);
            spawned
        };

        let (spawned, collected) = tokio::join!(driver, collect(rx, sink));
        let (sink, summary) = collected.context("failed to write outcome records")?;

        Ok(RunReport {
            spawned,
            recorded: sink.recorded(),
            elapsed: started.elapsed(),
            summary,
        })
    }

    /// Spawns exactly `total` sessions, aborting the spawn loop on resource
    /// exhaustion but still letting in-flight sessions finish.
    async fn spawn_total(
        &mut self,
        sessions: &mut JoinSet<()>,
        outcomes: &mpsc::Sender<Outcome>,
        total: u64,
    ) -> u64 {
        let mut spawned = 0;
        for id in 0..total {
            if let Err(err) = self.try_spawn(sessions, outcomes, id) {
                tracing::warn!(%err, "aborting spawn loop");
                break;
            }
            spawned += 1;

            let pause = self.arrival.next_delay(&mut self.rng);
            tokio::time::sleep(pause).await;
        }
        spawned
    }

    /// Spawns sessions until the wall-clock bound elapses; resource
    /// exhaustion here is transient, so failed attempts are skipped.
    async fn spawn_duration(
        &mut self,
        sessions: &mut JoinSet<()>,
        outcomes: &mpsc::Sender<Outcome>,
        bound: Duration,
    ) -> u64 {
        let started = Instant::now();
        let mut spawned = 0;
        while started.elapsed() <= bound {
            match self.try_spawn(sessions, outcomes, spawned) {
                Ok(()) => spawned += 1,
                Err(err) => {
                    tracing::debug!(%err, "skipping spawn attempt");
                    tokio::task::yield_now().await;
                    continue;
                }
            }

            let pause = self.arrival.next_delay(&mut self.rng);
            tokio::time::sleep(pause).await;
        }
        spawned
    }

    /// Attempts to create one session.
    ///
    /// The per-session seed is drawn here, so the sequence of selected
    /// resources depends only on the configured seed and the spawn order.
    fn try_spawn(
        &mut self,
        sessions: &mut JoinSet<()>,
        outcomes: &mpsc::Sender<Outcome>,
        id: u64,
    ) -> Result<(), SpawnError> {
        // reap finished sessions so the cap only counts live ones
        while sessions.try_join_next().is_some() {}
        if sessions.len() >= self.config.max_in_flight {
            return Err(SpawnError::Saturated {
                limit: self.config.max_in_flight,
            });
        }

        let session = Session::new(
            id,
            self.rng.next_u64(),
            self.config.host.clone(),
            self.config.port,
            Arc::clone(&self.selector),
            outcomes.clone(),
        );
        sessions.spawn(session.run());
        Ok(())
    }
}

/// Single consumer owning the sink: records every outcome, then flushes once
/// the channel closes.
async fn collect<W: Write>(
    mut outcomes: mpsc::Receiver<Outcome>,
    mut sink: RecordSink<W>,
) -> std::io::Result<(RecordSink<W>, RunSummary)> {
    let mut summary = RunSummary::default();
    while let Some(outcome) = outcomes.recv().await {
        summary.observe(&outcome);
        sink.record(outcome.to_string())?;
    }
    sink.flush()?;
    Ok((sink, summary))
}
