use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::info;

#[derive(Debug)]
pub struct StatsCollector {
    // Basic counters
    total_requests: AtomicU64,
    vetoed_requests: AtomicU64,
    blocked_requests: AtomicU64,
    passthrough_requests: AtomicU64,

    // Per-blocklist-source block counters. Max 256 sources (u8 key);
    // a fixed array of atomics keeps this purely lock-free.
    blocks_by_source: [AtomicU64; 256],

    // Per-engine hit and latency tracking. Up to 16 engines for stats
    // purposes; total time and count kept in separate arrays to stay
    // lock-free.
    engine_hits: [AtomicU64; 16],
    engine_total_ms: [AtomicU64; 16],
    engine_names: Vec<String>,
    blocklist_names: Vec<String>,

    log_interval: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStat {
    pub name: String,
    pub hits: u64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStat {
    pub name: String,
    pub blocked: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub vetoed_requests: u64,
    pub blocked_requests: u64,
    pub passthrough_requests: u64,
    pub engines: Vec<EngineStat>,
    pub blocks_by_source: Vec<SourceStat>,
}

impl StatsCollector {
    pub fn new(
        log_interval_sec: u64,
        engine_names: Vec<String>,
        blocklist_names: Vec<String>,
    ) -> Arc<Self> {
        let stats = Arc::new(Self {
            total_requests: AtomicU64::new(0),
            vetoed_requests: AtomicU64::new(0),
            blocked_requests: AtomicU64::new(0),
            passthrough_requests: AtomicU64::new(0),
            blocks_by_source: [0; 256].map(|_| AtomicU64::new(0)),
            engine_hits: [0; 16].map(|_| AtomicU64::new(0)),
            engine_total_ms: [0; 16].map(|_| AtomicU64::new(0)),
            engine_names,
            blocklist_names,
            log_interval: Duration::from_secs(log_interval_sec),
        });

        // Spawn background dumper
        let stats_clone = stats.clone();
        tokio::spawn(async move {
            stats_clone.run_logger().await;
        });

        stats
    }

    pub fn inc_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_vetoed(&self) {
        self.vetoed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_passthrough(&self) {
        self.passthrough_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_blocked_by_source(&self, source_id: u8) {
        self.blocked_requests.fetch_add(1, Ordering::Relaxed);
        self.blocks_by_source[source_id as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_engine_hit(&self, engine_idx: usize, ms: u64) {
        if engine_idx < 16 {
            self.engine_hits[engine_idx].fetch_add(1, Ordering::Relaxed);
            self.engine_total_ms[engine_idx].fetch_add(ms, Ordering::Relaxed);
        }
    }

    pub fn engine_index(&self, name: &str) -> Option<usize> {
        self.engine_names.iter().position(|n| n == name)
    }

    pub fn get_snapshot(&self) -> StatsSnapshot {
        let mut engines = Vec::new();
        for (i, name) in self.engine_names.iter().enumerate().take(16) {
            let hits = self.engine_hits[i].load(Ordering::Relaxed);
            let total_ms = self.engine_total_ms[i].load(Ordering::Relaxed);
            engines.push(EngineStat {
                name: name.clone(),
                hits,
                avg_latency_ms: if hits > 0 {
                    total_ms as f64 / hits as f64
                } else {
                    0.0
                },
            });
        }

        let mut blocks_by_source = Vec::new();
        for (i, count) in self.blocks_by_source.iter().enumerate() {
            let count = count.load(Ordering::Relaxed);
            if count > 0 {
                let name = self
                    .blocklist_names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string());
                blocks_by_source.push(SourceStat {
                    name,
                    blocked: count,
                });
            }
        }

        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            vetoed_requests: self.vetoed_requests.load(Ordering::Relaxed),
            blocked_requests: self.blocked_requests.load(Ordering::Relaxed),
            passthrough_requests: self.passthrough_requests.load(Ordering::Relaxed),
            engines,
            blocks_by_source,
        }
    }

    async fn run_logger(&self) {
        let mut interval = time::interval(self.log_interval);
        loop {
            interval.tick().await;
            self.dump_stats();
        }
    }

    fn dump_stats(&self) {
        let snapshot = self.get_snapshot();
        let total = snapshot.total_requests;

        let mut engine_stats = String::new();
        for engine in &snapshot.engines {
            if engine.hits > 0 {
                engine_stats.push_str(&format!(
                    "[{}: {} ({:.1}ms)] ",
                    engine.name, engine.hits, engine.avg_latency_ms
                ));
            }
        }

        let mut block_stats = String::new();
        if snapshot.blocked_requests > 0 {
            block_stats.push_str(" BlockStats: ");
            for source in &snapshot.blocks_by_source {
                let pct = (source.blocked as f64 / snapshot.blocked_requests as f64) * 100.0;
                block_stats.push_str(&format!(
                    "[{}: {} ({:.1}%)] ",
                    source.name, source.blocked, pct
                ));
            }
        }

        info!(
            "STATS DUMP: Total: {}, Vetoed: {}, Blocked: {} ({:.1}%), Passthrough: {}, Engines: {}{}",
            total,
            snapshot.vetoed_requests,
            snapshot.blocked_requests,
            if total > 0 {
                (snapshot.blocked_requests as f64 / total as f64) * 100.0
            } else {
                0.0
            },
            snapshot.passthrough_requests,
            engine_stats,
            block_stats
        );
    }
}
