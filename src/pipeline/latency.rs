//! Checkpoint-pair timing for one request.
//!
//! Phases are bracketed by `<phase>_start` / `<phase>_end` checkpoints; the
//! report turns each bracket into a span and adds the overall `total`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

/// Phases shown in the response footer, in display order.
pub const DISPLAY_PHASES: &[(&str, &str)] = &[
    ("stt", "STT"),
    ("vlm", "VLM"),
    ("pdf", "PDF"),
    ("rag", "RAG"),
    ("llm", "LLM"),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatencyError {
    #[error("Latency tracker was never started")]
    NotStarted,

    #[error("Latency tracker was never stopped")]
    NotStopped,
}

/// How `<base>_start` / `<base>_end` checkpoints are paired into spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpanPairing {
    /// Pair each `<base>_start` with the `<base>_end` of the same base name.
    #[default]
    ByBaseName,
    /// Sort checkpoint names and pair consecutive entries, keeping a pair
    /// only when it reads `*_start` then `*_end`. Because `_end` sorts before
    /// `_start`, this rarely yields spans; kept for report compatibility.
    Positional,
}

#[derive(Debug, Clone, Default)]
pub struct LatencyTracker {
    pairing: SpanPairing,
    started: Option<Instant>,
    stopped: Option<Instant>,
    checkpoints: BTreeMap<String, Instant>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pairing(pairing: SpanPairing) -> Self {
        Self {
            pairing,
            ..Self::default()
        }
    }

    /// Record t0 and forget any previous checkpoints.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, at: Instant) {
        self.started = Some(at);
        self.stopped = None;
        self.checkpoints.clear();
    }

    /// Record a named checkpoint. A repeated name keeps the latest time.
    pub fn checkpoint(&mut self, name: &str) {
        self.checkpoint_at(name, Instant::now());
    }

    pub fn checkpoint_at(&mut self, name: &str, at: Instant) {
        self.checkpoints.insert(name.to_string(), at);
    }

    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub fn stop_at(&mut self, at: Instant) {
        self.stopped = Some(at);
    }

    pub fn report(&self) -> Result<LatencyReport, LatencyError> {
        let started = self.started.ok_or(LatencyError::NotStarted)?;
        let stopped = self.stopped.ok_or(LatencyError::NotStopped)?;

        let spans = match self.pairing {
            SpanPairing::ByBaseName => self.spans_by_base_name(),
            SpanPairing::Positional => self.spans_positional(),
        };

        Ok(LatencyReport {
            total: stopped.saturating_duration_since(started),
            spans,
        })
    }

    fn spans_by_base_name(&self) -> BTreeMap<String, Duration> {
        self.checkpoints
            .iter()
            .filter_map(|(name, start)| {
                let base = name.strip_suffix("_start")?;
                let end = self.checkpoints.get(&format!("{base}_end"))?;
                Some((base.to_string(), end.saturating_duration_since(*start)))
            })
            .collect()
    }

    fn spans_positional(&self) -> BTreeMap<String, Duration> {
        let sorted: Vec<(&String, &Instant)> = self.checkpoints.iter().collect();
        sorted
            .chunks_exact(2)
            .filter_map(|pair| {
                let (start_name, start) = pair[0];
                let (end_name, end) = pair[1];
                let base = start_name.strip_suffix("_start")?;
                end_name.strip_suffix("_end")?;
                Some((base.to_string(), end.saturating_duration_since(*start)))
            })
            .collect()
    }
}

/// Derived timings for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyReport {
    pub total: Duration,
    pub spans: BTreeMap<String, Duration>,
}

impl LatencyReport {
    pub fn span(&self, name: &str) -> Option<Duration> {
        self.spans.get(name).copied()
    }

    /// Every span plus `total`, in seconds.
    pub fn as_seconds(&self) -> BTreeMap<String, f64> {
        let mut out: BTreeMap<String, f64> = self
            .spans
            .iter()
            .map(|(name, d)| (name.clone(), d.as_secs_f64()))
            .collect();
        out.insert("total".to_string(), self.total.as_secs_f64());
        out
    }

    /// Footer appended to every answered response.
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "\n\n---\n⚡ Processing Time: {:.2}s",
            self.total.as_secs_f64()
        );

        let phases: Vec<String> = DISPLAY_PHASES
            .iter()
            .filter_map(|(key, label)| {
                self.span(key)
                    .map(|d| format!("{label}: {:.2}s", d.as_secs_f64()))
            })
            .collect();
        if !phases.is_empty() {
            line.push_str(&format!(" ({})", phases.join(" | ")));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// start t0; vlm t0+100..t0+400; rag t0+400..t0+450; stop t0+1000.
    fn vlm_rag_tracker(pairing: SpanPairing) -> LatencyTracker {
        let t0 = Instant::now();
        let mut tracker = LatencyTracker::with_pairing(pairing);
        tracker.start_at(t0);
        tracker.checkpoint_at("vlm_start", t0 + ms(100));
        tracker.checkpoint_at("vlm_end", t0 + ms(400));
        tracker.checkpoint_at("rag_start", t0 + ms(400));
        tracker.checkpoint_at("rag_end", t0 + ms(450));
        tracker.stop_at(t0 + ms(1000));
        tracker
    }

    #[test]
    fn vlm_rag_scenario_by_base_name() {
        let report = vlm_rag_tracker(SpanPairing::ByBaseName).report().unwrap();
        assert_eq!(report.total, ms(1000));
        assert_eq!(report.span("vlm"), Some(ms(300)));
        assert_eq!(report.span("rag"), Some(ms(50)));

        let keys: Vec<String> = report.as_seconds().into_keys().collect();
        assert_eq!(keys, vec!["rag", "total", "vlm"]);
    }

    #[test]
    fn positional_pairing_misses_sorted_pairs() {
        // Sorted order is rag_end, rag_start, vlm_end, vlm_start.
        let report = vlm_rag_tracker(SpanPairing::Positional).report().unwrap();
        assert!(report.spans.is_empty());
        assert_eq!(report.total, ms(1000));
    }

    #[test]
    fn positional_pairing_works_for_single_phase() {
        let t0 = Instant::now();
        let mut tracker = LatencyTracker::with_pairing(SpanPairing::Positional);
        tracker.start_at(t0);
        tracker.checkpoint_at("a_start", t0 + ms(10));
        tracker.checkpoint_at("b_end", t0 + ms(30));
        tracker.stop_at(t0 + ms(40));
        let report = tracker.report().unwrap();
        assert_eq!(report.span("a"), Some(ms(20)));
    }

    #[test]
    fn report_requires_start_and_stop() {
        let mut tracker = LatencyTracker::new();
        assert_eq!(tracker.report(), Err(LatencyError::NotStarted));
        tracker.start();
        assert_eq!(tracker.report(), Err(LatencyError::NotStopped));
        tracker.stop();
        assert!(tracker.report().is_ok());
    }

    #[test]
    fn unmatched_checkpoint_yields_no_span() {
        let t0 = Instant::now();
        let mut tracker = LatencyTracker::new();
        tracker.start_at(t0);
        tracker.checkpoint_at("llm_start", t0 + ms(5));
        tracker.stop_at(t0 + ms(10));
        assert!(tracker.report().unwrap().spans.is_empty());
    }

    #[test]
    fn start_resets_checkpoints() {
        let t0 = Instant::now();
        let mut tracker = LatencyTracker::new();
        tracker.start_at(t0);
        tracker.checkpoint_at("rag_start", t0);
        tracker.checkpoint_at("rag_end", t0 + ms(5));
        tracker.stop_at(t0 + ms(10));
        tracker.start_at(t0 + ms(20));
        assert_eq!(tracker.report(), Err(LatencyError::NotStopped));
        tracker.stop_at(t0 + ms(30));
        assert!(tracker.report().unwrap().spans.is_empty());
    }

    #[test]
    fn summary_line_lists_present_phases_in_order() {
        let report = vlm_rag_tracker(SpanPairing::ByBaseName).report().unwrap();
        assert_eq!(
            report.summary_line(),
            "\n\n---\n⚡ Processing Time: 1.00s (VLM: 0.30s | RAG: 0.05s)"
        );
    }

    #[test]
    fn summary_line_without_phases() {
        let report = LatencyReport {
            total: ms(1234),
            spans: BTreeMap::new(),
        };
        assert_eq!(report.summary_line(), "\n\n---\n⚡ Processing Time: 1.23s");
    }
}
