//! Walk orchestrator (§4.9): iterative GETNEXT/GETBULK traversal with
//! subtree containment, loop detection, and adaptive bulk-size tuning.
//!
//! Grounded on the teacher's `snmp/client.rs::walk` loop (GETNEXT-until-out-
//! of-subtree) for the linear mode, and `other_examples/ContinuousC-
//! SmartAgent`'s `BulkConfig::max_repetitions` for the adaptive bulk-size
//! controller (double on success, halve on `too_big`, clamp to a ceiling).

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::codec::Varbind;
use crate::engine::{Engine, RequestOptions, SnmpVersion};
use crate::error::SnmpError;
use crate::oid::Oid;
use crate::target::Target;
use crate::value::Value;

const DEFAULT_MAX_ENTRIES: usize = 100_000;
const BULK_FLOOR: u32 = 1;

/// Tuning knobs for [`walk`] and [`walk_stream`].
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub initial_max_repetitions: u32,
    pub max_repetitions_ceiling: u32,
    pub max_entries: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        WalkOptions {
            initial_max_repetitions: 10,
            max_repetitions_ceiling: 100,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Walk the subtree rooted at `root_text`, buffering the full result.
pub async fn walk(
    engine: &Engine,
    target: &Target,
    root_text: &str,
    opts: &RequestOptions,
    walk_opts: &WalkOptions,
) -> Result<Vec<Varbind>, SnmpError> {
    let mut stream = WalkStream::new(engine, target, root_text, opts.clone(), *walk_opts, CancellationToken::new())?;
    let mut out = Vec::new();
    while let Some(item) = stream.next().await {
        out.push(item?);
    }
    Ok(out)
}

/// A lazy, finite, non-restartable sequence of varbinds from a walk.
/// Terminates on any of the §4.9 stop conditions. A mid-stream decode or
/// protocol error is delivered as the last item, per the open-question
/// resolution in spec §9 (no silent truncation).
pub struct WalkStream<'a> {
    engine: &'a Engine,
    target: &'a Target,
    root: Oid,
    opts: RequestOptions,
    walk_opts: WalkOptions,
    cancel: CancellationToken,
    current: Oid,
    current_bulk: u32,
    emitted: usize,
    done: bool,
    pending: Vec<Varbind>,
}

impl<'a> WalkStream<'a> {
    pub fn new(
        engine: &'a Engine,
        target: &'a Target,
        root_text: &str,
        opts: RequestOptions,
        walk_opts: WalkOptions,
        cancel: CancellationToken,
    ) -> Result<WalkStream<'a>, SnmpError> {
        let root = Oid::parse(root_text)?;
        Ok(WalkStream {
            engine,
            target,
            current: root.clone(),
            root,
            opts,
            walk_opts,
            cancel,
            current_bulk: walk_opts.initial_max_repetitions,
            emitted: 0,
            done: false,
            pending: Vec::new(),
        })
    }

    /// Pull the next varbind, or `None` once the walk has terminated.
    pub async fn next(&mut self) -> Option<Result<Varbind, SnmpError>> {
        if self.done {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.done = true;
            return None;
        }
        if self.emitted >= self.walk_opts.max_entries {
            self.done = true;
            return None;
        }

        if !self.pending.is_empty() {
            return self.take_pending();
        }

        let fetch = match self.opts.version {
            SnmpVersion::V1 => self.fetch_linear().await,
            SnmpVersion::V2c => self.fetch_bulk().await,
        };

        match fetch {
            Ok(()) => self.take_pending(),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    fn take_pending(&mut self) -> Option<Result<Varbind, SnmpError>> {
        if self.pending.is_empty() {
            self.done = true;
            return None;
        }
        let vb = self.pending.remove(0);
        self.emitted += 1;
        Some(Ok(vb))
    }

    async fn fetch_linear(&mut self) -> Result<(), SnmpError> {
        let (next_oid, vb) = self.engine.get_next(self.target, &self.current.to_string(), &self.opts).await?;
        self.apply_stop_conditions(&next_oid, &vb.value)?;
        if self.done {
            return Ok(());
        }
        self.current = next_oid;
        self.pending.push(vb);
        Ok(())
    }

    async fn fetch_bulk(&mut self) -> Result<(), SnmpError> {
        let mut bulk_opts = self.opts.clone();
        bulk_opts.non_repeaters = 0;
        bulk_opts.max_repetitions = self.current_bulk;
        let result = self
            .engine
            .get_bulk(self.target, &self.current.to_string(), &bulk_opts)
            .await;

        let varbinds = match result {
            Ok(vbs) => {
                self.current_bulk = (self.current_bulk * 2).min(self.walk_opts.max_repetitions_ceiling);
                vbs
            }
            Err(SnmpError::TooBig { .. }) => {
                self.current_bulk = (self.current_bulk / 2).max(BULK_FLOOR);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if varbinds.is_empty() {
            self.done = true;
            return Ok(());
        }

        let mut last_in_subtree = self.current.clone();
        for vb in varbinds {
            if self.done {
                break;
            }
            let oid = vb.oid.clone();
            self.apply_stop_conditions(&oid, &vb.value)?;
            if self.done {
                break;
            }
            last_in_subtree = oid;
            self.pending.push(vb);
        }
        self.current = last_in_subtree;
        Ok(())
    }

    /// Check the three non-cancellation stop conditions from §4.9: out of
    /// subtree, `endOfMibView`, and the loop guard (non-increasing OID).
    fn apply_stop_conditions(&mut self, candidate: &Oid, value: &Value) -> Result<(), SnmpError> {
        if !self.root.is_prefix_of(candidate) {
            self.done = true;
            return Ok(());
        }
        if matches!(value, Value::EndOfMibView) {
            self.done = true;
            return Ok(());
        }
        if *candidate <= self.current {
            self.done = true;
            return Ok(());
        }
        Ok(())
    }
}

/// Probe a target with escalating bulk sizes to find the largest
/// `max_repetitions` that still responds within `target_latency` (§4.9).
pub async fn benchmark_bulk_size(
    engine: &Engine,
    target: &Target,
    root_text: &str,
    opts: &RequestOptions,
    target_latency: Duration,
    ceiling: u32,
) -> Result<u32, SnmpError> {
    let mut best = BULK_FLOOR;
    let mut candidate = 10u32.min(ceiling).max(BULK_FLOOR);
    loop {
        let mut probe_opts = opts.clone();
        probe_opts.non_repeaters = 0;
        probe_opts.max_repetitions = candidate;
        let started = Instant::now();
        let outcome = engine.get_bulk(target, root_text, &probe_opts).await;
        let elapsed = started.elapsed();
        match outcome {
            Ok(_) if elapsed <= target_latency => {
                best = candidate;
                if candidate >= ceiling {
                    break;
                }
                candidate = (candidate * 2).min(ceiling);
            }
            _ => break,
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_size_doubles_and_halves_within_bounds() {
        let mut current = 10u32;
        let ceiling = 100u32;
        current = (current * 2).min(ceiling);
        assert_eq!(current, 20);
        current = (current / 2).max(BULK_FLOOR);
        assert_eq!(current, 10);
        current = ceiling * 10;
        current = current.min(ceiling);
        assert_eq!(current, ceiling);
    }

    #[test]
    fn stop_condition_detects_out_of_subtree() {
        let root = Oid::parse("1.3.6.1.2.1.1").unwrap();
        let candidate = Oid::parse("1.3.6.1.2.1.2.1").unwrap();
        assert!(!root.is_prefix_of(&candidate));
    }

    #[test]
    fn stop_condition_detects_non_increasing_oid() {
        let prev = Oid::parse("1.3.6.1.2.1.1.5.0").unwrap();
        let candidate = Oid::parse("1.3.6.1.2.1.1.5.0").unwrap();
        assert!(candidate <= prev);
    }
}
