//! Linearizability search over the entries of a partitioned history.
//!
//! Each partition is checked with the backtracking algorithm of Wing and Gong, extended by Lowe
//! with a cache of `(linearized set, state)` pairs so that equivalent configurations are only
//! explored once.

use {
    crate::{Event, EventKind, Model, Operation, Value},
    bit_vec::BitVec,
    crossbeam::channel::{self, RecvTimeoutError},
    std::{
        any::Any,
        collections::{BTreeSet, HashMap},
        mem,
        panic::resume_unwind,
        sync::atomic::{AtomicBool, Ordering},
        thread,
        time::{Duration, Instant},
    },
    tracing::{debug, trace},
};

/// Outcome of a linearizability check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CheckResult {
    /// The history is linearizable.
    Ok,
    /// The history is not linearizable.
    Illegal,
    /// The check timed out before reaching a verdict.
    Unknown,
}

/// A call or return, positioned in time. Operation histories use timestamps as `time`, event
/// histories use the position of the event.
#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub(crate) kind: EventKind,
    pub(crate) value: Value,
    pub(crate) id: usize,
    pub(crate) time: i64,
    pub(crate) client_id: usize,
}

/// Data gathered by a verbose check, used by [`visualize`](crate::visualize).
///
/// For every partition it holds the partition's entries and the longest partial
/// linearizations found, as sequences of operation ids. If the partition is linearizable,
/// its only partial linearization is a complete one.
#[derive(Clone, Debug, Default)]
pub struct LinearizationInfo {
    pub(crate) history: Vec<Vec<Entry>>,
    pub(crate) partial_linearizations: Vec<Vec<Vec<usize>>>,
}

impl LinearizationInfo {
    pub fn partition_count(&self) -> usize {
        self.history.len()
    }

    pub fn partial_linearizations(&self, partition: usize) -> &[Vec<usize>] {
        &self.partial_linearizations[partition]
    }
}

fn make_entries(history: &[Operation]) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(2 * history.len());
    for (id, op) in history.iter().enumerate() {
        entries.push(Entry {
            kind: EventKind::Call,
            value: op.input.clone(),
            id,
            time: op.call,
            client_id: op.client_id,
        });
        entries.push(Entry {
            kind: EventKind::Return,
            value: op.output.clone(),
            id,
            time: op.ret,
            client_id: op.client_id,
        });
    }
    // Calls sort before returns at the same instant, so touching intervals overlap.
    entries.sort_by(|a, b| a.time.cmp(&b.time).then(a.kind.cmp(&b.kind)));
    entries
}

/// Renumbers event ids to `0..n` in order of first appearance and uses positions as times.
fn convert_events(history: &[Event]) -> Vec<Entry> {
    let mut renumbered = HashMap::new();
    history
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let next_id = renumbered.len();
            let id = *renumbered.entry(event.id).or_insert(next_id);
            Entry {
                kind: event.kind,
                value: event.value.clone(),
                id,
                time: i as i64,
                client_id: event.client_id,
            }
        })
        .collect()
}

const HEAD: usize = 0;

struct Node {
    id: usize,
    value: Value,
    /// Position of the matching return, for calls only.
    matched: Option<usize>,
    prev: usize,
    next: Option<usize>,
}

/// A doubly linked list of entries in which a call can be detached together with its return
/// and later reattached at the same place.
struct EntryList {
    nodes: Vec<Node>,
}

impl EntryList {
    fn new(entries: &[Entry]) -> Self {
        let returns: HashMap<usize, usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == EventKind::Return)
            .map(|(i, e)| (e.id, i + 1))
            .collect();
        let mut nodes = Vec::with_capacity(entries.len() + 1);
        nodes.push(Node {
            id: usize::MAX,
            value: Value::new(()),
            matched: None,
            prev: HEAD,
            next: (!entries.is_empty()).then_some(1),
        });
        for (i, entry) in entries.iter().enumerate() {
            let matched = match entry.kind {
                EventKind::Call => match returns.get(&entry.id) {
                    Some(&position) => Some(position),
                    None => panic!("history has no return for call {}", entry.id),
                },
                EventKind::Return => None,
            };
            nodes.push(Node {
                id: entry.id,
                value: entry.value.clone(),
                matched,
                prev: i,
                next: (i + 1 < entries.len()).then_some(i + 2),
            });
        }
        EntryList { nodes }
    }

    fn front(&self) -> Option<usize> {
        self.nodes[HEAD].next
    }

    fn next(&self, node: usize) -> Option<usize> {
        self.nodes[node].next
    }

    fn detach(&mut self, node: usize) {
        let (prev, next) = (self.nodes[node].prev, self.nodes[node].next);
        self.nodes[prev].next = next;
        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }
    }

    fn reattach(&mut self, node: usize) {
        let (prev, next) = (self.nodes[node].prev, self.nodes[node].next);
        self.nodes[prev].next = Some(node);
        if let Some(next) = next {
            self.nodes[next].prev = node;
        }
    }

    fn lift(&mut self, call: usize) {
        self.detach(call);
        if let Some(ret) = self.nodes[call].matched {
            self.detach(ret);
        }
    }

    fn unlift(&mut self, call: usize) {
        if let Some(ret) = self.nodes[call].matched {
            self.reattach(ret);
        }
        self.reattach(call);
    }
}

struct CallFrame {
    node: usize,
    state: Value,
}

fn cache_contains(
    model: &Model,
    cache: &HashMap<BitVec, Vec<Value>>,
    linearized: &BitVec,
    state: &Value,
) -> bool {
    cache.get(linearized).map_or(false, |states| {
        states.iter().any(|s| model.equal_states(s, state))
    })
}

/// Checks one partition. Returns whether it is linearizable along with the longest partial
/// linearizations when `compute_partial` is set.
fn check_single(
    model: &Model,
    entries: &[Entry],
    compute_partial: bool,
    kill: &AtomicBool,
) -> (bool, Vec<Vec<usize>>) {
    let n = entries.len() / 2;
    let mut list = EntryList::new(entries);
    let mut linearized = BitVec::from_elem(n, false);
    let mut cache: HashMap<BitVec, Vec<Value>> = HashMap::new();
    let mut calls: Vec<CallFrame> = Vec::new();
    // Index into `sequences` of the longest partial linearization containing each operation.
    let mut longest: Vec<Option<usize>> = vec![None; n];
    let mut sequences: Vec<Vec<usize>> = Vec::new();

    let mut state = model.init();
    let mut cursor = list.front();
    while let Some(entry) = cursor {
        if kill.load(Ordering::Relaxed) {
            return (false, collect_partials(longest, sequences));
        }
        let id = list.nodes[entry].id;
        match list.nodes[entry].matched {
            Some(ret) => {
                let (ok, new_state) =
                    model.step(&state, &list.nodes[entry].value, &list.nodes[ret].value);
                if ok {
                    let mut new_linearized = linearized.clone();
                    new_linearized.set(id, true);
                    if !cache_contains(model, &cache, &new_linearized, &new_state) {
                        trace!(id, "linearizing call");
                        cache
                            .entry(new_linearized.clone())
                            .or_default()
                            .push(new_state.clone());
                        calls.push(CallFrame {
                            node: entry,
                            state: mem::replace(&mut state, new_state),
                        });
                        linearized = new_linearized;
                        list.lift(entry);
                        cursor = list.front();
                        continue;
                    }
                }
                cursor = list.next(entry);
            }
            None => {
                // A return with no linearized call before it: backtrack.
                if calls.is_empty() {
                    return (false, collect_partials(longest, sequences));
                }
                if compute_partial {
                    let len = calls.len();
                    let mut current = None;
                    for frame in &calls {
                        let call_id = list.nodes[frame.node].id;
                        let longer = longest[call_id].map_or(true, |i| len > sequences[i].len());
                        if longer {
                            let index = *current.get_or_insert_with(|| {
                                sequences
                                    .push(calls.iter().map(|f| list.nodes[f.node].id).collect());
                                sequences.len() - 1
                            });
                            longest[call_id] = Some(index);
                        }
                    }
                }
                let Some(frame) = calls.pop() else {
                    unreachable!("checked above");
                };
                trace!(id = list.nodes[frame.node].id, "revoking call");
                linearized.set(list.nodes[frame.node].id, false);
                state = frame.state;
                list.unlift(frame.node);
                cursor = list.next(frame.node);
            }
        }
    }

    let ok = list.front().is_none();
    if ok && compute_partial {
        sequences.push(calls.iter().map(|f| list.nodes[f.node].id).collect());
        longest = vec![Some(sequences.len() - 1); n];
    }
    (ok, collect_partials(longest, sequences))
}

fn collect_partials(longest: Vec<Option<usize>>, sequences: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    let used: BTreeSet<usize> = longest.into_iter().flatten().collect();
    sequences
        .into_iter()
        .enumerate()
        .filter(|(i, _)| used.contains(i))
        .map(|(_, seq)| seq)
        .collect()
}

/// Stops the remaining workers when the worker holding it unwinds, so that a panicking model
/// surfaces without waiting for the other partitions.
struct KillOnPanic<'a>(&'a AtomicBool);

impl Drop for KillOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

fn check_parallel(
    model: &Model,
    history: Vec<Vec<Entry>>,
    compute_info: bool,
    timeout: Duration,
) -> (CheckResult, LinearizationInfo) {
    debug!(partitions = history.len(), ?timeout, "checking history");
    let kill = AtomicBool::new(false);
    let mut partials = vec![Vec::new(); history.len()];
    let mut ok = true;
    let mut timed_out = false;

    let scoped = crossbeam::thread::scope(|scope| {
        let (tx, rx) = channel::unbounded();
        for (i, entries) in history.iter().enumerate() {
            let tx = tx.clone();
            let kill = &kill;
            scope.spawn(move |_| {
                let _guard = KillOnPanic(kill);
                let (ok, partial) = check_single(model, entries, compute_info, kill);
                // The receiver is gone once the verdict is settled.
                let _ = tx.send((i, ok, partial));
            });
        }
        drop(tx);

        let deadline = (timeout > Duration::ZERO).then(|| Instant::now() + timeout);
        for _ in 0..history.len() {
            let received = match deadline {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((i, partition_ok, partial)) => {
                    debug!(partition = i, ok = partition_ok, "partition checked");
                    partials[i] = partial;
                    if !partition_ok {
                        ok = false;
                        if !compute_info {
                            kill.store(true, Ordering::Relaxed);
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    debug!("timed out");
                    timed_out = true;
                    kill.store(true, Ordering::Relaxed);
                    break;
                }
                // A worker panicked; the scope rethrows it below.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });
    if let Err(panic) = scoped {
        // crossbeam collects the payloads of all panicked workers.
        match panic.downcast::<Vec<Box<dyn Any + Send + 'static>>>() {
            Ok(panics) => {
                if let Some(panic) = (*panics).into_iter().next() {
                    resume_unwind(panic);
                }
                panic!("a worker panicked");
            }
            Err(panic) => resume_unwind(panic),
        }
    }

    let result = match (ok, timed_out) {
        (false, _) => CheckResult::Illegal,
        (true, true) => CheckResult::Unknown,
        (true, false) => CheckResult::Ok,
    };
    debug!(?result, "check complete");
    let info = LinearizationInfo {
        history,
        partial_linearizations: partials,
    };
    (result, info)
}

fn check_operation_partitions(
    model: &Model,
    history: &[Operation],
    compute_info: bool,
    timeout: Duration,
) -> (CheckResult, LinearizationInfo) {
    let partitions = model
        .partition_operations(history)
        .iter()
        .map(|partition| make_entries(partition))
        .collect();
    check_parallel(model, partitions, compute_info, timeout)
}

fn check_event_partitions(
    model: &Model,
    history: &[Event],
    compute_info: bool,
    timeout: Duration,
) -> (CheckResult, LinearizationInfo) {
    let partitions = model
        .partition_events(history)
        .iter()
        .map(|partition| convert_events(partition))
        .collect();
    check_parallel(model, partitions, compute_info, timeout)
}

/// Checks whether an operation history is linearizable.
pub fn check_operations(model: &Model, history: &[Operation]) -> bool {
    check_operation_partitions(model, history, false, Duration::ZERO).0 == CheckResult::Ok
}

/// Checks whether an operation history is linearizable, giving up after `timeout`. A zero
/// timeout never expires.
pub fn check_operations_timeout(
    model: &Model,
    history: &[Operation],
    timeout: Duration,
) -> CheckResult {
    check_operation_partitions(model, history, false, timeout).0
}

/// Like [`check_operations_timeout`], but also gathers the data needed to visualize the
/// history and its (partial) linearizations.
pub fn check_operations_verbose(
    model: &Model,
    history: &[Operation],
    timeout: Duration,
) -> (CheckResult, LinearizationInfo) {
    check_operation_partitions(model, history, true, timeout)
}

/// Checks whether an event history is linearizable.
pub fn check_events(model: &Model, history: &[Event]) -> bool {
    check_event_partitions(model, history, false, Duration::ZERO).0 == CheckResult::Ok
}

/// Checks whether an event history is linearizable, giving up after `timeout`. A zero timeout
/// never expires.
pub fn check_events_timeout(model: &Model, history: &[Event], timeout: Duration) -> CheckResult {
    check_event_partitions(model, history, false, timeout).0
}

/// Like [`check_events_timeout`], but also gathers the data needed to visualize the history
/// and its (partial) linearizations.
pub fn check_events_verbose(
    model: &Model,
    history: &[Event],
    timeout: Duration,
) -> (CheckResult, LinearizationInfo) {
    check_event_partitions(model, history, true, timeout)
}
