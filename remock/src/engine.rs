use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::stub::NativeStub;

/// A unique id for an installed redirection layer.
pub type LayerId = u64;

static LAYER_ID: AtomicU64 = AtomicU64::new(0);

fn next_layer_id() -> LayerId {
    LAYER_ID.fetch_add(1, Ordering::Relaxed)
}

/// What an entry slot designates: the untouched original body or one
/// installed layer's stub.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Entry {
    Original,
    Layer(LayerId),
}

struct LayerNode {
    stub: NativeStub,
    /// The live entry captured immediately before this layer was installed.
    previous: Entry,
    prev: Option<LayerId>,
    next: Option<LayerId>,
    calls: u64,
}

/// Per-identity hook state: the live entry plus the redirection stack as a
/// doubly-linked node set, so an interior layer can be spliced out in O(1)
/// when handles are disposed out of order.
pub(crate) struct EntryState {
    live: Entry,
    nodes: HashMap<LayerId, LayerNode>,
    head: Option<LayerId>,
    tail: Option<LayerId>,
    /// Set by the manager when this state is pruned from the registry; a
    /// racing install observing it must re-fetch the state.
    pub(crate) retired: bool,
}

impl EntryState {
    pub(crate) fn new() -> Self {
        Self {
            live: Entry::Original,
            nodes: HashMap::new(),
            head: None,
            tail: None,
            retired: false,
        }
    }

    /// Captures the current live entry, links the new layer at the tail, and
    /// swaps the live entry to it. The caller holds this identity's critical
    /// section for the whole operation.
    pub(crate) fn install(&mut self, stub: NativeStub) -> LayerId {
        let id = next_layer_id();
        let previous = self.live;
        let node = LayerNode {
            stub,
            previous,
            prev: self.tail,
            next: None,
            calls: 0,
        };
        if let Some(tail) = self.tail {
            self.nodes
                .get_mut(&tail)
                .expect("tail layer is always present")
                .next = Some(id);
        } else {
            self.head = Some(id);
        }
        self.tail = Some(id);
        self.nodes.insert(id, node);
        self.live = Entry::Layer(id);
        self.check_invariant();
        id
    }

    /// Removes a layer anywhere in the stack. Removing the top rewrites the
    /// live entry back to the layer's recorded previous value; removing an
    /// interior layer splices the links and re-points the next neighbor's
    /// recorded previous. Unknown ids (already restored) return `None`.
    pub(crate) fn restore(&mut self, id: LayerId) -> Option<u64> {
        let node = self.nodes.remove(&id)?;
        match node.prev {
            Some(prev) => {
                self.nodes
                    .get_mut(&prev)
                    .expect("linked layer is always present")
                    .next = node.next;
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                let neighbor = self
                    .nodes
                    .get_mut(&next)
                    .expect("linked layer is always present");
                neighbor.prev = node.prev;
                neighbor.previous = node.previous;
            }
            None => self.tail = node.prev,
        }
        if self.live == Entry::Layer(id) {
            self.live = node.previous;
        }
        self.check_invariant();
        Some(node.calls)
    }

    /// The stub currently receiving calls, recording the call against its
    /// layer. `None` when the stack is empty and the original body runs.
    pub(crate) fn live_stub(&mut self) -> Option<NativeStub> {
        match self.live {
            Entry::Original => None,
            Entry::Layer(id) => {
                let node = self
                    .nodes
                    .get_mut(&id)
                    .expect("live entry always designates a present layer");
                node.calls += 1;
                Some(NativeStub::clone(&node.stub))
            }
        }
    }

    pub(crate) fn call_count(&self, id: LayerId) -> Option<u64> {
        self.nodes.get(&id).map(|node| node.calls)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn depth(&self) -> usize {
        self.nodes.len()
    }

    /// The live entry always designates the tail layer, or the original body
    /// when the stack is empty.
    fn check_invariant(&self) {
        debug_assert!(match (self.tail, self.live) {
            (Some(tail), Entry::Layer(live)) => tail == live,
            (None, Entry::Original) => true,
            _ => false,
        });
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::stub::{BoxArgs, BoxRet};

    use super::*;

    fn stub(value: i32) -> NativeStub {
        Arc::new(move |_args: BoxArgs| -> BoxRet { Box::new(value) })
    }

    fn live_value(state: &mut EntryState) -> Option<i32> {
        let stub = state.live_stub()?;
        Some(*stub(Box::new(())).downcast::<i32>().unwrap())
    }

    #[test]
    fn empty_state_calls_through() {
        let mut state = EntryState::new();
        assert_eq!(live_value(&mut state), None);
    }

    #[test]
    fn last_installed_wins() {
        let mut state = EntryState::new();
        state.install(stub(1));
        state.install(stub(2));
        assert_eq!(live_value(&mut state), Some(2));
    }

    #[test]
    fn restoring_the_top_reveals_the_next_outer_layer() {
        let mut state = EntryState::new();
        let first = state.install(stub(1));
        let second = state.install(stub(2));

        state.restore(second);
        assert_eq!(live_value(&mut state), Some(1));
        state.restore(first);
        assert_eq!(live_value(&mut state), None);
    }

    #[test]
    fn out_of_order_restore_splices_the_interior_layer() {
        let mut state = EntryState::new();
        let first = state.install(stub(1));
        let second = state.install(stub(2));

        // Dispose the older layer first: calls keep observing the top.
        state.restore(first);
        assert_eq!(live_value(&mut state), Some(2));

        // The survivor's recorded previous was re-pointed at the original.
        state.restore(second);
        assert_eq!(live_value(&mut state), None);
    }

    #[test]
    fn splice_in_the_middle_of_three_layers() {
        let mut state = EntryState::new();
        let first = state.install(stub(1));
        let second = state.install(stub(2));
        let third = state.install(stub(3));

        state.restore(second);
        assert_eq!(live_value(&mut state), Some(3));
        state.restore(third);
        assert_eq!(live_value(&mut state), Some(1));
        state.restore(first);
        assert_eq!(live_value(&mut state), None);
    }

    #[test]
    fn restore_is_idempotent() {
        let mut state = EntryState::new();
        let id = state.install(stub(1));
        assert!(state.restore(id).is_some());
        assert!(state.restore(id).is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn calls_are_recorded_against_the_serving_layer() {
        let mut state = EntryState::new();
        let first = state.install(stub(1));
        let second = state.install(stub(2));

        live_value(&mut state);
        live_value(&mut state);

        assert_eq!(state.call_count(second), Some(2));
        assert_eq!(state.call_count(first), Some(0));
        assert_eq!(state.restore(second), Some(2));
    }

    #[test]
    fn depth_tracks_installed_layers() {
        let mut state = EntryState::new();
        assert_eq!(state.depth(), 0);
        let id = state.install(stub(1));
        assert_eq!(state.depth(), 1);
        state.restore(id);
        assert_eq!(state.depth(), 0);
    }
}
