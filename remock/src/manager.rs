use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

use crate::engine::{EntryState, LayerId};
use crate::error::SetupError;
use crate::identity::{MethodIdentity, MethodKey, MethodShape};
use crate::stub::NativeStub;

/// Process-wide registry mapping method identity to its hook state. Created
/// lazily on first setup; entries are pruned when their stack empties.
pub(crate) static HOOK_MANAGER: Lazy<HookManager> = Lazy::new(HookManager::default);

#[derive(Default)]
pub(crate) struct HookManager {
    states: RwLock<HashMap<MethodKey, Arc<Mutex<EntryState>>>>,
}

impl HookManager {
    fn state(&self, key: &MethodKey) -> Option<Arc<Mutex<EntryState>>> {
        self.states.read().get(key).cloned()
    }

    fn state_or_create(&self, key: &MethodKey) -> Arc<Mutex<EntryState>> {
        if let Some(state) = self.state(key) {
            return state;
        }
        Arc::clone(
            self.states
                .write()
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(EntryState::new()))),
        )
    }

    /// Installs a stub as the new live entry for `identity` and returns the
    /// owning layer id. The whole observe-rewrite-push sequence runs inside
    /// the identity's critical section.
    pub(crate) fn install(
        &self,
        identity: &MethodIdentity,
        stub: NativeStub,
    ) -> Result<LayerId, SetupError> {
        if let MethodShape::NotRedirectable(reason) = identity.shape {
            return Err(SetupError::UnsupportedMethodShape {
                name: identity.display_name(),
                reason,
            });
        }
        loop {
            let state = self.state_or_create(identity.key());
            let mut state = state.lock();
            if state.retired {
                // Lost a race against prune; the map entry is gone.
                continue;
            }
            let layer = state.install(NativeStub::clone(&stub));
            log::debug!(
                "installed redirection layer {layer} on {} (depth {})",
                identity.display_name(),
                state.depth(),
            );
            return Ok(layer);
        }
    }

    /// Removes `layer` from the identity's stack, returning its final call
    /// count, or `None` when the layer was already restored. Prunes the
    /// registry entry once the stack is empty.
    pub(crate) fn restore(&self, key: &MethodKey, layer: LayerId) -> Option<u64> {
        let state = self.state(key)?;
        let mut guard = state.lock();
        let calls = guard.restore(layer);
        let empty = guard.is_empty();
        drop(guard);
        if calls.is_some() {
            log::debug!("restored redirection layer {layer} on `{}`", key.name);
        }
        if empty {
            self.prune(key);
        }
        calls
    }

    fn prune(&self, key: &MethodKey) {
        let mut map = self.states.write();
        if let Some(state) = map.get(key) {
            let mut state = state.lock();
            // Emptiness is re-checked under both locks: an install that
            // slipped in between keeps the entry alive.
            if state.is_empty() {
                state.retired = true;
                drop(state);
                map.remove(key);
                log::trace!("pruned empty hook state for `{}`", key.name);
            }
        }
    }

    /// The stub currently receiving calls for `key`, with the call recorded
    /// against the serving layer. `None` means the original body runs.
    pub(crate) fn live_stub(&self, key: &MethodKey) -> Option<NativeStub> {
        let state = self.state(key)?;
        let stub = state.lock().live_stub();
        stub
    }

    pub(crate) fn call_count(&self, key: &MethodKey, layer: LayerId) -> Option<u64> {
        let state = self.state(key)?;
        let count = state.lock().call_count(layer);
        count
    }

    #[cfg(test)]
    pub(crate) fn has_state(&self, key: &MethodKey) -> bool {
        self.states.read().contains_key(key)
    }

    #[cfg(test)]
    pub(crate) fn depth(&self, key: &MethodKey) -> usize {
        self.state(key).map_or(0, |state| state.lock().depth())
    }
}

#[cfg(test)]
mod test {
    use std::any::TypeId;
    use std::sync::Arc;

    use crate::identity::{BindingFlags, MethodKind, ReturnSig, TypeSig};
    use crate::stub::{BoxArgs, BoxRet};

    use super::*;

    fn identity(name: &'static str) -> MethodIdentity {
        MethodIdentity::new(
            TypeSig::of::<HookManager>(),
            name,
            TypeId::of::<()>(),
            MethodKind::Static,
            BindingFlags::default(),
            vec![],
            vec![],
            ReturnSig::Value(TypeSig::of::<i32>()),
            MethodShape::Redirectable,
        )
    }

    fn stub(value: i32) -> NativeStub {
        Arc::new(move |_args: BoxArgs| -> BoxRet { Box::new(value) })
    }

    fn live_value(manager: &HookManager, key: &MethodKey) -> Option<i32> {
        let stub = manager.live_stub(key)?;
        Some(*stub(Box::new(())).downcast::<i32>().unwrap())
    }

    #[test]
    fn install_and_restore_round_trip() {
        let manager = HookManager::default();
        let identity = identity("round_trip");

        let layer = manager.install(&identity, stub(5)).unwrap();
        assert_eq!(live_value(&manager, identity.key()), Some(5));

        assert_eq!(manager.restore(identity.key(), layer), Some(1));
        assert_eq!(live_value(&manager, identity.key()), None);
    }

    #[test]
    fn empty_stacks_are_pruned() {
        let manager = HookManager::default();
        let identity = identity("pruned");

        let layer = manager.install(&identity, stub(5)).unwrap();
        assert!(manager.has_state(identity.key()));

        manager.restore(identity.key(), layer);
        assert!(!manager.has_state(identity.key()));
    }

    #[test]
    fn restore_of_an_unknown_layer_is_a_no_op() {
        let manager = HookManager::default();
        let identity = identity("unknown_layer");
        assert_eq!(manager.restore(identity.key(), 12345), None);
    }

    #[test]
    fn identities_do_not_share_stacks() {
        let manager = HookManager::default();
        let first = identity("independent_a");
        let second = identity("independent_b");

        let layer = manager.install(&first, stub(1)).unwrap();
        assert_eq!(live_value(&manager, first.key()), Some(1));
        assert_eq!(live_value(&manager, second.key()), None);

        manager.restore(first.key(), layer);
    }

    #[test]
    fn non_redirectable_members_fail_install() {
        let manager = HookManager::default();
        let mut identity = identity("inlined");
        identity.shape = MethodShape::NotRedirectable("always inlined");

        let err = manager.install(&identity, stub(1)).unwrap_err();
        assert!(matches!(err, SetupError::UnsupportedMethodShape { .. }));
        assert!(!manager.has_state(identity.key()));
    }

    #[test]
    fn concurrent_installs_on_one_identity_stay_consistent() {
        let manager = Arc::new(HookManager::default());
        let identity = identity("contended");

        let handles: Vec<_> = (0..8)
            .map(|value| {
                let manager = Arc::clone(&manager);
                let identity = identity.clone();
                std::thread::spawn(move || manager.install(&identity, stub(value)).unwrap())
            })
            .collect();
        let layers: Vec<LayerId> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(manager.depth(identity.key()), 8);
        for layer in layers {
            manager.restore(identity.key(), layer);
        }
        assert_eq!(live_value(&manager, identity.key()), None);
        assert!(!manager.has_state(identity.key()));
    }
}
