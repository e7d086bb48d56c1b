use std::fmt;

use crate::engine::LayerId;
use crate::identity::MethodIdentity;
use crate::manager::HOOK_MANAGER;

/// Disposable token owning exactly one installed redirection layer.
///
/// Disposal (explicit or on drop) restores the layer exactly once; disposing
/// again is a no-op. Dropping handles in reverse installation order pops the
/// stack; any other order splices the layer out without disturbing the rest.
pub struct MockHandle {
    identity: MethodIdentity,
    layer: LayerId,
    live: bool,
    final_calls: u64,
}

impl MockHandle {
    pub(crate) fn new(identity: MethodIdentity, layer: LayerId) -> Self {
        Self {
            identity,
            layer,
            live: true,
            final_calls: 0,
        }
    }

    /// Restores this handle's layer. Safe to call more than once.
    pub fn dispose(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        if let Some(calls) = HOOK_MANAGER.restore(self.identity.key(), self.layer) {
            self.final_calls = calls;
        }
    }

    pub fn is_disposed(&self) -> bool {
        !self.live
    }

    pub fn identity(&self) -> &MethodIdentity {
        &self.identity
    }

    /// How many calls this layer has served; retained across disposal.
    pub fn call_count(&self) -> u64 {
        if self.live {
            HOOK_MANAGER
                .call_count(self.identity.key(), self.layer)
                .unwrap_or(0)
        } else {
            self.final_calls
        }
    }

    /// Panics when the layer never served a call.
    pub fn assert_called(&self) {
        if self.call_count() == 0 {
            panic!("{} was not called", self.identity.display_name());
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandle")
            .field("target", &self.identity.display_name())
            .field("layer", &self.layer)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
