/*!
 * Device hooks: pre/post side-channel callbacks on inputs, actions,
 * outputs, and the `act`/`out`/`xto` pseudo-components.
 */

use std::sync::Arc;

use crate::core::InlineString;
use crate::event::Context;
use crate::signal::SignalConnection;

/// The context every hook callback receives: the handler's own call
/// context, plus whatever context the hook was installed with. Output
/// hooks never have a call context.
pub struct HookContext {
    pub call_context: Option<Context>,
    pub hook_context: Option<Context>,
}

/// Context delivered to `xto`-hooks: who called `xto`, and the transition
/// it performed.
pub struct XtoContext {
    pub caller: InlineString,
    pub old_state: InlineString,
    pub new_state: InlineString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookWhen {
    Pre,
    Post,
}

struct HookEntryInner {
    call: crate::event::EventCallback,
    hook_context: Option<Context>,
}

#[derive(Clone)]
pub(super) struct HookEntry(Arc<HookEntryInner>);

impl HookEntry {
    pub(super) fn new(call: crate::event::EventCallback, hook_context: Option<Context>) -> Self {
        Self(Arc::new(HookEntryInner { call, hook_context }))
    }

    pub(super) fn call(&self) -> &crate::event::EventCallback {
        &self.0.call
    }

    pub(super) fn hook_context(&self) -> Option<Context> {
        self.0.hook_context.clone()
    }
}

impl PartialEq for HookEntry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A handle returned by [`super::Device::hook`], usable to remove the hook
/// again via [`super::Device::unhook`].
#[derive(Clone)]
pub enum HookHandle {
    Output {
        name: InlineString,
        conn: SignalConnection,
    },
    Component {
        name: InlineString,
        when: HookWhen,
        entry: HookEntry,
    },
}
