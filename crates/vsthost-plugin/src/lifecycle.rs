//! Activation state machine.
//!
//! `Closed -> Open -> Enabled -> Processing`, plus an editor flag alongside.
//! Every transition is idempotent and dispatches at most once; without a
//! dispatcher every transition is a no-op.

use crate::dispatch::Dispatcher;
use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use vsthost_abi::abi::opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Closed,
    /// Open with mains off.
    Open,
    Enabled,
    Processing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Lifecycle {
    open: bool,
    enabled: bool,
    processing: bool,
    editor_open: bool,
}

impl Lifecycle {
    pub fn state(&self) -> LifecycleState {
        if self.processing {
            LifecycleState::Processing
        } else if self.enabled {
            LifecycleState::Enabled
        } else if self.open {
            LifecycleState::Open
        } else {
            LifecycleState::Closed
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn is_editor_open(&self) -> bool {
        self.editor_open
    }

    pub fn open(&mut self, dispatcher: &Dispatcher) {
        if self.open || !dispatcher.is_available() {
            return;
        }
        dispatcher.send(opcode::OPEN, 0, 0, 0.0);
        self.open = true;
        tracing::debug!("plugin opened");
    }

    pub fn close(&mut self, dispatcher: &Dispatcher) {
        if !self.open || !dispatcher.is_available() {
            return;
        }
        dispatcher.send(opcode::CLOSE, 0, 0, 0.0);
        self.open = false;
        tracing::debug!("plugin closed");
    }

    /// Mains on.
    pub fn enable(&mut self, dispatcher: &Dispatcher) {
        if self.enabled || !dispatcher.is_available() {
            return;
        }
        dispatcher.send(opcode::MAINS_CHANGED, 0, 1, 0.0);
        self.enabled = true;
        tracing::debug!("mains on");
    }

    /// Mains off, stopping processing first.
    pub fn disable(&mut self, dispatcher: &Dispatcher) {
        if !self.enabled || !dispatcher.is_available() {
            return;
        }
        if self.processing {
            self.stop_process(dispatcher);
        }
        dispatcher.send(opcode::MAINS_CHANGED, 0, 0, 0.0);
        self.enabled = false;
        tracing::debug!("mains off");
    }

    /// Starts processing, switching mains on first.
    pub fn start_process(&mut self, dispatcher: &Dispatcher) {
        if self.processing || !dispatcher.is_available() {
            return;
        }
        if !self.enabled {
            self.enable(dispatcher);
        }
        dispatcher.send(opcode::START_PROCESS, 0, 0, 0.0);
        self.processing = true;
        tracing::debug!("processing started");
    }

    pub fn stop_process(&mut self, dispatcher: &Dispatcher) {
        if !self.processing || !dispatcher.is_available() {
            return;
        }
        dispatcher.send(opcode::STOP_PROCESS, 0, 0, 0.0);
        self.processing = false;
        tracing::debug!("processing stopped");
    }

    /// Opens the editor in `window`, closing an already open editor first.
    /// Returns whether the plugin accepted.
    pub fn open_editor(&mut self, dispatcher: &Dispatcher, window: *mut c_void) -> bool {
        if !dispatcher.is_available() {
            return false;
        }
        if self.editor_open {
            self.close_editor(dispatcher);
        }
        // SAFETY: the window handle is forwarded untouched; the caller
        // vouches for it.
        let accepted = unsafe { dispatcher.call(opcode::EDIT_OPEN, 0, 0, window, 0.0) } != 0;
        self.editor_open = accepted;
        tracing::debug!(accepted, "editor open requested");
        accepted
    }

    pub fn close_editor(&mut self, dispatcher: &Dispatcher) {
        if !self.editor_open || !dispatcher.is_available() {
            return;
        }
        dispatcher.send(opcode::EDIT_CLOSE, 0, 0, 0.0);
        self.editor_open = false;
        tracing::debug!("editor closed");
    }

    /// Teardown order: mains off (stopping processing), editor, close.
    pub fn shut_down(&mut self, dispatcher: &Dispatcher) {
        self.disable(dispatcher);
        self.close_editor(dispatcher);
        self.close(dispatcher);
    }
}
