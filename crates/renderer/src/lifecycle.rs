//! Two-state load guard shared by every asset kind.

use std::mem;

use asset::{
    AssetResult,
    diagnostics::{DiagnosticSink, LogSink},
};

use crate::device::GraphicsDevice;

/// A device-backed resource with an explicit loaded/unloaded lifecycle.
///
/// `load` on a loaded asset and `unload` on an unloaded one do nothing.
/// A failed `load` leaves the asset unloaded with no device handles.
pub trait Asset {
    fn name(&self) -> &str;
    fn is_loaded(&self) -> bool;

    /// Load, reporting recoverable conditions such as skipped mesh lines to
    /// `sink`.
    fn load_reporting(
        &mut self,
        device: &mut dyn GraphicsDevice,
        sink: &mut dyn DiagnosticSink,
    ) -> AssetResult<()>;

    fn load(&mut self, device: &mut dyn GraphicsDevice) -> AssetResult<()> {
        self.load_reporting(device, &mut LogSink)
    }

    fn unload(&mut self, device: &mut dyn GraphicsDevice);
}

/// Handles of a loaded asset, or nothing.
#[derive(Debug, Default)]
pub enum AssetState<T> {
    #[default]
    Unloaded,
    Loaded(T),
}

impl<T> AssetState<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, AssetState::Loaded(_))
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            AssetState::Loaded(value) => Some(value),
            AssetState::Unloaded => None,
        }
    }

    /// Run `load` unless already loaded. Returns whether it ran and succeeded.
    pub fn load_with(&mut self, load: impl FnOnce() -> AssetResult<T>) -> AssetResult<bool> {
        if self.is_loaded() {
            return Ok(false);
        }
        *self = AssetState::Loaded(load()?);
        Ok(true)
    }

    /// Hand the loaded value to `release`, leaving the state unloaded.
    /// Returns whether anything was released.
    pub fn unload_with(&mut self, release: impl FnOnce(T)) -> bool {
        match mem::replace(self, AssetState::Unloaded) {
            AssetState::Loaded(value) => {
                release(value);
                true
            }
            AssetState::Unloaded => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use asset::AssetError;

    use super::*;

    #[test]
    fn second_load_does_not_run() {
        let mut state = AssetState::Unloaded;
        let mut calls = 0;
        let loaded = state.load_with(|| {
            calls += 1;
            Ok(7)
        });
        assert!(loaded.expect("load"));
        let reloaded = state.load_with(|| {
            calls += 1;
            Ok(8)
        });
        assert!(!reloaded.expect("load"));
        assert_eq!(calls, 1);
        assert_eq!(state.loaded(), Some(&7));
    }

    #[test]
    fn failed_load_stays_unloaded() {
        let mut state: AssetState<u32> = AssetState::Unloaded;
        assert!(state.load_with(|| Err(AssetError::malformed("bad"))).is_err());
        assert!(!state.is_loaded());
    }

    #[test]
    fn unload_releases_once() {
        let mut state = AssetState::Loaded(3);
        let mut released = Vec::new();
        assert!(state.unload_with(|v| released.push(v)));
        assert!(!state.unload_with(|v| released.push(v)));
        assert_eq!(released, [3]);
        assert!(state.loaded().is_none());
    }
}
