//! Microphone backed by clips the browser uploads.
//!
//! The client records locally and reports its permission when a recording
//! starts; the clip arrives with the stop request. One handle lives in the
//! sequencer as its `AudioDevice`, a clone stays with the session so the
//! request handlers can feed it.

use std::sync::{Arc, Mutex, MutexGuard};

use learnflow_core::{AudioDevice, FlowError};

#[derive(Debug, Default)]
struct MicrophoneState {
    permitted: bool,
    clip: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientMicrophone {
    state: Arc<Mutex<MicrophoneState>>,
}

impl ClientMicrophone {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MicrophoneState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the permission the client reported for the next recording.
    pub fn set_permission(&self, permitted: bool) {
        self.state().permitted = permitted;
    }

    /// Hand over the clip for the recording about to be stopped.
    pub fn deliver(&self, clip: Vec<u8>) {
        self.state().clip = clip;
    }
}

impl AudioDevice for ClientMicrophone {
    fn begin(&mut self) -> learnflow_core::Result<()> {
        let mut state = self.state();
        if !state.permitted {
            return Err(FlowError::DeviceUnavailable(
                "microphone permission denied by client".to_string(),
            ));
        }
        state.clip.clear();
        Ok(())
    }

    fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.state().clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_permission_fails_to_begin() {
        let mut mic = ClientMicrophone::new();
        assert!(matches!(mic.begin(), Err(FlowError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_delivered_clip_is_taken_once() {
        let handle = ClientMicrophone::new();
        let mut device = handle.clone();
        handle.set_permission(true);
        device.begin().unwrap();
        handle.deliver(b"webm".to_vec());

        assert_eq!(device.finish(), b"webm".to_vec());
        assert!(device.finish().is_empty());
    }

    #[test]
    fn test_begin_discards_stale_clip() {
        let handle = ClientMicrophone::new();
        let mut device = handle.clone();
        handle.set_permission(true);
        handle.deliver(b"old".to_vec());
        device.begin().unwrap();
        assert!(device.finish().is_empty());
    }
}
