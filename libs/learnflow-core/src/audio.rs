//! Recording lifecycle for pronunciation tasks.
//!
//! A capture session is either idle or recording; `start` and `stop` are the
//! only transitions. The microphone itself sits behind [`AudioDevice`].

use tracing::debug;

use crate::error::{ActionError, CaptureError, Result};

/// Microphone capability: record, stop, hand over the clip.
pub trait AudioDevice: Send + Sync {
    /// Begin capturing. Fails with `FlowError::DeviceUnavailable` when
    /// permission is denied or no device exists.
    fn begin(&mut self) -> Result<()>;

    /// Stop capturing and return the recorded bytes.
    fn finish(&mut self) -> Vec<u8>;
}

/// Identifies one recording started by a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingHandle {
    id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Idle,
    Recording(RecordingHandle),
}

pub struct AudioCaptureSession {
    device: Box<dyn AudioDevice>,
    state: CaptureState,
    next_id: u64,
}

impl AudioCaptureSession {
    pub fn new(device: Box<dyn AudioDevice>) -> Self {
        Self {
            device,
            state: CaptureState::Idle,
            next_id: 1,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, CaptureState::Recording(_))
    }

    /// Start a recording. Rejected while another one is active.
    pub fn start(&mut self) -> std::result::Result<RecordingHandle, CaptureError> {
        if self.is_recording() {
            return Err(ActionError::AlreadyRecording.into());
        }
        self.device.begin()?;

        let handle = RecordingHandle { id: self.next_id };
        self.next_id += 1;
        self.state = CaptureState::Recording(handle);
        debug!(recording = handle.id, "recording started");
        Ok(handle)
    }

    /// Stop the active recording and take its audio.
    pub fn stop(&mut self, handle: RecordingHandle) -> std::result::Result<Vec<u8>, ActionError> {
        match self.state {
            CaptureState::Idle => Err(ActionError::NotRecording),
            CaptureState::Recording(active) if active != handle => Err(ActionError::StaleRecording),
            CaptureState::Recording(_) => {
                self.state = CaptureState::Idle;
                let audio = self.device.finish();
                debug!(recording = handle.id, bytes = audio.len(), "recording stopped");
                Ok(audio)
            }
        }
    }

    /// Force-stop any active recording and discard its audio.
    pub fn abandon(&mut self) {
        if let CaptureState::Recording(handle) = self.state {
            self.state = CaptureState::Idle;
            let discarded = self.device.finish();
            debug!(recording = handle.id, bytes = discarded.len(), "recording discarded");
        }
    }
}
