//! cpal output stream driving the mixer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;

use crate::{
    audio::{AudioBackend, AudioHandle, Completion, PlaybackError, PlaybackParams},
    resolve::Locator,
};

use super::{
    link::MixerLink,
    mixer::{Mixer, MixerCommand, MixerEvent},
    COMMAND_QUEUE_LEN, EVENT_QUEUE_LEN,
};

/// `AudioBackend` playing through the default output device.
pub struct CpalBackend {
    // Dropping the stream stops the callback.
    _stream: cpal::Stream,
    link: MixerLink,
}

impl CpalBackend {
    /// Open the default output device and start the mixer callback.
    pub fn open_default() -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlaybackError::Device("no default output device available".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| PlaybackError::Device(format!("failed to fetch default output config: {e}")))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let (command_tx, command_rx) = RingBuffer::<MixerCommand>::new(COMMAND_QUEUE_LEN);
        let (event_tx, event_rx) = RingBuffer::<MixerEvent>::new(EVENT_QUEUE_LEN);

        let stream = device
            .build_output_stream(
                &config.into(),
                {
                    let mut mixer = Mixer::new(channels, command_rx, event_tx);
                    move |data: &mut [f32], _| mixer.render(data)
                },
                move |err| tracing::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| PlaybackError::Device(format!("failed to build output stream: {e}")))?;
        stream
            .play()
            .map_err(|e| PlaybackError::Device(format!("failed to start output stream: {e}")))?;

        tracing::info!(sample_rate, channels, "audio output started");

        Ok(Self {
            _stream: stream,
            link: MixerLink::new(channels, sample_rate, command_tx, event_rx)?,
        })
    }
}

impl AudioBackend for CpalBackend {
    fn open(
        &mut self,
        locator: &Locator,
        params: PlaybackParams,
    ) -> Result<Box<dyn AudioHandle>, PlaybackError> {
        self.link.open(locator, params)
    }

    fn drain_completions(&mut self) -> Vec<Completion> {
        self.link.drain_completions()
    }
}
