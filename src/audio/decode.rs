//! Clip decoding with symphonia, plus conversion to the output format.

use std::{fs::File, io, path::Path};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::DecoderOptions,
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("missing audio track")]
    MissingTrack,

    #[error("missing sample rate in codec parameters")]
    MissingSampleRate,

    #[error("missing channel layout in codec parameters")]
    MissingChannels,

    #[error("decoder error: {0}")]
    Symphonia(#[from] SymphoniaError),
}

/// Decoded clip, interleaved f32 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundData {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl SoundData {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Convert to the given channel count and sample rate.
    pub fn conform(self, channels: u16, sample_rate: u32) -> SoundData {
        self.remap_channels(channels).resample(sample_rate)
    }

    fn remap_channels(self, channels: u16) -> SoundData {
        if channels == self.channels || self.channels == 0 || channels == 0 {
            return self;
        }
        let (cin, cout) = (self.channels as usize, channels as usize);
        let mut samples = Vec::with_capacity(self.frames() * cout);

        for frame in self.samples.chunks_exact(cin) {
            if cout == 1 {
                samples.push(frame.iter().sum::<f32>() / cin as f32);
            } else if cin == 1 {
                samples.extend(std::iter::repeat(frame[0]).take(cout));
            } else {
                samples.extend((0..cout).map(|ch| frame[ch % cin]));
            }
        }

        SoundData {
            samples,
            channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Linear interpolation between neighbouring frames.
    fn resample(self, sample_rate: u32) -> SoundData {
        if sample_rate == self.sample_rate || self.sample_rate == 0 || sample_rate == 0 {
            return self;
        }
        let channels = self.channels as usize;
        let frames_in = self.frames();
        if frames_in == 0 {
            return SoundData {
                sample_rate,
                ..self
            };
        }

        let step = self.sample_rate as f64 / sample_rate as f64;
        let frames_out = ((frames_in as f64) / step).ceil() as usize;
        let mut samples = Vec::with_capacity(frames_out * channels);

        for i in 0..frames_out {
            let pos = i as f64 * step;
            let i0 = (pos.floor() as usize).min(frames_in - 1);
            let i1 = (i0 + 1).min(frames_in - 1);
            let frac = (pos - i0 as f64) as f32;
            for ch in 0..channels {
                let a = self.samples[i0 * channels + ch];
                let b = self.samples[i1 * channels + ch];
                samples.push(a + (b - a) * frac);
            }
        }

        SoundData {
            samples,
            channels: self.channels,
            sample_rate,
        }
    }
}

/// Decode a whole file into memory.
pub fn decode_file(path: &Path) -> Result<SoundData, DecodeError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .default_track()
        .ok_or(DecodeError::MissingTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::MissingSampleRate)?;
    let channels = track
        .codec_params
        .channels
        .ok_or(DecodeError::MissingChannels)?
        .count() as u16;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
    let mut samples = Vec::<f32>::new();

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // A corrupt packet is skipped, the rest of the clip still plays.
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(path = %path.display(), "skipping corrupt packet: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(SoundData {
        samples,
        channels,
        sample_rate,
    })
}

#[cfg(test)]
pub(crate) fn write_test_wav(path: &Path, frames: usize, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample(((i % 64) as i16 - 32) * 512).unwrap();
    }
    writer.finalize().unwrap();
}
