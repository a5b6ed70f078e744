//! Realtime side of the output backend.
//!
//! The mixer lives inside the audio callback. It receives commands from the UI
//! thread over a lock-free ring, renders every playing voice into the output
//! block, and reports finished one-shot voices back over a second ring. Clips
//! that are released are handed back to the UI thread so the callback never
//! frees memory.
//!
//! Events that do not fit in the ring wait in a preallocated queue and are
//! retried on the next block. While that queue is nearly full the mixer stops
//! taking commands, so no event is ever dropped.

use std::{collections::VecDeque, sync::Arc};

use rtrb::{Consumer, Producer, PushError};

use crate::audio::{Completion, HandleId, SoundData};

use super::{COMMAND_QUEUE_LEN, MAX_VOICES};

/// Events held back while the event ring is full
const PENDING_EVENTS: usize = 2 * MAX_VOICES + COMMAND_QUEUE_LEN;

/// UI → audio thread
#[derive(Debug)]
pub enum MixerCommand {
    /// Register a voice. The clip must already match the output format.
    Load {
        voice: HandleId,
        clip: Arc<SoundData>,
        looping: bool,
        volume: f32,
    },
    Play { voice: HandleId, run: u32 },
    Pause { voice: HandleId },
    Rewind { voice: HandleId },
    Release { voice: HandleId },
}

/// Audio → UI thread
#[derive(Debug)]
pub enum MixerEvent {
    /// A one-shot voice played its last frame
    Finished(Completion),
    /// A released clip, to be dropped off the audio thread
    Retired(Arc<SoundData>),
}

struct Voice {
    id: HandleId,
    clip: Arc<SoundData>,
    frame: usize,
    playing: bool,
    looping: bool,
    volume: f32,
    run: u32,
}

impl Voice {
    /// Add this voice into `out`. Returns true when a one-shot voice ran out.
    fn mix_into(&mut self, out: &mut [f32], channels: usize) -> bool {
        let total = self.clip.frames();
        if total == 0 {
            return !self.looping;
        }

        for frame in out.chunks_exact_mut(channels) {
            if self.frame >= total {
                if !self.looping {
                    return true;
                }
                self.frame = 0;
            }
            let start = self.frame * channels;
            let source = &self.clip.samples[start..start + channels];
            for (o, s) in frame.iter_mut().zip(source) {
                *o += s * self.volume;
            }
            self.frame += 1;
        }

        !self.looping && self.frame >= total
    }
}

/// Voice mixer driven by the output callback.
pub struct Mixer {
    voices: Vec<Voice>,
    commands: Consumer<MixerCommand>,
    events: Producer<MixerEvent>,
    pending: VecDeque<MixerEvent>,
    channels: usize,
}

impl Mixer {
    pub fn new(channels: u16, commands: Consumer<MixerCommand>, events: Producer<MixerEvent>) -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            commands,
            events,
            pending: VecDeque::with_capacity(PENDING_EVENTS),
            channels: channels.max(1) as usize,
        }
    }

    /// Render one interleaved block.
    pub fn render(&mut self, out: &mut [f32]) {
        self.flush_pending();
        self.process_commands();

        out.fill(0.0);
        for voice in self.voices.iter_mut().filter(|v| v.playing) {
            if voice.mix_into(out, self.channels) {
                voice.playing = false;
                let finished = MixerEvent::Finished(Completion {
                    handle: voice.id,
                    run: voice.run,
                });
                emit(&mut self.events, &mut self.pending, finished);
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    fn flush_pending(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            if let Err(PushError::Full(event)) = self.events.push(event) {
                self.pending.push_front(event);
                break;
            }
        }
    }

    /// Room for one command's event plus a whole block of completions
    fn has_event_room(&self) -> bool {
        self.pending.len() + MAX_VOICES < PENDING_EVENTS
    }

    fn process_commands(&mut self) {
        while self.has_event_room() {
            let Ok(command) = self.commands.pop() else {
                break;
            };
            match command {
                MixerCommand::Load {
                    voice,
                    clip,
                    looping,
                    volume,
                } => {
                    if self.voices.len() >= MAX_VOICES {
                        // Over the limit: hand the clip straight back.
                        emit(&mut self.events, &mut self.pending, MixerEvent::Retired(clip));
                        continue;
                    }
                    self.voices.push(Voice {
                        id: voice,
                        clip,
                        frame: 0,
                        playing: false,
                        looping,
                        volume,
                        run: 0,
                    });
                }
                MixerCommand::Play { voice, run } => {
                    if let Some(v) = self.voice_mut(voice) {
                        v.playing = true;
                        v.run = run;
                    }
                }
                MixerCommand::Pause { voice } => {
                    if let Some(v) = self.voice_mut(voice) {
                        v.playing = false;
                    }
                }
                MixerCommand::Rewind { voice } => {
                    if let Some(v) = self.voice_mut(voice) {
                        v.frame = 0;
                    }
                }
                MixerCommand::Release { voice } => {
                    if let Some(idx) = self.voices.iter().position(|v| v.id == voice) {
                        let retired = self.voices.swap_remove(idx);
                        emit(&mut self.events, &mut self.pending, MixerEvent::Retired(retired.clip));
                    }
                }
            }
        }
    }

    fn voice_mut(&mut self, id: HandleId) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.id == id)
    }
}

/// Push to the ring, or queue behind events already waiting.
fn emit(events: &mut Producer<MixerEvent>, pending: &mut VecDeque<MixerEvent>, event: MixerEvent) {
    if !pending.is_empty() {
        pending.push_back(event);
        return;
    }
    if let Err(PushError::Full(event)) = events.push(event) {
        pending.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    struct Rig {
        mixer: Mixer,
        tx: Producer<MixerCommand>,
        rx: Consumer<MixerEvent>,
    }

    fn rig(channels: u16) -> Rig {
        rig_with_event_room(channels, 64)
    }

    fn rig_with_event_room(channels: u16, events: usize) -> Rig {
        let (tx, commands) = RingBuffer::new(64);
        let (events, rx) = RingBuffer::new(events);
        Rig {
            mixer: Mixer::new(channels, commands, events),
            tx,
            rx,
        }
    }

    fn clip(frames: usize) -> Arc<SoundData> {
        Arc::new(SoundData {
            samples: vec![0.5; frames],
            channels: 1,
            sample_rate: 48_000,
        })
    }

    fn load(rig: &mut Rig, id: u64, frames: usize, looping: bool) {
        rig.tx
            .push(MixerCommand::Load {
                voice: HandleId(id),
                clip: clip(frames),
                looping,
                volume: 1.0,
            })
            .unwrap();
    }

    fn finished(rig: &mut Rig) -> Vec<Completion> {
        let mut done = Vec::new();
        while let Ok(event) = rig.rx.pop() {
            if let MixerEvent::Finished(c) = event {
                done.push(c);
            }
        }
        done
    }

    #[test]
    fn loaded_voice_is_silent_until_played() {
        let mut rig = rig(1);
        load(&mut rig, 1, 16, false);
        let mut out = [1.0f32; 8];
        rig.mixer.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(rig.rx.pop().is_err());
    }

    #[test]
    fn one_shot_reports_completion_once() {
        let mut rig = rig(1);
        load(&mut rig, 1, 10, false);
        rig.tx.push(MixerCommand::Play { voice: HandleId(1), run: 3 }).unwrap();

        let mut out = [0.0f32; 8];
        rig.mixer.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.5));
        assert!(finished(&mut rig).is_empty());

        rig.mixer.render(&mut out);
        assert_eq!(&out[..2], &[0.5, 0.5]);
        assert!(out[2..].iter().all(|&s| s == 0.0), "silence after the clip ends");
        assert_eq!(
            finished(&mut rig),
            vec![Completion {
                handle: HandleId(1),
                run: 3
            }]
        );

        rig.mixer.render(&mut out);
        assert!(finished(&mut rig).is_empty());
    }

    #[test]
    fn looping_voice_wraps_without_completion() {
        let mut rig = rig(1);
        load(&mut rig, 1, 3, true);
        rig.tx.push(MixerCommand::Play { voice: HandleId(1), run: 1 }).unwrap();

        let mut out = [0.0f32; 32];
        rig.mixer.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.5));
        assert!(finished(&mut rig).is_empty());
    }

    #[test]
    fn pause_holds_and_rewind_resets_position() {
        let mut rig = rig(1);
        rig.tx
            .push(MixerCommand::Load {
                voice: HandleId(1),
                clip: Arc::new(SoundData {
                    samples: vec![0.1, 0.2, 0.3, 0.4],
                    channels: 1,
                    sample_rate: 48_000,
                }),
                looping: false,
                volume: 1.0,
            })
            .unwrap();
        rig.tx.push(MixerCommand::Play { voice: HandleId(1), run: 1 }).unwrap();

        let mut out = [0.0f32; 2];
        rig.mixer.render(&mut out);
        assert_eq!(out, [0.1, 0.2]);

        rig.tx.push(MixerCommand::Pause { voice: HandleId(1) }).unwrap();
        rig.mixer.render(&mut out);
        assert_eq!(out, [0.0, 0.0]);

        rig.tx.push(MixerCommand::Rewind { voice: HandleId(1) }).unwrap();
        rig.tx.push(MixerCommand::Play { voice: HandleId(1), run: 2 }).unwrap();
        rig.mixer.render(&mut out);
        assert_eq!(out, [0.1, 0.2]);
    }

    #[test]
    fn volume_scales_and_output_is_clamped() {
        let mut rig = rig(2);
        for (id, volume) in [(1, 0.5), (2, 1.0), (3, 1.0)] {
            rig.tx
                .push(MixerCommand::Load {
                    voice: HandleId(id),
                    clip: Arc::new(SoundData {
                        samples: vec![0.8; 8],
                        channels: 2,
                        sample_rate: 48_000,
                    }),
                    looping: true,
                    volume,
                })
                .unwrap();
        }
        rig.tx.push(MixerCommand::Play { voice: HandleId(1), run: 1 }).unwrap();

        let mut out = [0.0f32; 4];
        rig.mixer.render(&mut out);
        assert!(out.iter().all(|&s| (s - 0.4).abs() < 1e-6));

        rig.tx.push(MixerCommand::Play { voice: HandleId(2), run: 1 }).unwrap();
        rig.tx.push(MixerCommand::Play { voice: HandleId(3), run: 1 }).unwrap();
        rig.mixer.render(&mut out);
        assert!(out.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn release_hands_the_clip_back() {
        let mut rig = rig(1);
        load(&mut rig, 1, 4, false);
        rig.tx.push(MixerCommand::Release { voice: HandleId(1) }).unwrap();

        rig.tx.push(MixerCommand::Play { voice: HandleId(1), run: 1 }).unwrap();

        let mut out = [0.0f32; 4];
        rig.mixer.render(&mut out);
        assert!(matches!(rig.rx.pop(), Ok(MixerEvent::Retired(_))));
        assert!(out.iter().all(|&s| s == 0.0), "released voice is gone");
    }

    #[test]
    fn completions_survive_a_full_event_ring() {
        let mut rig = rig_with_event_room(1, 1);
        for id in 1..=3 {
            load(&mut rig, id, 2, false);
            rig.tx.push(MixerCommand::Play { voice: HandleId(id), run: 1 }).unwrap();
        }

        let mut out = [0.0f32; 4];
        let mut done = Vec::new();
        for _ in 0..4 {
            rig.mixer.render(&mut out);
            done.extend(finished(&mut rig));
        }

        let mut ids: Vec<u64> = done.iter().map(|c| c.handle.0).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn retired_clips_wait_for_room_instead_of_dropping() {
        let mut rig = rig_with_event_room(1, 1);
        load(&mut rig, 1, 4, false);
        load(&mut rig, 2, 4, false);
        let kept = clip(4);
        rig.tx
            .push(MixerCommand::Load {
                voice: HandleId(3),
                clip: Arc::clone(&kept),
                looping: false,
                volume: 1.0,
            })
            .unwrap();
        for id in 1..=3 {
            rig.tx.push(MixerCommand::Release { voice: HandleId(id) }).unwrap();
        }

        let mut out = [0.0f32; 4];
        rig.mixer.render(&mut out);
        assert_eq!(Arc::strong_count(&kept), 2, "clip is still owned by a queued event");

        let mut retired = 0;
        for _ in 0..3 {
            while let Ok(event) = rig.rx.pop() {
                assert!(matches!(event, MixerEvent::Retired(_)));
                retired += 1;
            }
            rig.mixer.render(&mut out);
        }
        assert_eq!(retired, 3);
        assert_eq!(Arc::strong_count(&kept), 1);
    }
}
