//! UI-thread end of the mixer.
//!
//! `MixerLink` owns the command producer and event consumer, counts live
//! voices against `MAX_VOICES`, and hands clip decoding to a worker thread so
//! `open` returns at once. A finished decode is forwarded to the mixer as a
//! `Load` the next time the host drains completions; until then the handle
//! refuses to start with `PlaybackError::Loading`.
//!
//! Load and Release must reach the mixer. When the command ring is full they
//! wait in a backlog that is flushed, in order, on every drain.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    path::PathBuf,
    rc::Rc,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
};

use rtrb::{Consumer, Producer, PushError};

use crate::{
    audio::{
        decode_file, AudioBackend, AudioHandle, Completion, DecodeError, HandleId,
        PlaybackError, PlaybackParams, SoundData,
    },
    resolve::Locator,
};

use super::{
    mixer::{MixerCommand, MixerEvent},
    MAX_VOICES,
};

struct DecodeJob {
    voice: HandleId,
    path: PathBuf,
}

struct Decoded {
    voice: HandleId,
    clip: Result<SoundData, DecodeError>,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    /// With the decode worker
    Decoding(PlaybackParams),
    /// Decoded, `Load` waiting in the backlog
    Queued,
    Ready,
    Failed(String),
}

/// State shared by the link and its handles.
struct Shared {
    commands: Producer<MixerCommand>,
    backlog: VecDeque<MixerCommand>,
    slots: HashMap<HandleId, Slot>,
}

impl Shared {
    fn push(&mut self, command: MixerCommand) -> Result<(), PlaybackError> {
        self.commands.push(command).map_err(|_| PlaybackError::QueueFull)
    }

    /// Push now, or keep the command for the next flush.
    fn push_or_defer(&mut self, command: MixerCommand) {
        let loaded = loaded_voice(&command);
        let command = if self.backlog.is_empty() {
            match self.commands.push(command) {
                Ok(()) => return self.mark_ready(loaded),
                Err(PushError::Full(command)) => command,
            }
        } else {
            command
        };

        if let Some(voice) = loaded {
            self.slots.insert(voice, Slot::Queued);
        }
        self.backlog.push_back(command);
    }

    fn flush(&mut self) {
        while let Some(command) = self.backlog.pop_front() {
            let loaded = loaded_voice(&command);
            if let Err(PushError::Full(command)) = self.commands.push(command) {
                self.backlog.push_front(command);
                break;
            }
            self.mark_ready(loaded);
        }
    }

    fn mark_ready(&mut self, loaded: Option<HandleId>) {
        if let Some(slot) = loaded.and_then(|voice| self.slots.get_mut(&voice)) {
            *slot = Slot::Ready;
        }
    }

    fn live_voices(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| !matches!(slot, Slot::Failed(_)))
            .count()
    }
}

fn loaded_voice(command: &MixerCommand) -> Option<HandleId> {
    match command {
        MixerCommand::Load { voice, .. } => Some(*voice),
        _ => None,
    }
}

fn decode_worker(jobs: Receiver<DecodeJob>, done: Sender<Decoded>, channels: u16, sample_rate: u32) {
    for job in jobs {
        let clip = decode_file(&job.path).map(|data| data.conform(channels, sample_rate));
        if done.send(Decoded { voice: job.voice, clip }).is_err() {
            break;
        }
    }
}

/// `AudioBackend` over a mixer's command and event rings.
pub struct MixerLink {
    shared: Rc<RefCell<Shared>>,
    events: Consumer<MixerEvent>,
    jobs: Sender<DecodeJob>,
    decoded: Receiver<Decoded>,
    next_id: u64,
}

impl MixerLink {
    /// Connect to a mixer rendering `channels` at `sample_rate`. Spawns the
    /// decode worker, which exits once the link is dropped.
    pub fn new(
        channels: u16,
        sample_rate: u32,
        commands: Producer<MixerCommand>,
        events: Consumer<MixerEvent>,
    ) -> Result<Self, PlaybackError> {
        let (jobs, job_rx) = mpsc::channel();
        let (done_tx, decoded) = mpsc::channel();
        thread::Builder::new()
            .name("soundboard-decode".into())
            .spawn(move || decode_worker(job_rx, done_tx, channels, sample_rate))
            .map_err(|e| PlaybackError::Device(format!("failed to start decoder thread: {e}")))?;

        Ok(Self {
            shared: Rc::new(RefCell::new(Shared {
                commands,
                backlog: VecDeque::new(),
                slots: HashMap::new(),
            })),
            events,
            jobs,
            decoded,
            next_id: 0,
        })
    }

    /// Voices counted against `MAX_VOICES`: loaded or still decoding
    pub fn live_voices(&self) -> usize {
        self.shared.borrow().live_voices()
    }

    fn collect_decoded(&mut self) {
        let mut shared = self.shared.borrow_mut();
        shared.flush();

        while let Ok(Decoded { voice, clip }) = self.decoded.try_recv() {
            let params = match shared.slots.get(&voice) {
                Some(Slot::Decoding(params)) => *params,
                // Released while decoding.
                _ => continue,
            };
            match clip {
                Ok(clip) => shared.push_or_defer(MixerCommand::Load {
                    voice,
                    clip: Arc::new(clip),
                    looping: params.looping,
                    volume: params.volume,
                }),
                Err(e) => {
                    tracing::warn!(handle = voice.0, "failed to decode clip: {e}");
                    shared.slots.insert(voice, Slot::Failed(e.to_string()));
                }
            }
        }
    }
}

impl AudioBackend for MixerLink {
    fn open(
        &mut self,
        locator: &Locator,
        params: PlaybackParams,
    ) -> Result<Box<dyn AudioHandle>, PlaybackError> {
        let path = locator
            .as_path()
            .ok_or_else(|| PlaybackError::Remote(locator.clone()))?;
        if !path.is_file() {
            let missing = std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            );
            return Err(DecodeError::Io(missing).into());
        }
        if self.live_voices() >= MAX_VOICES {
            return Err(PlaybackError::Rejected(format!(
                "voice limit of {MAX_VOICES} reached"
            )));
        }

        self.next_id += 1;
        let id = HandleId(self.next_id);
        let job = DecodeJob {
            voice: id,
            path: path.to_path_buf(),
        };
        self.jobs
            .send(job)
            .map_err(|_| PlaybackError::Device("decoder thread stopped".into()))?;
        self.shared
            .borrow_mut()
            .slots
            .insert(id, Slot::Decoding(params));

        Ok(Box::new(VoiceHandle {
            id,
            run: 0,
            shared: Rc::clone(&self.shared),
            released: false,
        }))
    }

    fn drain_completions(&mut self) -> Vec<Completion> {
        self.collect_decoded();

        let mut done = Vec::new();
        while let Ok(event) = self.events.pop() {
            match event {
                MixerEvent::Finished(completion) => done.push(completion),
                MixerEvent::Retired(clip) => drop(clip),
            }
        }
        done
    }
}

/// One clip, loading or loaded into the mixer.
pub struct VoiceHandle {
    id: HandleId,
    run: u32,
    shared: Rc<RefCell<Shared>>,
    released: bool,
}

impl VoiceHandle {
    fn slot(&self) -> Option<Slot> {
        self.shared.borrow().slots.get(&self.id).cloned()
    }

    /// Send a transport command to a loaded voice; ignored while loading.
    fn control(&self, command: MixerCommand) {
        if self.slot() != Some(Slot::Ready) {
            return;
        }
        if let Err(e) = self.shared.borrow_mut().push(command) {
            tracing::warn!(handle = self.id.0, "dropped audio command: {e}");
        }
    }
}

impl AudioHandle for VoiceHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn run(&self) -> u32 {
        self.run
    }

    fn start(&mut self) -> Result<(), PlaybackError> {
        if self.released {
            return Err(PlaybackError::Released);
        }
        match self.slot() {
            Some(Slot::Ready) => {}
            Some(Slot::Decoding(_) | Slot::Queued) => return Err(PlaybackError::Loading),
            Some(Slot::Failed(reason)) => return Err(PlaybackError::LoadFailed(reason)),
            None => return Err(PlaybackError::Released),
        }

        let run = self.run.wrapping_add(1);
        self.shared
            .borrow_mut()
            .push(MixerCommand::Play { voice: self.id, run })?;
        self.run = run;
        Ok(())
    }

    fn pause(&mut self) {
        self.control(MixerCommand::Pause { voice: self.id });
    }

    fn rewind(&mut self) {
        self.control(MixerCommand::Rewind { voice: self.id });
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut shared = self.shared.borrow_mut();
        match shared.slots.remove(&self.id) {
            Some(Slot::Ready | Slot::Queued) => {
                shared.push_or_defer(MixerCommand::Release { voice: self.id })
            }
            // Never reached the mixer.
            Some(Slot::Decoding(_) | Slot::Failed(_)) | None => {}
        }
    }
}

impl Drop for VoiceHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rtrb::RingBuffer;

    use super::*;
    use crate::{audio::decode::write_test_wav, output::Mixer};

    struct Rig {
        link: MixerLink,
        mixer: Mixer,
        dir: tempfile::TempDir,
    }

    fn rig(command_room: usize) -> Rig {
        let (command_tx, command_rx) = RingBuffer::new(command_room);
        let (event_tx, event_rx) = RingBuffer::new(64);
        Rig {
            link: MixerLink::new(1, 8_000, command_tx, event_rx).unwrap(),
            mixer: Mixer::new(1, command_rx, event_tx),
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn wav(rig: &Rig, name: &str, frames: usize) -> Locator {
        let path = rig.dir.path().join(name);
        write_test_wav(&path, frames, 8_000);
        Locator::new(path.to_string_lossy())
    }

    fn open(rig: &mut Rig, locator: &Locator) -> Box<dyn AudioHandle> {
        rig.link
            .open(locator, PlaybackParams::default())
            .unwrap_or_else(|e| panic!("open failed: {e}"))
    }

    /// Drain until `handle` starts, rendering so the mixer takes its commands.
    fn start_when_loaded(rig: &mut Rig, handle: &mut dyn AudioHandle) {
        let mut out = [0.0f32; 16];
        for _ in 0..500 {
            rig.link.drain_completions();
            match handle.start() {
                Ok(()) => return,
                Err(PlaybackError::Loading | PlaybackError::QueueFull) => {
                    rig.mixer.render(&mut out);
                    thread::sleep(Duration::from_millis(2));
                }
                Err(e) => panic!("start failed: {e}"),
            }
        }
        panic!("clip never finished loading");
    }

    #[test]
    fn open_returns_before_the_clip_is_decoded() {
        let mut rig = rig(64);
        let tone = wav(&rig, "tone.wav", 400);

        let mut handle = open(&mut rig, &tone);
        assert!(matches!(handle.start(), Err(PlaybackError::Loading)));
        assert_eq!(handle.run(), 0);

        start_when_loaded(&mut rig, handle.as_mut());
        assert_eq!(handle.run(), 1);

        let mut out = [0.0f32; 256];
        let mut done = Vec::new();
        let mut heard = false;
        for _ in 0..4 {
            rig.mixer.render(&mut out);
            heard |= out.iter().any(|&s| s != 0.0);
            done.extend(rig.link.drain_completions());
        }
        assert!(heard);
        assert_eq!(
            done,
            vec![Completion {
                handle: handle.id(),
                run: 1
            }]
        );
    }

    #[test]
    fn missing_and_remote_clips_fail_at_open() {
        let mut rig = rig(64);
        let missing = Locator::new(rig.dir.path().join("nope.wav").to_string_lossy());
        assert!(matches!(
            rig.link.open(&missing, PlaybackParams::default()),
            Err(PlaybackError::Decode(DecodeError::Io(_)))
        ));
        assert!(matches!(
            rig.link.open(&Locator::new("https://example.com/a.mp3"), PlaybackParams::default()),
            Err(PlaybackError::Remote(_))
        ));
        assert_eq!(rig.link.live_voices(), 0);
    }

    #[test]
    fn undecodable_clip_fails_to_start() {
        let mut rig = rig(64);
        let path = rig.dir.path().join("junk.wav");
        std::fs::write(&path, b"not audio at all").unwrap();
        let mut handle = open(&mut rig, &Locator::new(path.to_string_lossy()));

        let mut result = handle.start();
        for _ in 0..500 {
            if !matches!(result, Err(PlaybackError::Loading)) {
                break;
            }
            thread::sleep(Duration::from_millis(2));
            rig.link.drain_completions();
            result = handle.start();
        }
        assert!(matches!(result, Err(PlaybackError::LoadFailed(_))));
        assert_eq!(rig.link.live_voices(), 0, "failed clips hold no voice");
    }

    #[test]
    fn voice_limit_rejects_open_until_a_handle_is_released() {
        let mut rig = rig(MAX_VOICES * 2 + 8);
        let tone = wav(&rig, "tone.wav", 16);

        let mut handles: Vec<_> = (0..MAX_VOICES).map(|_| open(&mut rig, &tone)).collect();
        assert_eq!(rig.link.live_voices(), MAX_VOICES);

        let over = rig.link.open(&tone, PlaybackParams::default());
        assert!(matches!(over, Err(PlaybackError::Rejected(_))));

        handles.pop();
        assert_eq!(rig.link.live_voices(), MAX_VOICES - 1);
        let mut last = open(&mut rig, &tone);
        start_when_loaded(&mut rig, last.as_mut());

        let mut out = [0.0f32; 64];
        let mut done = Vec::new();
        for _ in 0..2 {
            rig.mixer.render(&mut out);
            done.extend(rig.link.drain_completions());
        }
        assert!(done.iter().any(|c| c.handle == last.id()), "the replacement voice plays to the end");
    }

    #[test]
    fn loads_wait_in_the_backlog_when_the_ring_is_full() {
        let mut rig = rig(1);
        let tone = wav(&rig, "tone.wav", 16);
        let mut first = open(&mut rig, &tone);
        let mut second = open(&mut rig, &tone);

        start_when_loaded(&mut rig, first.as_mut());
        start_when_loaded(&mut rig, second.as_mut());
        assert_eq!(rig.link.live_voices(), 2);
    }

    #[test]
    fn release_while_decoding_frees_the_voice() {
        let mut rig = rig(64);
        let tone = wav(&rig, "tone.wav", 16);
        let mut handle = open(&mut rig, &tone);
        handle.release();
        assert_eq!(rig.link.live_voices(), 0);
        assert!(matches!(handle.start(), Err(PlaybackError::Released)));

        thread::sleep(Duration::from_millis(20));
        rig.link.drain_completions();
        assert_eq!(rig.link.live_voices(), 0);
    }
}
