#![allow(dead_code)]

//! Playback capture for integration tests
//!
//! Records every call the manager makes on audio sources, the zone loader
//! and the mixer, in order.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use zonemix_common::config::MusicConfig;
use zonemix_player::playback::{
    AudioSource, ChannelRegistry, MixerEffects, TransitionExecutor, ZoneLoader,
};
use zonemix_player::{MusicManager, ZoneId};

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Play(usize),
    Stop(usize),
    Volume(usize, f32),
    LoadZone(ZoneId),
    Effect(String, Duration),
}

/// Shared call log
#[derive(Clone, Default)]
pub struct PlaybackCapture {
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl PlaybackCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: Recorded) {
        self.calls.lock().unwrap().push(call);
    }

    /// All calls recorded so far
    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than volume changes
    pub fn commands(&self) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Recorded::Volume(..)))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Number of stop calls on `channel`
    pub fn stops(&self, channel: usize) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == Recorded::Stop(channel))
            .count()
    }

    pub fn source(&self, index: usize) -> Box<dyn AudioSource> {
        Box::new(CapturedSource {
            index,
            capture: self.clone(),
        })
    }
}

struct CapturedSource {
    index: usize,
    capture: PlaybackCapture,
}

impl AudioSource for CapturedSource {
    fn play(&mut self) {
        self.capture.record(Recorded::Play(self.index));
    }

    fn stop(&mut self) {
        self.capture.record(Recorded::Stop(self.index));
    }

    fn set_volume(&mut self, volume: f32) {
        self.capture.record(Recorded::Volume(self.index, volume));
    }
}

impl ZoneLoader for PlaybackCapture {
    fn load_zone(&mut self, zone: ZoneId) {
        self.record(Recorded::LoadZone(zone));
    }
}

impl MixerEffects for PlaybackCapture {
    fn trigger_effect(&mut self, effect: &str, duration: Duration) {
        self.record(Recorded::Effect(effect.to_string(), duration));
    }
}

/// Started manager whose channels and host calls go to a fresh capture
///
/// The capture is cleared after startup.
pub fn manager_with_capture(config: &MusicConfig) -> (MusicManager, PlaybackCapture) {
    let capture = PlaybackCapture::new();
    let channels = ChannelRegistry::new(&config.channels, |index, _| capture.source(index));
    let executor = TransitionExecutor::new(Box::new(capture.clone()), Box::new(capture.clone()));
    let mut manager = MusicManager::new(config, channels, executor).unwrap();
    manager.start().unwrap();
    capture.clear();
    (manager, capture)
}
