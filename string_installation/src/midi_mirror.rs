//! Optional MIDI mirror: every pluck is also sent as a MIDI note.
//!
//! Notes go out on their own thread so note-offs can be timed without
//! touching the frame loop.  The note is the nearest MIDI key to the
//! quantised pluck frequency and is released after the tone's decay time.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use pluck_synth::midi_note_for;

use crate::InstallationError;

/// Longest the mirror thread sleeps with nothing pending.
const IDLE_WAIT: Duration = Duration::from_millis(250);

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir (and test recorders)
// ════════════════════════════════════════════════════════════════════════════

pub trait MidiOut: Send {
    fn note_on(&mut self,  channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

pub fn note_on_message(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
}

pub fn note_off_message(channel: u8, note: u8) -> [u8; 3] {
    [0x80 | (channel & 0x0F), note & 0x7F, 0]
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let _ = self.conn.send(&note_on_message(channel, note, velocity));
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        let _ = self.conn.send(&note_off_message(channel, note));
    }
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output — enumerate ports and pick one
// ════════════════════════════════════════════════════════════════════════════

/// Open the output port whose name contains `port_hint` (case-insensitive).
/// An empty hint prefers a visible software synthesiser, else the first
/// port.
pub fn open_midi_output(port_hint: &str) -> Result<Box<dyn MidiOut>, InstallationError> {
    let midi_out = midir::MidiOutput::new("string_installation")
        .map_err(|e| InstallationError::Midi(e.to_string()))?;

    let ports = midi_out.ports();
    if ports.is_empty() {
        return Err(InstallationError::Midi("no MIDI output ports found".to_string()));
    }

    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    let port_idx = pick_port(&names, port_hint).ok_or_else(|| {
        InstallationError::Midi(format!("no MIDI port matching '{}' among {:?}", port_hint, names))
    })?;

    info!(target: "midi", port = %names[port_idx], "opening MIDI port");
    let conn = midi_out
        .connect(&ports[port_idx], "string-pluck")
        .map_err(|e| InstallationError::Midi(e.to_string()))?;
    Ok(Box::new(MidirOut { conn }))
}

fn pick_port(names: &[String], hint: &str) -> Option<usize> {
    let hint = hint.trim().to_lowercase();
    if !hint.is_empty() {
        return names.iter().position(|n| n.to_lowercase().contains(&hint));
    }
    // Prefer a softsynth if visible
    let synth = names.iter().position(|n| {
        let n = n.to_lowercase();
        n.contains("fluid") || n.contains("timidity") ||
        n.contains("microsoft") || n.contains("gm") ||
        n.contains("synth")
    });
    synth.or(if names.is_empty() { None } else { Some(0) })
}

// ════════════════════════════════════════════════════════════════════════════
// PendingNotes — note-off schedule
// ════════════════════════════════════════════════════════════════════════════

/// Sounding notes and when each must be released.
#[derive(Debug, Default)]
pub struct PendingNotes {
    notes: Vec<(u8, Instant)>,
}

impl PendingNotes {
    pub fn len(&self) -> usize { self.notes.len() }
    pub fn is_empty(&self) -> bool { self.notes.is_empty() }
    pub fn contains(&self, note: u8) -> bool { self.notes.iter().any(|(n, _)| *n == note) }

    /// Schedule `note` for release at `off_at`, replacing an earlier entry.
    pub fn push(&mut self, note: u8, off_at: Instant) {
        self.notes.retain(|(n, _)| *n != note);
        self.notes.push((note, off_at));
    }

    pub fn next_due(&self) -> Option<Instant> { self.notes.iter().map(|(_, t)| *t).min() }

    /// Remove and return every note due at or before `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<u8> {
        let mut due = Vec::new();
        self.notes.retain(|&(n, t)| {
            if t <= now {
                due.push(n);
                false
            } else {
                true
            }
        });
        due
    }

    pub fn drain(&mut self) -> Vec<u8> { self.notes.drain(..).map(|(n, _)| n).collect() }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiMirror — the note thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MirrorSettings {
    pub channel:  u8,
    pub velocity: u8,
    /// Time from note-on to note-off.
    pub hold:     Duration,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        MirrorSettings {
            channel:  0,
            velocity: 100,
            hold:     Duration::from_secs_f32(pluck_synth::Envelope::default().duration()),
        }
    }
}

enum MirrorCommand {
    Pluck { note: u8 },
    Quit,
}

/// Handle to the MIDI thread.  Dropping it releases all sounding notes and
/// closes the port.
pub struct MidiMirror {
    cmd_tx: Sender<MirrorCommand>,
    join:   Option<JoinHandle<()>>,
}

impl MidiMirror {
    /// Open a port (see [`open_midi_output`]) and start the thread.
    pub fn connect(port_hint: &str, settings: MirrorSettings) -> Result<Self, InstallationError> {
        let out = open_midi_output(port_hint)?;
        Self::spawn(out, settings)
    }

    pub fn spawn(out: Box<dyn MidiOut>, settings: MirrorSettings) -> Result<Self, InstallationError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("midi-mirror".into())
            .spawn(move || mirror_thread(out, settings, cmd_rx))
            .map_err(|e| InstallationError::Midi(e.to_string()))?;
        Ok(MidiMirror { cmd_tx, join: Some(join) })
    }

    /// Mirror one pluck at `frequency` Hz.
    pub fn pluck(&self, frequency: f32) {
        let note = midi_note_for(frequency);
        let _ = self.cmd_tx.send(MirrorCommand::Pluck { note });
    }
}

impl Drop for MidiMirror {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(MirrorCommand::Quit);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!(target: "midi", "MIDI mirror thread panicked");
            }
        }
    }
}

fn mirror_thread(mut out: Box<dyn MidiOut>, settings: MirrorSettings, cmd_rx: Receiver<MirrorCommand>) {
    let MirrorSettings { channel, velocity, hold } = settings;
    let mut pending = PendingNotes::default();

    loop {
        let wait = pending
            .next_due()
            .map(|t| t.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT);

        match cmd_rx.recv_timeout(wait) {
            Ok(MirrorCommand::Pluck { note }) => {
                if pending.contains(note) {
                    out.note_off(channel, note);
                }
                out.note_on(channel, note, velocity);
                pending.push(note, Instant::now() + hold);
                debug!(target: "midi", note, "note on");
            }
            Ok(MirrorCommand::Quit) | Err(RecvTimeoutError::Disconnected) => {
                for note in pending.drain() {
                    out.note_off(channel, note);
                }
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        for note in pending.take_due(Instant::now()) {
            out.note_off(channel, note);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
