//! The VGA zone runtime: bytecode interpreter, sprite table, suspend/
//! resume queues, timer pump and draw pipeline for a family of 2-D
//! adventure releases.
//!
//! The runtime is strictly single-threaded and tick-driven. The external
//! game-logic layer attaches scripts to sprites through [`VgaRuntime`] and
//! calls [`VgaRuntime::pump_one_tick`] once per tick; the illusion of many
//! concurrently animating sprites comes from scripts suspending themselves
//! into the continuation queues and timer table, never from threads.
//! Collaborators plug in at three seams: [`ZoneLoader`] produces zone byte
//! buffers, [`GameHooks`] absorbs delegated side effects (sound, object
//! queries, the pointer), and [`vga_core::DisplaySink`] presents the
//! composited surface.

pub mod error;
pub mod resume;
pub mod sprite;
pub mod timer;
pub mod variant;
pub mod zone;

mod draw;
mod interp;
#[cfg(test)]
mod tests;

use std::collections::HashMap;

use vga_core::logging::{log, LogCategory, LogLevel};
use vga_core::{DisplaySink, Rect, Rgb, Surface};

pub use error::EngineError;
pub use resume::{Continuation, ResumeQueue, MAX_CONTINUATIONS};
pub use sprite::{Sprite, SpriteTable, MAX_SPRITES};
pub use timer::{TimerEntry, TimerKind, TimerQueue, MAX_TIMERS};
pub use variant::{EngineVersion, VariantConfig, VgaOp};
pub use zone::{ImageEntry, Zone, ZoneLoader};

use draw::{Fade, ScrollState, WindowState};
use interp::{Cursor, ScriptCtx};

/// Scripting variables shared with the game-logic layer.
pub const NUM_VARS: usize = 256;
/// Bit flags shared with the game-logic layer.
pub const NUM_BITS: usize = 256;
/// Numbered sub-windows.
pub const NUM_WINDOWS: usize = 8;

/// Resource ids group into zones in blocks of 100.
const IDS_PER_ZONE: u16 = 100;

/// Heartbeat cadence before any script sets a frame rate.
const DEFAULT_FRAME_RATE: u16 = 1;

/// Delegated side effects. Every method has a no-op default so tests and
/// headless tools can plug in [`NullHooks`].
pub trait GameHooks {
    fn play_sound(&mut self, _sound: i16) {}
    fn stop_all_sounds(&mut self) {}
    fn sound_playing(&self) -> bool {
        false
    }
    /// Whether a game object is present in the current room.
    fn object_here(&self, _object: u16) -> bool {
        false
    }
    fn pointer_visible(&mut self, _visible: bool) {}
    fn play_track(&mut self, _track: i16) {}
    fn queue_track(&mut self, _track: i16) {}
    fn track_done(&self) -> bool {
        true
    }
}

/// Hooks that ignore everything.
#[derive(Debug, Default)]
pub struct NullHooks;

impl GameHooks for NullHooks {}

/// The runtime. One instance per game session; all state resets wholesale
/// through [`VgaRuntime::reset_all`].
pub struct VgaRuntime<Z: ZoneLoader, H: GameHooks, D: DisplaySink> {
    pub(crate) cfg: &'static VariantConfig,
    pub(crate) loader: Z,
    pub(crate) hooks: H,
    pub(crate) display: D,
    pub(crate) zones: HashMap<u16, Zone>,
    pub(crate) sprites: SpriteTable,
    pub(crate) wait_stop: ResumeQueue,
    pub(crate) wait_end: ResumeQueue,
    pub(crate) wait_sync: ResumeQueue,
    pub(crate) timers: TimerQueue,
    pub(crate) vars: [i16; NUM_VARS],
    pub(crate) bits: [u16; NUM_BITS / 16],
    pub(crate) surface: Surface,
    pub(crate) palette: [Rgb; 256],
    pub(crate) fade: Fade,
    pub(crate) windows: [WindowState; NUM_WINDOWS],
    pub(crate) active_window: u8,
    pub(crate) frame_rate: u16,
    pub(crate) coord_scale: u8,
    pub(crate) marks: u16,
    pub(crate) scroll: Option<ScrollState>,
    pub(crate) scroll_x: u16,
    pub(crate) scroll_y: u16,
    pub(crate) pending_clip: (u16, u16),
    pub(crate) cursor: Cursor,
    pub(crate) ctx: ScriptCtx,
    pub(crate) call_stack: Vec<usize>,
}

impl<Z: ZoneLoader, H: GameHooks, D: DisplaySink> VgaRuntime<Z, H, D> {
    pub fn new(version: EngineVersion, loader: Z, hooks: H, display: D) -> Self {
        let cfg = VariantConfig::for_version(version);
        let mut windows = [WindowState::default(); NUM_WINDOWS];
        windows[0] = WindowState {
            rect: Rect {
                x: 0,
                y: 0,
                w: cfg.screen_width,
                h: cfg.window_height,
            },
            enabled: true,
        };
        let mut timers = TimerQueue::new();
        timers
            .schedule(DEFAULT_FRAME_RATE, TimerKind::Heartbeat, 0, 0, 0)
            .expect("empty timer table");
        Self {
            cfg,
            loader,
            hooks,
            display,
            zones: HashMap::new(),
            sprites: SpriteTable::new(),
            wait_stop: ResumeQueue::new("wait-stop"),
            wait_end: ResumeQueue::new("wait-end"),
            wait_sync: ResumeQueue::new("wait-sync"),
            timers,
            vars: [0; NUM_VARS],
            bits: [0; NUM_BITS / 16],
            surface: Surface::new(cfg.screen_width as usize, cfg.screen_height as usize),
            palette: [Rgb::default(); 256],
            fade: Fade::new(),
            windows,
            active_window: 0,
            frame_rate: DEFAULT_FRAME_RATE,
            coord_scale: cfg.coord_scale,
            marks: 0,
            scroll: None,
            scroll_x: 0,
            scroll_y: 0,
            pending_clip: (0, 0),
            cursor: Cursor::Parked,
            ctx: ScriptCtx::default(),
            call_stack: Vec::new(),
        }
    }

    pub fn version(&self) -> EngineVersion {
        self.cfg.version
    }

    /// Create a sprite and execute its animation script until it ends or
    /// suspends. The general-case invariant is one live sprite per
    /// (id, zone); the two earliest releases overwrite instead.
    pub fn attach_and_run(
        &mut self,
        sprite_id: u16,
        zone: u16,
        window: u8,
        x: i16,
        y: i16,
        palette: u8,
    ) -> Result<(), EngineError> {
        self.start_sprite(sprite_id, zone, window, x, y, palette)
    }

    /// Run the script attached to a full-screen image. The owning zone
    /// follows from the id: resources group in blocks of 100.
    pub fn run_image_script(&mut self, image_id: u16) -> Result<(), EngineError> {
        let zone = image_id / IDS_PER_ZONE;
        self.ensure_zone(zone)?;
        let offset = self
            .zone_ref(zone)?
            .anim_offset(image_id)
            .ok_or(EngineError::MissingResource {
                kind: "image script",
                id: image_id,
                zone,
            })?;
        self.exec_nested(offset, 0, zone)
    }

    /// Stop one animation: cancel its timers, drop its continuations,
    /// remove the sprite, and wake everything waiting on its stop.
    pub fn stop_animation(&mut self, sprite_id: u16, zone: u16) -> Result<(), EngineError> {
        self.stop_sprite(sprite_id, zone)
    }

    /// Clear the sprite table, all three continuation queues and the timer
    /// table in one step, then re-arm the heartbeat. Nothing can observe
    /// the tables half-cleared: the runtime is single-threaded and no
    /// interpreter step runs inside this call.
    pub fn reset_all(&mut self) {
        log(LogCategory::Sprite, LogLevel::Info, || {
            format!(
                "reset: dropping {} sprites, {} timers",
                self.sprites.len(),
                self.timers.len()
            )
        });
        self.sprites.clear();
        self.wait_stop.clear();
        self.wait_end.clear();
        self.wait_sync.clear();
        self.timers.clear();
        self.scroll = None;
        self.timers
            .schedule(self.frame_rate, TimerKind::Heartbeat, 0, 0, 0)
            .expect("timer table just cleared");
    }

    /// Advance one external tick: age every timer entry, fire the due
    /// ones, then step any palette fade in flight.
    pub fn pump_one_tick(&mut self) -> Result<(), EngineError> {
        self.timers.tick_down();
        while let Some(due) = self.timers.first_due() {
            log(LogCategory::Timer, LogLevel::Debug, || {
                format!(
                    "fire {:?} sprite {} zone {} offset {:#06x}",
                    due.kind, due.sprite, due.zone, due.code_offset
                )
            });
            match due.kind {
                TimerKind::Heartbeat => {
                    self.animate_all()?;
                    self.timers.rearm_heartbeat(self.frame_rate);
                }
                TimerKind::ScriptResume => {
                    // Resume first, then remove; a reset inside the script
                    // may have emptied the table already.
                    self.resume_script(due.code_offset, due.sprite, due.zone)?;
                    self.timers.remove_fired(&due);
                }
                TimerKind::ScrollStep => {
                    self.scroll_step()?;
                    self.timers.remove_fired(&due);
                }
            }
        }
        self.step_fade();
        Ok(())
    }

    pub fn variable(&self, index: usize) -> Result<i16, EngineError> {
        self.vars
            .get(index)
            .copied()
            .ok_or(EngineError::IndexOutOfRange {
                what: "variable",
                index,
            })
    }

    pub fn set_variable(&mut self, index: usize, value: i16) -> Result<(), EngineError> {
        match self.vars.get_mut(index) {
            Some(v) => {
                *v = value;
                Ok(())
            }
            None => Err(EngineError::IndexOutOfRange {
                what: "variable",
                index,
            }),
        }
    }

    pub fn bit(&self, index: usize) -> Result<bool, EngineError> {
        if index >= NUM_BITS {
            return Err(EngineError::IndexOutOfRange {
                what: "bit flag",
                index,
            });
        }
        Ok(self.bits[index / 16] & (1 << (index % 16)) != 0)
    }

    pub fn set_bit(&mut self, index: usize, value: bool) -> Result<(), EngineError> {
        if index >= NUM_BITS {
            return Err(EngineError::IndexOutOfRange {
                what: "bit flag",
                index,
            });
        }
        if value {
            self.bits[index / 16] |= 1 << (index % 16);
        } else {
            self.bits[index / 16] &= !(1 << (index % 16));
        }
        Ok(())
    }

    pub fn sprites(&self) -> &SpriteTable {
        &self.sprites
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Read-only inspection snapshot for frontends and tests. This is not
    /// a save state; it never round-trips.
    pub fn debug_state(&self) -> serde_json::Value {
        serde_json::json!({
            "version": self.cfg.version,
            "sprites": self.sprites.len(),
            "timers": self.timers.len(),
            "wait_stop": self.wait_stop.len(),
            "wait_end": self.wait_end.len(),
            "wait_sync": self.wait_sync.len(),
            "zones_loaded": self.zones.len(),
            "frame_rate": self.frame_rate,
            "fade_level": self.fade.level,
            "marks": self.marks,
            "scroll": { "x": self.scroll_x, "y": self.scroll_y },
            "parked": matches!(self.cursor, Cursor::Parked),
        })
    }

    pub(crate) fn ensure_zone(&mut self, zone: u16) -> Result<(), EngineError> {
        if self.zones.contains_key(&zone) {
            return Ok(());
        }
        let (script, pixels) = self.loader.load_zone(zone)?;
        let parsed = Zone::parse(zone, script, pixels, self.cfg)?;
        self.zones.insert(zone, parsed);
        Ok(())
    }

    pub(crate) fn zone_ref(&self, zone: u16) -> Result<&Zone, EngineError> {
        self.zones
            .get(&zone)
            .ok_or(EngineError::ZoneNotLoaded { zone })
    }

    pub(crate) fn zone_mut(&mut self, zone: u16) -> Result<&mut Zone, EngineError> {
        self.zones
            .get_mut(&zone)
            .ok_or(EngineError::ZoneNotLoaded { zone })
    }

    /// Full stop of one sprite, shared by the public API and the stop
    /// opcode.
    pub(crate) fn stop_sprite(&mut self, sprite_id: u16, zone: u16) -> Result<(), EngineError> {
        self.timers.cancel(sprite_id, zone);
        self.wait_stop.purge(sprite_id, zone);
        self.wait_end.purge(sprite_id, zone);
        self.wait_sync.purge(sprite_id, zone);
        self.sprites.remove(sprite_id, zone);
        log(LogCategory::Sprite, LogLevel::Debug, || {
            format!("stop sprite {} zone {}", sprite_id, zone)
        });
        let fired = self.wait_stop.fire(sprite_id);
        self.schedule_continuations(fired)
    }

    /// File fired continuations into the timer queue at base delay; they
    /// resume on the next pump, never inside the one that fired them.
    pub(crate) fn schedule_continuations(
        &mut self,
        fired: Vec<Continuation>,
    ) -> Result<(), EngineError> {
        for c in fired {
            self.timers
                .schedule(1, TimerKind::ScriptResume, c.code_offset, c.sprite, c.zone)?;
        }
        Ok(())
    }
}
