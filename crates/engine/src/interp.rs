//! The bytecode interpreter: fetch, decode, execute.
//!
//! `run` reads opcodes at the cursor until the script ends (opcode 0 with
//! an empty call stack), suspends (a handler parks the cursor and
//! returns), or dies on an unknown opcode. Suspension is the engine's
//! substitute for coroutines: the handler files a continuation — nothing
//! but a code offset plus the owning sprite and zone — into a queue or the
//! timer table, parks the cursor and returns; some unrelated code path
//! later hands the stored offset back to [`VgaRuntime::resume_script`].
//! Execution is never re-entered mid-instruction, so there is no machine
//! state to restore beyond the offset.
//!
//! Opcode width is per release (single byte, or big-endian word on the
//! early ones). Script operands are big-endian words on every release;
//! only the zone tables switched byte order. A failed conditional skips
//! exactly one instruction by re-reading the next opcode and advancing by
//! that opcode's length from the release's operand-length table.

use vga_core::bytes::{put_u16, u16_at, Endian};
use vga_core::logging::{log, LogCategory, LogLevel};
use vga_core::DisplaySink;

use crate::draw;
use crate::error::EngineError;
use crate::sprite::Sprite;
use crate::timer::TimerKind;
use crate::variant::VgaOp;
use crate::zone::ZoneLoader;
use crate::{GameHooks, VgaRuntime, NUM_VARS, NUM_WINDOWS};

/// Script operands are big-endian regardless of release.
const OPERAND_ORDER: Endian = Endian::Big;

/// DelayLong multiplies its operand by this many ticks.
const DELAY_LONG_SCALE: u16 = 10;

/// Sub-script call depth cap; authored data never nests deeper.
const MAX_CALL_DEPTH: usize = 16;

/// Marks available to V6 scripts.
const NUM_MARKS: u16 = 16;

/// The read cursor into the current zone's script, or the out-of-band
/// "no code" state a suspending handler leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cursor {
    Parked,
    Running { zone: u16, pos: usize },
}

/// The sprite and zone the current script acts on behalf of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScriptCtx {
    pub sprite: u16,
    pub zone: u16,
}

impl<Z: ZoneLoader, H: GameHooks, D: DisplaySink> VgaRuntime<Z, H, D> {
    /// Execute from the cursor until end, suspension, or a fatal error.
    pub(crate) fn run(&mut self) -> Result<(), EngineError> {
        loop {
            let Cursor::Running { zone, pos } = self.cursor else {
                return Ok(());
            };
            let opcode = self.fetch_opcode()?;
            let Some(op) = self.cfg.lookup(opcode) else {
                return Err(EngineError::UnknownOpcode {
                    opcode,
                    offset: pos,
                    zone,
                });
            };
            log(LogCategory::Script, LogLevel::Trace, || {
                format!("zone {} offset {:#06x}: {:?}", zone, pos, op)
            });
            self.exec(op)?;
        }
    }

    /// Start a script in a fresh frame, preserving whatever the caller was
    /// executing. Used for API entry points and for scripts spawned
    /// mid-instruction by other scripts.
    pub(crate) fn exec_nested(
        &mut self,
        offset: u32,
        sprite: u16,
        zone: u16,
    ) -> Result<(), EngineError> {
        let saved_cursor = self.cursor;
        let saved_ctx = self.ctx;
        let saved_stack = std::mem::take(&mut self.call_stack);
        self.cursor = Cursor::Running {
            zone,
            pos: offset as usize,
        };
        self.ctx = ScriptCtx { sprite, zone };
        let result = self.run();
        self.cursor = saved_cursor;
        self.ctx = saved_ctx;
        self.call_stack = saved_stack;
        result
    }

    /// Resume a fired continuation. There is no stack to restore: the
    /// stored offset and context are the whole execution state.
    pub(crate) fn resume_script(
        &mut self,
        offset: u32,
        sprite: u16,
        zone: u16,
    ) -> Result<(), EngineError> {
        log(LogCategory::Script, LogLevel::Debug, || {
            format!(
                "resume sprite {} zone {} at {:#06x}",
                sprite, zone, offset
            )
        });
        self.exec_nested(offset, sprite, zone)
    }

    /// Create the sprite for an animation and run its script.
    pub(crate) fn start_sprite(
        &mut self,
        id: u16,
        zone: u16,
        window: u8,
        x: i16,
        y: i16,
        palette: u8,
    ) -> Result<(), EngineError> {
        if window as usize >= NUM_WINDOWS {
            return Err(EngineError::IndexOutOfRange {
                what: "window",
                index: window as usize,
            });
        }
        self.ensure_zone(zone)?;
        if self.sprites.find(id, zone).is_some() {
            if self.cfg.allow_duplicate_sprites {
                self.stop_sprite(id, zone)?;
            } else {
                log(LogCategory::Sprite, LogLevel::Debug, || {
                    format!("sprite {} zone {} already animating", id, zone)
                });
                return Ok(());
            }
        }
        let offset =
            self.zone_ref(zone)?
                .anim_offset(id)
                .ok_or(EngineError::MissingResource {
                    kind: "animation",
                    id,
                    zone,
                })?;
        self.sprites.insert(Sprite {
            id,
            zone,
            window,
            x,
            y,
            image: 0,
            palette,
            flags: 0,
            priority: 0,
        })?;
        log(LogCategory::Sprite, LogLevel::Debug, || {
            format!("animate sprite {} zone {} at ({}, {})", id, zone, x, y)
        });
        self.exec_nested(offset, id, zone)
    }

    fn exec(&mut self, op: VgaOp) -> Result<(), EngineError> {
        match op {
            VgaOp::End => self.op_end(),
            VgaOp::FadeOut => self.op_fade_out(),
            VgaOp::CallScript => self.op_call_script(),
            VgaOp::NewSprite => self.op_new_sprite(),
            VgaOp::FadeIn => self.op_fade_in(),
            VgaOp::IfVarEq => self.op_if_var_eq(),
            VgaOp::IfObjectHere => self.op_if_object_here(true),
            VgaOp::IfObjectGone => self.op_if_object_here(false),
            VgaOp::IfVarNe => self.op_if_var_ne(),
            VgaOp::IfVarLt => self.op_if_var_lt(),
            VgaOp::Draw => self.op_draw(),
            VgaOp::OnStop => self.op_on_stop(),
            VgaOp::Delay => self.op_delay(),
            VgaOp::AddX => self.op_add_x(),
            VgaOp::AddY => self.op_add_y(),
            VgaOp::Signal => self.op_signal(),
            VgaOp::WaitSync => self.op_wait_sync(),
            VgaOp::SetClip => self.op_set_clip(),
            VgaOp::Jump => self.op_jump(),
            VgaOp::ChainScript => self.op_chain_script(),
            VgaOp::SetRepeat => self.op_set_repeat(),
            VgaOp::EndRepeat => self.op_end_repeat(),
            VgaOp::SetPalette => self.op_set_palette(),
            VgaOp::SetPriority => self.op_set_priority(),
            VgaOp::MoveTo => self.op_move_to(),
            VgaOp::HaltSprite => self.op_halt_sprite(),
            VgaOp::SetWindow => self.op_set_window(),
            VgaOp::ResetSprites => self.op_reset_sprites(),
            VgaOp::WaitEnd => self.op_wait_end(),
            VgaOp::StopAllSounds => self.op_stop_all_sounds(),
            VgaOp::SetFrameRate => self.op_set_frame_rate(),
            VgaOp::SetWindowNum => self.op_set_window_num(),
            VgaOp::CopyVar => self.op_copy_var(),
            VgaOp::PointerOn => self.op_pointer(true),
            VgaOp::PointerOff => self.op_pointer(false),
            VgaOp::ClearWindow => self.op_clear_window(),
            VgaOp::SetWindowImage => self.op_set_window_image(),
            VgaOp::AddYIndirect => self.op_add_y_indirect(),
            VgaOp::IfVarZero => self.op_if_var_zero(),
            VgaOp::SetVar => self.op_set_var(),
            VgaOp::AddVar => self.op_add_var(),
            VgaOp::SubVar => self.op_sub_var(),
            VgaOp::DelayIfSilent => self.op_delay_if_silent(),
            VgaOp::IfBitSet => self.op_if_bit(true),
            VgaOp::IfBitClear => self.op_if_bit(false),
            VgaOp::SetXIndirect => self.op_set_x_indirect(),
            VgaOp::SetYIndirect => self.op_set_y_indirect(),
            VgaOp::AddVarIndirect => self.op_add_var_indirect(),
            VgaOp::SetImage => self.op_set_image(),
            VgaOp::SetBit => self.op_set_bit(true),
            VgaOp::ClearBit => self.op_set_bit(false),
            VgaOp::EnableWindow => self.op_enable_window(),
            VgaOp::PlaySound => self.op_play_sound(),
            VgaOp::PanScrollH => self.op_pan_scroll(false),
            VgaOp::PanScrollV => self.op_pan_scroll(true),
            VgaOp::SetSpriteFlags => self.op_set_sprite_flags(),
            VgaOp::DelayLong => self.op_delay_long(),
            VgaOp::BlackPalette => self.op_black_palette(),
            VgaOp::IfSoundPlaying => self.op_if_sound_playing(),
            VgaOp::StopSprite => self.op_stop_sprite(),
            VgaOp::AttachScript => self.op_attach_script(),
            VgaOp::FastFadeOut => self.op_fast_fade(false),
            VgaOp::FastFadeIn => self.op_fast_fade(true),
            VgaOp::IfVarGt => self.op_if_var_gt(),
            VgaOp::SlowFadeIn => self.op_slow_fade_in(),
            VgaOp::IfLongVarEq => self.op_if_var_pair(true),
            VgaOp::IfLongVarNe => self.op_if_var_pair(false),
            VgaOp::CentreScroll => self.op_centre_scroll(),
            VgaOp::PlayTrack => self.op_play_track(),
            VgaOp::QueueTrack => self.op_queue_track(),
            VgaOp::IfTrackDone => self.op_if_track_done(),
            VgaOp::SetMark => self.op_set_mark(true),
            VgaOp::ClearMark => self.op_set_mark(false),
            VgaOp::SetScale => self.op_set_scale(),
        }
    }

    // ---- cursor and operand fetching ----------------------------------

    fn cursor_pos(&self) -> (u16, usize) {
        match self.cursor {
            Cursor::Running { zone, pos } => (zone, pos),
            Cursor::Parked => unreachable!("operand fetch while parked"),
        }
    }

    fn set_pos(&mut self, pos: usize) {
        let (zone, _) = self.cursor_pos();
        self.cursor = Cursor::Running { zone, pos };
    }

    fn park(&mut self) {
        self.cursor = Cursor::Parked;
    }

    fn fetch_u8(&mut self) -> Result<u8, EngineError> {
        let (zone, pos) = self.cursor_pos();
        let byte = *self
            .zone_ref(zone)?
            .script
            .get(pos)
            .ok_or(EngineError::ScriptOverrun { zone, offset: pos })?;
        self.set_pos(pos + 1);
        Ok(byte)
    }

    fn fetch_u16(&mut self) -> Result<u16, EngineError> {
        let (zone, pos) = self.cursor_pos();
        let word = u16_at(&self.zone_ref(zone)?.script, pos, OPERAND_ORDER)
            .map_err(|e| EngineError::ScriptOverrun {
                zone,
                offset: e.offset,
            })?;
        self.set_pos(pos + 2);
        Ok(word)
    }

    fn fetch_opcode(&mut self) -> Result<u16, EngineError> {
        if self.cfg.wide_opcodes {
            self.fetch_u16()
        } else {
            Ok(self.fetch_u8()? as u16)
        }
    }

    /// A "small" operand: one byte on the narrow releases, a word on the
    /// wide ones.
    fn read_small(&mut self) -> Result<u16, EngineError> {
        if self.cfg.wide_opcodes {
            self.fetch_u16()
        } else {
            Ok(self.fetch_u8()? as u16)
        }
    }

    /// A 16-bit operand that is either a literal or, when it lands in the
    /// release's indirection window, a reference into the variable store.
    fn read_var_or_word(&mut self) -> Result<i16, EngineError> {
        let raw = self.fetch_u16()?;
        let base = self.cfg.var_base;
        if raw >= base && raw < base + NUM_VARS as u16 {
            self.variable((raw - base) as usize)
        } else {
            Ok(raw as i16)
        }
    }

    /// Skip exactly the next instruction: re-read its opcode and advance
    /// the cursor by that opcode's configured operand length.
    fn skip_next_instruction(&mut self) -> Result<(), EngineError> {
        let (zone, at) = self.cursor_pos();
        let opcode = self.fetch_opcode()?;
        if self.cfg.lookup(opcode).is_none() {
            return Err(EngineError::UnknownOpcode {
                opcode,
                offset: at,
                zone,
            });
        }
        let len = self.cfg.operand_len[opcode as usize] as usize;
        let (zone, pos) = self.cursor_pos();
        if pos + len > self.zone_ref(zone)?.script.len() {
            return Err(EngineError::ScriptOverrun {
                zone,
                offset: pos + len,
            });
        }
        self.set_pos(pos + len);
        Ok(())
    }

    /// Conditionals fall through when true and skip one instruction when
    /// false.
    fn cond(&mut self, taken: bool) -> Result<(), EngineError> {
        if taken {
            Ok(())
        } else {
            self.skip_next_instruction()
        }
    }

    fn with_sprite<F: FnOnce(&mut Sprite)>(&mut self, f: F) {
        let ScriptCtx { sprite, zone } = self.ctx;
        if let Some(s) = self.sprites.get_mut(sprite, zone) {
            f(s);
        }
    }

    /// Park into the timer table, resuming after `delay` ticks at the
    /// current cursor position.
    fn suspend_for(&mut self, delay: u16) -> Result<(), EngineError> {
        let (zone, pos) = self.cursor_pos();
        self.timers.schedule(
            delay,
            TimerKind::ScriptResume,
            pos as u32,
            self.ctx.sprite,
            zone,
        )?;
        self.park();
        Ok(())
    }

    fn resolve_script(&self, script: u16) -> Result<u32, EngineError> {
        let zone = self.ctx.zone;
        self.zone_ref(zone)?
            .anim_offset(script)
            .ok_or(EngineError::MissingResource {
                kind: "animation",
                id: script,
                zone,
            })
    }

    // ---- script flow --------------------------------------------------

    fn op_end(&mut self) -> Result<(), EngineError> {
        match self.call_stack.pop() {
            Some(ret) => {
                self.set_pos(ret);
                Ok(())
            }
            None => {
                self.park();
                Ok(())
            }
        }
    }

    fn op_call_script(&mut self) -> Result<(), EngineError> {
        let script = self.fetch_u16()?;
        let offset = self.resolve_script(script)?;
        if self.call_stack.len() == MAX_CALL_DEPTH {
            return Err(EngineError::TableFull {
                table: "call stack",
                capacity: MAX_CALL_DEPTH,
            });
        }
        let (_, pos) = self.cursor_pos();
        self.call_stack.push(pos);
        self.set_pos(offset as usize);
        Ok(())
    }

    fn op_chain_script(&mut self) -> Result<(), EngineError> {
        let script = self.fetch_u16()?;
        let offset = self.resolve_script(script)?;
        self.call_stack.clear();
        self.set_pos(offset as usize);
        Ok(())
    }

    fn op_jump(&mut self) -> Result<(), EngineError> {
        let target = self.fetch_u16()? as usize;
        let (zone, _) = self.cursor_pos();
        if target >= self.zone_ref(zone)?.script.len() {
            return Err(EngineError::ScriptOverrun {
                zone,
                offset: target,
            });
        }
        self.set_pos(target);
        Ok(())
    }

    fn op_set_repeat(&mut self) -> Result<(), EngineError> {
        let count = self.fetch_u16()?;
        let (zone, slot) = self.cursor_pos();
        put_u16(&mut self.zone_mut(zone)?.script, slot, OPERAND_ORDER, count).map_err(|e| {
            EngineError::ScriptOverrun {
                zone,
                offset: e.offset,
            }
        })?;
        self.set_pos(slot + 2);
        Ok(())
    }

    fn op_end_repeat(&mut self) -> Result<(), EngineError> {
        let back = self.fetch_u16()? as usize;
        let (zone, pos) = self.cursor_pos();
        let slot = pos
            .checked_sub(back)
            .ok_or(EngineError::ScriptOverrun { zone, offset: pos })?;
        let counter = u16_at(&self.zone_ref(zone)?.script, slot, OPERAND_ORDER)
            .map_err(|e| EngineError::ScriptOverrun {
                zone,
                offset: e.offset,
            })?
            .saturating_sub(1);
        put_u16(
            &mut self.zone_mut(zone)?.script,
            slot,
            OPERAND_ORDER,
            counter,
        )
        .map_err(|e| EngineError::ScriptOverrun {
            zone,
            offset: e.offset,
        })?;
        if counter != 0 {
            self.set_pos(slot + 2);
        }
        Ok(())
    }

    // ---- sprite lifecycle ---------------------------------------------

    fn op_new_sprite(&mut self) -> Result<(), EngineError> {
        let id = self.fetch_u16()?;
        let zone = self.fetch_u16()?;
        let x = self.read_var_or_word()?;
        let y = self.read_var_or_word()?;
        let window = self.read_small()? as u8;
        self.start_sprite(id, zone, window, x, y, 0)
    }

    fn op_halt_sprite(&mut self) -> Result<(), EngineError> {
        let ScriptCtx { sprite, zone } = self.ctx;
        self.timers.cancel(sprite, zone);
        self.wait_stop.purge(sprite, zone);
        self.wait_end.purge(sprite, zone);
        self.wait_sync.purge(sprite, zone);
        self.sprites.remove(sprite, zone);
        log(LogCategory::Sprite, LogLevel::Debug, || {
            format!("halt sprite {} zone {}", sprite, zone)
        });
        let fired = self.wait_end.fire(sprite);
        self.schedule_continuations(fired)?;
        self.park();
        Ok(())
    }

    fn op_stop_sprite(&mut self) -> Result<(), EngineError> {
        let id = self.fetch_u16()?;
        let zone = self.fetch_u16()?;
        self.stop_sprite(id, zone)
    }

    fn op_attach_script(&mut self) -> Result<(), EngineError> {
        let id = self.fetch_u16()?;
        let script = self.fetch_u16()?;
        let zone = self.ctx.zone;
        if self.sprites.find(id, zone).is_none() {
            return Ok(());
        }
        let offset = self.resolve_script(script)?;
        self.timers.cancel(id, zone);
        self.timers
            .schedule(1, TimerKind::ScriptResume, offset, id, zone)?;
        Ok(())
    }

    fn op_reset_sprites(&mut self) -> Result<(), EngineError> {
        self.reset_all();
        Ok(())
    }

    fn op_move_to(&mut self) -> Result<(), EngineError> {
        let x = self.read_var_or_word()?;
        let y = self.read_var_or_word()?;
        let image = self.fetch_u16()?;
        self.with_sprite(|s| {
            s.x = x;
            s.y = y;
            s.image = image;
        });
        Ok(())
    }

    fn op_add_x(&mut self) -> Result<(), EngineError> {
        let dx = self.read_var_or_word()?;
        self.with_sprite(|s| s.x = s.x.wrapping_add(dx));
        Ok(())
    }

    fn op_add_y(&mut self) -> Result<(), EngineError> {
        let dy = self.read_var_or_word()?;
        self.with_sprite(|s| s.y = s.y.wrapping_add(dy));
        Ok(())
    }

    fn op_add_y_indirect(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let dy = self.variable(var as usize)?;
        self.with_sprite(|s| s.y = s.y.wrapping_add(dy));
        Ok(())
    }

    fn op_set_x_indirect(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let x = self.variable(var as usize)?;
        self.with_sprite(|s| s.x = x);
        Ok(())
    }

    fn op_set_y_indirect(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let y = self.variable(var as usize)?;
        self.with_sprite(|s| s.y = y);
        Ok(())
    }

    fn op_set_priority(&mut self) -> Result<(), EngineError> {
        let priority = self.read_small()? as u8;
        let ScriptCtx { sprite, zone } = self.ctx;
        self.sprites.set_priority(sprite, zone, priority);
        Ok(())
    }

    fn op_set_image(&mut self) -> Result<(), EngineError> {
        let image = self.fetch_u16()?;
        self.with_sprite(|s| s.image = image);
        Ok(())
    }

    fn op_set_sprite_flags(&mut self) -> Result<(), EngineError> {
        let flags = self.fetch_u16()?;
        self.with_sprite(|s| s.flags = flags);
        Ok(())
    }

    // ---- synchronization ----------------------------------------------

    fn op_delay(&mut self) -> Result<(), EngineError> {
        let ticks = self.read_var_or_word()?;
        self.suspend_for(ticks.max(1) as u16)
    }

    fn op_delay_long(&mut self) -> Result<(), EngineError> {
        let ticks = self.read_var_or_word()?;
        self.suspend_for((ticks.max(1) as u16).saturating_mul(DELAY_LONG_SCALE))
    }

    fn op_delay_if_silent(&mut self) -> Result<(), EngineError> {
        let ticks = self.read_var_or_word()?;
        if self.hooks.sound_playing() {
            self.suspend_for(ticks.max(1) as u16)
        } else {
            Ok(())
        }
    }

    fn op_signal(&mut self) -> Result<(), EngineError> {
        let ident = self.fetch_u16()?;
        let fired = self.wait_sync.fire(ident);
        log(LogCategory::Script, LogLevel::Debug, || {
            format!("signal {}: woke {} waiter(s)", ident, fired.len())
        });
        self.schedule_continuations(fired)
    }

    fn op_wait_sync(&mut self) -> Result<(), EngineError> {
        let ident = self.fetch_u16()?;
        let (zone, pos) = self.cursor_pos();
        self.wait_sync
            .register(ident, pos as u32, self.ctx.sprite, zone)?;
        self.park();
        Ok(())
    }

    fn op_wait_end(&mut self) -> Result<(), EngineError> {
        let ident = self.fetch_u16()?;
        let (zone, pos) = self.cursor_pos();
        self.wait_end
            .register(ident, pos as u32, self.ctx.sprite, zone)?;
        self.park();
        Ok(())
    }

    fn op_on_stop(&mut self) -> Result<(), EngineError> {
        let ident = self.fetch_u16()?;
        let (zone, pos) = self.cursor_pos();
        self.wait_stop
            .register(ident, pos as u32, self.ctx.sprite, zone)?;
        self.park();
        Ok(())
    }

    // ---- variables and flags ------------------------------------------

    fn op_set_var(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let value = self.read_var_or_word()?;
        self.set_variable(var as usize, value)
    }

    fn op_add_var(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let value = self.read_var_or_word()?;
        let old = self.variable(var as usize)?;
        self.set_variable(var as usize, old.wrapping_add(value))
    }

    fn op_sub_var(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let value = self.read_var_or_word()?;
        let old = self.variable(var as usize)?;
        self.set_variable(var as usize, old.wrapping_sub(value))
    }

    fn op_copy_var(&mut self) -> Result<(), EngineError> {
        let dst = self.read_small()?;
        let src = self.read_small()?;
        let value = self.variable(src as usize)?;
        self.set_variable(dst as usize, value)
    }

    fn op_add_var_indirect(&mut self) -> Result<(), EngineError> {
        let dst = self.read_small()?;
        let src = self.read_small()?;
        let add = self.variable(src as usize)?;
        let old = self.variable(dst as usize)?;
        self.set_variable(dst as usize, old.wrapping_add(add))
    }

    fn op_set_bit(&mut self, value: bool) -> Result<(), EngineError> {
        let bit = self.fetch_u16()?;
        self.set_bit(bit as usize, value)
    }

    // ---- conditionals -------------------------------------------------

    fn op_if_var_eq(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let value = self.read_var_or_word()?;
        let taken = self.variable(var as usize)? == value;
        self.cond(taken)
    }

    fn op_if_var_ne(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let value = self.read_var_or_word()?;
        let taken = self.variable(var as usize)? != value;
        self.cond(taken)
    }

    fn op_if_var_lt(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let value = self.read_var_or_word()?;
        let taken = self.variable(var as usize)? < value;
        self.cond(taken)
    }

    fn op_if_var_gt(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let value = self.read_var_or_word()?;
        let taken = self.variable(var as usize)? > value;
        self.cond(taken)
    }

    fn op_if_var_zero(&mut self) -> Result<(), EngineError> {
        let var = self.read_small()?;
        let taken = self.variable(var as usize)? == 0;
        self.cond(taken)
    }

    fn op_if_var_pair(&mut self, want_equal: bool) -> Result<(), EngineError> {
        let a = self.read_small()?;
        let b = self.read_small()?;
        let equal = self.variable(a as usize)? == self.variable(b as usize)?;
        self.cond(equal == want_equal)
    }

    fn op_if_bit(&mut self, want_set: bool) -> Result<(), EngineError> {
        let bit = self.fetch_u16()?;
        let set = self.bit(bit as usize)?;
        self.cond(set == want_set)
    }

    fn op_if_object_here(&mut self, want_here: bool) -> Result<(), EngineError> {
        let object = self.fetch_u16()?;
        let here = self.hooks.object_here(object);
        self.cond(here == want_here)
    }

    fn op_if_sound_playing(&mut self) -> Result<(), EngineError> {
        let playing = self.hooks.sound_playing();
        self.cond(playing)
    }

    fn op_if_track_done(&mut self) -> Result<(), EngineError> {
        let done = self.hooks.track_done();
        self.cond(done)
    }

    // ---- drawing and palette ------------------------------------------

    fn op_draw(&mut self) -> Result<(), EngineError> {
        let image = self.fetch_u16()?;
        let palette = self.read_small()? as u8;
        let x = self.read_var_or_word()?;
        let y = self.read_var_or_word()?;
        let flags = self.read_small()?;
        self.with_sprite(|s| {
            s.image = image;
            s.palette = palette;
        });
        self.draw_op(image, palette, x, y, flags)
    }

    fn op_set_palette(&mut self) -> Result<(), EngineError> {
        let base = self.read_small()?;
        let count = self.read_small()?;
        let src = self.fetch_u16()?;
        self.upload_palette(base as usize, count as usize, src as usize)
    }

    fn op_set_clip(&mut self) -> Result<(), EngineError> {
        let left = self.read_var_or_word()?;
        let top = self.read_var_or_word()?;
        self.pending_clip = (left.max(0) as u16, top.max(0) as u16);
        Ok(())
    }

    fn op_fade_out(&mut self) -> Result<(), EngineError> {
        self.begin_fade(0, 2);
        Ok(())
    }

    fn op_fade_in(&mut self) -> Result<(), EngineError> {
        self.begin_fade(draw::FADE_MAX, 2);
        Ok(())
    }

    fn op_slow_fade_in(&mut self) -> Result<(), EngineError> {
        self.begin_fade(draw::FADE_MAX, 1);
        Ok(())
    }

    fn op_fast_fade(&mut self, to_full: bool) -> Result<(), EngineError> {
        self.snap_fade(if to_full { draw::FADE_MAX } else { 0 });
        Ok(())
    }

    fn op_black_palette(&mut self) -> Result<(), EngineError> {
        self.snap_fade(0);
        Ok(())
    }

    // ---- windows ------------------------------------------------------

    fn op_set_window(&mut self) -> Result<(), EngineError> {
        let x = self.read_var_or_word()?;
        let y = self.read_var_or_word()?;
        let w = self.read_var_or_word()?;
        let h = self.read_var_or_word()?;
        let idx = self.active_window as usize;
        self.windows[idx].rect = vga_core::Rect {
            x,
            y,
            w: w.max(0) as u16,
            h: h.max(0) as u16,
        };
        self.windows[idx].enabled = true;
        Ok(())
    }

    fn op_set_window_num(&mut self) -> Result<(), EngineError> {
        let win = self.read_small()?;
        if win as usize >= NUM_WINDOWS {
            return Err(EngineError::IndexOutOfRange {
                what: "window",
                index: win as usize,
            });
        }
        self.active_window = win as u8;
        self.with_sprite(|s| s.window = win as u8);
        Ok(())
    }

    fn op_enable_window(&mut self) -> Result<(), EngineError> {
        let win = self.read_small()?;
        if win as usize >= NUM_WINDOWS {
            return Err(EngineError::IndexOutOfRange {
                what: "window",
                index: win as usize,
            });
        }
        self.windows[win as usize].enabled = true;
        Ok(())
    }

    fn op_clear_window(&mut self) -> Result<(), EngineError> {
        let win = self.read_small()?;
        let colour = self.read_small()? as u8;
        self.clear_window(win as usize, colour)
    }

    fn op_set_window_image(&mut self) -> Result<(), EngineError> {
        let image = self.fetch_u16()?;
        let win = self.read_small()?;
        self.draw_window_image(image, win as usize)
    }

    // ---- scrolling ----------------------------------------------------

    /// `vertical` selects the axis: PanScrollH is false, PanScrollV true.
    fn op_pan_scroll(&mut self, vertical: bool) -> Result<(), EngineError> {
        let image = self.fetch_u16()?;
        let target = self.read_var_or_word()?;
        self.start_scroll(image, vertical, target.max(0) as u16)
    }

    fn op_centre_scroll(&mut self) -> Result<(), EngineError> {
        let x = self.read_var_or_word()?;
        self.centre_scroll(x.max(0) as u16)
    }

    // ---- delegated side effects ---------------------------------------

    fn op_play_sound(&mut self) -> Result<(), EngineError> {
        let sound = self.read_var_or_word()?;
        log(LogCategory::Sound, LogLevel::Debug, || {
            format!("play sound {}", sound)
        });
        self.hooks.play_sound(sound);
        Ok(())
    }

    fn op_stop_all_sounds(&mut self) -> Result<(), EngineError> {
        self.hooks.stop_all_sounds();
        Ok(())
    }

    fn op_play_track(&mut self) -> Result<(), EngineError> {
        let track = self.read_var_or_word()?;
        self.hooks.play_track(track);
        Ok(())
    }

    fn op_queue_track(&mut self) -> Result<(), EngineError> {
        let track = self.read_var_or_word()?;
        self.hooks.queue_track(track);
        Ok(())
    }

    fn op_pointer(&mut self, visible: bool) -> Result<(), EngineError> {
        self.hooks.pointer_visible(visible);
        Ok(())
    }

    fn op_set_frame_rate(&mut self) -> Result<(), EngineError> {
        let rate = self.read_small()?;
        self.frame_rate = rate.max(1);
        Ok(())
    }

    fn op_set_mark(&mut self, value: bool) -> Result<(), EngineError> {
        let mark = self.read_small()?;
        if mark >= NUM_MARKS {
            return Err(EngineError::IndexOutOfRange {
                what: "mark",
                index: mark as usize,
            });
        }
        if value {
            self.marks |= 1 << mark;
        } else {
            self.marks &= !(1 << mark);
        }
        Ok(())
    }

    fn op_set_scale(&mut self) -> Result<(), EngineError> {
        let scale = self.read_small()?;
        self.coord_scale = if scale == 0 {
            self.cfg.coord_scale
        } else {
            scale as u8
        };
        Ok(())
    }
}
