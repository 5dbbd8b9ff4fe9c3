//! End-to-end scenarios driving the public runtime API against hand-built
//! in-memory zones.

use std::collections::HashMap;

use vga_core::bytes::Endian;
use vga_core::{DisplaySink, Rgb, Surface};

use crate::timer::TimerKind;
use crate::variant::{EngineVersion, VariantConfig};
use crate::zone::{ZoneLoader, IMG_32C, IMG_MASKED, IMG_PANORAMA, IMG_PLANAR, IMG_TEXT};
use crate::{EngineError, GameHooks, VgaRuntime};

// ---- harness ----------------------------------------------------------

struct MapLoader {
    zones: HashMap<u16, (Vec<u8>, Vec<u8>)>,
}

impl ZoneLoader for MapLoader {
    fn load_zone(&mut self, zone: u16) -> Result<(Vec<u8>, Vec<u8>), EngineError> {
        self.zones
            .get(&zone)
            .cloned()
            .ok_or(EngineError::MissingResource {
                kind: "zone",
                id: zone,
                zone,
            })
    }
}

#[derive(Default)]
struct RecordingHooks {
    sounds: Vec<i16>,
    sound_playing: bool,
}

impl GameHooks for RecordingHooks {
    fn play_sound(&mut self, sound: i16) {
        self.sounds.push(sound);
    }

    fn sound_playing(&self) -> bool {
        self.sound_playing
    }
}

#[derive(Default)]
struct RecordingSink {
    presents: usize,
    last_palette: Vec<Rgb>,
}

impl DisplaySink for RecordingSink {
    fn present(&mut self, _surface: &Surface) {
        self.presents += 1;
    }

    fn update_palette(&mut self, first: usize, colours: &[Rgb]) {
        if self.last_palette.len() < first + colours.len() {
            self.last_palette.resize(first + colours.len(), Rgb::default());
        }
        self.last_palette[first..first + colours.len()].copy_from_slice(colours);
    }
}

/// Bytecode assembler for narrow releases: one-byte opcodes, big-endian
/// operand words.
#[derive(Default)]
struct Asm {
    bytes: Vec<u8>,
}

impl Asm {
    fn op(mut self, opcode: u8) -> Self {
        self.bytes.push(opcode);
        self
    }

    fn byte(mut self, v: u8) -> Self {
        self.bytes.push(v);
        self
    }

    fn word(mut self, v: u16) -> Self {
        self.bytes.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Wide opcode for the early releases.
    fn opw(self, opcode: u16) -> Self {
        self.word(opcode)
    }
}

struct ImageSpec {
    id: u16,
    width: u16,
    height: u16,
    flags: u16,
    colour_base: u16,
    data: Vec<u8>,
}

/// Assemble a zone's two buffers in the layout the given release expects.
fn build_zone(
    cfg: &VariantConfig,
    anims: &[(u16, &[u8])],
    images: &[ImageSpec],
) -> (Vec<u8>, Vec<u8>) {
    let put16 = |out: &mut Vec<u8>, v: u16| match cfg.endian {
        Endian::Big => out.extend_from_slice(&v.to_be_bytes()),
        Endian::Little => out.extend_from_slice(&v.to_le_bytes()),
    };
    let put32 = |out: &mut Vec<u8>, v: u32| match cfg.endian {
        Endian::Big => out.extend_from_slice(&v.to_be_bytes()),
        Endian::Little => out.extend_from_slice(&v.to_le_bytes()),
    };

    let offset_width = if cfg.long_image_offsets { 4 } else { 2 };
    let entry_size = 2 + offset_width + 8;
    let header_len = 2 + anims.len() * 4 + 2 + images.len() * entry_size;

    let mut script = Vec::new();
    put16(&mut script, anims.len() as u16);
    let mut code_at = header_len as u16;
    for (id, code) in anims {
        put16(&mut script, *id);
        put16(&mut script, code_at);
        code_at += code.len() as u16;
    }

    let mut pixels = Vec::new();
    put16(&mut script, images.len() as u16);
    for img in images {
        put16(&mut script, img.id);
        if cfg.long_image_offsets {
            put32(&mut script, pixels.len() as u32);
        } else {
            put16(&mut script, pixels.len() as u16);
        }
        put16(&mut script, img.width);
        put16(&mut script, img.height);
        put16(&mut script, img.flags);
        put16(&mut script, img.colour_base);
        pixels.extend_from_slice(&img.data);
    }

    assert_eq!(script.len(), header_len);
    for (_, code) in anims {
        script.extend_from_slice(code);
    }
    (script, pixels)
}

type TestRuntime = VgaRuntime<MapLoader, RecordingHooks, RecordingSink>;

fn runtime(version: EngineVersion, zones: Vec<(u16, (Vec<u8>, Vec<u8>))>) -> TestRuntime {
    VgaRuntime::new(
        version,
        MapLoader {
            zones: zones.into_iter().collect(),
        },
        RecordingHooks::default(),
        RecordingSink::default(),
    )
}

/// A solid 8x8 run-length image: one repeat run covering all 64 pixels.
fn solid_8x8(id: u16, colour: u8) -> ImageSpec {
    ImageSpec {
        id,
        width: 8,
        height: 8,
        flags: 0,
        colour_base: 0,
        data: vec![63, colour],
    }
}

// ---- scenarios --------------------------------------------------------

#[test]
fn test_delay_then_draw_end_to_end() {
    // Sprite 42 in zone 3: delay 5 ticks, draw image 310, end.
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        .op(12) // Delay
        .word(5)
        .op(10) // Draw
        .word(310)
        .byte(0)
        .word(0)
        .word(0)
        .byte(0)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(42, &code)], &[solid_8x8(310, 7)]);
    let mut rt = runtime(EngineVersion::V5, vec![(3, zone)]);

    rt.attach_and_run(42, 3, 0, 0, 0, 0).unwrap();

    // Suspended: one timer entry with delay 5 at the post-operand offset.
    let resume = rt
        .timers
        .live()
        .iter()
        .find(|e| e.kind == TimerKind::ScriptResume)
        .copied()
        .unwrap();
    assert_eq!(resume.delay, 5);
    assert_eq!(resume.sprite, 42);
    assert_eq!(resume.zone, 3);
    // Delay is opcode byte + operand word.
    let script_base = rt.zone_ref(3).unwrap().anim_offset(42).unwrap();
    assert_eq!(resume.code_offset, script_base + 3);

    for _ in 0..4 {
        rt.pump_one_tick().unwrap();
        assert_eq!(rt.sprites().get(42, 3).unwrap().image, 0);
    }
    rt.pump_one_tick().unwrap();

    let sprite = rt.sprites().get(42, 3).unwrap();
    assert_eq!(sprite.image, 310);
    assert_eq!(rt.sprites().len(), 1);
    assert_eq!(rt.surface().pixel(0, 0), 7);
    // The fired entry is gone.
    assert!(rt
        .timers
        .live()
        .iter()
        .all(|e| e.kind != TimerKind::ScriptResume));
}

#[test]
fn test_conditional_false_skips_exactly_one_instruction() {
    // IfVarEq fails, so the Draw that follows (8 operand bytes of junk
    // that would misparse as opcodes) must be stepped over exactly.
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        .op(39) // SetVar v1 = 5
        .byte(1)
        .word(5)
        .op(5) // IfVarEq v1 == 0 -> false
        .byte(1)
        .word(0)
        .op(10) // skipped Draw
        .byte(0xEE)
        .byte(0xEE)
        .byte(0xEE)
        .byte(0xEE)
        .byte(0xEE)
        .byte(0xEE)
        .byte(0xEE)
        .byte(0xEE)
        .op(39) // SetVar v2 = 1
        .byte(2)
        .word(1)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);

    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.variable(1).unwrap(), 5);
    assert_eq!(rt.variable(2).unwrap(), 1);
}

#[test]
fn test_conditional_true_falls_through() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        .op(39) // SetVar v1 = 5
        .byte(1)
        .word(5)
        .op(5) // IfVarEq v1 == 5 -> true
        .byte(1)
        .word(5)
        .op(39) // SetVar v2 = 1 (executed)
        .byte(2)
        .word(1)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.variable(2).unwrap(), 1);
}

#[test]
fn test_wait_sync_resumes_on_signal() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let waiter = Asm::default()
        .op(16) // WaitSync 5
        .word(5)
        .op(39) // SetVar v9 = 1
        .byte(9)
        .word(1)
        .op(0)
        .bytes;
    let signaller = Asm::default().op(15).word(5).op(0).bytes;
    let zone = build_zone(cfg, &[(1, &waiter), (2, &signaller)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(4, zone)]);

    rt.attach_and_run(1, 4, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.wait_sync.len(), 1);
    assert_eq!(rt.variable(9).unwrap(), 0);

    rt.attach_and_run(2, 4, 0, 0, 0, 0).unwrap();
    // Fired out of the queue into the timer table at base delay.
    assert_eq!(rt.wait_sync.len(), 0);
    assert_eq!(rt.variable(9).unwrap(), 0);

    rt.pump_one_tick().unwrap();
    assert_eq!(rt.variable(9).unwrap(), 1);
}

#[test]
fn test_signal_wakes_every_waiter_on_same_ident() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let waiter_a = Asm::default()
        .op(16)
        .word(7)
        .op(40) // AddVar v9 += 1
        .byte(9)
        .word(1)
        .op(0)
        .bytes;
    let waiter_b = waiter_a.clone();
    let signaller = Asm::default().op(15).word(7).op(0).bytes;
    let zone = build_zone(cfg, &[(1, &waiter_a), (2, &waiter_b), (3, &signaller)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(4, zone)]);

    rt.attach_and_run(1, 4, 0, 0, 0, 0).unwrap();
    rt.attach_and_run(2, 4, 0, 0, 0, 0).unwrap();
    rt.attach_and_run(3, 4, 0, 0, 0, 0).unwrap();
    rt.pump_one_tick().unwrap();
    assert_eq!(rt.variable(9).unwrap(), 2);
}

#[test]
fn test_wait_end_resumes_when_sprite_halts() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let waiter = Asm::default()
        .op(28) // WaitEnd on sprite 2
        .word(2)
        .op(39)
        .byte(8)
        .word(1)
        .op(0)
        .bytes;
    let short_lived = Asm::default().op(25).bytes; // HaltSprite
    let zone = build_zone(cfg, &[(1, &waiter), (2, &short_lived)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(4, zone)]);

    rt.attach_and_run(1, 4, 0, 0, 0, 0).unwrap();
    rt.attach_and_run(2, 4, 0, 0, 0, 0).unwrap();
    assert!(rt.sprites().get(2, 4).is_none(), "halted sprite removed");
    rt.pump_one_tick().unwrap();
    assert_eq!(rt.variable(8).unwrap(), 1);
    assert!(rt.sprites().get(1, 4).is_some());
}

#[test]
fn test_on_stop_resumes_when_animation_stopped() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let watcher = Asm::default()
        .op(11) // OnStop ident 2
        .word(2)
        .op(39)
        .byte(7)
        .word(1)
        .op(0)
        .bytes;
    let idle = Asm::default()
        .op(12) // Delay forever-ish
        .word(1000)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &watcher), (2, &idle)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(4, zone)]);

    rt.attach_and_run(1, 4, 0, 0, 0, 0).unwrap();
    rt.attach_and_run(2, 4, 0, 0, 0, 0).unwrap();

    rt.stop_animation(2, 4).unwrap();
    assert!(rt.sprites().get(2, 4).is_none());
    // The stopped sprite's own pending resume is cancelled with it.
    assert!(rt.timers.live().iter().all(|e| e.sprite != 2));

    rt.pump_one_tick().unwrap();
    assert_eq!(rt.variable(7).unwrap(), 1);
}

#[test]
fn test_repeat_loop_counts_in_stream() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    // SetRepeat 3 / AddVar v1 += 1 / EndRepeat. The counter lives in the
    // instruction stream itself.
    let code = Asm::default()
        .op(20) // SetRepeat: count, then the in-stream counter slot
        .word(3)
        .word(0)
        .op(40) // AddVar v1 += 1
        .byte(1)
        .word(1)
        .op(21) // EndRepeat: distance back to the counter slot
        .word(9)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.variable(1).unwrap(), 3);
}

#[test]
fn test_call_script_returns_to_caller() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let main = Asm::default()
        .op(2) // CallScript 9
        .word(9)
        .op(39) // runs after the sub-script returns
        .byte(2)
        .word(20)
        .op(0)
        .bytes;
    let sub = Asm::default().op(39).byte(1).word(10).op(0).bytes;
    let zone = build_zone(cfg, &[(1, &main), (9, &sub)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.variable(1).unwrap(), 10);
    assert_eq!(rt.variable(2).unwrap(), 20);
}

#[test]
fn test_variable_indirection_window() {
    // Operand 60003 on this release reads variable 3 instead of a literal.
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        .op(39)
        .byte(3)
        .word(11)
        .op(13) // AddX var 3
        .word(60003)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 5, 0, 0).unwrap();
    assert_eq!(rt.sprites().get(1, 2).unwrap().x, 16);
}

#[test]
fn test_priority_orders_sprite_table() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let pri = |p: u8| Asm::default().op(23).byte(p).op(0).bytes;
    let (a, b, c) = (pri(30), pri(10), pri(20));
    let zone = build_zone(cfg, &[(1, &a), (2, &b), (3, &c)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(4, zone)]);

    rt.attach_and_run(1, 4, 0, 0, 0, 0).unwrap();
    rt.attach_and_run(2, 4, 0, 0, 0, 0).unwrap();
    rt.attach_and_run(3, 4, 0, 0, 0, 0).unwrap();

    let order: Vec<(u16, u8)> = rt
        .sprites()
        .live()
        .iter()
        .map(|s| (s.id, s.priority))
        .collect();
    assert_eq!(order, vec![(2, 10), (3, 20), (1, 30)]);
    assert_eq!(rt.sprites().raw()[3].id, 0, "sentinel at first free slot");
}

#[test]
fn test_unknown_opcode_is_fatal() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    // 58 is a hole on every release.
    let code = Asm::default().op(58).op(0).bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    let err = rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap_err();
    assert!(matches!(
        err,
        EngineError::UnknownOpcode {
            opcode: 58,
            zone: 2,
            ..
        }
    ));
}

#[test]
fn test_missing_animation_is_fatal() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let zone = build_zone(cfg, &[], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    let err = rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap_err();
    assert!(matches!(
        err,
        EngineError::MissingResource {
            kind: "animation",
            id: 1,
            zone: 2
        }
    ));
}

#[test]
fn test_duplicate_animate_ignored_on_late_release() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default().op(13).word(7).op(0).bytes; // AddX 7
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);

    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.sprites().get(1, 2).unwrap().x, 7);
    // Second animate for the same (id, zone) is a no-op here.
    rt.attach_and_run(1, 2, 0, 50, 0, 0).unwrap();
    assert_eq!(rt.sprites().len(), 1);
    assert_eq!(rt.sprites().get(1, 2).unwrap().x, 7);
}

#[test]
fn test_duplicate_animate_overwrites_on_early_release() {
    // Wide release: 16-bit big-endian opcodes, wide small operands.
    let cfg = VariantConfig::for_version(EngineVersion::V1);
    let code = Asm::default().opw(13).word(7).opw(0).bytes; // AddX 7
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V1, vec![(2, zone)]);

    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.sprites().get(1, 2).unwrap().x, 7);
    rt.attach_and_run(1, 2, 0, 50, 0, 0).unwrap();
    assert_eq!(rt.sprites().len(), 1);
    assert_eq!(rt.sprites().get(1, 2).unwrap().x, 57);
}

#[test]
fn test_wide_release_skip_lengths() {
    let cfg = VariantConfig::for_version(EngineVersion::V1);
    // IfVarEq (wide: var word + value word) fails and must skip the wide
    // MoveTo that follows.
    let code = Asm::default()
        .opw(5) // IfVarEq v1 == 9 -> false
        .word(1)
        .word(9)
        .opw(24) // MoveTo (6 operand bytes), skipped
        .word(111)
        .word(222)
        .word(333)
        .opw(13) // AddX 4
        .word(4)
        .opw(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V1, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    let s = rt.sprites().get(1, 2).unwrap();
    assert_eq!((s.x, s.y, s.image), (4, 0, 0));
}

#[test]
fn test_reset_all_clears_tables_and_keeps_heartbeat() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let waiter = Asm::default().op(16).word(5).op(39).byte(9).word(1).op(0).bytes;
    let sleeper = Asm::default().op(12).word(100).op(0).bytes;
    let zone = build_zone(cfg, &[(1, &waiter), (2, &sleeper)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(4, zone)]);

    rt.attach_and_run(1, 4, 0, 0, 0, 0).unwrap();
    rt.attach_and_run(2, 4, 0, 0, 0, 0).unwrap();
    rt.reset_all();

    assert_eq!(rt.sprites().len(), 0);
    assert_eq!(rt.wait_sync.len(), 0);
    assert_eq!(rt.timers.len(), 1);
    assert_eq!(rt.timers.live()[0].kind, TimerKind::Heartbeat);

    // Nothing resumes after the reset.
    for _ in 0..5 {
        rt.pump_one_tick().unwrap();
    }
    assert_eq!(rt.variable(9).unwrap(), 0);
}

#[test]
fn test_reset_from_inside_a_script() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    // The script resets the world and keeps executing.
    let code = Asm::default()
        .op(27) // ResetSprites
        .op(39)
        .byte(1)
        .word(1)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.variable(1).unwrap(), 1);
    assert_eq!(rt.sprites().len(), 0);
}

#[test]
fn test_run_image_script_maps_id_to_zone() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    // Image script 305 lives in zone 3 (ids group in blocks of 100).
    let code = Asm::default()
        .op(10) // Draw image 310 at (0, 0)
        .word(310)
        .byte(0)
        .word(0)
        .word(0)
        .byte(0)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(305, &code)], &[solid_8x8(310, 9)]);
    let mut rt = runtime(EngineVersion::V5, vec![(3, zone)]);

    rt.run_image_script(305).unwrap();
    assert_eq!(rt.surface().pixel(0, 0), 9);
    assert_eq!(rt.surface().pixel(7, 7), 9);
    assert!(rt.display.presents > 0);
}

#[test]
fn test_play_sound_delegates_to_hooks() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default().op(52).word(44).op(0).bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.hooks.sounds, vec![44]);
}

#[test]
fn test_planar_image_draw_uses_palette_bank() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        .op(10)
        .word(310)
        .byte(1) // palette bank 1
        .word(0)
        .word(0)
        .byte(0)
        .op(0)
        .bytes;
    // 16x1, four planes all set at bit 0: first pixel is nibble 0xF.
    let img = ImageSpec {
        id: 310,
        width: 16,
        height: 1,
        flags: IMG_PLANAR,
        colour_base: 0,
        data: vec![0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00],
    };
    let zone = build_zone(cfg, &[(1, &code)], &[img]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.surface().pixel(0, 0), 0x1F);
    assert_eq!(rt.surface().pixel(1, 0), 0x10);
}

#[test]
fn test_text_image_marks_ink_only() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        .op(10)
        .word(310)
        .byte(0)
        .word(0)
        .word(0)
        .byte(0)
        .op(0)
        .bytes;
    let img = ImageSpec {
        id: 310,
        width: 8,
        height: 1,
        flags: IMG_TEXT,
        colour_base: 5,
        data: vec![0xA0], // pixels 0 and 2
    };
    let zone = build_zone(cfg, &[(1, &code)], &[img]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.surface().pixel(0, 0), 5);
    assert_eq!(rt.surface().pixel(1, 0), 0);
    assert_eq!(rt.surface().pixel(2, 0), 5);
}

#[test]
fn test_masked_draw_honours_colour_key() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        // Paint the backdrop row, then the masked image over it.
        .op(10)
        .word(310)
        .byte(0)
        .word(0)
        .word(0)
        .byte(0)
        .op(10)
        .word(311)
        .byte(0)
        .word(0)
        .word(0)
        .byte(0)
        .op(0)
        .bytes;
    let backdrop = ImageSpec {
        id: 310,
        width: 8,
        height: 1,
        flags: 0,
        colour_base: 0,
        // Literal run: eight destination indices straddling the key range.
        data: vec![0xF8, 223, 224, 230, 254, 255, 0, 10, 240],
    };
    let masked = ImageSpec {
        id: 311,
        width: 8,
        height: 1,
        flags: IMG_MASKED,
        colour_base: 0,
        // Mask section first (all eight pixels opaque), then foreground.
        data: vec![0x00, 0xFF, 0x07, 5],
    };
    let zone = build_zone(cfg, &[(1, &code)], &[backdrop, masked]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();

    // This release only overwrites destinations inside 224..=254.
    let row: Vec<u8> = (0..8).map(|x| rt.surface().pixel(x, 0)).collect();
    assert_eq!(row, vec![223, 5, 5, 5, 255, 0, 10, 240]);
}

#[test]
fn test_panorama_draw_and_scroll() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    // 480x16 panorama: 60 vertical strips, each solid with its own index.
    let strips = 60u32;
    let mut data = Vec::new();
    for i in 0..strips {
        let off = strips * 4 + i * 2;
        data.extend_from_slice(&off.to_le_bytes());
    }
    for i in 0..strips {
        data.extend_from_slice(&[0x7F, i as u8]); // 128 px = one 8x16 strip
    }
    let pan = ImageSpec {
        id: 310,
        width: 480,
        height: 16,
        flags: IMG_PANORAMA,
        colour_base: 0,
        data,
    };
    let code = Asm::default()
        .op(10) // Draw the panorama
        .word(310)
        .byte(0)
        .word(0)
        .word(0)
        .byte(0)
        .op(53) // PanScrollH to x = 16
        .word(310)
        .word(16)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[pan]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);

    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.surface().pixel(0, 0), 0);
    assert_eq!(rt.surface().pixel(319, 0), 39);
    assert_eq!(rt.scroll_x, 0);

    rt.pump_one_tick().unwrap();
    assert_eq!(rt.scroll_x, 8);
    assert_eq!(rt.surface().pixel(0, 0), 1);
    assert_eq!(rt.surface().pixel(319, 0), 40);

    rt.pump_one_tick().unwrap();
    assert_eq!(rt.scroll_x, 16);
    assert_eq!(rt.surface().pixel(319, 0), 41);
    assert!(rt
        .timers
        .live()
        .iter()
        .all(|e| e.kind != TimerKind::ScrollStep));
}

#[test]
fn test_oversized_image_without_strip_table_is_malformed() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        .op(10)
        .word(310)
        .byte(0)
        .word(0)
        .word(0)
        .byte(0)
        .op(0)
        .bytes;
    let img = ImageSpec {
        id: 310,
        width: 480,
        height: 16,
        flags: 0, // wider than the screen but no panorama layout
        colour_base: 0,
        data: vec![0u8; 16],
    };
    let zone = build_zone(cfg, &[(1, &code)], &[img]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    let err = rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap_err();
    assert!(matches!(err, EngineError::MalformedZone { zone: 2, .. }));
}

#[test]
fn test_fast_fades_swing_the_palette() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    // Upload one bright entry, fade to black, fade back in.
    let code = Asm::default()
        .op(22) // SetPalette base 1, count 1, src 0
        .byte(1)
        .byte(1)
        .word(0)
        .op(62) // FastFadeOut
        .op(0)
        .bytes;
    let img = ImageSpec {
        id: 310,
        width: 0,
        height: 0,
        flags: 0,
        colour_base: 0,
        data: vec![63, 0, 63], // DAC triple
    };
    let zone = build_zone(cfg, &[(1, &code)], &[img]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();

    assert_eq!(rt.fade.level, 0);
    assert_eq!(rt.display.last_palette[1], Rgb::default());

    rt.begin_fade(crate::draw::FADE_MAX, 2);
    for _ in 0..8 {
        rt.pump_one_tick().unwrap();
    }
    assert_eq!(rt.fade.level, crate::draw::FADE_MAX);
    assert_eq!(rt.display.last_palette[1], Rgb { r: 255, g: 0, b: 255 });
}

#[test]
fn test_delay_if_silent_only_waits_during_sound() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let code = Asm::default()
        .op(42) // DelayIfSilent 3
        .word(3)
        .op(39)
        .byte(1)
        .word(1)
        .op(0)
        .bytes;
    let zone = build_zone(cfg, &[(1, &code)], &[]);

    // No sound playing: falls straight through.
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone.clone())]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.variable(1).unwrap(), 1);

    // Sound playing: suspends, resumes after the delay.
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.hooks.sound_playing = true;
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();
    assert_eq!(rt.variable(1).unwrap(), 0);
    for _ in 0..3 {
        rt.pump_one_tick().unwrap();
    }
    assert_eq!(rt.variable(1).unwrap(), 1);
}

#[test]
fn test_stop_sprite_opcode_stops_other_sprite() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let sleeper = Asm::default().op(12).word(100).op(0).bytes;
    let killer = Asm::default().op(60).word(1).word(4).op(0).bytes;
    let zone = build_zone(cfg, &[(1, &sleeper), (2, &killer)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(4, zone)]);

    rt.attach_and_run(1, 4, 0, 0, 0, 0).unwrap();
    assert!(rt.sprites().get(1, 4).is_some());
    rt.attach_and_run(2, 4, 0, 0, 0, 0).unwrap();
    assert!(rt.sprites().get(1, 4).is_none());
    assert!(rt.timers.live().iter().all(|e| e.sprite != 1));
}

#[test]
fn test_debug_state_snapshot() {
    let cfg = VariantConfig::for_version(EngineVersion::V5);
    let sleeper = Asm::default().op(12).word(10).op(0).bytes;
    let zone = build_zone(cfg, &[(1, &sleeper)], &[]);
    let mut rt = runtime(EngineVersion::V5, vec![(2, zone)]);
    rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap();

    let state = rt.debug_state();
    assert_eq!(state["version"], "V5");
    assert_eq!(state["sprites"], 1);
    assert_eq!(state["zones_loaded"], 1);
    assert_eq!(state["timers"], 2); // heartbeat + suspended script
    assert_eq!(state["parked"], true);
}

#[test]
fn test_thirty_two_colour_image_rejected_on_four_plane_release() {
    let cfg = VariantConfig::for_version(EngineVersion::V4);
    let code = Asm::default()
        .op(10)
        .word(310)
        .byte(0)
        .word(0)
        .word(0)
        .byte(0)
        .op(0)
        .bytes;
    let img = ImageSpec {
        id: 310,
        width: 16,
        height: 1,
        flags: IMG_PLANAR | IMG_32C,
        colour_base: 0,
        data: vec![0u8; 10],
    };
    let zone = build_zone(cfg, &[(1, &code)], &[img]);
    let mut rt = runtime(EngineVersion::V4, vec![(2, zone)]);
    let err = rt.attach_and_run(1, 2, 0, 0, 0, 0).unwrap_err();
    assert!(matches!(err, EngineError::MalformedZone { .. }));
}
