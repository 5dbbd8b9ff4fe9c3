//! Per-release variant configuration.
//!
//! Six releases share this interpreter. Instead of branching on a game
//! identity inside handlers, everything release-specific is collected once
//! into a [`VariantConfig`] value: opcode width, zone byte order, image
//! offset width, colour depth, screen geometry and panorama bounds, the
//! variable-indirection base, and the two per-release tables — opcode
//! number to handler, and opcode number to operand byte length. The length
//! table drives the conditional-skip algorithm and must match what each
//! handler actually consumes, opcode by opcode; the tables differ across
//! releases, so each release carries its own copy.
//!
//! Slots a release never shipped are `None` and fatal when fetched. The
//! numeric thresholds (30000/60000 indirection bases, panorama limits) are
//! opaque per-release constants carried verbatim.

use serde::Serialize;
use vga_core::bytes::Endian;

/// One of the six engine releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EngineVersion {
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

/// Tagged opcode handler, resolved at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VgaOp {
    End,
    FadeOut,
    CallScript,
    NewSprite,
    FadeIn,
    IfVarEq,
    IfObjectHere,
    IfObjectGone,
    IfVarNe,
    IfVarLt,
    Draw,
    OnStop,
    Delay,
    AddX,
    AddY,
    Signal,
    WaitSync,
    SetClip,
    Jump,
    ChainScript,
    SetRepeat,
    EndRepeat,
    SetPalette,
    SetPriority,
    MoveTo,
    HaltSprite,
    SetWindow,
    ResetSprites,
    WaitEnd,
    StopAllSounds,
    SetFrameRate,
    SetWindowNum,
    CopyVar,
    PointerOn,
    PointerOff,
    ClearWindow,
    SetWindowImage,
    AddYIndirect,
    IfVarZero,
    SetVar,
    AddVar,
    SubVar,
    DelayIfSilent,
    IfBitSet,
    IfBitClear,
    SetXIndirect,
    SetYIndirect,
    AddVarIndirect,
    SetImage,
    SetBit,
    ClearBit,
    EnableWindow,
    PlaySound,
    PanScrollH,
    PanScrollV,
    SetSpriteFlags,
    DelayLong,
    BlackPalette,
    IfSoundPlaying,
    StopSprite,
    AttachScript,
    FastFadeOut,
    FastFadeIn,
    IfVarGt,
    SlowFadeIn,
    IfLongVarEq,
    IfLongVarNe,
    CentreScroll,
    PlayTrack,
    QueueTrack,
    IfTrackDone,
    SetMark,
    ClearMark,
    SetScale,
}

/// Everything the interpreter needs to know about one release, built once
/// at startup and consulted read-only.
pub struct VariantConfig {
    pub version: EngineVersion,
    /// Opcodes are big-endian 16-bit words instead of single bytes.
    pub wide_opcodes: bool,
    /// Byte order of zone table integers. Script operands are always
    /// big-endian; only the zone tables switched byte order.
    pub endian: Endian,
    /// Image pixel offsets are 32-bit in the zone image table.
    pub long_image_offsets: bool,
    /// Colour depth in bit planes (4 or 5).
    pub planes: u8,
    pub screen_width: u16,
    pub screen_height: u16,
    /// Height of the default sprite window.
    pub window_height: u16,
    /// Widest panorama this release ships; an image wider than the screen
    /// but within this bound scrolls horizontally, anything wider is
    /// malformed.
    pub pan_width_limit: u16,
    /// Tallest panorama this release ships.
    pub pan_height_limit: u16,
    /// Operand values at or above this are variable references.
    pub var_base: u16,
    /// The two earliest releases overwrite an existing (id, zone) sprite;
    /// everything later ignores the duplicate animate call.
    pub allow_duplicate_sprites: bool,
    /// Masked composites only overwrite destination indices inside this
    /// range when set.
    pub masked_key: Option<(u8, u8)>,
    /// Script coordinates are divided by this before hitting the surface.
    pub coord_scale: u8,
    /// Opcode number to handler; `None` slots are fatal.
    pub dispatch: &'static [Option<VgaOp>],
    /// Opcode number to operand byte length, for the conditional skip.
    pub operand_len: &'static [u8],
}

impl VariantConfig {
    pub fn for_version(version: EngineVersion) -> &'static VariantConfig {
        match version {
            EngineVersion::V1 => &V1,
            EngineVersion::V2 => &V2,
            EngineVersion::V3 => &V3,
            EngineVersion::V4 => &V4,
            EngineVersion::V5 => &V5,
            EngineVersion::V6 => &V6,
        }
    }

    /// Handler for an opcode number, if this release ships it.
    pub fn lookup(&self, opcode: u16) -> Option<VgaOp> {
        self.dispatch.get(opcode as usize).copied().flatten()
    }
}

static V1: VariantConfig = VariantConfig {
    version: EngineVersion::V1,
    wide_opcodes: true,
    endian: Endian::Big,
    long_image_offsets: false,
    planes: 4,
    screen_width: 320,
    screen_height: 200,
    window_height: 200,
    pan_width_limit: 320,
    pan_height_limit: 200,
    var_base: 30000,
    allow_duplicate_sprites: true,
    masked_key: None,
    coord_scale: 1,
    dispatch: &DISPATCH_V1,
    operand_len: &LEN_V1,
};

static V2: VariantConfig = VariantConfig {
    version: EngineVersion::V2,
    wide_opcodes: true,
    endian: Endian::Big,
    long_image_offsets: false,
    planes: 4,
    screen_width: 320,
    screen_height: 200,
    window_height: 200,
    pan_width_limit: 320,
    pan_height_limit: 200,
    var_base: 30000,
    allow_duplicate_sprites: true,
    masked_key: None,
    coord_scale: 1,
    dispatch: &DISPATCH_V2,
    operand_len: &LEN_V2,
};

static V3: VariantConfig = VariantConfig {
    version: EngineVersion::V3,
    wide_opcodes: true,
    endian: Endian::Big,
    long_image_offsets: true,
    planes: 4,
    screen_width: 320,
    screen_height: 200,
    window_height: 200,
    pan_width_limit: 320,
    pan_height_limit: 200,
    var_base: 30000,
    allow_duplicate_sprites: false,
    masked_key: None,
    coord_scale: 1,
    dispatch: &DISPATCH_V3,
    operand_len: &LEN_V3,
};

static V4: VariantConfig = VariantConfig {
    version: EngineVersion::V4,
    wide_opcodes: false,
    endian: Endian::Little,
    long_image_offsets: true,
    planes: 4,
    screen_width: 320,
    screen_height: 200,
    window_height: 200,
    pan_width_limit: 320,
    pan_height_limit: 200,
    var_base: 30000,
    allow_duplicate_sprites: false,
    masked_key: None,
    coord_scale: 1,
    dispatch: &DISPATCH_V4,
    operand_len: &LEN_V4,
};

static V5: VariantConfig = VariantConfig {
    version: EngineVersion::V5,
    wide_opcodes: false,
    endian: Endian::Little,
    long_image_offsets: true,
    planes: 5,
    screen_width: 320,
    screen_height: 200,
    window_height: 200,
    pan_width_limit: 624,
    pan_height_limit: 200,
    var_base: 60000,
    allow_duplicate_sprites: false,
    masked_key: Some((224, 254)),
    coord_scale: 1,
    dispatch: &DISPATCH_V5,
    operand_len: &LEN_V5,
};

static V6: VariantConfig = VariantConfig {
    version: EngineVersion::V6,
    wide_opcodes: false,
    endian: Endian::Little,
    long_image_offsets: true,
    planes: 5,
    screen_width: 320,
    screen_height: 200,
    window_height: 134,
    pan_width_limit: 624,
    pan_height_limit: 480,
    var_base: 60000,
    allow_duplicate_sprites: false,
    masked_key: None,
    coord_scale: 2,
    dispatch: &DISPATCH_V6,
    operand_len: &LEN_V6,
};

use VgaOp as Op;

static DISPATCH_V1: [Option<VgaOp>; 32] = [
    Some(Op::End),
    Some(Op::FadeOut),
    Some(Op::CallScript),
    Some(Op::NewSprite),
    Some(Op::FadeIn),
    Some(Op::IfVarEq),
    None, // 6
    None, // 7
    Some(Op::IfVarNe),
    Some(Op::IfVarLt),
    Some(Op::Draw),
    None, // 11
    Some(Op::Delay),
    Some(Op::AddX),
    Some(Op::AddY),
    Some(Op::Signal),
    Some(Op::WaitSync),
    None, // 17
    Some(Op::Jump),
    None, // 19
    Some(Op::SetRepeat),
    Some(Op::EndRepeat),
    Some(Op::SetPalette),
    Some(Op::SetPriority),
    Some(Op::MoveTo),
    Some(Op::HaltSprite),
    Some(Op::SetWindow),
    Some(Op::ResetSprites),
    None, // 28
    None, // 29
    None, // 30
    Some(Op::SetWindowNum),
];

static DISPATCH_V2: [Option<VgaOp>; 52] = [
    Some(Op::End),
    Some(Op::FadeOut),
    Some(Op::CallScript),
    Some(Op::NewSprite),
    Some(Op::FadeIn),
    Some(Op::IfVarEq),
    Some(Op::IfObjectHere),
    Some(Op::IfObjectGone),
    Some(Op::IfVarNe),
    Some(Op::IfVarLt),
    Some(Op::Draw),
    Some(Op::OnStop),
    Some(Op::Delay),
    Some(Op::AddX),
    Some(Op::AddY),
    Some(Op::Signal),
    Some(Op::WaitSync),
    None, // 17
    Some(Op::Jump),
    Some(Op::ChainScript),
    Some(Op::SetRepeat),
    Some(Op::EndRepeat),
    Some(Op::SetPalette),
    Some(Op::SetPriority),
    Some(Op::MoveTo),
    Some(Op::HaltSprite),
    Some(Op::SetWindow),
    Some(Op::ResetSprites),
    Some(Op::WaitEnd),
    Some(Op::StopAllSounds),
    Some(Op::SetFrameRate),
    Some(Op::SetWindowNum),
    Some(Op::CopyVar),
    Some(Op::PointerOn),
    Some(Op::PointerOff),
    Some(Op::ClearWindow),
    Some(Op::SetWindowImage),
    Some(Op::AddYIndirect),
    Some(Op::IfVarZero),
    Some(Op::SetVar),
    Some(Op::AddVar),
    Some(Op::SubVar),
    None, // 42
    Some(Op::IfBitSet),
    Some(Op::IfBitClear),
    Some(Op::SetXIndirect),
    Some(Op::SetYIndirect),
    None, // 47
    Some(Op::SetImage),
    Some(Op::SetBit),
    Some(Op::ClearBit),
    Some(Op::EnableWindow),
];

static DISPATCH_V3: [Option<VgaOp>; 52] = [
    Some(Op::End),
    Some(Op::FadeOut),
    Some(Op::CallScript),
    Some(Op::NewSprite),
    Some(Op::FadeIn),
    Some(Op::IfVarEq),
    Some(Op::IfObjectHere),
    Some(Op::IfObjectGone),
    Some(Op::IfVarNe),
    Some(Op::IfVarLt),
    Some(Op::Draw),
    Some(Op::OnStop),
    Some(Op::Delay),
    Some(Op::AddX),
    Some(Op::AddY),
    Some(Op::Signal),
    Some(Op::WaitSync),
    None, // 17
    Some(Op::Jump),
    Some(Op::ChainScript),
    Some(Op::SetRepeat),
    Some(Op::EndRepeat),
    Some(Op::SetPalette),
    Some(Op::SetPriority),
    Some(Op::MoveTo),
    Some(Op::HaltSprite),
    Some(Op::SetWindow),
    Some(Op::ResetSprites),
    Some(Op::WaitEnd),
    Some(Op::StopAllSounds),
    Some(Op::SetFrameRate),
    Some(Op::SetWindowNum),
    Some(Op::CopyVar),
    Some(Op::PointerOn),
    Some(Op::PointerOff),
    Some(Op::ClearWindow),
    Some(Op::SetWindowImage),
    Some(Op::AddYIndirect),
    Some(Op::IfVarZero),
    Some(Op::SetVar),
    Some(Op::AddVar),
    Some(Op::SubVar),
    None, // 42
    Some(Op::IfBitSet),
    Some(Op::IfBitClear),
    Some(Op::SetXIndirect),
    Some(Op::SetYIndirect),
    Some(Op::AddVarIndirect),
    Some(Op::SetImage),
    Some(Op::SetBit),
    Some(Op::ClearBit),
    Some(Op::EnableWindow),
];

static DISPATCH_V4: [Option<VgaOp>; 64] = [
    Some(Op::End),
    Some(Op::FadeOut),
    Some(Op::CallScript),
    Some(Op::NewSprite),
    Some(Op::FadeIn),
    Some(Op::IfVarEq),
    Some(Op::IfObjectHere),
    Some(Op::IfObjectGone),
    Some(Op::IfVarNe),
    Some(Op::IfVarLt),
    Some(Op::Draw),
    Some(Op::OnStop),
    Some(Op::Delay),
    Some(Op::AddX),
    Some(Op::AddY),
    Some(Op::Signal),
    Some(Op::WaitSync),
    Some(Op::SetClip),
    Some(Op::Jump),
    Some(Op::ChainScript),
    Some(Op::SetRepeat),
    Some(Op::EndRepeat),
    Some(Op::SetPalette),
    Some(Op::SetPriority),
    Some(Op::MoveTo),
    Some(Op::HaltSprite),
    Some(Op::SetWindow),
    Some(Op::ResetSprites),
    Some(Op::WaitEnd),
    Some(Op::StopAllSounds),
    Some(Op::SetFrameRate),
    Some(Op::SetWindowNum),
    Some(Op::CopyVar),
    Some(Op::PointerOn),
    Some(Op::PointerOff),
    Some(Op::ClearWindow),
    Some(Op::SetWindowImage),
    Some(Op::AddYIndirect),
    Some(Op::IfVarZero),
    Some(Op::SetVar),
    Some(Op::AddVar),
    Some(Op::SubVar),
    Some(Op::DelayIfSilent),
    Some(Op::IfBitSet),
    Some(Op::IfBitClear),
    Some(Op::SetXIndirect),
    Some(Op::SetYIndirect),
    Some(Op::AddVarIndirect),
    Some(Op::SetImage),
    Some(Op::SetBit),
    Some(Op::ClearBit),
    Some(Op::EnableWindow),
    Some(Op::PlaySound),
    Some(Op::PanScrollH),
    Some(Op::PanScrollV),
    Some(Op::SetSpriteFlags),
    Some(Op::DelayLong),
    Some(Op::BlackPalette),
    None, // 58
    None, // 59
    Some(Op::StopSprite),
    Some(Op::AttachScript),
    Some(Op::FastFadeOut),
    Some(Op::FastFadeIn),
];

static DISPATCH_V5: [Option<VgaOp>; 64] = [
    Some(Op::End),
    Some(Op::FadeOut),
    Some(Op::CallScript),
    Some(Op::NewSprite),
    Some(Op::FadeIn),
    Some(Op::IfVarEq),
    Some(Op::IfObjectHere),
    Some(Op::IfObjectGone),
    Some(Op::IfVarNe),
    Some(Op::IfVarLt),
    Some(Op::Draw),
    Some(Op::OnStop),
    Some(Op::Delay),
    Some(Op::AddX),
    Some(Op::AddY),
    Some(Op::Signal),
    Some(Op::WaitSync),
    Some(Op::SetClip),
    Some(Op::Jump),
    Some(Op::ChainScript),
    Some(Op::SetRepeat),
    Some(Op::EndRepeat),
    Some(Op::SetPalette),
    Some(Op::SetPriority),
    Some(Op::MoveTo),
    Some(Op::HaltSprite),
    Some(Op::SetWindow),
    Some(Op::ResetSprites),
    Some(Op::WaitEnd),
    Some(Op::StopAllSounds),
    Some(Op::SetFrameRate),
    Some(Op::SetWindowNum),
    Some(Op::CopyVar),
    Some(Op::PointerOn),
    Some(Op::PointerOff),
    Some(Op::ClearWindow),
    Some(Op::SetWindowImage),
    Some(Op::AddYIndirect),
    Some(Op::IfVarZero),
    Some(Op::SetVar),
    Some(Op::AddVar),
    Some(Op::SubVar),
    Some(Op::DelayIfSilent),
    Some(Op::IfBitSet),
    Some(Op::IfBitClear),
    Some(Op::SetXIndirect),
    Some(Op::SetYIndirect),
    Some(Op::AddVarIndirect),
    Some(Op::SetImage),
    Some(Op::SetBit),
    Some(Op::ClearBit),
    Some(Op::EnableWindow),
    Some(Op::PlaySound),
    Some(Op::PanScrollH),
    Some(Op::PanScrollV),
    Some(Op::SetSpriteFlags),
    Some(Op::DelayLong),
    Some(Op::BlackPalette),
    None, // 58
    Some(Op::IfSoundPlaying),
    Some(Op::StopSprite),
    Some(Op::AttachScript),
    Some(Op::FastFadeOut),
    Some(Op::FastFadeIn),
];

static DISPATCH_V6: [Option<VgaOp>; 75] = [
    Some(Op::End),
    Some(Op::FadeOut),
    Some(Op::CallScript),
    Some(Op::NewSprite),
    Some(Op::FadeIn),
    Some(Op::IfVarEq),
    Some(Op::IfObjectHere),
    Some(Op::IfObjectGone),
    Some(Op::IfVarNe),
    Some(Op::IfVarLt),
    Some(Op::Draw),
    Some(Op::OnStop),
    Some(Op::Delay),
    Some(Op::AddX),
    Some(Op::AddY),
    Some(Op::Signal),
    Some(Op::WaitSync),
    Some(Op::SetClip),
    Some(Op::Jump),
    Some(Op::ChainScript),
    Some(Op::SetRepeat),
    Some(Op::EndRepeat),
    Some(Op::SetPalette),
    Some(Op::SetPriority),
    Some(Op::MoveTo),
    Some(Op::HaltSprite),
    Some(Op::SetWindow),
    Some(Op::ResetSprites),
    Some(Op::WaitEnd),
    Some(Op::StopAllSounds),
    Some(Op::SetFrameRate),
    Some(Op::SetWindowNum),
    Some(Op::CopyVar),
    Some(Op::PointerOn),
    Some(Op::PointerOff),
    Some(Op::ClearWindow),
    Some(Op::SetWindowImage),
    Some(Op::AddYIndirect),
    Some(Op::IfVarZero),
    Some(Op::SetVar),
    Some(Op::AddVar),
    Some(Op::SubVar),
    Some(Op::DelayIfSilent),
    Some(Op::IfBitSet),
    Some(Op::IfBitClear),
    Some(Op::SetXIndirect),
    Some(Op::SetYIndirect),
    Some(Op::AddVarIndirect),
    Some(Op::SetImage),
    Some(Op::SetBit),
    Some(Op::ClearBit),
    Some(Op::EnableWindow),
    Some(Op::PlaySound),
    Some(Op::PanScrollH),
    Some(Op::PanScrollV),
    Some(Op::SetSpriteFlags),
    Some(Op::DelayLong),
    Some(Op::BlackPalette),
    None, // 58
    Some(Op::IfSoundPlaying),
    Some(Op::StopSprite),
    Some(Op::AttachScript),
    Some(Op::FastFadeOut),
    Some(Op::FastFadeIn),
    Some(Op::IfVarGt),
    Some(Op::SlowFadeIn),
    Some(Op::IfLongVarEq),
    Some(Op::IfLongVarNe),
    Some(Op::CentreScroll),
    Some(Op::PlayTrack),
    Some(Op::QueueTrack),
    Some(Op::IfTrackDone),
    Some(Op::SetMark),
    Some(Op::ClearMark),
    Some(Op::SetScale),
];

// Operand byte lengths per opcode. Wide releases read every small operand
// as a 16-bit word, so their lengths differ from the narrow releases
// opcode by opcode. Hole slots carry 0 and are never consulted: the skip
// routine rejects them through the dispatch table first.

#[rustfmt::skip]
static LEN_V1: [u8; 32] = [
    0, 0, 2, 10, 0, 4, 0, 0,
    4, 4, 10, 0, 2, 2, 2, 2,
    2, 0, 2, 0, 4, 2, 6, 2,
    6, 0, 8, 0, 0, 0, 0, 2,
];

#[rustfmt::skip]
static LEN_V2: [u8; 52] = [
    0, 0, 2, 10, 0, 4, 2, 2,
    4, 4, 10, 2, 2, 2, 2, 2,
    2, 0, 2, 2, 4, 2, 6, 2,
    6, 0, 8, 0, 2, 0, 2, 2,
    4, 0, 0, 4, 4, 2, 2, 4,
    4, 4, 0, 2, 2, 2, 2, 0,
    2, 2, 2, 2,
];

#[rustfmt::skip]
static LEN_V3: [u8; 52] = [
    0, 0, 2, 10, 0, 4, 2, 2,
    4, 4, 10, 2, 2, 2, 2, 2,
    2, 0, 2, 2, 4, 2, 6, 2,
    6, 0, 8, 0, 2, 0, 2, 2,
    4, 0, 0, 4, 4, 2, 2, 4,
    4, 4, 0, 2, 2, 2, 2, 4,
    2, 2, 2, 2,
];

#[rustfmt::skip]
static LEN_V4: [u8; 64] = [
    0, 0, 2, 9, 0, 3, 2, 2,
    3, 3, 8, 2, 2, 2, 2, 2,
    2, 4, 2, 2, 4, 2, 4, 1,
    6, 0, 8, 0, 2, 0, 1, 1,
    2, 0, 0, 2, 3, 1, 1, 3,
    3, 3, 2, 2, 2, 1, 1, 2,
    2, 2, 2, 1, 2, 4, 4, 2,
    2, 0, 0, 0, 4, 4, 0, 0,
];

#[rustfmt::skip]
static LEN_V5: [u8; 64] = [
    0, 0, 2, 9, 0, 3, 2, 2,
    3, 3, 8, 2, 2, 2, 2, 2,
    2, 4, 2, 2, 4, 2, 4, 1,
    6, 0, 8, 0, 2, 0, 1, 1,
    2, 0, 0, 2, 3, 1, 1, 3,
    3, 3, 2, 2, 2, 1, 1, 2,
    2, 2, 2, 1, 2, 4, 4, 2,
    2, 0, 0, 0, 4, 4, 0, 0,
];

#[rustfmt::skip]
static LEN_V6: [u8; 75] = [
    0, 0, 2, 9, 0, 3, 2, 2,
    3, 3, 8, 2, 2, 2, 2, 2,
    2, 4, 2, 2, 4, 2, 4, 1,
    6, 0, 8, 0, 2, 0, 1, 1,
    2, 0, 0, 2, 3, 1, 1, 3,
    3, 3, 2, 2, 2, 1, 1, 2,
    2, 2, 2, 1, 2, 4, 4, 2,
    2, 0, 0, 0, 4, 4, 0, 0,
    3, 0, 2, 2, 2, 2, 2, 0,
    1, 1, 1,
];

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EngineVersion; 6] = [
        EngineVersion::V1,
        EngineVersion::V2,
        EngineVersion::V3,
        EngineVersion::V4,
        EngineVersion::V5,
        EngineVersion::V6,
    ];

    #[test]
    fn test_for_version_round_trips() {
        for v in ALL {
            assert_eq!(VariantConfig::for_version(v).version, v);
        }
    }

    #[test]
    fn test_tables_are_same_length() {
        for v in ALL {
            let cfg = VariantConfig::for_version(v);
            assert_eq!(
                cfg.dispatch.len(),
                cfg.operand_len.len(),
                "dispatch/length mismatch for {:?}",
                v
            );
        }
    }

    #[test]
    fn test_every_release_has_end_at_zero() {
        for v in ALL {
            assert_eq!(VariantConfig::for_version(v).lookup(0), Some(VgaOp::End));
        }
    }

    #[test]
    fn test_table_sizes_per_release() {
        let sizes: Vec<usize> = ALL
            .iter()
            .map(|&v| VariantConfig::for_version(v).dispatch.len())
            .collect();
        assert_eq!(sizes, vec![32, 52, 52, 64, 64, 75]);
    }

    #[test]
    fn test_holes() {
        let v1 = VariantConfig::for_version(EngineVersion::V1);
        for hole in [6, 7, 11, 17, 19, 28, 29, 30] {
            assert_eq!(v1.lookup(hole), None, "V1 opcode {}", hole);
        }
        let v2 = VariantConfig::for_version(EngineVersion::V2);
        assert_eq!(v2.lookup(47), None);
        let v3 = VariantConfig::for_version(EngineVersion::V3);
        assert_eq!(v3.lookup(47), Some(VgaOp::AddVarIndirect));
        let v4 = VariantConfig::for_version(EngineVersion::V4);
        assert_eq!(v4.lookup(59), None);
        let v5 = VariantConfig::for_version(EngineVersion::V5);
        assert_eq!(v5.lookup(59), Some(VgaOp::IfSoundPlaying));
        for v in ALL {
            let cfg = VariantConfig::for_version(v);
            if cfg.dispatch.len() > 58 {
                assert_eq!(cfg.lookup(58), None, "58 is a hole everywhere");
            }
        }
    }

    #[test]
    fn test_out_of_range_opcode_is_unknown() {
        for v in ALL {
            let cfg = VariantConfig::for_version(v);
            assert_eq!(cfg.lookup(cfg.dispatch.len() as u16), None);
            assert_eq!(cfg.lookup(0xFFFF), None);
        }
    }

    #[test]
    fn test_wide_releases_use_wide_operand_lengths() {
        // Draw: image u16 + pal + x vw + y vw + flags.
        assert_eq!(LEN_V1[10], 10);
        assert_eq!(LEN_V4[10], 8);
        // SetPriority: one small operand.
        assert_eq!(LEN_V2[23], 2);
        assert_eq!(LEN_V5[23], 1);
    }

    #[test]
    fn test_v6_extension_lengths() {
        assert_eq!(LEN_V6[64], 3); // IfVarGt
        assert_eq!(LEN_V6[71], 0); // IfTrackDone
        assert_eq!(LEN_V6[74], 1); // SetScale
    }
}
