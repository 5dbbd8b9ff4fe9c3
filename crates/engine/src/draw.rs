//! The draw pipeline: image decode, clipping, compositing, palette upload,
//! fades and panorama scrolling.
//!
//! Every draw call builds a short-lived [`DrawRequest`], decodes the image
//! through `vga_core::codec`, clips it against the target window, and
//! composites the visible rectangle into the surface under a
//! [`vga_core::SurfaceLock`]. The lock is taken before any clipping
//! decision so that every exit path — including a fully clipped-out draw —
//! ends with a present.
//!
//! Path selection follows the image, not the caller: dimensions beyond the
//! screen select the panorama machinery, a mask section selects masked
//! compositing (with the release's colour-key rule, when it has one), a
//! 32-colour flag selects the five-plane decoder.

use vga_core::codec::{self, MaskKind, STRIP_SIZE};
use vga_core::logging::{log, LogCategory, LogLevel};
use vga_core::{DisplaySink, Rect, Rgb, SurfaceLock};

use crate::error::EngineError;
use crate::sprite::Sprite;
use crate::timer::TimerKind;
use crate::variant::VariantConfig;
use crate::zone::{
    ImageEntry, Zone, ZoneLoader, IMG_32C, IMG_MASKED, IMG_PANORAMA, IMG_PLANAR, IMG_TEXT,
};
use crate::{GameHooks, VgaRuntime, NUM_WINDOWS};

/// Sprite/draw flag: colour 0 is transparent.
pub(crate) const SPR_TRANSPARENT: u16 = 0x0001;

/// Fade levels run 0 (black) to this (full brightness).
pub(crate) const FADE_MAX: u8 = 16;

/// A numbered sub-window. Window 0 is the full sprite area and starts
/// enabled; the rest are configured by scripts.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WindowState {
    pub rect: Rect,
    pub enabled: bool,
}

/// Palette fade in flight. `level` approaches `target` by `step` per tick.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fade {
    pub level: u8,
    pub target: u8,
    pub step: u8,
}

impl Fade {
    pub fn new() -> Self {
        Self {
            level: FADE_MAX,
            target: FADE_MAX,
            step: 0,
        }
    }
}

/// An in-flight panorama scroll.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScrollState {
    pub zone: u16,
    pub image: u16,
    pub vertical: bool,
    pub target: u16,
}

/// The short-lived per-draw record: where the pixels come from, how much
/// of them survives clipping, and where they land.
#[derive(Debug, Clone, Copy)]
struct DrawRequest {
    /// Visible size after clipping.
    width: usize,
    height: usize,
    /// Source skip counts (left columns / top rows clipped away).
    src_x: usize,
    src_y: usize,
    /// Destination on the surface.
    dst_x: usize,
    dst_y: usize,
    flags: u16,
}

/// Clip an image against a window rectangle and the surface bounds.
/// Returns `None` when nothing survives.
#[allow(clippy::too_many_arguments)]
fn clip_request(
    w: usize,
    h: usize,
    x: i32,
    y: i32,
    clip: (u16, u16),
    win: &WindowState,
    surface_w: usize,
    surface_h: usize,
    flags: u16,
) -> Option<DrawRequest> {
    if !win.enabled {
        return None;
    }
    let win_x0 = (win.rect.x.max(0) as i32).min(surface_w as i32);
    let win_y0 = (win.rect.y.max(0) as i32).min(surface_h as i32);
    let win_x1 = win.rect.right().min(surface_w as i32);
    let win_y1 = win.rect.bottom().min(surface_h as i32);

    let mut src_x = clip.0 as i32;
    let mut src_y = clip.1 as i32;
    let mut out_x = x;
    let mut out_y = y;
    let mut vis_w = w as i32 - src_x;
    let mut vis_h = h as i32 - src_y;
    if out_x < win_x0 {
        src_x += win_x0 - out_x;
        vis_w -= win_x0 - out_x;
        out_x = win_x0;
    }
    if out_y < win_y0 {
        src_y += win_y0 - out_y;
        vis_h -= win_y0 - out_y;
        out_y = win_y0;
    }
    vis_w = vis_w.min(win_x1 - out_x);
    vis_h = vis_h.min(win_y1 - out_y);
    if vis_w <= 0 || vis_h <= 0 {
        return None;
    }
    Some(DrawRequest {
        width: vis_w as usize,
        height: vis_h as usize,
        src_x: src_x as usize,
        src_y: src_y as usize,
        dst_x: out_x as usize,
        dst_y: out_y as usize,
        flags,
    })
}

/// Decode an image into one colour index per pixel, plus its mask section
/// when it carries one. The mask is run-length encoded ahead of the
/// foreground data; its consumed length locates the foreground stream.
fn decode_image(
    cfg: &VariantConfig,
    zone: &Zone,
    entry: &ImageEntry,
    palette: u8,
) -> Result<(Vec<u8>, Option<(Vec<u8>, MaskKind)>), EngineError> {
    let data = zone.pixel_data(entry);
    let w = entry.width as usize;
    let h = entry.height as usize;

    let mut consumed = 0;
    let mask = if entry.flags & IMG_MASKED != 0 {
        let kind = if entry.flags & IMG_32C != 0 {
            MaskKind::Nibbles
        } else {
            MaskKind::Bits
        };
        let stride = kind.bytes_for(w, 1);
        let mut m = vec![0u8; kind.bytes_for(w, h)];
        consumed = codec::decode_columns(data, stride, h, &mut m)?;
        Some((m, kind))
    } else {
        None
    };
    let body = &data[consumed..];

    let chunky = if entry.flags & IMG_TEXT != 0 {
        let mut px = vec![0u8; w * h];
        codec::text_plane_to_bytes(body, w, h, &mut px)?;
        // The marker only flags coverage; ink lands at the colour base.
        for p in &mut px {
            if *p != 0 {
                *p = entry.colour_base as u8;
            }
        }
        px
    } else if entry.flags & IMG_32C != 0 {
        if cfg.planes != 5 {
            return Err(EngineError::MalformedZone {
                zone: zone.number,
                reason: "32-colour image on a 4-plane release".to_string(),
            });
        }
        let mut px = vec![0u8; w * h];
        codec::planes_to_bytes(body, w, h, &mut px)?;
        for p in &mut px {
            *p = p.wrapping_add(entry.colour_base as u8);
        }
        px
    } else if entry.flags & IMG_PLANAR != 0 {
        let mut nibbles = vec![0u8; w.div_ceil(2) * h];
        codec::planes_to_nibbles(body, w, h, &mut nibbles)?;
        // Unpack under the 16-colour bank the draw selected.
        let bank = palette << 4;
        let mut px = vec![0u8; w * h];
        for (i, p) in px.iter_mut().enumerate() {
            let byte = nibbles[i / 2];
            let v = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
            *p = bank | v;
        }
        px
    } else {
        let mut px = vec![0u8; w * h];
        codec::decode_columns(body, w, h, &mut px)?;
        px
    };
    Ok((chunky, mask))
}

/// Decode one strip of a panorama image.
fn decode_strip(
    cfg: &VariantConfig,
    zone: &Zone,
    entry: &ImageEntry,
    strip: usize,
    vertical: bool,
) -> Result<Vec<u8>, EngineError> {
    let data = zone.pixel_data(entry);
    if vertical {
        let w = entry.width as usize;
        let strips = entry.height as usize / STRIP_SIZE;
        let mut buf = vec![0u8; w * STRIP_SIZE];
        codec::decode_hstrip(data, cfg.endian, strip, strips, w, &mut buf)?;
        Ok(buf)
    } else {
        let h = entry.height as usize;
        let strips = entry.width as usize / STRIP_SIZE;
        let mut buf = vec![0u8; STRIP_SIZE * h];
        codec::decode_vstrip(data, cfg.endian, strip, strips, h, &mut buf)?;
        Ok(buf)
    }
}

impl<Z: ZoneLoader, H: GameHooks, D: DisplaySink> VgaRuntime<Z, H, D> {
    /// The draw opcode body: look the image up, pick a path, paint.
    pub(crate) fn draw_op(
        &mut self,
        image: u16,
        palette: u8,
        x: i16,
        y: i16,
        flags: u16,
    ) -> Result<(), EngineError> {
        let zone = self.ctx.zone;
        let entry = *self
            .zone_ref(zone)?
            .image(image)
            .ok_or(EngineError::MissingResource {
                kind: "image",
                id: image,
                zone,
            })?;
        if entry.width == 0 || entry.height == 0 {
            return Ok(());
        }
        if entry.width > self.cfg.screen_width {
            return self.begin_panorama(zone, &entry, false);
        }
        if entry.height > self.cfg.screen_height {
            return self.begin_panorama(zone, &entry, true);
        }
        let (sprite_flags, window) = match self.sprites.get(self.ctx.sprite, self.ctx.zone) {
            Some(s) => (s.flags, s.window),
            None => (0, self.active_window),
        };
        let scale = self.coord_scale.max(1) as i32;
        let sx = x as i32 / scale - self.scroll_x as i32;
        let sy = y as i32 / scale - self.scroll_y as i32;
        log(LogCategory::Draw, LogLevel::Debug, || {
            format!(
                "draw image {} ({}x{}) at ({}, {}) flags {:#06x}",
                image, entry.width, entry.height, sx, sy, flags
            )
        });
        self.render_image(zone, &entry, palette, sx, sy, flags | sprite_flags, window as usize)
    }

    /// Repaint every live sprite in priority order; driven by the
    /// heartbeat timer entry.
    pub(crate) fn animate_all(&mut self) -> Result<(), EngineError> {
        let sprites: Vec<Sprite> = self.sprites.live().to_vec();
        for s in sprites {
            if s.image == 0 {
                continue;
            }
            let entry =
                *self
                    .zone_ref(s.zone)?
                    .image(s.image)
                    .ok_or(EngineError::MissingResource {
                        kind: "image",
                        id: s.image,
                        zone: s.zone,
                    })?;
            if entry.width > self.cfg.screen_width || entry.height > self.cfg.screen_height {
                continue; // panoramas never hang off sprites
            }
            let scale = self.coord_scale.max(1) as i32;
            let sx = s.x as i32 / scale - self.scroll_x as i32;
            let sy = s.y as i32 / scale - self.scroll_y as i32;
            self.render_image(s.zone, &entry, s.palette, sx, sy, s.flags, s.window as usize)?;
        }
        Ok(())
    }

    /// Decode, clip and composite one image. The surface lock spans the
    /// whole operation, so a clipped-out draw still presents on return.
    pub(crate) fn render_image(
        &mut self,
        zone: u16,
        entry: &ImageEntry,
        palette: u8,
        x: i32,
        y: i32,
        flags: u16,
        window: usize,
    ) -> Result<(), EngineError> {
        if window >= NUM_WINDOWS {
            return Err(EngineError::IndexOutOfRange {
                what: "window",
                index: window,
            });
        }
        let win = self.windows[window];
        let clip = self.pending_clip;
        self.pending_clip = (0, 0);
        let cfg = self.cfg;

        let mut lock = SurfaceLock::new(&mut self.surface, &mut self.display);
        let Some(req) = clip_request(
            entry.width as usize,
            entry.height as usize,
            x,
            y,
            clip,
            &win,
            lock.width(),
            lock.height(),
            flags,
        ) else {
            return Ok(());
        };

        let z = self
            .zones
            .get(&zone)
            .ok_or(EngineError::ZoneNotLoaded { zone })?;
        let (chunky, mask) = decode_image(cfg, z, entry, palette)?;
        let full_w = entry.width as usize;

        // Re-pack the visible rectangle: foreground rows, and a bit mask
        // covering exactly the visible pixels.
        let mut fg = vec![0u8; req.width * req.height];
        for row in 0..req.height {
            let src = (req.src_y + row) * full_w + req.src_x;
            fg[row * req.width..(row + 1) * req.width]
                .copy_from_slice(&chunky[src..src + req.width]);
        }
        let bits_stride = req.width.div_ceil(8);
        let mut bits = vec![0u8; bits_stride * req.height];
        for row in 0..req.height {
            for col in 0..req.width {
                let opaque = match &mask {
                    Some((m, kind)) => {
                        kind.opaque_at(m, full_w, req.src_x + col, req.src_y + row)
                    }
                    None if req.flags & SPR_TRANSPARENT != 0 => fg[row * req.width + col] != 0,
                    None => true,
                };
                if opaque {
                    bits[row * bits_stride + col / 8] |= 0x80 >> (col % 8);
                }
            }
        }
        let key = if mask.is_some() { cfg.masked_key } else { None };

        let Some((dst, stride)) = lock.from_mut(req.dst_x, req.dst_y) else {
            return Ok(());
        };
        codec::composite(
            &fg,
            &bits,
            MaskKind::Bits,
            req.width,
            req.height,
            dst,
            stride,
            key,
        )?;
        Ok(())
    }

    /// Fill a sub-window with one colour.
    pub(crate) fn clear_window(&mut self, window: usize, colour: u8) -> Result<(), EngineError> {
        if window >= NUM_WINDOWS {
            return Err(EngineError::IndexOutOfRange {
                what: "window",
                index: window,
            });
        }
        let win = self.windows[window];
        let mut lock = SurfaceLock::new(&mut self.surface, &mut self.display);
        if win.enabled {
            lock.fill_rect(win.rect, colour);
        }
        Ok(())
    }

    /// Draw an image at a window's origin, clipped to that window.
    pub(crate) fn draw_window_image(
        &mut self,
        image: u16,
        window: usize,
    ) -> Result<(), EngineError> {
        if window >= NUM_WINDOWS {
            return Err(EngineError::IndexOutOfRange {
                what: "window",
                index: window,
            });
        }
        let zone = self.ctx.zone;
        let entry = *self
            .zone_ref(zone)?
            .image(image)
            .ok_or(EngineError::MissingResource {
                kind: "image",
                id: image,
                zone,
            })?;
        let rect = self.windows[window].rect;
        self.render_image(zone, &entry, 0, rect.x as i32, rect.y as i32, 0, window)
    }

    // ---- palette and fades --------------------------------------------

    /// Copy `count` colour triples from the zone's pixel data into the
    /// display palette, scaling each 6-bit component up to 8 bits.
    pub(crate) fn upload_palette(
        &mut self,
        base: usize,
        count: usize,
        src: usize,
    ) -> Result<(), EngineError> {
        if base + count > self.palette.len() {
            return Err(EngineError::IndexOutOfRange {
                what: "palette",
                index: base + count,
            });
        }
        let zone = self.ctx.zone;
        let z = self.zone_ref(zone)?;
        let bytes = z
            .pixels
            .get(src..src + count * 3)
            .ok_or_else(|| EngineError::MalformedZone {
                zone,
                reason: "palette block outside pixel data".to_string(),
            })?
            .to_vec();
        for i in 0..count {
            self.palette[base + i] =
                Rgb::from_dac(bytes[i * 3], bytes[i * 3 + 1], bytes[i * 3 + 2]);
        }
        log(LogCategory::Draw, LogLevel::Debug, || {
            format!("palette upload: {} entries at {}", count, base)
        });
        self.apply_palette();
        Ok(())
    }

    /// Push the palette to the sink at the current fade level.
    pub(crate) fn apply_palette(&mut self) {
        let level = self.fade.level;
        let mut faded = [Rgb::default(); 256];
        for (out, c) in faded.iter_mut().zip(self.palette.iter()) {
            *out = c.faded(level, FADE_MAX);
        }
        self.display.update_palette(0, &faded);
    }

    /// Begin a stepped fade toward `target`.
    pub(crate) fn begin_fade(&mut self, target: u8, step: u8) {
        self.fade.target = target;
        self.fade.step = step.max(1);
    }

    /// Jump straight to a fade level.
    pub(crate) fn snap_fade(&mut self, level: u8) {
        self.fade.level = level;
        self.fade.target = level;
        self.apply_palette();
    }

    /// Advance an in-flight fade by one tick.
    pub(crate) fn step_fade(&mut self) {
        if self.fade.level == self.fade.target {
            return;
        }
        let step = self.fade.step.max(1);
        self.fade.level = if self.fade.level < self.fade.target {
            (self.fade.level + step).min(self.fade.target)
        } else {
            self.fade.level.saturating_sub(step).max(self.fade.target)
        };
        self.apply_palette();
    }

    // ---- panorama scrolling -------------------------------------------

    /// First draw of a panorama image: validate it, reset the scroll
    /// origin and paint the initial screenful of strips.
    pub(crate) fn begin_panorama(
        &mut self,
        zone: u16,
        entry: &ImageEntry,
        vertical: bool,
    ) -> Result<(), EngineError> {
        let malformed = |reason: &str| EngineError::MalformedZone {
            zone,
            reason: reason.to_string(),
        };
        if entry.flags & IMG_PANORAMA == 0 {
            return Err(malformed("oversized image without panorama layout"));
        }
        if entry.width % STRIP_SIZE as u16 != 0 || entry.height % STRIP_SIZE as u16 != 0 {
            return Err(malformed("panorama dimensions not strip-aligned"));
        }
        if !vertical && entry.width > self.cfg.pan_width_limit {
            return Err(malformed("panorama wider than the release limit"));
        }
        if vertical && entry.height > self.cfg.pan_height_limit {
            return Err(malformed("panorama taller than the release limit"));
        }
        log(LogCategory::Draw, LogLevel::Info, || {
            format!(
                "panorama image {} ({}x{}), {}",
                entry.id,
                entry.width,
                entry.height,
                if vertical { "vertical" } else { "horizontal" }
            )
        });
        self.scroll = Some(ScrollState {
            zone,
            image: entry.id,
            vertical,
            target: 0,
        });
        self.scroll_x = 0;
        self.scroll_y = 0;

        let visible = if vertical {
            (self.cfg.screen_height as usize / STRIP_SIZE).min(entry.height as usize / STRIP_SIZE)
        } else {
            (self.cfg.screen_width as usize / STRIP_SIZE).min(entry.width as usize / STRIP_SIZE)
        };
        for strip in 0..visible {
            self.paint_strip(zone, entry, strip, strip, vertical, 0)?;
        }
        Ok(())
    }

    /// Scroll opcode body: aim the in-flight panorama at a new target
    /// offset and start stepping toward it.
    pub(crate) fn start_scroll(
        &mut self,
        image: u16,
        vertical: bool,
        target: u16,
    ) -> Result<(), EngineError> {
        let zone = self.ctx.zone;
        let entry = *self
            .zone_ref(zone)?
            .image(image)
            .ok_or(EngineError::MissingResource {
                kind: "image",
                id: image,
                zone,
            })?;
        let needs_init = match self.scroll {
            Some(s) => s.image != image || s.zone != zone || s.vertical != vertical,
            None => true,
        };
        if needs_init {
            self.begin_panorama(zone, &entry, vertical)?;
        }
        let max = if vertical {
            entry.height.saturating_sub(self.cfg.screen_height)
        } else {
            entry.width.saturating_sub(self.cfg.screen_width)
        };
        let target = (target.min(max)) & !(STRIP_SIZE as u16 - 1);
        if let Some(s) = self.scroll.as_mut() {
            s.target = target;
        }
        self.timers.cancel_scroll();
        let moving = if vertical {
            self.scroll_y != target
        } else {
            self.scroll_x != target
        };
        if moving {
            self.timers
                .schedule(1, TimerKind::ScrollStep, 0, 0, zone)?;
        }
        Ok(())
    }

    /// Centre the horizontal panorama view on an x position.
    pub(crate) fn centre_scroll(&mut self, x: u16) -> Result<(), EngineError> {
        let Some(s) = self.scroll else {
            return Ok(());
        };
        let half = self.cfg.screen_width / 2;
        let ctx_zone = self.ctx.zone;
        // Centre against the scroll's own image, whatever zone we run in.
        self.ctx.zone = s.zone;
        let result = self.start_scroll(s.image, s.vertical, x.saturating_sub(half));
        self.ctx.zone = ctx_zone;
        result
    }

    /// One scroll-step timer fire: move the view one strip toward the
    /// target, decode the strip entering the window, and re-arm if the
    /// target is still ahead.
    pub(crate) fn scroll_step(&mut self) -> Result<(), EngineError> {
        let Some(s) = self.scroll else {
            return Ok(());
        };
        let entry = *self
            .zone_ref(s.zone)?
            .image(s.image)
            .ok_or(EngineError::MissingResource {
                kind: "image",
                id: s.image,
                zone: s.zone,
            })?;
        let step = STRIP_SIZE as u16;
        let (pos, screen) = if s.vertical {
            (self.scroll_y, self.cfg.screen_height)
        } else {
            (self.scroll_x, self.cfg.screen_width)
        };
        if pos == s.target {
            return Ok(());
        }
        let forward = s.target > pos;
        let new = if forward { pos + step } else { pos - step };

        // Which strip enters the view, and which screen slot it fills.
        let (strip, slot) = if forward {
            (
                (new + screen) as usize / STRIP_SIZE - 1,
                screen as usize / STRIP_SIZE - 1,
            )
        } else {
            (new as usize / STRIP_SIZE, 0)
        };
        let shift = if forward {
            STRIP_SIZE as isize
        } else {
            -(STRIP_SIZE as isize)
        };
        self.paint_strip(s.zone, &entry, strip, slot, s.vertical, shift)?;

        if s.vertical {
            self.scroll_y = new;
        } else {
            self.scroll_x = new;
        }
        if new != s.target {
            self.timers
                .schedule(1, TimerKind::ScrollStep, 0, 0, s.zone)?;
        }
        Ok(())
    }

    /// Decode one strip and write it into a screen slot, optionally
    /// shifting the surface first. One lock scope covers the shift and the
    /// write.
    fn paint_strip(
        &mut self,
        zone: u16,
        entry: &ImageEntry,
        strip: usize,
        slot: usize,
        vertical: bool,
        shift: isize,
    ) -> Result<(), EngineError> {
        let cfg = self.cfg;
        let mut lock = SurfaceLock::new(&mut self.surface, &mut self.display);
        let z = self
            .zones
            .get(&zone)
            .ok_or(EngineError::ZoneNotLoaded { zone })?;
        let buf = decode_strip(cfg, z, entry, strip, vertical)?;
        if shift != 0 {
            if vertical {
                lock.shift_vertical(shift);
            } else {
                lock.shift_horizontal(shift);
            }
        }
        let sw = lock.width();
        let sh = lock.height();
        if vertical {
            let w = (entry.width as usize).min(sw);
            let y0 = slot * STRIP_SIZE;
            for row in 0..STRIP_SIZE {
                let y = y0 + row;
                if y >= sh {
                    break;
                }
                let dst = &mut lock.pixels_mut()[y * sw..y * sw + w];
                dst.copy_from_slice(&buf[row * entry.width as usize..][..w]);
            }
        } else {
            let x0 = slot * STRIP_SIZE;
            let rows = (entry.height as usize).min(sh);
            for row in 0..rows {
                let dst = &mut lock.pixels_mut()[row * sw + x0..row * sw + x0 + STRIP_SIZE];
                dst.copy_from_slice(&buf[row * STRIP_SIZE..(row + 1) * STRIP_SIZE]);
            }
        }
        Ok(())
    }
}
