//! Zone resources: parsed animation and image tables over the two opaque
//! byte buffers a zone ships as.
//!
//! The loading collaborator hands the runtime a script/metadata buffer and
//! a pixel-data buffer; everything else — decompression, file names,
//! catalogs — stays on its side of the seam. The script buffer opens with
//! the animation table (sprite id to script offset) followed by the image
//! table (image id to pixel offset, dimensions, flags, colour base). Table
//! integers use the release's byte order and image offsets are 16-bit on
//! the earliest releases, so parsing is driven by the variant
//! configuration. The runtime keeps its own copy of the script buffer
//! because repeat loops store their counters in the instruction stream.

use vga_core::bytes::ByteReader;
use vga_core::logging::{log, LogCategory, LogLevel};

use crate::error::EngineError;
use crate::variant::VariantConfig;

/// Image is bit-plane encoded; unset means run-length.
pub const IMG_PLANAR: u16 = 0x0001;
/// Mask data precedes the foreground data.
pub const IMG_MASKED: u16 = 0x0002;
/// Five-plane, 32-colour image (releases with `planes == 5` only).
pub const IMG_32C: u16 = 0x0004;
/// Panorama layout: pixel data starts with a strip offset table.
pub const IMG_PANORAMA: u16 = 0x0008;
/// One-plane text-mode image.
pub const IMG_TEXT: u16 = 0x0010;

/// One image table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageEntry {
    pub id: u16,
    pub pixel_offset: u32,
    pub width: u16,
    pub height: u16,
    pub flags: u16,
    pub colour_base: u16,
}

#[derive(Debug, Clone, Copy)]
struct AnimEntry {
    id: u16,
    code_offset: u16,
}

/// A loaded, parsed zone.
#[derive(Debug)]
pub struct Zone {
    pub number: u16,
    /// Private mutable copy of the script buffer; repeat counters write
    /// into it.
    pub script: Vec<u8>,
    pub pixels: Vec<u8>,
    anims: Vec<AnimEntry>,
    images: Vec<ImageEntry>,
}

impl Zone {
    pub fn parse(
        number: u16,
        script: Vec<u8>,
        pixels: Vec<u8>,
        cfg: &VariantConfig,
    ) -> Result<Self, EngineError> {
        let malformed = |reason: &str| EngineError::MalformedZone {
            zone: number,
            reason: reason.to_string(),
        };

        let mut r = ByteReader::new(&script, cfg.endian);
        let anim_count = r.read_u16().map_err(|_| malformed("missing anim count"))?;
        let mut anims = Vec::with_capacity(anim_count as usize);
        for _ in 0..anim_count {
            let id = r.read_u16().map_err(|_| malformed("truncated anim table"))?;
            let code_offset = r.read_u16().map_err(|_| malformed("truncated anim table"))?;
            if (code_offset as usize) >= script.len() {
                return Err(malformed("anim offset outside script"));
            }
            anims.push(AnimEntry { id, code_offset });
        }

        let image_count = r.read_u16().map_err(|_| malformed("missing image count"))?;
        let mut images = Vec::with_capacity(image_count as usize);
        for _ in 0..image_count {
            let id = r.read_u16().map_err(|_| malformed("truncated image table"))?;
            let pixel_offset = if cfg.long_image_offsets {
                r.read_u32().map_err(|_| malformed("truncated image table"))?
            } else {
                r.read_u16().map_err(|_| malformed("truncated image table"))? as u32
            };
            let width = r.read_u16().map_err(|_| malformed("truncated image table"))?;
            let height = r.read_u16().map_err(|_| malformed("truncated image table"))?;
            let flags = r.read_u16().map_err(|_| malformed("truncated image table"))?;
            let colour_base = r.read_u16().map_err(|_| malformed("truncated image table"))?;
            if width > 0 && height > 0 && (pixel_offset as usize) >= pixels.len() {
                return Err(malformed("image offset outside pixel data"));
            }
            images.push(ImageEntry {
                id,
                pixel_offset,
                width,
                height,
                flags,
                colour_base,
            });
        }

        log(LogCategory::Zone, LogLevel::Info, || {
            format!(
                "zone {}: {} animations, {} images, {} script bytes",
                number,
                anims.len(),
                images.len(),
                script.len()
            )
        });

        Ok(Self {
            number,
            script,
            pixels,
            anims,
            images,
        })
    }

    /// Script offset of an animation, by sprite/script id.
    pub fn anim_offset(&self, id: u16) -> Option<u32> {
        self.anims
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.code_offset as u32)
    }

    pub fn image(&self, id: u16) -> Option<&ImageEntry> {
        self.images.iter().find(|i| i.id == id)
    }

    /// Pixel data from an image's offset to the end of the buffer; the
    /// decoders consume what they need.
    pub fn pixel_data(&self, entry: &ImageEntry) -> &[u8] {
        &self.pixels[entry.pixel_offset as usize..]
    }
}

/// Loading collaborator: produces the two raw byte buffers for a zone.
/// File formats, decompression and catalogs live behind this seam.
pub trait ZoneLoader {
    fn load_zone(&mut self, zone: u16) -> Result<(Vec<u8>, Vec<u8>), EngineError>;
}
