//! Bitmap glyph atlases to TrueType outline fonts.
//!
//! Masks are split into filled regions and holes, traced along pixel corners, simplified,
//! transformed per style and collected in a [`GlyphRegistry`] that is then assembled into one
//! font per [`StyleVariant`].

pub mod assemble;
pub mod legacy;
pub mod mask;
pub mod names;
pub mod outline;
pub mod provider;
pub mod region;
pub mod registry;
pub mod style;
pub mod trace;
pub mod unihex;

pub use assemble::{FontAsset, FontInfo, assemble, write_family};
pub use mask::{BitmapMask, Rect};
pub use names::GlyphNames;
pub use outline::{Extent, Outline, Transform, vectorize};
pub use provider::{ResourceId, ResourceRoot};
pub use registry::{CharacterKey, GlyphEntry, GlyphRegistry};
pub use style::StyleVariant;

pub const UNITS_PER_EM: u16 = 1200;

/// Source rasters are nominally 12 pixels to the em.
pub const PIXEL_SCALE: f64 = UNITS_PER_EM as f64 / 12.0;

pub const ASCENT: i16 = (UNITS_PER_EM * 9 / 12) as i16;
pub const DESCENT: i16 = (UNITS_PER_EM * 2 / 12) as i16;
pub const CAP_HEIGHT: i16 = (UNITS_PER_EM * 7 / 12) as i16;
pub const X_HEIGHT: i16 = (UNITS_PER_EM * 5 / 12) as i16;
