//! Glyph outlines and the process wide outline cache.

use crate::geom::Matrix;
use once_cell::sync::Lazy;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tiny_skia::Path;

/// A positioned glyph, `x`/`y` in user space.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Glyph {
    pub index: u32,
    pub x: f64,
    pub y: f64,
}

/// Font at a fixed size, the outline source for [`Glyph`]s.
pub trait ScaledFont: fmt::Debug {
    /// Fonts with the same id produce the same outlines.
    fn id(&self) -> u64;

    /// Outline of glyph `index` in glyph space, `None` for blank glyphs.
    fn glyph_path(&self, index: u32) -> Option<Path>;

    /// Glyph space to user space.
    fn font_matrix(&self) -> Matrix;
}

type Key = (u64, u32);

/// Outline cache keyed by font id and glyph index.
///
/// The lock covers lookup and insert only. Outlines are produced with the
/// lock released, so a font may itself use the cache.
pub struct GlyphCache {
    entries: Mutex<HashMap<Key, Option<Arc<Path>>, ahash::RandomState>>,
}

static GLOBAL: Lazy<GlyphCache> = Lazy::new(GlyphCache::new);

impl GlyphCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::default()),
        }
    }

    pub fn global() -> &'static GlyphCache {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Option<Arc<Path>>, ahash::RandomState>> {
        // entries are inserted whole, a panic elsewhere leaves them valid
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn outline(&self, font: &dyn ScaledFont, index: u32) -> Option<Arc<Path>> {
        let key = (font.id(), index);
        let hit = self.lock().get(&key).cloned();
        if let Some(outline) = hit {
            return outline;
        }
        let outline = font.glyph_path(index).map(Arc::new);
        // another caller may have raced us here, keep the first entry
        self.lock().entry(key).or_insert(outline).clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for GlyphCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GlyphCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphCache")
            .field("len", &self.len())
            .finish()
    }
}
