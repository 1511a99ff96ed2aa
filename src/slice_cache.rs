use image::RgbaImage;
use tracing::debug;

use crate::contrast::Lut;
use crate::enums::View;
use crate::error::Result;
use crate::services::ImageQuery;

/// Handle for one outstanding raster fetch. Only the ticket of the latest
/// request of a view can land its raster.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterTicket {
    pub generation: u64,
    pub query: ImageQuery,
}

impl RasterTicket {
    pub fn view(&self) -> View {
        self.query.view
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer request was issued for the view after this one.
    Stale,
}

#[derive(Clone, Debug, Default)]
struct CacheEntry {
    pending: Option<u64>,
    loaded: Option<ImageQuery>,
    /// Raster exactly as delivered by the image service.
    original: Option<RgbaImage>,
    /// `original` passed through the current LUT.
    display: Option<RgbaImage>,
}

/// Last loaded raster per view, plus the LUT-processed surface drawn on screen.
#[derive(Clone, Debug, Default)]
pub struct SliceCache {
    entries: [CacheEntry; 3],
    next_generation: u64,
}

impl SliceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fetch for `query`, superseding any outstanding one of the same view.
    pub fn begin(&mut self, query: ImageQuery) -> RasterTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries[query.view.index()].pending = Some(generation);
        RasterTicket { generation, query }
    }

    /// Land a fetched raster. Stale tickets are dropped without decoding. A
    /// payload that fails to decode leaves the ticket outstanding for [`SliceCache::fail`].
    pub fn complete(&mut self, ticket: &RasterTicket, bytes: &[u8], lut: &Lut) -> Result<LoadOutcome> {
        let entry = &mut self.entries[ticket.view().index()];
        if entry.pending != Some(ticket.generation) {
            debug!(
                view = %ticket.view(),
                layer = ticket.query.layer,
                generation = ticket.generation,
                "discarding stale raster"
            );
            return Ok(LoadOutcome::Stale);
        }
        let original = image::load_from_memory(bytes)?.to_rgba8();
        entry.pending = None;
        let display = lut.apply(&original);
        entry.original = Some(original);
        entry.display = Some(display);
        entry.loaded = Some(ticket.query.clone());
        Ok(LoadOutcome::Applied)
    }

    /// Forget a failed fetch so the view can be requested again. Returns
    /// whether the ticket was still the view's latest request.
    pub fn fail(&mut self, ticket: &RasterTicket) -> bool {
        let entry = &mut self.entries[ticket.view().index()];
        if entry.pending != Some(ticket.generation) {
            return false;
        }
        entry.pending = None;
        true
    }

    /// Re-derive every display surface from its original raster. No fetch involved.
    pub fn apply_lut(&mut self, lut: &Lut) {
        for entry in &mut self.entries {
            if let (Some(original), Some(display)) = (&entry.original, &mut entry.display) {
                lut.apply_into(original, display);
            }
        }
    }

    pub fn display(&self, view: View) -> Option<&RgbaImage> {
        self.entries[view.index()].display.as_ref()
    }

    pub fn original(&self, view: View) -> Option<&RgbaImage> {
        self.entries[view.index()].original.as_ref()
    }

    pub fn loaded_query(&self, view: View) -> Option<&ImageQuery> {
        self.entries[view.index()].loaded.as_ref()
    }

    /// Natural size of the loaded raster, which is also the internal drawing size.
    pub fn dimensions(&self, view: View) -> Option<(u32, u32)> {
        self.original(view).map(|raster| raster.dimensions())
    }

    pub fn is_pending(&self, view: View) -> bool {
        self.entries[view.index()].pending.is_some()
    }
}
