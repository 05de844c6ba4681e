//! Hand-off to the render thread.
//!
//! The render collaborator is not thread-safe. Everything it needs to know
//! arrives as a [`RenderCommand`] on one channel, drained from the thread
//! that owns the scene.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::coord::QuadKey;
use crate::pipeline::{LoadSummary, MapData, PipelineError};
use crate::tile::Tile;

/// Instruction for the render collaborator.
#[derive(Debug)]
pub enum RenderCommand {
    /// A tile entered the loaded set; data for it follows.
    Activate(Arc<Tile>),
    Data { tile: Arc<Tile>, data: MapData },
    Completed { tile: Arc<Tile>, summary: LoadSummary },
    Failed { quadkey: QuadKey, error: PipelineError },
    /// A tile left the loaded set. Its render state should be released.
    Deactivate(Arc<Tile>),
}

impl RenderCommand {
    pub fn quadkey(&self) -> QuadKey {
        match self {
            Self::Activate(tile)
            | Self::Data { tile, .. }
            | Self::Completed { tile, .. }
            | Self::Deactivate(tile) => *tile.quadkey(),
            Self::Failed { quadkey, .. } => *quadkey,
        }
    }

    /// Calls the matching method on `sink`.
    pub fn dispatch(self, sink: &mut dyn RenderSink) {
        match self {
            Self::Activate(tile) => sink.activate(&tile),
            Self::Data { tile, data } => sink.render(&tile, data),
            Self::Completed { tile, summary } => sink.completed(&tile, &summary),
            Self::Failed { quadkey, error } => sink.failed(&quadkey, &error),
            Self::Deactivate(tile) => sink.deactivate(&tile),
        }
    }
}

/// Render-side receiver of [`RenderCommand`]s.
pub trait RenderSink {
    fn activate(&mut self, _tile: &Arc<Tile>) {}

    fn render(&mut self, tile: &Arc<Tile>, data: MapData);

    fn completed(&mut self, _tile: &Arc<Tile>, _summary: &LoadSummary) {}

    fn failed(&mut self, _quadkey: &QuadKey, _error: &PipelineError) {}

    fn deactivate(&mut self, _tile: &Arc<Tile>) {}
}

/// Dispatches every command already queued on `rx` without waiting.
///
/// Meant to be called once per frame. Returns the number dispatched.
pub fn drain_into(rx: &mut mpsc::UnboundedReceiver<RenderCommand>, sink: &mut dyn RenderSink) -> usize {
    let mut count = 0;
    while let Ok(command) = rx.try_recv() {
        command.dispatch(sink);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GeoCoordinate;
    use crate::pipeline::{Element, MapData};
    use crate::projection::{CartesianProjection, Projection};
    use crate::tile::{ElementRegistry, Stylesheet};
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl RenderSink for Recorder {
        fn activate(&mut self, tile: &Arc<Tile>) {
            self.calls.push(format!("activate {}", tile.quadkey()));
        }

        fn render(&mut self, tile: &Arc<Tile>, data: MapData) {
            let kind = match data {
                MapData::Element(_) => "element",
                MapData::Mesh(_) => "mesh",
            };
            self.calls.push(format!("{} {}", kind, tile.quadkey()));
        }

        fn failed(&mut self, quadkey: &QuadKey, _error: &PipelineError) {
            self.calls.push(format!("failed {}", quadkey));
        }
    }

    fn tile() -> Arc<Tile> {
        let projection: Arc<dyn Projection> =
            Arc::new(CartesianProjection::new(GeoCoordinate::new(0.0, 0.0)));
        Arc::new(Tile::new(
            QuadKey::new(1, 0, 1),
            Stylesheet::new("default.mapcss"),
            projection,
            Arc::new(ElementRegistry::new()),
        ))
    }

    #[test]
    fn test_drain_dispatches_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tile = tile();
        tx.send(RenderCommand::Activate(Arc::clone(&tile))).unwrap();
        tx.send(RenderCommand::Data {
            tile: Arc::clone(&tile),
            data: MapData::Element(Element {
                id: 1,
                geometry: vec![],
                heights: vec![],
                tags: HashMap::new(),
                styles: HashMap::new(),
            }),
        })
        .unwrap();
        tx.send(RenderCommand::Failed {
            quadkey: QuadKey::new(1, 0, 1),
            error: PipelineError::Cancelled,
        })
        .unwrap();
        // Default no-op
        tx.send(RenderCommand::Deactivate(tile)).unwrap();

        let mut sink = Recorder::default();
        assert_eq!(drain_into(&mut rx, &mut sink), 4);
        assert_eq!(sink.calls, vec!["activate 1", "element 1", "failed 1"]);
        assert_eq!(drain_into(&mut rx, &mut sink), 0);
    }
}
