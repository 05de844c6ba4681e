//! Streaming runtime.
//!
//! [`TileStreamer`] is the application context that ties a
//! [`TileController`](crate::controller::TileController) to a
//! [`MapDataLoader`](crate::pipeline::MapDataLoader). Loading runs on the
//! tokio runtime; the results reach the render thread as [`RenderCommand`]s.
//!
//! ```text
//! TileController ──TileEvent──► TileStreamer ──spawn──► MapDataLoader
//!                                     │                      │
//!                                     ▼                      ▼
//!                        mpsc<RenderCommand> ◄──── MapData ──┘
//!                                     │
//!                                     ▼
//!                      drain_into(&mut dyn RenderSink)  (render thread)
//! ```

mod render;
mod streamer;

pub use render::{drain_into, RenderCommand, RenderSink};
pub use streamer::TileStreamer;
