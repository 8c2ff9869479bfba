#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod request;
pub mod text_metrics;
pub mod theme;
pub mod threshold;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, OutputFormat, RenderConfig, load_config};
pub use dispatch::{ArtifactSink, FileSink, Manifest, MemorySink, dispatch, render_chart};
pub use error::{ChartError, Result};
pub use layout::{Layout, compute_layout};
pub use render::render_svg;
pub use request::{ChartKind, ChartRequest, StageCounts};
pub use theme::Theme;
pub use threshold::{InsufficientData, ThresholdDetector, ThresholdResult};
