//! Server-side SVG rendering seam.
//!
//! Rendering is optional: a pipeline without a renderer produces chart
//! URLs only, and tiles degrade per-tile when rendering fails.

use crate::chart::ChartData;
use crate::config::TileConfig;
use futures::future::BoxFuture;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("rendering failed: {0}")]
    Failed(String),
    #[error("unsupported tile type for rendering: {0}")]
    Unsupported(String),
}

/// Renders normalized chart data to an SVG document.
///
/// Implementations may shell out to a headless renderer or draw
/// directly; the pipeline only requires the future to resolve to a
/// complete `<svg>` string.
pub trait SvgRenderer: Send + Sync {
    fn render(&self, tile: &TileConfig, chart: &ChartData) -> BoxFuture<'static, Result<String, RenderError>>;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Renderer returning a fixed document, or an error when `fail` is
    /// set.
    pub struct MockRenderer {
        pub svg: String,
        pub fail: bool,
    }

    impl Default for MockRenderer {
        fn default() -> Self {
            Self {
                svg: "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>".to_string(),
                fail: false,
            }
        }
    }

    impl SvgRenderer for MockRenderer {
        fn render(
            &self,
            _tile: &TileConfig,
            _chart: &ChartData,
        ) -> BoxFuture<'static, Result<String, RenderError>> {
            let result = if self.fail {
                Err(RenderError::Failed("mock failure".to_string()))
            } else {
                Ok(self.svg.clone())
            };
            Box::pin(async move { result })
        }
    }
}
