//! Satellite tile retrieval.

use super::coord::TileCoord;
use crate::bbox::BoundingBox;
use crate::config::TileConfig;
use crate::error::CorpusError;
use async_trait::async_trait;
use image::RgbImage;
use std::time::Duration;

/// Something that can produce an RGB raster for a bounding box.
///
/// Failures are reported as `None`; implementations log the cause and never
/// propagate it.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch_image(&self, bbox: &BoundingBox, zoom: u8) -> Option<RgbImage>;
}

/// Fetches the single tile containing a bbox's centre from an XYZ tile server.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: reqwest::Client,
    url_template: String,
}

impl HttpTileSource {
    pub fn new(config: &TileConfig) -> Result<Self, CorpusError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            url_template: config.url_template.clone(),
        })
    }

    pub fn tile_url(&self, coord: &TileCoord) -> String {
        coord.url(&self.url_template)
    }

    /// Fetch and decode one tile, surfacing the failure reason.
    pub async fn fetch_tile(&self, coord: &TileCoord) -> Result<RgbImage, CorpusError> {
        let url = self.tile_url(coord);
        let response = self.client.get(&url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(CorpusError::tile(format!(
                "tile {coord} returned HTTP {}",
                response.status()
            )));
        }
        let body = response.bytes().await?;
        let image = image::load_from_memory(&body)?;
        Ok(image.to_rgb8())
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch_image(&self, bbox: &BoundingBox, zoom: u8) -> Option<RgbImage> {
        let (lat, lon) = bbox.center();
        let coord = TileCoord::from_lat_lon(lat, lon, zoom);
        match self.fetch_tile(&coord).await {
            Ok(image) => {
                tracing::debug!(
                    tile = %coord,
                    width = image.width(),
                    height = image.height(),
                    "fetched tile"
                );
                Some(image)
            }
            Err(e) => {
                tracing::warn!(tile = %coord, error = %e, "failed to fetch tile");
                None
            }
        }
    }
}
