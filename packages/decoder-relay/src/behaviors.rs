//! Behavior library endpoints.
//!
//! The library is read from disk on each request so an updated file is
//! served without a restart. With no file the default empty library is
//! returned.

use axum::{extract::State, Json};
use decoder_core::{BehaviorLibrary, BehaviorLibrarySource, BundledAsset};
use serde::Serialize;

use crate::api::{ApiResponse, RelayError};
use crate::state::{RelayConfig, RelayState};

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

async fn load_library(config: &RelayConfig) -> Result<BehaviorLibrary, RelayError> {
    let Some(path) = config.library_path() else {
        return Ok(BehaviorLibrary::default());
    };

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(BehaviorLibrary::default());
    }

    BundledAsset::new(&path).fetch().await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Behavior library error");
        RelayError::Library(e.to_string())
    })
}

/// Get the complete behavior library.
///
/// GET /api/v1/behaviors
pub async fn get_behaviors(
    State(state): State<RelayState>,
) -> Result<Json<ApiResponse<BehaviorLibrary>>, RelayError> {
    let library = load_library(&state.config).await?;
    let message = format!("Loaded {} behaviors and traits", library.count_behaviors());
    Ok(ApiResponse::success(library, message))
}

/// Get just the category names.
///
/// GET /api/v1/behaviors/categories
pub async fn get_categories(
    State(state): State<RelayState>,
) -> Result<Json<ApiResponse<CategoriesResponse>>, RelayError> {
    let library = load_library(&state.config).await?;
    Ok(ApiResponse::success(
        CategoriesResponse {
            categories: library.category_names(),
        },
        "Categories loaded",
    ))
}
