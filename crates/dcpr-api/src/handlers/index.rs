use axum::{extract::State, Json};
use dcpr_store::ports::VectorIndex;
use dcpr_store::{load_index, IndexManifest};

use crate::dto::ReloadResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Reload the index from disk and swap it in for new requests.
///
/// The replacement must come from the embedder the server was started with.
pub async fn reload_index(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let shared = state.pipeline.index();
    let embedder = shared.current().embedder().to_string();
    let path = state.index_path.clone();

    let (manifest, index) = tokio::task::spawn_blocking(move || {
        let manifest = IndexManifest::read(&path)?;
        let index = load_index(&path, &embedder)?;
        Ok::<_, dcpr_core::error::DcprError>((manifest, index))
    })
    .await
    .map_err(|e| ApiError::internal("Index reload task failed").with_details(e.to_string()))??;

    let previous = shared.swap(index);

    tracing::info!(
        passages = manifest.passage_count,
        previous = previous.len(),
        "Index reloaded"
    );

    Ok(Json(ReloadResponse::new(manifest, previous.len())))
}
