//! Product CRUD and stock endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{ProductId, ProductInput, StockInput};
use ledger_store::{LedgerStore, Product};

use super::{AppState, MessageResponse};
use crate::error::ApiError;

/// GET /products: list every product.
#[tracing::instrument(skip(state))]
pub async fn list<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.products.list().await?))
}

/// POST /products: create a product.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(input) = payload?;
    let product = state.products.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/:id: fetch one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.products.get(ProductId::new(id)).await?))
}

/// PUT /products/:id: replace every field of a product.
///
/// An unknown id is reported ahead of an unreadable body.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = ProductId::new(id?.0);
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            state.products.get(id).await?;
            return Err(rejection.into());
        }
    };
    state.products.update(id, input).await?;
    Ok(Json(MessageResponse::new("Product updated successfully")))
}

/// PUT /products/:id/stock: overwrite the stock on hand.
///
/// An unknown id is reported ahead of an unreadable body.
#[tracing::instrument(skip(state, payload))]
pub async fn update_stock<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StockInput>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = ProductId::new(id?.0);
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            state.products.get(id).await?;
            return Err(rejection.into());
        }
    };
    state.products.update_stock(id, input).await?;
    Ok(Json(MessageResponse::new("Stock updated successfully")))
}

/// DELETE /products/:id: remove a product no order refers to.
#[tracing::instrument(skip(state))]
pub async fn delete<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    state.products.delete(ProductId::new(id)).await?;
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}
