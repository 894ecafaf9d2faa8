//! Order endpoints: CRUD, total and cancellation.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{OrderId, OrderInput};
use ledger_store::{LedgerStore, Order};
use serde::Serialize;

use super::{AppState, MessageResponse};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct OrderTotalResponse {
    pub order_id: OrderId,
    pub total: f64,
}

/// GET /orders: list every order with its product ids.
#[tracing::instrument(skip(state))]
pub async fn list<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list().await?))
}

/// POST /orders: place an order for an existing customer.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<OrderInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(input) = payload?;
    let order = state.orders.create(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/:id: fetch one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.orders.get(OrderId::new(id)).await?))
}

/// PUT /orders/:id: replace an order's fields and product set.
///
/// An unknown id is reported ahead of an unreadable body.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<OrderInput>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = OrderId::new(id?.0);
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            state.orders.get(id).await?;
            return Err(rejection.into());
        }
    };
    state.orders.update(id, input).await?;
    Ok(Json(MessageResponse::new("Order updated successfully")))
}

/// GET /orders/:id/total: sum of current product prices.
#[tracing::instrument(skip(state))]
pub async fn total<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderTotalResponse>, ApiError> {
    let Path(id) = id?;
    let order_id = OrderId::new(id);
    let total = state.orders.total(order_id).await?;
    Ok(Json(OrderTotalResponse { order_id, total }))
}

/// PUT /orders/:id/cancel: delete the order and its associations.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    state.orders.cancel(OrderId::new(id)).await?;
    Ok(Json(MessageResponse::new("Order cancelled successfully")))
}
