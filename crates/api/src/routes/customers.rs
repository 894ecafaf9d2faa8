//! Customer CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{CustomerId, CustomerInput};
use ledger_store::{Customer, LedgerStore};

use super::{AppState, MessageResponse};
use crate::error::ApiError;

/// GET /customers: list every customer.
#[tracing::instrument(skip(state))]
pub async fn list<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(state.customers.list().await?))
}

/// POST /customers: create a customer.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CustomerInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let Json(input) = payload?;
    let customer = state.customers.create(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers/:id: fetch one customer.
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.customers.get(CustomerId::new(id)).await?))
}

/// PUT /customers/:id: replace every field of a customer.
///
/// An unknown id is reported ahead of an unreadable body.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CustomerInput>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = CustomerId::new(id?.0);
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            state.customers.get(id).await?;
            return Err(rejection.into());
        }
    };
    state.customers.update(id, input).await?;
    Ok(Json(MessageResponse::new("Customer updated successfully")))
}

/// DELETE /customers/:id: remove a customer without orders.
#[tracing::instrument(skip(state))]
pub async fn delete<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    state.customers.delete(CustomerId::new(id)).await?;
    Ok(Json(MessageResponse::new("Customer deleted successfully")))
}
