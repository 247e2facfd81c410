//! Transaction CRUD and saga trigger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CategoryId, TransactionId, UserId};
use domain::{Money, Transaction, TransactionKind};
use saga::{
    CreateTransaction, SagaCoordinator, SpendingAnalyzer, TransactionService, UpdateTransaction,
};
use serde::{Deserialize, Serialize};
use storage::{CategoryRepository, TransactionRepository, UserRepository};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub service: TransactionService<S, SpendingAnalyzer>,
    pub coordinator: SagaCoordinator<S, SpendingAnalyzer>,
    pub storage: Arc<S>,
}

/// Bound required of the storage type behind the HTTP handlers.
pub trait Repositories:
    UserRepository + CategoryRepository + TransactionRepository + 'static
{
}
impl<T: UserRepository + CategoryRepository + TransactionRepository + 'static> Repositories for T {}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTransactionRequest {
    pub user_id: i64,
    pub category_id: i64,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub description: String,
}

#[derive(Deserialize)]
pub struct UpdateTransactionRequest {
    pub category_id: i64,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub description: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(txn: Transaction) -> Self {
        Self {
            id: txn.id.as_i64(),
            user_id: txn.user_id.as_i64(),
            category_id: txn.category_id.as_i64(),
            amount_cents: txn.amount.as_cents(),
            kind: txn.kind,
            description: txn.description,
            occurred_at: txn.occurred_at,
        }
    }
}

impl CreateTransactionRequest {
    fn into_command(self) -> Result<CreateTransaction, ApiError> {
        if self.amount_cents <= 0 {
            return Err(ApiError::BadRequest(
                "amount_cents must be positive".to_string(),
            ));
        }
        Ok(CreateTransaction::new(
            UserId::new(self.user_id),
            CategoryId::new(self.category_id),
            Money::from_cents(self.amount_cents),
            self.kind,
            self.description,
        ))
    }
}

// -- Handlers --

/// POST /transactions — plain create, no saga post-processing.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Repositories>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let txn = state.service.create_transaction(req.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(txn.into())))
}

/// POST /transactions/saga/choreography — choreography-style saga create.
#[tracing::instrument(skip(state, req))]
pub async fn create_with_choreography<S: Repositories>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let txn = state
        .service
        .create_transaction_with_saga(req.into_command()?)
        .await?;
    Ok((StatusCode::CREATED, Json(txn.into())))
}

/// POST /transactions/saga/orchestration — coordinator-driven saga create.
#[tracing::instrument(skip(state, req))]
pub async fn create_with_orchestration<S: Repositories>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let txn = state.coordinator.execute(req.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(txn.into())))
}

/// GET /transactions/:id — load one transaction.
#[tracing::instrument(skip(state))]
pub async fn get<S: Repositories>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let txn = state.service.get_transaction(TransactionId::new(id)).await?;
    Ok(Json(txn.into()))
}

/// GET /transactions — list every transaction.
#[tracing::instrument(skip(state))]
pub async fn list<S: Repositories>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let txns = state.service.list_transactions().await?;
    Ok(Json(txns.into_iter().map(Into::into).collect()))
}

/// GET /transactions/user/:user_id — list one user's transactions.
#[tracing::instrument(skip(state))]
pub async fn list_for_user<S: Repositories>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let txns = state.service.list_for_user(UserId::new(user_id)).await?;
    Ok(Json(txns.into_iter().map(Into::into).collect()))
}

/// PUT /transactions/:id — update a transaction's mutable fields.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Repositories>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTransactionRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    if req.amount_cents <= 0 {
        return Err(ApiError::BadRequest(
            "amount_cents must be positive".to_string(),
        ));
    }

    let txn = state
        .service
        .update_transaction(
            TransactionId::new(id),
            UpdateTransaction::new(
                CategoryId::new(req.category_id),
                Money::from_cents(req.amount_cents),
                req.kind,
                req.description,
            ),
        )
        .await?;
    Ok(Json(txn.into()))
}

/// DELETE /transactions/:id — delete a transaction.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Repositories>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_transaction(TransactionId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
