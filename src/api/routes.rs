use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::application::LedgerService;
use crate::domain::{TransactionDraft, UserDraft};

use super::dto::{
    amount_to_cents, identifier_to_string, AccountBody, BalanceBody, CreateUserRequest, Envelope,
    LedgerEntryView, ReversalBody, ReversalRequest, StatusUpdateRequest, TransactionBody,
    TransactionRequest, TransactionView, TransactionsBody, TransactionsQuery, UserBody,
    UserDetails,
};
use super::errors::ApiError;

type Service = State<Arc<LedgerService>>;
type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid JSON data: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

pub async fn get_user(State(service): Service, Path(user_uuid): Path<String>) -> ApiResult<UserBody> {
    let user = service.get_user(&user_uuid).await?;
    Ok((
        StatusCode::OK,
        Json(Envelope::ok(UserBody {
            user_details: UserDetails::from(&user),
        })),
    ))
}

pub async fn create_user(
    State(service): Service,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<UserBody> {
    let Json(req) = body?;
    let user = service
        .create_user(UserDraft {
            firstname: req.firstname,
            lastname: req.lastname,
            username: req.username,
            email: req.email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok_with_message(
            "User created successfully",
            UserBody {
                user_details: UserDetails::from(&user),
            },
        )),
    ))
}

pub async fn update_user_status(
    State(service): Service,
    Path(user_uuid): Path<String>,
    body: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<AccountBody> {
    let Json(req) = body?;
    let user = service.update_user_status(&user_uuid, req.status).await?;

    Ok((
        StatusCode::OK,
        Json(Envelope::ok_with_message(
            "User status updated successfully",
            AccountBody::from(&user),
        )),
    ))
}

pub async fn get_balance(State(service): Service, Path(user_uuid): Path<String>) -> ApiResult<BalanceBody> {
    let result = service.get_balance(&user_uuid).await?;
    Ok((StatusCode::OK, Json(Envelope::ok(BalanceBody::from(&result)))))
}

pub async fn list_transactions(
    State(service): Service,
    Path(user_uuid): Path<String>,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> ApiResult<TransactionsBody> {
    let Query(query) = query?;
    let entries = service
        .list_transactions(&user_uuid, query.transaction_type.as_deref())
        .await?;

    Ok((
        StatusCode::OK,
        Json(Envelope::ok(TransactionsBody {
            transactions: entries.iter().map(LedgerEntryView::from).collect(),
        })),
    ))
}

pub async fn record_transaction(
    State(service): Service,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> ApiResult<TransactionBody> {
    let Json(req) = body?;
    let draft = TransactionDraft {
        user_id: req.user_uuid,
        amount_cents: amount_to_cents(req.amount.as_ref())?,
        transaction_type: req.transaction_type,
    };
    let transaction = service.record_transaction(draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok_with_message(
            "Transaction processed successfully",
            TransactionBody {
                transaction: TransactionView::from(&transaction),
            },
        )),
    ))
}

pub async fn reverse_transaction(
    State(service): Service,
    body: Result<Json<ReversalRequest>, JsonRejection>,
) -> ApiResult<ReversalBody> {
    let Json(req) = body?;
    let id = identifier_to_string(req.transaction_uuid.as_ref());
    let result = service.reverse_transaction(id.as_deref()).await?;

    Ok((
        StatusCode::OK,
        Json(Envelope::ok_with_message(
            "Transaction reversed successfully",
            ReversalBody::from(&result),
        )),
    ))
}
