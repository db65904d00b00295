use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use stockroom_engine::{BatchReport, ItemRef, ListParams, NewStock, Sale};

use crate::auth::{Action, Authenticated};
use crate::envelope::Reply;
use crate::error::{ServerError, ServerResult};
use crate::extract::{Params, Payload};
use crate::state::AppState;

const NO_SALES: &str = "No sales processed";

#[derive(Debug, Default, Deserialize)]
pub struct AddMultiple {
    #[serde(default)]
    pub items: Vec<NewStock>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SellMultiple {
    #[serde(default)]
    pub sales: Vec<Sale>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ByDate {
    pub date: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    caller: Authenticated,
    Params(params): Params<ListParams>,
) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::ReadInventory).await?;
    Reply::ok().with_data(state.queries.list_inventory(&params).await?)
}

pub async fn add(
    State(state): State<AppState>,
    caller: Authenticated,
    Payload(item): Payload<NewStock>,
) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::WriteInventory).await?;
    let outcome = state.engine.add(&caller.0, &item).await?;
    Reply::ok().with_message(outcome.message()).with_data(outcome)
}

pub async fn add_multiple(
    State(state): State<AppState>,
    caller: Authenticated,
    Payload(batch): Payload<AddMultiple>,
) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::WriteInventory).await?;
    if batch.items.is_empty() {
        return Err(ServerError::invalid("No items provided"));
    }
    let report = state.engine.add_multiple(&caller.0, &batch.items).await?;
    batch_reply(report)
}

pub async fn sell(
    State(state): State<AppState>,
    caller: Authenticated,
    Payload(sale): Payload<Sale>,
) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::WriteInventory).await?;
    let outcome = state.engine.sell(&caller.0, &sale).await?;
    Reply::ok().with_message(outcome.message()).with_data(outcome)
}

pub async fn sell_multiple(
    State(state): State<AppState>,
    caller: Authenticated,
    Payload(batch): Payload<SellMultiple>,
) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::WriteInventory).await?;
    if batch.sales.is_empty() {
        return Err(ServerError::invalid(NO_SALES));
    }
    let report = state.engine.sell_multiple(&caller.0, &batch.sales).await?;
    if !report.any_applied() {
        return Reply::failure(StatusCode::BAD_REQUEST, NO_SALES)
            .with_errors(report.failures())?
            .with_data(&report);
    }
    batch_reply(report)
}

fn batch_reply(report: BatchReport) -> ServerResult<Reply> {
    let mut reply = Reply::ok().with_message(report.summary());
    let failures = report.failures();
    if !failures.is_empty() {
        reply = reply.with_errors(&failures)?;
    }
    reply.with_data(&report)
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Authenticated,
    Payload(item): Payload<ItemRef>,
) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::WriteInventory).await?;
    let outcome = state.engine.delete(&caller.0, &item).await?;
    Reply::ok().with_message(outcome.message()).with_data(outcome)
}

pub async fn dashboard(State(state): State<AppState>, caller: Authenticated) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::ReadInventory).await?;
    Reply::ok().with_data(state.queries.dashboard().await?)
}

pub async fn by_date(
    State(state): State<AppState>,
    caller: Authenticated,
    Params(query): Params<ByDate>,
) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::ReadInventory).await?;
    let day = state.queries.by_date(query.date.as_deref().unwrap_or_default()).await?;
    Reply::ok().with_data(day)
}

pub async fn names(State(state): State<AppState>) -> ServerResult<Reply> {
    Reply::ok().with_data(state.queries.distinct_names().await?)
}
