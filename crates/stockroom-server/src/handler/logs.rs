use axum::extract::State;
use stockroom_engine::{EngineError, Movement};

use crate::envelope::Reply;
use crate::error::{ServerError, ServerResult};
use crate::extract::Payload;
use crate::state::AppState;

pub async fn all(State(state): State<AppState>) -> ServerResult<Reply> {
    Reply::ok().with_data(state.queries.all_logs().await?)
}

pub async fn allot(State(state): State<AppState>, Payload(movement): Payload<Movement>) -> ServerResult<Reply> {
    let entry = state.engine.allot(None, &movement).await?;
    Reply::ok().with_message("Log entry added for sale").with_data(entry)
}

pub async fn return_stock(State(state): State<AppState>, Payload(movement): Payload<Movement>) -> ServerResult<Reply> {
    let outcome = state.engine.return_stock(None, &movement).await.map_err(|err| match err {
        EngineError::NotFound(_) => ServerError::NotFound("Item not found or inventory update failed".into()),
        other => other.into(),
    })?;
    Reply::ok().with_message(outcome.message()).with_data(outcome)
}
