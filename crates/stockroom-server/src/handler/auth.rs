use axum::extract::State;
use stockroom_engine::validation::Validator;
use tracing::{info, warn};

use crate::auth::{Action, Authenticated};
use crate::envelope::Reply;
use crate::error::{ServerError, ServerResult};
use crate::extract::Payload;
use crate::state::AppState;
use crate::users::{LoginRequest, NewUser};

pub async fn login(State(state): State<AppState>, Payload(request): Payload<LoginRequest>) -> ServerResult<Reply> {
    let mut v = Validator::new();
    let username = v.text("username", &request.username);
    let password = v.text("password", &request.password);
    v.finish("Validation error").map_err(ServerError::from)?;
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ServerError::Internal("validator accepted incomplete login".into()));
    };

    let Some(user) = state.users.authenticate(username, password)? else {
        warn!(username, "login failed");
        return Err(ServerError::Unauthorized("Invalid credentials".into()));
    };

    let issued = state.tokens.issue(&user.actor())?;
    info!(username = %user.username, role = %user.role, "login succeeded");
    Reply::ok().with_message("Login successful").with_data(issued)
}

pub async fn create_user(
    State(state): State<AppState>,
    caller: Authenticated,
    Payload(request): Payload<NewUser>,
) -> ServerResult<Reply> {
    caller.require(&state.auth, Action::ManageUsers).await?;
    let record = state.users.create(&request)?;
    info!(by = %caller.0.identity, username = %record.username, "user created via api");
    Reply::created()
        .with_message(format!("User '{}' created", record.username))
        .with_data(serde_json::json!({ "username": record.username, "role": record.role }))
}
