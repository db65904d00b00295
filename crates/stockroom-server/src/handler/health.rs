use crate::envelope::Reply;
use crate::error::ServerResult;

pub async fn health() -> ServerResult<Reply> {
    Reply::ok().with_message("ok").with_data(serde_json::json!({
        "name": "stockroom-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
