//! A small service behind the envelope.
//!
//! ```text
//! cargo run -p veneer --example basic
//! curl -H 'UserId: 9a3e7c1d-2b4f-4d6a-8e0c-1f2a3b4c5d6e' localhost:8080/api/me
//! ```
//!
//! Settings come from `veneer.toml` when present, then `VENEER__*` variables
//! (a `.env` file is read first).

use serde_json::json;
use veneer::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_dotenv()?
        .with_development()
        .with_optional_file("veneer.toml")?
        .with_env_prefix("VENEER")
        .load()?;

    init_telemetry(&config.telemetry)?;
    tracing::info!(addr = %config.server.http_addr, "starting example service");

    Server::from_config(&config)?
        .handler(|ctx, request| {
            let caller = ctx.user_id();
            async move {
                match request.uri().path() {
                    "/api/me" => Ok(Response::json(
                        StatusCode::OK,
                        &json!({ "caller": caller.map(|id| id.to_string()) }),
                    )),
                    "/api/orders" => Err(ApiFault::from(
                        ApplicationFault::new(StatusCode::UNPROCESSABLE_ENTITY, "Invalid order")
                            .with_validation_error("quantity", "must be positive"),
                    )),
                    "/api/boom" => Err(ApiFault::unclassified(anyhow::anyhow!("database unreachable"))),
                    "/swagger/index.html" => Ok(Response::text(StatusCode::OK, "<html>docs</html>")),
                    _ => Ok(Response::empty(StatusCode::NOT_FOUND)),
                }
            }
        })
        .build()
        .run()
        .await?;

    Ok(())
}
