use serde_json::json;
use trellis_web::middleware::RequestLogger;
use trellis_web::{App, HandlerResult, ListenOptions, Next, RequestContext, ResponseContext, handler_fn};

async fn ping(_req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
    resp.json(&json!({ "ok": true }))?;
    Ok(Next::Halt)
}

async fn hello(req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
    let name = req.param("name").unwrap_or("world").to_string();
    resp.send(format!("hello {name}"))?;
    Ok(Next::Halt)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new();
    app.use_at("/", RequestLogger::new())?
        .get("/ping", handler_fn(ping))?
        .get("/hello/:name?", handler_fn(hello))?;

    app.listen(ListenOptions::new("127.0.0.1:3000")?).await?;
    Ok(())
}
