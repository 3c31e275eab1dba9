use http::StatusCode;
use serde::Deserialize;
use trellis_web::middleware::{BodyParser, RequestLogger};
use trellis_web::{
    App, HandlerResult, ListenOptions, MatchTarget, Next, ParsedBody, RequestContext, ResponseContext, handler_fn,
};

#[derive(Deserialize, Debug)]
struct Pagination {
    page: Option<u32>,
}

async fn echo(req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
    match req.body() {
        Some(ParsedBody::Json(value)) => resp.json(value)?,
        Some(ParsedBody::Form(fields)) => resp.json(fields)?,
        Some(ParsedBody::Text(text)) => resp.send(text.clone())?,
        None => resp.set_status(StatusCode::NO_CONTENT).send("")?,
    }
    Ok(Next::Halt)
}

async fn list(req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
    let pagination: Pagination = req.query()?;
    resp.send(format!("page {}", pagination.page.unwrap_or(1)))?;
    Ok(Next::Halt)
}

async fn not_found(_req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
    resp.set_status(StatusCode::NOT_FOUND).send("nothing to echo here")?;
    Ok(Next::Halt)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new();
    // `/items?page=2` has to reach the `/items` route
    app.match_target(MatchTarget::Path);
    app.use_middleware(RequestLogger::new())?.use_middleware(BodyParser::new().max_body_bytes(64 * 1024))?;
    app.post("/echo", handler_fn(echo))?.put("/echo", handler_fn(echo))?.get("/items", handler_fn(list))?;
    app.not_found(handler_fn(not_found));

    app.listen(ListenOptions::new("127.0.0.1:3000")?).await?;
    Ok(())
}
