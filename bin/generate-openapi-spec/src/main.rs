//! Generate `OpenAPI` specification for the Routerscope API

use api::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), serde_json::Error> {
    let openapi = ApiDoc::openapi();
    let json = serde_json::to_string_pretty(&openapi)?;
    println!("{json}");
    Ok(())
}
