use std::time::Duration;

use crate::error::{Error, Result};

pub fn client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("mirrorpane/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// GET `url` and parse the body as JSON. Non-2xx answers are errors.
pub async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<json::JsonValue> {
    let response = client.get(url).query(query).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(json::parse(&response.text().await?)?)
}
