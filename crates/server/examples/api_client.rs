//! Example calls against a running retrieval gateway.
//!
//! ```sh
//! ACCESS_TOKEN=... cargo run -p gateway-server --example api_client
//! ```

use reqwest::Client;
use serde_json::json;

const SERVER_URL: &str = "http://localhost:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let token = std::env::var("ACCESS_TOKEN").unwrap_or_else(|_| "change-me".to_string());
    let client = Client::new();

    // Example 1: Health check
    println!("1. Health Check:");
    let resp = client.get(format!("{SERVER_URL}/health")).send().await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    // Example 2: Retrieve neighbours for a piece of text
    println!("2. Get Results:");
    let resp = client
        .post(format!("{SERVER_URL}/api/get_results"))
        .bearer_auth(&token)
        .json(&json!({ "text": "How do validators earn rewards?" }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    // Example 3: Blank text is rejected before any upstream call
    println!("3. Empty Text:");
    let resp = client
        .post(format!("{SERVER_URL}/api/get_results"))
        .bearer_auth(&token)
        .json(&json!({ "text": "   " }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    // Example 4: Missing credentials
    println!("4. Unauthorized:");
    let resp = client
        .post(format!("{SERVER_URL}/api/get_results"))
        .json(&json!({ "text": "hello" }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);

    Ok(())
}
