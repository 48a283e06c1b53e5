use std::sync::Arc;

use openai_kit::{ChatApi, ClientOptions, Model, OpenAiClient, TracingObserver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");

    let options = ClientOptions::new(api_key).with_observer(Arc::new(TracingObserver));
    let client = OpenAiClient::new(options)?;

    println!("Sending message...");
    let reply = client
        .chat()
        .send_message("Hello! Introduce yourself in one sentence.", Model::Gpt4oMini)
        .await?;

    println!("Response:");
    println!("{}", reply);

    Ok(())
}
