use std::io::Write;

use futures::StreamExt;
use openai_kit::features::chat::{ChatCompletionRequest, ChatMessage};
use openai_kit::{ChatApi, ClientOptions, Model, OpenAiClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
    let client = OpenAiClient::new(ClientOptions::new(api_key))?;

    let request = ChatCompletionRequest::new(
        Model::Gpt4oMini,
        vec![
            ChatMessage::system("You are a concise assistant."),
            ChatMessage::user("Write a haiku about the Rust borrow checker."),
        ],
    );

    println!("Streaming response:");
    let mut chunks = client.chat().stream_chat_completion(&request).await?;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if let Some(content) = chunk.choices.first().and_then(|c| c.delta.content.as_deref()) {
            print!("{}", content);
            std::io::stdout().flush()?;
        }
    }
    println!();

    println!("\nAccumulated response:");
    let message = client.chat().stream_message(&request).await?;
    println!("{}", message.content.unwrap_or_default());

    Ok(())
}
