use openai_kit::features::embeddings::EmbeddingsEndpoint;
use openai_kit::{ClientOptions, EmbeddingsApi, OpenAiClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
    let client = OpenAiClient::new(ClientOptions::new(api_key))?;

    let vector = client
        .embeddings()
        .embed("The food was delicious", EmbeddingsEndpoint::default_model())
        .await?;

    println!("Embedding has {} dimensions", vector.len());
    println!("First values: {:?}", &vector[..vector.len().min(5)]);

    Ok(())
}
