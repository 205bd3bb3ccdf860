//! Hello World
//!
//! This demo loads the smallest useful definition and prints its trace.
//!
//! Key concepts:
//! - Loading a definition into a machine handle
//! - Executing with input and reading the output
//! - One trace entry per visited state
//!
//! Run with: RUST_LOG=stepgraph=debug cargo run --example hello_world

use serde_json::json;
use stepgraph::Interpreter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Hello World ===\n");

    let interpreter = Interpreter::new();
    let handle = interpreter.load_definition(&json!({
        "Comment": "hello-world",
        "StartAt": "Greet",
        "States": {
            "Greet": {"Type": "Pass", "Result": {"greeting": "Hello"}, "ResultPath": "$.message", "Next": "Done"},
            "Done": {"Type": "Succeed"}
        }
    }))?;

    let result = interpreter
        .execute(&handle, json!({"name": "World"}))
        .await?;

    println!("Machine: {}", handle.name());
    println!("Output:  {}", result.output);
    println!("\nTrace:");
    for entry in &result.trace {
        println!(
            "  {:<6} {} -> {}",
            entry.state_name,
            entry.input,
            entry.next_state.as_deref().unwrap_or("(end)")
        );
    }

    Ok(())
}
