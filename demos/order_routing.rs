//! Order Routing
//!
//! This demo runs an order workflow against mock task handlers.
//!
//! Key concepts:
//! - Task handlers registered by resource name
//! - Retry with backoff for flaky services
//! - Choice rules routing on computed values
//! - Catch turning a declined payment into a designed failure
//! - A named machine registry shared by executions
//!
//! Run with: RUST_LOG=stepgraph=debug cargo run --example order_routing

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use stepgraph::core::{handler_fn, TaskError};
use stepgraph::engine::ImmediateScheduler;
use stepgraph::{ExecutionOptions, Interpreter, MachineRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn definition() -> Value {
    json!({
        "Comment": "order-routing",
        "StartAt": "Price",
        "States": {
            "Price": {
                "Type": "Task",
                "Resource": "pricing",
                "ResultPath": "$.total",
                "Retry": [{"ErrorEquals": ["Pricing.Unavailable"], "IntervalSeconds": 1, "MaxAttempts": 3}],
                "Next": "Route"
            },
            "Route": {
                "Type": "Choice",
                "Choices": [
                    {
                        "And": [
                            {"Variable": "$.total", "NumericGreaterThan": 500},
                            {"Not": {"Variable": "$.customer", "StringMatches": "vip-*"}}
                        ],
                        "Next": "ManualReview"
                    }
                ],
                "Default": "Charge"
            },
            "ManualReview": {
                "Type": "Wait",
                "Seconds": 3600,
                "Next": "Charge"
            },
            "Charge": {
                "Type": "Task",
                "Resource": "payments",
                "ResultPath": "$.payment",
                "Catch": [{"ErrorEquals": ["States.ALL"], "Next": "Rejected", "ResultPath": "$.failure"}],
                "Next": "Shipped"
            },
            "Rejected": {
                "Type": "Fail",
                "ErrorPath": "$.failure.Error",
                "CausePath": "$.failure.Cause"
            },
            "Shipped": {
                "Type": "Succeed"
            }
        }
    })
}

fn options() -> ExecutionOptions {
    let pricing_calls = Arc::new(AtomicU32::new(0));

    ExecutionOptions::builder()
        .scheduler(Arc::new(ImmediateScheduler::new()))
        .task(
            "pricing",
            handler_fn(move |input: Value| {
                let call = pricing_calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    // The first call after startup hits a cold cache.
                    if call == 0 {
                        return Err(TaskError::new("Pricing.Unavailable", "cache warming up"));
                    }
                    let qty = input["qty"].as_f64().unwrap_or_default();
                    let unit = input["unit_price"].as_f64().unwrap_or_default();
                    Ok(json!(qty * unit))
                }
            }),
        )
        .task(
            "payments",
            handler_fn(|input: Value| async move {
                if input["card"] == "expired" {
                    return Err(TaskError::new("Payment.Declined", "card expired"));
                }
                Ok(json!({"status": "captured", "amount": input["total"].clone()}))
            }),
        )
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Order Routing ===\n");

    let interpreter = Interpreter::new().with_options(options());
    let registry = MachineRegistry::new();
    let name = registry.load(&interpreter, &definition()).await?;
    let handle = registry.get(&name).await?;

    let orders = [
        json!({"customer": "alice", "qty": 2, "unit_price": 40.0, "card": "ok"}),
        json!({"customer": "bob", "qty": 10, "unit_price": 80.0, "card": "ok"}),
        json!({"customer": "vip-carol", "qty": 10, "unit_price": 80.0, "card": "ok"}),
        json!({"customer": "dave", "qty": 1, "unit_price": 15.0, "card": "expired"}),
    ];

    for order in orders {
        let customer = order["customer"].clone();
        match interpreter.execute(&handle, order).await {
            Ok(result) => {
                println!("{customer}: shipped via {}", result.trace.path().join(" -> "));
            }
            Err(failure) => {
                println!(
                    "{customer}: {} at {} ({})",
                    failure.error.error_name(),
                    failure.failed_state().unwrap_or("?"),
                    failure.error
                );
            }
        }
    }

    Ok(())
}
