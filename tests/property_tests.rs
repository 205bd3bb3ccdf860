//! Property-based tests for the execution contract.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs and definitions.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use stepgraph::engine::ImmediateScheduler;
use stepgraph::{ExecutionFailure, ExecutionOptions, ExecutionResult, Interpreter};

fn arbitrary_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn run(definition: Value, input: Value) -> Result<ExecutionResult, ExecutionFailure> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let interpreter = Interpreter::new().with_options(
        ExecutionOptions::builder()
            .scheduler(Arc::new(ImmediateScheduler::new()))
            .build(),
    );
    let handle = interpreter.load_definition(&definition).unwrap();
    runtime.block_on(interpreter.execute(&handle, input))
}

/// `count` Pass states `S0 -> S1 -> ...`, the last one ending the execution.
fn pass_chain(count: usize) -> Map<String, Value> {
    (0..count)
        .map(|i| {
            let state = if i + 1 == count {
                json!({"Type": "Pass", "End": true})
            } else {
                json!({"Type": "Pass", "Next": format!("S{}", i + 1)})
            };
            (format!("S{i}"), state)
        })
        .collect()
}

proptest! {
    #[test]
    fn pass_without_result_is_identity(input in arbitrary_json()) {
        let definition = json!({
            "StartAt": "P",
            "States": {"P": {"Type": "Pass", "End": true}}
        });

        let result = run(definition, input.clone()).unwrap();
        prop_assert_eq!(result.output, input);
    }

    #[test]
    fn pass_result_ignores_input(input in arbitrary_json(), fixed in arbitrary_json()) {
        let definition = json!({
            "StartAt": "P",
            "States": {"P": {"Type": "Pass", "Result": fixed.clone()}}
        });

        let result = run(definition, input).unwrap();
        prop_assert_eq!(result.output, fixed);
    }

    #[test]
    fn linear_chain_trace_matches_visits(count in 1usize..12, input in arbitrary_json()) {
        let definition = json!({"StartAt": "S0", "States": pass_chain(count)});

        let result = run(definition, input).unwrap();

        let expected: Vec<String> = (0..count).map(|i| format!("S{i}")).collect();
        prop_assert_eq!(result.trace.len(), count);
        prop_assert_eq!(result.trace.path(), expected.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert!(result.trace.last().unwrap().next_state.is_none());
        prop_assert!(result.trace.entries().iter().all(|entry| entry.error.is_none()));
    }

    #[test]
    fn failure_at_step_k_has_k_entries(k in 1usize..12) {
        let mut states = pass_chain(k);
        let last = format!("S{}", k - 1);
        states.insert(last, json!({"Type": "Fail", "Error": "Stop"}));
        let definition = json!({"StartAt": "S0", "States": states});

        let failure = run(definition, json!({})).unwrap_err();

        prop_assert_eq!(failure.trace.len(), k);
        let (failed, before) = failure.trace.entries().split_last().unwrap();
        prop_assert!(failed.error.is_some());
        prop_assert!(failed.output.is_none());
        prop_assert!(before.iter().all(|entry| entry.error.is_none()));
        prop_assert!(failure.error.is_configured_failure());
    }

    #[test]
    fn choice_first_match_wins(n in -50i64..50, high in -20i64..20, low in -20i64..20) {
        let definition = json!({
            "StartAt": "Route",
            "States": {
                "Route": {
                    "Type": "Choice",
                    "Choices": [
                        {"Variable": "$.n", "NumericGreaterThan": high, "Next": "A"},
                        {"Variable": "$.n", "NumericGreaterThan": low, "Next": "B"}
                    ],
                    "Default": "D"
                },
                "A": {"Type": "Succeed"},
                "B": {"Type": "Succeed"},
                "D": {"Type": "Succeed"}
            }
        });

        let result = run(definition, json!({"n": n})).unwrap();

        let expected = if n > high {
            "A"
        } else if n > low {
            "B"
        } else {
            "D"
        };
        prop_assert_eq!(result.trace.path(), vec!["Route", expected]);
        prop_assert_eq!(result.output, json!({"n": n}));
    }
}
