//! Task handlers the gateway registers out of the box.
//!
//! - `echo`: returns its single argument, or all argument values as an array.
//! - `add`: sums numeric arguments, slices included.
//! - `sleep`: waits for the given number of milliseconds, then returns it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use taskgate_tasks::execution::{handler_fn, InProcessBackend, TaskHandler};
use taskgate_tasks::TaskArg;

/// Longest `sleep` a client may request.
pub const MAX_SLEEP: Duration = Duration::from_secs(300);

/// Registers every built-in handler on `backend`.
pub fn register_builtins(backend: InProcessBackend) -> InProcessBackend {
    backend
        .register("echo", handler_fn(|args: Vec<TaskArg>| async move { Ok(echo(args)) }))
        .register("add", handler_fn(|args: Vec<TaskArg>| async move { add(&args) }))
        .register("sleep", SleepHandler)
}

fn echo(args: Vec<TaskArg>) -> Value {
    let mut values: Vec<Value> = args.into_iter().map(|a| a.value).collect();
    match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Array(values),
    }
}

fn add(args: &[TaskArg]) -> Result<Value, String> {
    let mut numbers = Vec::new();
    for arg in args {
        match &arg.value {
            Value::Array(items) => numbers.extend(items.iter()),
            other => numbers.push(other),
        }
    }

    if numbers.iter().all(|n| n.is_i64()) {
        let mut sum: i64 = 0;
        for n in &numbers {
            let n = n.as_i64().unwrap_or_default();
            sum = sum
                .checked_add(n)
                .ok_or_else(|| "integer overflow".to_string())?;
        }
        return Ok(json!(sum));
    }

    let mut sum = 0.0;
    for n in &numbers {
        sum += n
            .as_f64()
            .ok_or_else(|| format!("cannot add non-numeric value {n}"))?;
    }
    Ok(json!(sum))
}

/// Sleeps for `args[0]` milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct SleepHandler;

#[async_trait]
impl TaskHandler for SleepHandler {
    async fn call(&self, args: Vec<TaskArg>) -> Result<Value, String> {
        let millis = args
            .first()
            .and_then(|a| a.value.as_u64())
            .ok_or_else(|| "sleep expects a non-negative millisecond count".to_string())?;
        let duration = Duration::from_millis(millis);
        if duration > MAX_SLEEP {
            return Err(format!("sleep is capped at {}ms", MAX_SLEEP.as_millis()));
        }
        tokio::time::sleep(duration).await;
        Ok(json!(millis))
    }
}
