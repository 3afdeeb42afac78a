//! Panic payload formatting.
//!
//! Handlers that panic are reported as failed steps; the payload becomes the
//! failure message.

use std::any::Any;

use crate::execution::StepSignal;

/// Render a panic payload as a readable message.
///
/// String payloads are used verbatim, numbers and step signals through
/// their `Display` form, anything else through `Debug`.
///
/// # Examples
///
/// ```
/// use storyline::panic_message;
/// use std::any::Any;
///
/// let payload: Box<dyn Any + Send> = Box::new("boom");
/// assert_eq!(panic_message(payload.as_ref()), "boom");
/// ```
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .or_else(|| payload.downcast_ref::<StepSignal>().map(|signal| format!("{signal:?}")))
        .or_else(|| payload.downcast_ref::<i32>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<i64>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<u32>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<u64>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<usize>().map(ToString::to_string))
        .unwrap_or_else(|| format!("{payload:?}"))
}
