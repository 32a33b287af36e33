// SPDX-License-Identifier: GPL-3.0-or-later
use std::any::Any;

use anyhow::anyhow;
use num_traits::Num;
use tokio::task::JoinError;

/// Parse an unsigned integer from a base-10 or base-16 string representation.
///
/// If the string starts with `0x`, the rest of the string is treated as a hexadecimal integer.
/// Otherwise the string is treated as a decimal integer.
#[allow(clippy::from_str_radix_10)]
pub fn parse_int_decimal_hex<U: Num>(num_str: &str) -> Result<U, <U as Num>::FromStrRadixErr> {
    let num_str = num_str.to_ascii_lowercase();
    if let Some(hex_str) = num_str.strip_prefix("0x") {
        U::from_str_radix(hex_str, 16)
    } else {
        U::from_str_radix(num_str.as_str(), 10)
    }
}

/// Collapse the result of a blocking task into a single [`anyhow::Result`].
///
/// Unlike a plain `?`, a panic inside the task is turned into an error instead of being resumed,
/// so one dead producer thread does not take the rest of the process with it.
pub(crate) fn flatten_join_result<T>(
    join_result: Result<anyhow::Result<T>, JoinError>,
) -> anyhow::Result<T> {
    match join_result {
        Ok(inner_result) => inner_result,
        Err(join_error) => {
            if join_error.is_panic() {
                Err(anyhow!(
                    "thread panicked: {}",
                    panic_message(join_error.into_panic().as_ref())
                ))
            } else {
                Err(join_error.into())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "(non-string panic payload)"
    }
}
