//! Process exit codes.
//! Codes 2-5 mirror `SizeError::exit_code` so scripts can branch on the failure kind.

use sizewatch_core::SizeError;

pub const SUCCESS: i32 = 0;
pub const SIZE_REGRESSION: i32 = 1; // compare: increase over the limit
pub const CONFIG_ERROR: i32 = 2; // bad input, arguments or config

/// Exit code for a failed command.
pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SizeError>())
        .map_or(CONFIG_ERROR, SizeError::exit_code)
}
