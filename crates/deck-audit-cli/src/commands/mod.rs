pub mod expected;
pub mod parse;
pub mod validate;

use serde_json::Value;

/// What a subcommand hands back to `main`: the value to format and the
/// process exit code.
pub struct CommandOutput {
    pub value: Value,
    pub exit_code: i32,
}

impl From<Value> for CommandOutput {
    fn from(value: Value) -> Self {
        Self {
            value,
            exit_code: 0,
        }
    }
}
