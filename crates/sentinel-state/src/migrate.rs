//! Schema evolution for persisted session state.
//!
//! Each version bump gets one step in `upgrade`, applied in order starting
//! from whatever `schema_version` the stored JSON carries. There is only one
//! schema version today; this is scaffolding for the next one.

use serde_json::Value;

use crate::state::CURRENT_SCHEMA_VERSION;

fn version_of(value: &Value) -> u32 {
    value
        .get("schema_version")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(0)
}

/// Upgrades `value` in place to `CURRENT_SCHEMA_VERSION`, applying each
/// version step in sequence. Unknown future versions are left untouched;
/// deserialization will fail and the caller falls back to zero-state.
pub fn upgrade(mut value: Value) -> Value {
    let mut version = version_of(&value);

    // Step table: `if version == N { value = migrate_n_to_n_plus_1(value); version = N + 1; }`
    // No steps exist yet since this is the first schema version.

    if version == 0 {
        if let Some(obj) = value.as_object_mut() {
            obj.insert("schema_version".to_string(), Value::from(1));
        }
        version = 1;
    }

    let _ = version;
    value
}
