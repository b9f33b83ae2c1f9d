use serde_json::{Map, Value};

/// Layout version written by this build.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("snapshot is not a JSON object")]
    NotAnObject,
    #[error("snapshot version {0} is newer than supported version {CURRENT_SNAPSHOT_VERSION}")]
    UnsupportedVersion(u32),
}

/// Upgrade a raw snapshot to the current layout.
///
/// Version 1 snapshots were wrapped in a `{ "state": …, "version": … }` envelope and
/// stored the first mandatory consent as `termsOfService`.
pub fn migrate(raw: Value) -> Result<Value, MigrationError> {
    let Value::Object(mut outer) = raw else {
        return Err(MigrationError::NotAnObject);
    };

    let version = outer
        .get("version")
        .and_then(Value::as_u64)
        .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
        .unwrap_or(1);

    if version > CURRENT_SNAPSHOT_VERSION {
        return Err(MigrationError::UnsupportedVersion(version));
    }

    let mut snapshot = if version < 2 {
        match outer.remove("state") {
            Some(Value::Object(inner)) => inner,
            Some(_) => return Err(MigrationError::NotAnObject),
            None => outer,
        }
    } else {
        outer
    };

    if version < 2 {
        rename_legacy_consent(&mut snapshot);
    }

    snapshot.insert(
        "version".to_string(),
        Value::from(CURRENT_SNAPSHOT_VERSION),
    );
    Ok(Value::Object(snapshot))
}

fn rename_legacy_consent(snapshot: &mut Map<String, Value>) {
    let Some(Value::Object(consents)) = snapshot.get_mut("consents") else {
        return;
    };
    if let Some(legacy) = consents.remove("termsOfService") {
        consents.entry("termOfService").or_insert(legacy);
    }
}
