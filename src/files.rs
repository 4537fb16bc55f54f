use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde_json::{Map, Value};

use crate::models::UserRecord;

/// Loads an exported user collection from a `.json` array or a `.csv` with headers.
pub fn load_users(path: &Path) -> anyhow::Result<Vec<UserRecord>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => load_json(path),
        Some("csv") => load_csv(path),
        _ => bail!(
            "unsupported file type for {} (expected .json or .csv)",
            path.display()
        ),
    }
}

fn load_json(path: &Path) -> anyhow::Result<Vec<UserRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    match value {
        Value::Array(items) => Ok(items.iter().map(UserRecord::from_json).collect()),
        _ => bail!("{} must contain a JSON array of users", path.display()),
    }
}

/// Every column becomes a field; `createdAt`, `status` and `id` feed the metrics.
fn load_csv(path: &Path) -> anyhow::Result<Vec<UserRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut users = Vec::new();

    for result in reader.deserialize::<HashMap<String, String>>() {
        let row = result.with_context(|| format!("malformed row in {}", path.display()))?;
        let fields: Map<String, Value> = row
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        users.push(UserRecord::from_json(&Value::Object(fields)));
    }

    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatedAt;
    use chrono::{TimeZone, Utc};

    #[test]
    fn loads_csv_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        std::fs::write(
            &path,
            "id,name,createdAt,status\n\
             u1,Selam,2024-03-15T09:00:00Z,active\n\
             u2,Yonas,,Pending\n",
        )
        .unwrap();

        let users = load_users(&path).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id.as_deref(), Some("u1"));
        assert_eq!(
            users[0].created_at,
            Some(CreatedAt::Instant(
                Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
            ))
        );
        assert_eq!(users[1].created_at, None);
        assert!(users[1].has_status("pending"));
        assert_eq!(
            users[1].fields.get("name").and_then(Value::as_str),
            Some("Yonas")
        );
    }

    #[test]
    fn loads_json_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.JSON");
        std::fs::write(
            &path,
            r#"[{"_id": "a", "status": "suspended"}, {"_id": "b", "createdAt": null}]"#,
        )
        .unwrap();

        let users = load_users(&path).unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].has_status("suspended"));
    }

    #[test]
    fn rejects_unknown_extensions_and_non_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("users.txt");
        std::fs::write(&txt, "").unwrap();
        assert!(load_users(&txt).is_err());

        let object = dir.path().join("users.json");
        std::fs::write(&object, r#"{"users": []}"#).unwrap();
        assert!(load_users(&object).is_err());
    }
}
