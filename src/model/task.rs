//! Ledger task record.

use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// One entry of the ledger document.
///
/// Serialized with camelCase field names so documents stay compatible with
/// the web client (`createdAt`). Every mutation rewrites the whole document,
/// so fields this type does not model are carried in `extra` and written
/// back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "millis_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Build a fresh, incomplete task. `text` must already be trimmed.
    pub fn new(text: impl Into<String>) -> Self {
        let now = Utc::now().trunc_subsecs(3);
        Self {
            id: generate_id(now),
            text: text.into(),
            completed: false,
            created_at: Some(now),
            extra: Map::new(),
        }
    }
}

/// `<unix-millis>-<9 base36 chars>`. Unique in practice, not cryptographically.
fn generate_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{suffix}", now.timestamp_millis())
}

/// `createdAt` is always written as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
mod millis_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<DateTime<Utc>>::deserialize(deserializer)
    }
}
