use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::game::errors::GameError;

/// Fields that report what a command did. They survive [`Response::shrink_to_fit`].
const OUTCOME_FIELDS: &[&str] = &[
    "msg", "result", "reward", "exp", "gold", "loot", "levelup", "winner", "count",
];

fn encoded_len<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_vec(value).map_or(usize::MAX, |bytes| bytes.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// A response record: `status` plus whatever fields the command reports,
/// flattened next to it on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            fields: Map::new(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            fields: Map::new(),
        }
        .msg(msg)
    }

    pub fn msg(self, msg: impl Into<String>) -> Self {
        self.with_value("msg", Value::String(msg.into()))
    }

    /// Attach `key`. A value that cannot be represented as JSON becomes `null`.
    pub fn with<T: Serialize>(self, key: &str, value: T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.with_value(key, value)
    }

    fn with_value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn message(&self) -> Option<&str> {
        self.get("msg").and_then(Value::as_str)
    }

    /// Trim the reply until its JSON is at most `limit` bytes, keeping
    /// `status` and the outcome fields. The `player` record goes first; after
    /// that the largest remaining field is halved if it is a list (newest
    /// entries kept) or dropped otherwise. A trimmed reply carries
    /// `truncated: true`. `None` when the outcome alone does not fit.
    pub fn shrink_to_fit(mut self, limit: usize) -> Option<Self> {
        if encoded_len(&self) <= limit {
            return Some(self);
        }
        self.fields.remove("player");
        self.fields.insert("truncated".to_string(), Value::Bool(true));

        while encoded_len(&self) > limit {
            let key = self
                .fields
                .iter()
                .filter(|(k, _)| k.as_str() != "truncated" && !OUTCOME_FIELDS.contains(&k.as_str()))
                .max_by_key(|(_, v)| encoded_len(*v))
                .map(|(k, _)| k.clone())?;
            match self.fields.get_mut(&key) {
                Some(Value::Array(items)) if items.len() > 1 => {
                    let drop = items.len() - items.len() / 2;
                    items.drain(..drop);
                }
                _ => {
                    self.fields.remove(&key);
                }
            }
        }
        Some(self)
    }
}

impl From<GameError> for Response {
    fn from(err: GameError) -> Self {
        Response::error(err.to_string())
    }
}
