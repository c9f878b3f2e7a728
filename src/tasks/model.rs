use serde::{Deserialize, Deserializer};

/// Todoist priorities run 1 (normal) to 4 (urgent).
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Due {
    /// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`, or RFC 3339 with an offset.
    pub date: String,
    #[serde(default)]
    pub string: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub due: Option<Due>,
    #[serde(default = "default_priority", deserialize_with = "clamped_priority")]
    pub priority: u8,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Filled in by the fetcher from the projects listing.
    #[serde(skip)]
    pub project_name: Option<String>,
}

impl TaskRecord {
    pub fn due_date(&self) -> Option<&str> {
        self.due.as_ref().map(|d| d.date.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

/// One page of a listing. The API wraps results with a cursor; older
/// endpoints return a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Page<T> {
    Cursor {
        results: Vec<T>,
        #[serde(default)]
        next_cursor: Option<String>,
    },
    Bare(Vec<T>),
}

impl<T> Page<T> {
    pub(crate) fn into_parts(self) -> (Vec<T>, Option<String>) {
        match self {
            Self::Cursor {
                results,
                next_cursor,
            } => (results, next_cursor.filter(|c| !c.is_empty())),
            Self::Bare(items) => (items, None),
        }
    }
}

fn default_priority() -> u8 {
    MIN_PRIORITY
}

fn clamped_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    let clamped = raw.clamp(i64::from(MIN_PRIORITY), i64::from(MAX_PRIORITY));
    Ok(u8::try_from(clamped).unwrap_or(MIN_PRIORITY))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(i64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}
