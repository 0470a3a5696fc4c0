//! Field redaction applied to every event before it leaves the process

use tracing::trace;

use super::SecurityEvent;

/// Fields stripped when no explicit list is configured
pub const DEFAULT_REDACTED_FIELDS: &[&str] = &[
    "msp_name",
    "msp_id",
    "tenant_name",
    "tenant_id",
    "mitre_classifications",
    "recorded_device_info",
    "file_status",
    "sandbox_status",
];

/// Static set of top-level field names removed from each event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionList {
    fields: Vec<String>,
}

impl Default for RedactionList {
    fn default() -> Self {
        Self::new(DEFAULT_REDACTED_FIELDS.iter().copied())
    }
}

impl RedactionList {
    /// Build a list from field names. Blank names and repeats are dropped.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into().trim().to_string();
            if !field.is_empty() && !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self { fields: unique }
    }

    /// Parse a comma-separated list such as `tenant_id,msp_id`
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// A list that removes nothing
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Remove every listed field present on the event.
    ///
    /// Absent fields are skipped. Returns how many fields were removed.
    pub fn apply(&self, event: &mut SecurityEvent) -> usize {
        let map = event.fields_mut();
        let removed = self
            .fields
            .iter()
            .filter(|field| map.shift_remove(field.as_str()).is_some())
            .count();

        trace!(event_id = event.id(), removed, "Redacted event fields");
        removed
    }
}
