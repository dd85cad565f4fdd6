// ── Vendor alarms ──

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const LANGUAGES: [&str; 4] = ["de", "en", "fr", "it"];

/// A vendor alarm occurrence, normalized from the webhook payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Vendor alarm session. One session maps to one set of platform rules.
    pub session_id: String,
    pub datapoint_id: String,
    pub name: String,
    pub description: String,
    pub severity: String,
    pub need_acknowledge: bool,
    pub active: bool,
    pub acked: bool,
    pub closed: bool,
    pub acked_by: String,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

/// Localized `come`/`gone` texts keyed by language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmMessage {
    pub come: BTreeMap<String, String>,
    pub gone: BTreeMap<String, String>,
}

impl AlarmEvent {
    /// Platform priority: 1 is most urgent, 10 is informational.
    pub fn priority(&self) -> u8 {
        match self.severity.as_str() {
            "Critical" | "Urgent" => 1,
            "High" => 2,
            "Low" => 3,
            _ => 10,
        }
    }

    pub fn message(&self) -> AlarmMessage {
        let description = if self.description.is_empty() {
            String::new()
        } else {
            format!(": {}", self.description)
        };
        let come_text = format!("{}{description} {{{{asset.name}}}} ({{{{alarm.val}}}})", self.name);
        let come = LANGUAGES
            .iter()
            .map(|lang| ((*lang).to_owned(), come_text.clone()))
            .collect();

        let name = &self.name;
        let gone = BTreeMap::from([
            ("de".to_owned(), format!("{name} behoben")),
            ("en".to_owned(), format!("{name} resolved")),
            ("fr".to_owned(), format!("{name} résolu")),
            ("it".to_owned(), format!("{name} risolto")),
        ]);

        AlarmMessage { come, gone }
    }

    pub fn ack_text(&self) -> String {
        format!("{}: {}", self.acked_by, self.comment)
    }
}
