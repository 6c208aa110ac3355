/// Workflow key fields and the derived workflow key
///
/// The key identifies a saved workflow: name and description segments followed
/// by the targeting fields (market, language, client, channel, page, placements,
/// domain), upper-cased and joined with `_`.

use serde::{Deserialize, Serialize};

/// Targeting fields, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyField {
    Market,
    Language,
    Client,
    Channel,
    Page,
    Placement,
    Domain,
}

impl KeyField {
    pub const ORDER: [KeyField; 7] = [
        KeyField::Market,
        KeyField::Language,
        KeyField::Client,
        KeyField::Channel,
        KeyField::Page,
        KeyField::Placement,
        KeyField::Domain,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|field| *field == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowKey {
    pub market: String,
    pub language: String,
    pub client: String,
    pub channel: String,
    pub page: String,
    pub placement: Vec<String>,
    pub domain: String,
}

impl WorkflowKey {
    /// Set one field and clear every field that depends on it
    ///
    /// Placement values are given as a `-` separated list.
    pub fn set(&mut self, field: KeyField, value: &str) {
        let value = value.trim();
        match field {
            KeyField::Market => self.market = value.to_string(),
            KeyField::Language => self.language = value.to_string(),
            KeyField::Client => self.client = value.to_string(),
            KeyField::Channel => self.channel = value.to_string(),
            KeyField::Page => self.page = value.to_string(),
            KeyField::Placement => self.placement = split_placements(value),
            KeyField::Domain => self.domain = value.to_string(),
        }
        for later in &KeyField::ORDER[field.index() + 1..] {
            self.clear(*later);
        }
    }

    /// Add or remove one placement; the domain depends on placements and is cleared
    pub fn toggle_placement(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        if let Some(index) = self.placement.iter().position(|p| p == value) {
            self.placement.remove(index);
        } else {
            self.placement.push(value.to_string());
        }
        self.domain.clear();
    }

    fn clear(&mut self, field: KeyField) {
        match field {
            KeyField::Market => self.market.clear(),
            KeyField::Language => self.language.clear(),
            KeyField::Client => self.client.clear(),
            KeyField::Channel => self.channel.clear(),
            KeyField::Page => self.page.clear(),
            KeyField::Placement => self.placement.clear(),
            KeyField::Domain => self.domain.clear(),
        }
    }

    /// Non-empty field values in order; placements sorted and joined with `-`
    pub fn segments(&self) -> Vec<String> {
        let mut placements = self.placement.clone();
        placements.sort();
        let placement = placements.join("-");

        [
            self.market.as_str(),
            self.language.as_str(),
            self.client.as_str(),
            self.channel.as_str(),
            self.page.as_str(),
            placement.as_str(),
            self.domain.as_str(),
        ]
        .into_iter()
        .map(segment)
        .filter(|part| !part.is_empty())
        .collect()
    }

    /// Build the workflow key, e.g. `CHECKOUT_NIGHTLY_UK_EN_ACME_WEB_HOME_HERO-TOP_SHOP`
    pub fn generate(&self, name: &str, description: &str) -> String {
        let mut parts = vec![segment(name), segment(description)];
        parts.extend(self.segments());
        parts.retain(|part| !part.is_empty());
        parts.join("_")
    }

    /// Recover key fields from a generated key
    ///
    /// Keys with more than seven segments are assumed to start with a name and
    /// a description segment, which are skipped.
    pub fn parse(key: &str) -> Self {
        let parts: Vec<&str> = key.split('_').collect();
        let start = if parts.len() > 7 { 2 } else { 0 };
        let part = |offset: usize| parts.get(start + offset).map(|p| p.to_string()).unwrap_or_default();

        Self {
            market: part(0),
            language: part(1),
            client: part(2),
            channel: part(3),
            page: part(4),
            placement: split_placements(&part(5)),
            domain: part(6),
        }
    }
}

fn segment(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join("_").to_uppercase()
}

fn split_placements(value: &str) -> Vec<String> {
    value
        .split('-')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
