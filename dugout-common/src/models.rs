//! Record models shared by the server and client
//!
//! `RawRecord` is the upstream shape (untrusted rank, loosely typed numbers).
//! `Record` is the stored shape after rank correction.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stored record with a finalized rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identity assigned at import time
    pub id: Uuid,
    /// Rank in `1..=N`, assigned only by rank correction
    pub rank: u32,
    /// Player name
    pub name: String,
    /// Age during the season, when known
    pub age: Option<u32>,
    /// Hit count (the ranking score)
    pub hits: u32,
    /// Season year, when known
    pub year: Option<i32>,
    /// Batting side (e.g. "L", "R", "B")
    pub bats: String,
    /// Generated summary; empty until generation completes
    #[serde(default)]
    pub result: String,
}

impl Record {
    /// Build a stored record from an upstream record and its corrected rank
    ///
    /// Missing or malformed upstream values fall back to empty/zero/None.
    pub fn from_raw(id: Uuid, rank: u32, raw: &RawRecord) -> Self {
        Self {
            id,
            rank,
            name: raw.player.clone().unwrap_or_default(),
            age: raw.age.and_then(|a| u32::try_from(a).ok()),
            hits: raw.score(),
            year: raw.year.and_then(|y| i32::try_from(y).ok()),
            bats: raw.bats.clone().unwrap_or_default(),
            result: String::new(),
        }
    }

    /// True once a generated summary has been stored
    pub fn has_result(&self) -> bool {
        !self.result.is_empty()
    }
}

/// Upstream record before rank correction
///
/// Field names follow the upstream JSON. Numeric fields are accepted
/// either as numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Provisional rank from upstream (may collide, never trusted)
    #[serde(rename = "Rank", default, deserialize_with = "lenient_number")]
    pub rank: Option<i64>,
    #[serde(rename = "Player", default)]
    pub player: Option<String>,
    #[serde(rename = "AgeThatYear", default, deserialize_with = "lenient_number")]
    pub age: Option<i64>,
    #[serde(rename = "Hits", default, deserialize_with = "lenient_number")]
    pub hits: Option<i64>,
    #[serde(rename = "Year", default, deserialize_with = "lenient_number")]
    pub year: Option<i64>,
    #[serde(rename = "Bats", default)]
    pub bats: Option<String>,
}

impl RawRecord {
    /// Comparable score used for ranking (hit count, 0 when absent or negative)
    pub fn score(&self) -> u32 {
        self.hits
            .and_then(|h| u32::try_from(h).ok())
            .unwrap_or(0)
    }
}

/// Accept a JSON number, a numeric string, or null
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }))
}

/// Partial record update
///
/// Identity and rank are not updatable; unknown fields in the request body
/// (including `id` and `rank`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bats: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl RecordUpdate {
    /// Overwrite the provided fields on `record`
    pub fn apply_to(&self, record: &mut Record) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(age) = self.age {
            record.age = Some(age);
        }
        if let Some(hits) = self.hits {
            record.hits = hits;
        }
        if let Some(year) = self.year {
            record.year = Some(year);
        }
        if let Some(bats) = &self.bats {
            record.bats = bats.clone();
        }
        if let Some(result) = &self.result {
            record.result = result.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Request to generate a summary for one record
///
/// Built fresh per selection from the record's display fields; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: Uuid,
    pub name: String,
    pub year: Option<i32>,
    pub hits: u32,
    pub age: Option<u32>,
    pub bats: String,
}

impl From<&Record> for GenerationRequest {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            year: record.year,
            hits: record.hits,
            age: record.age,
            bats: record.bats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_accepts_numeric_strings() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"Rank":"3","Player":"Ichiro Suzuki","AgeThatYear":"30","Hits":262,"Year":2004,"Bats":"L"}"#,
        )
        .unwrap();

        assert_eq!(raw.rank, Some(3));
        assert_eq!(raw.age, Some(30));
        assert_eq!(raw.score(), 262);
        assert_eq!(raw.year, Some(2004));
    }

    #[test]
    fn raw_record_tolerates_missing_and_garbage_fields() {
        let raw: RawRecord =
            serde_json::from_str(r#"{"Player":"Nobody","AgeThatYear":"n/a","Hits":null}"#).unwrap();

        assert_eq!(raw.age, None);
        assert_eq!(raw.score(), 0);

        let record = Record::from_raw(Uuid::new_v4(), 1, &raw);
        assert_eq!(record.name, "Nobody");
        assert_eq!(record.bats, "");
        assert_eq!(record.year, None);
        assert!(!record.has_result());
    }

    #[test]
    fn update_ignores_rank_and_id_fields() {
        let update: RecordUpdate = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000000","rank":1,"name":"Renamed"}"#,
        )
        .unwrap();

        assert_eq!(update.name.as_deref(), Some("Renamed"));
        assert_eq!(update.hits, None);
        assert!(!update.is_empty());
        assert!(RecordUpdate::default().is_empty());
    }

    #[test]
    fn update_overwrites_only_provided_fields() {
        let mut record = Record {
            id: Uuid::new_v4(),
            rank: 2,
            name: "George Sisler".to_string(),
            age: Some(27),
            hits: 257,
            year: Some(1920),
            bats: "L".to_string(),
            result: String::new(),
        };
        let update = RecordUpdate {
            hits: Some(258),
            result: Some("Edited.".to_string()),
            ..Default::default()
        };

        update.apply_to(&mut record);

        assert_eq!(record.hits, 258);
        assert_eq!(record.result, "Edited.");
        assert_eq!(record.name, "George Sisler");
        assert_eq!(record.rank, 2);
    }
}
