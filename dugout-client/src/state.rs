//! Client view state

use dugout_common::Record;
use uuid::Uuid;

/// What the client shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Record list in server order
    pub records: Vec<Record>,
    /// Record whose description is shown
    pub selected: Option<Uuid>,
    /// Description text (live buffer while generating)
    pub displayed: String,
    /// A transmission is in progress for `selected`
    pub generating: bool,
    /// The last transmission ended without completing
    pub failed: bool,
}

impl ViewState {
    /// Replace the in-memory copy of a record, if listed
    pub fn replace_record(&mut self, record: Record) -> bool {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }
}
