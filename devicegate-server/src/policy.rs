//! Authorization policy
//!
//! Maps the result of an allow-list lookup to an authorization decision.
//! An unknown identifier is an authoritative deny, not a failure; every other
//! lookup error is passed through for the caller to report.

use crate::db::{DeviceRecord, StoreError};

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// A stored allow-list record.
    Stored,
    /// No record exists; the zero record was substituted.
    DefaultDeny,
}

/// Outcome of authorizing one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub record: DeviceRecord,
    pub source: DecisionSource,
}

impl Decision {
    pub fn allow(&self) -> bool {
        self.record.allow
    }

    pub fn data(&self) -> &[u8] {
        self.record.data()
    }
}

/// Apply the default-deny policy to a lookup result.
pub fn decide(lookup: Result<DeviceRecord, StoreError>) -> Result<Decision, StoreError> {
    match lookup {
        Ok(record) => Ok(Decision {
            record,
            source: DecisionSource::Stored,
        }),
        Err(StoreError::NotFound) => Ok(Decision {
            record: DeviceRecord::zero(),
            source: DecisionSource::DefaultDeny,
        }),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_stored_record_is_used_as_is() {
        let record = DeviceRecord {
            id: "ABC123".into(),
            allow: true,
            data: Some(b"{}".to_vec()),
            ..DeviceRecord::default()
        };

        let decision = decide(Ok(record.clone())).unwrap();
        assert_eq!(decision.source, DecisionSource::Stored);
        assert_eq!(decision.record, record);
        assert!(decision.allow());
    }

    #[test]
    fn test_stored_deny_is_not_default_deny() {
        let record = DeviceRecord {
            id: "blocked".into(),
            allow: false,
            ..DeviceRecord::default()
        };

        let decision = decide(Ok(record)).unwrap();
        assert_eq!(decision.source, DecisionSource::Stored);
        assert!(!decision.allow());
    }

    #[test]
    fn test_not_found_denies() {
        let decision = decide(Err(StoreError::NotFound)).unwrap();
        assert_eq!(decision.source, DecisionSource::DefaultDeny);
        assert!(!decision.allow());
        assert!(decision.data().is_empty());
    }

    #[test]
    fn test_other_errors_propagate() {
        let result = decide(Err(StoreError::Timeout(Duration::from_secs(5))));
        assert!(matches!(result, Err(StoreError::Timeout(_))));

        let result = decide(Err(StoreError::Connection("refused".into())));
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
