use sea_orm::{DbErr, SqlErr};

/// Failures surfaced by the user directory and the infraction ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] DbErr),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("ban duration {0} does not give a valid expiry")]
    InvalidDuration(chrono::Duration),

    #[error("platform {action} failed: {source}")]
    PlatformActionFailed {
        action: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LedgerError {
    pub fn platform(action: &'static str, source: anyhow::Error) -> Self {
        LedgerError::PlatformActionFailed {
            action,
            source: source.into(),
        }
    }
}

impl From<DbErr> for LedgerError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return LedgerError::DuplicateKey(detail);
        }

        match err {
            DbErr::RecordNotFound(what) => LedgerError::RecordNotFound(what),
            other => LedgerError::StorageUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found_is_classified() {
        let err: LedgerError = DbErr::RecordNotFound("user 42".to_owned()).into();
        assert!(matches!(err, LedgerError::RecordNotFound(ref what) if what == "user 42"));
    }

    #[test]
    fn test_other_errors_are_storage_failures() {
        let err: LedgerError = DbErr::Custom("connection reset".to_owned()).into();
        assert!(matches!(err, LedgerError::StorageUnavailable(_)));
    }

    #[test]
    fn test_platform_failure_keeps_source_message() {
        let err = LedgerError::platform("ban", anyhow::anyhow!("Missing Permissions"));
        assert_eq!(err.to_string(), "platform ban failed: Missing Permissions");
    }
}
