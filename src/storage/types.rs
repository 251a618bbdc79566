use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of devlog appears to be running. Please close it and try again.")]
    InstanceLocked,

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, mapping lock conditions to `InstanceLocked`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Row Types
// ============================================================================

/// Row shape of `auth_session`.
pub(crate) type SessionRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    Option<i64>,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_errors_map_to_instance_locked() {
        let err = sqlx::Error::Protocol("database is locked".into());
        assert!(matches!(
            DatabaseError::from_sqlx(err),
            DatabaseError::InstanceLocked
        ));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = sqlx::Error::RowNotFound;
        assert!(matches!(DatabaseError::from_sqlx(err), DatabaseError::Other(_)));
    }
}
