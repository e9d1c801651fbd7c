//! Conversions from external infrastructure errors into domain errors.

use caseload_domain::CaseloadError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CaseloadError);

impl From<InfraError> for CaseloadError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CaseloadError> for InfraError {
    fn from(value: CaseloadError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCaseloadError {
    fn into_caseload(self) -> CaseloadError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CaseloadError */
/* -------------------------------------------------------------------------- */

impl IntoCaseloadError for SqlError {
    fn into_caseload(self) -> CaseloadError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        CaseloadError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        CaseloadError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        CaseloadError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        CaseloadError::Database("foreign key constraint violation".into())
                    }
                    _ => CaseloadError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => CaseloadError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                CaseloadError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                CaseloadError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                CaseloadError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                CaseloadError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => CaseloadError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => CaseloadError::Database("invalid SQL query".into()),
            other => CaseloadError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_caseload())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → CaseloadError */
/* -------------------------------------------------------------------------- */

impl IntoCaseloadError for r2d2::Error {
    fn into_caseload(self) -> CaseloadError {
        CaseloadError::Database(format!("connection pool error: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_caseload())
    }
}
