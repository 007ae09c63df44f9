//! Backend error translation.

use memories_error::{BackendError, BackendErrorKind, StorageError, StorageErrorKind};

/// Translate a backend failure into the kind callers see, logging it first.
///
/// Only an unambiguous not-found stays `NotFound`; every other backend
/// failure becomes `StoreUnavailable`.
#[track_caller]
pub(crate) fn translate(
    operation: &'static str,
    namespace: &str,
    key: Option<&str>,
    err: BackendError,
) -> StorageError {
    let key = key.unwrap_or("-");
    match &err.kind {
        BackendErrorKind::NotFound(missing) => {
            tracing::warn!(operation, namespace, key, error = %err, "Object not found");
            StorageError::new(StorageErrorKind::NotFound(missing.clone()))
        }
        BackendErrorKind::AlreadyExists(_) => {
            tracing::error!(operation, namespace, key, error = %err, "Storage key collision");
            StorageError::new(StorageErrorKind::StoreUnavailable(err.kind.to_string()))
        }
        BackendErrorKind::Io(_) | BackendErrorKind::Unavailable(_) => {
            tracing::error!(operation, namespace, key, error = %err, "Backend operation failed");
            StorageError::new(StorageErrorKind::StoreUnavailable(err.kind.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_stays_not_found() {
        let err = BackendError::new(BackendErrorKind::NotFound("events/e/1-a.jpg".into()));
        let translated = translate("share_file", "e", Some("events/e/1-a.jpg"), err);
        assert_eq!(
            translated.kind,
            StorageErrorKind::NotFound("events/e/1-a.jpg".into())
        );
    }

    #[test]
    fn test_everything_else_is_unavailable() {
        for kind in [
            BackendErrorKind::AlreadyExists("k".into()),
            BackendErrorKind::Io("disk full".into()),
            BackendErrorKind::Unavailable("503".into()),
        ] {
            let translated = translate("put", "e", None, BackendError::new(kind));
            assert!(matches!(
                translated.kind,
                StorageErrorKind::StoreUnavailable(_)
            ));
        }
    }
}
