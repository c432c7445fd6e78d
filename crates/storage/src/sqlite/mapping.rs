use exam_core::model::QuizToken;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(field: &'static str, raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("invalid {field}: {e}")))
}

pub(crate) fn token_from_str(raw: &str) -> Result<QuizToken, StorageError> {
    raw.parse()
        .map_err(|_| StorageError::Serialization(format!("invalid token: {raw}")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_u32() {
        assert!(u32_from_i64("time_limit_secs", -1).is_err());
        assert_eq!(u32_from_i64("time_limit_secs", 60).unwrap(), 60);
    }

    #[test]
    fn json_errors_name_the_field() {
        let err = from_json::<Vec<String>>("question_bag", "{").unwrap_err();
        assert!(err.to_string().contains("question_bag"));
    }
}
