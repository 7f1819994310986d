// crates/hooks/src/view.rs
use std::sync::Arc;

use grantswipe_cache::QuerySnapshot;
use grantswipe_types::ApiError;
use serde::de::DeserializeOwned;

/// Typed view of a cache snapshot, as handed to presentation components.
#[derive(Debug, Clone)]
pub struct HookView<T> {
    /// Decoded payload; stale data is kept visible during refetches.
    pub data: Option<T>,
    pub error: Option<Arc<ApiError>>,
    pub is_loading: bool,
    /// False while the session gate keeps the hook disabled.
    pub enabled: bool,
}

impl<T> HookView<T> {
    /// View of a hook whose session gate is closed. Not an error state.
    pub fn disabled() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            enabled: false,
        }
    }
}

impl<T: DeserializeOwned> HookView<T> {
    pub fn from_query(snapshot: &QuerySnapshot) -> Self {
        let mut error = snapshot.error.clone();
        let data = match &snapshot.data {
            Some(value) => match serde_json::from_value::<T>((**value).clone()) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    error = Some(Arc::new(ApiError::Decode(e.to_string())));
                    None
                }
            },
            None => None,
        };
        Self {
            data,
            error,
            is_loading: snapshot.is_loading,
            enabled: true,
        }
    }
}
