use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use shared::AppError;
use tracing::warn;

/// `Path` whose rejection is a validation error, so malformed segments get
/// the same 422 JSON body as out-of-range calendar values.
#[derive(Debug)]
pub struct ValidatedPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                warn!("Rejected path {}: {}", parts.uri.path(), rejection.body_text());
                Err(AppError::validation(rejection.body_text()))
            }
        }
    }
}
