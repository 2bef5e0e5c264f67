use std::fmt;
use std::marker::PhantomData;

use hookq_sdk::{Schema, SchemaError};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

/// Successful response body, tagged with the schema it is expected to match.
///
/// Nothing is validated when a call returns. [`Payload::raw`] is the
/// unchecked accessor; [`Payload::validate`] runs the schema for `T` on the
/// same data.
pub struct Payload<T = Value> {
    value: Value,
    schema: PhantomData<fn() -> T>,
}

impl<T> Payload<T> {
    pub(crate) fn new(value: Value) -> Self {
        Self {
            value,
            schema: PhantomData,
        }
    }

    /// The body exactly as received. `null` when the server sent none.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn into_raw(self) -> Value {
        self.value
    }

    /// Deserializes the body into an arbitrary type, bypassing the schema.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the body does not fit `D`.
    pub fn json<D: DeserializeOwned>(&self) -> Result<D, ClientError> {
        D::deserialize(&self.value)
            .map_err(|e| ClientError::validation(format!("body does not fit target type: {e}")))
    }
}

impl<T: Schema> Payload<T> {
    /// Checks the body against the schema for `T`.
    ///
    /// # Errors
    /// Returns every violated field as a [`SchemaError`].
    pub fn validate(&self) -> Result<T, SchemaError> {
        T::validate(&self.value)
    }

    /// Like [`Payload::validate`], with schema failures folded into
    /// [`ClientError::Validation`].
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] carrying the schema issues.
    pub fn into_validated(self) -> Result<T, ClientError> {
        Ok(T::validate(&self.value)?)
    }
}

impl<T> Clone for Payload<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> fmt::Debug for Payload<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("schema", &std::any::type_name::<T>())
            .field("value", &self.value)
            .finish()
    }
}
