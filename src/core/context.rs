//! The extended-state ("context") carried by every machine snapshot.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait for machine context values.
///
/// Context is opaque to the engine: it is only replaced by assignment
/// actions and read by guards and actions.
///
/// # Required Traits
///
/// - `Clone`: every snapshot owns its own context
/// - `PartialEq`: used to detect eventless transition cycles
/// - `Debug`: diagnostics
/// - `Serialize` + `DeserializeOwned`: snapshots and fingerprints
///
/// Any type meeting the bounds is a context; there is nothing to implement.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Context;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// struct LightContext {
///     elapsed: u32,
/// }
///
/// fn assert_context<C: Context>() {}
/// assert_context::<LightContext>();
/// assert_context::<()>();
/// ```
pub trait Context:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Context for T where
    T: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}
