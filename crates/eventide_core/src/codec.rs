//! Mapping entry type tags to typed payloads.

use crate::error::{CoreError, CoreResult};
use eventide_journal::EntryValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

type Decoder<T> = Box<dyn Fn(&str) -> serde_json::Result<T> + Send + Sync>;

/// Serializes a payload for storage as an entry body or snapshot.
///
/// # Errors
///
/// Returns [`CoreError::Codec`] if serialization fails.
pub fn encode<E: Serialize + ?Sized>(value: &E) -> CoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decoders for entry bodies, keyed by entry type.
///
/// Every registered payload type is decoded from JSON and converted into
/// the common type `T`, usually an enum with one variant per event.
///
/// ```
/// use eventide_core::TypeRegistry;
/// use eventide_journal::EntryValue;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Deposited { amount: u64 }
///
/// enum AccountEvent { Deposited(u64) }
///
/// impl From<Deposited> for AccountEvent {
///     fn from(e: Deposited) -> Self { AccountEvent::Deposited(e.amount) }
/// }
///
/// let mut types = TypeRegistry::<AccountEvent>::new();
/// types.register::<Deposited>("Deposited");
///
/// let entry = EntryValue::new("account_1", 0, "Deposited", r#"{"amount":5}"#, "");
/// let AccountEvent::Deposited(amount) = types.decode(&entry).unwrap();
/// assert_eq!(amount, 5);
/// ```
pub struct TypeRegistry<T> {
    decoders: HashMap<String, Decoder<T>>,
}

impl<T> TypeRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers `E` as the payload of entries typed `tag`.
    ///
    /// A later registration for the same tag replaces the earlier one.
    pub fn register<E>(&mut self, tag: impl Into<String>) -> &mut Self
    where
        E: DeserializeOwned + Into<T> + 'static,
        T: 'static,
    {
        self.decoders.insert(
            tag.into(),
            Box::new(|body: &str| serde_json::from_str::<E>(body).map(Into::into)),
        );
        self
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<E>(mut self, tag: impl Into<String>) -> Self
    where
        E: DeserializeOwned + Into<T> + 'static,
        T: 'static,
    {
        self.register::<E>(tag);
        self
    }

    /// Returns true if a decoder is registered for `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Decodes the body of `entry` according to its entry type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] if the entry type was never
    /// registered, or [`CoreError::Codec`] if the body does not match it.
    pub fn decode(&self, entry: &EntryValue) -> CoreResult<T> {
        let decoder = self
            .decoders
            .get(&entry.entry_type)
            .ok_or_else(|| CoreError::unknown_type(&entry.entry_type))?;
        Ok(decoder(&entry.body)?)
    }
}

impl<T> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.decoders.keys().collect();
        tags.sort();
        f.debug_struct("TypeRegistry").field("tags", &tags).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Renamed {
        name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Discontinued;

    #[derive(Debug, PartialEq)]
    enum ProductEvent {
        Renamed(String),
        Discontinued,
    }

    impl From<Renamed> for ProductEvent {
        fn from(e: Renamed) -> Self {
            Self::Renamed(e.name)
        }
    }

    impl From<Discontinued> for ProductEvent {
        fn from(_: Discontinued) -> Self {
            Self::Discontinued
        }
    }

    fn registry() -> TypeRegistry<ProductEvent> {
        TypeRegistry::new()
            .with::<Renamed>("Renamed")
            .with::<Discontinued>("Discontinued")
    }

    #[test]
    fn decodes_by_entry_type() {
        let types = registry();
        let body = encode(&Renamed { name: "lamp".into() }).unwrap();
        let renamed = EntryValue::new("product_1", 0, "Renamed", body, "");
        let gone = EntryValue::new("product_1", 1, "Discontinued", "null", "");

        assert_eq!(
            types.decode(&renamed).unwrap(),
            ProductEvent::Renamed("lamp".into())
        );
        assert_eq!(types.decode(&gone).unwrap(), ProductEvent::Discontinued);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let types = registry();
        assert!(types.contains("Renamed"));
        assert!(!types.contains("Priced"));

        let entry = EntryValue::new("product_1", 0, "Priced", "{}", "");
        assert!(matches!(
            types.decode(&entry),
            Err(CoreError::UnknownType { type_tag }) if type_tag == "Priced"
        ));
    }

    #[test]
    fn malformed_body_is_a_codec_error() {
        let entry = EntryValue::new("product_1", 0, "Renamed", "{\"nom\":1}", "");
        assert!(matches!(registry().decode(&entry), Err(CoreError::Codec(_))));
    }
}
