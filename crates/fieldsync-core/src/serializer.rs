//! Value codecs.
//!
//! A [`Serializer`] is bound to exactly one value type and converts it to and
//! from the text stored in a field table's `data` column. Types that can be
//! encoded by the generic structured fallback opt in through
//! [`FieldValue::structured`].

use crate::SerializationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// Bidirectional codec between one value type and its textual form.
///
/// Both directions fail with [`SerializationError`] on malformed or
/// incompatible payloads and never hand back a partially populated value.
pub trait Serializer<T>: Send + Sync {
    /// Encodes `value` to text.
    fn serialize(&self, value: &T) -> Result<String, SerializationError>;

    /// Decodes text produced by a compatible [`Serializer::serialize`].
    fn deserialize(&self, data: &str) -> Result<T, SerializationError>;
}

/// A value type that can be carried by a field accessor.
pub trait FieldValue: Send + 'static {
    /// Builds a serializer for `Self` from the generic structured codec.
    ///
    /// Returns `None` (the default) for types the fallback cannot encode; the
    /// registry then treats the type as having no serializer.
    fn structured(codec: FallbackCodec) -> Option<Arc<dyn Serializer<Self>>>
    where
        Self: Sized,
    {
        let _ = codec;
        None
    }
}

/// Implements [`FieldValue`] for serde types, opting them into the
/// structured fallback codec.
#[macro_export]
macro_rules! structured_field_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::FieldValue for $ty {
                fn structured(
                    codec: $crate::FallbackCodec,
                ) -> ::std::option::Option<::std::sync::Arc<dyn $crate::Serializer<Self>>> {
                    ::std::option::Option::Some(codec.serializer::<Self>())
                }
            }
        )+
    };
}

structured_field_value!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String);

/// Generic structured encoding used to synthesize missing serializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FallbackCodec {
    /// Compact JSON via serde_json.
    #[default]
    Json,
}

impl FallbackCodec {
    /// Builds a serializer for `T` using this codec.
    pub fn serializer<T>(&self) -> Arc<dyn Serializer<T>>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        match self {
            Self::Json => Arc::new(JsonSerializer::<T>::new()),
        }
    }
}

/// serde_json backed serializer.
pub struct JsonSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSerializer")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Serializer<T> for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<String, SerializationError> {
        let type_name = std::any::type_name::<T>();
        let text = serde_json::to_string(value)
            .map_err(|e| SerializationError::encode(type_name, e.to_string()))?;
        // serde_json writes NaN and infinities as `null`, which no float decodes.
        serde_json::from_str::<T>(&text).map_err(|e| {
            SerializationError::encode(type_name, format!("{text} does not decode back: {e}"))
        })?;
        Ok(text)
    }

    fn deserialize(&self, data: &str) -> Result<T, SerializationError> {
        serde_json::from_str(data)
            .map_err(|e| SerializationError::decode(std::any::type_name::<T>(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pouch {
        coins: u32,
        label: String,
    }

    #[test]
    fn json_float_keeps_fraction_marker() {
        let codec = JsonSerializer::<f64>::new();
        assert_eq!(codec.serialize(&14.0).unwrap(), "14.0");
        assert_eq!(codec.deserialize("14.0").unwrap(), 14.0);
    }

    #[test]
    fn non_finite_floats_fail_to_encode() {
        let doubles = JsonSerializer::<f64>::new();
        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = doubles.serialize(&value).unwrap_err();
            assert_eq!(err.direction, "serialize");
            assert_eq!(err.type_name, "f64");
        }

        let singles = JsonSerializer::<f32>::new();
        for value in [f32::INFINITY, f32::NAN] {
            assert_eq!(singles.serialize(&value).unwrap_err().type_name, "f32");
        }
        assert_eq!(singles.serialize(&0.5).unwrap(), "0.5");
    }

    #[test]
    fn non_finite_float_inside_a_struct_fails_to_encode() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Vector {
            x: f64,
            y: f64,
        }
        let codec = FallbackCodec::Json.serializer::<Vector>();
        assert!(codec.serialize(&Vector { x: 1.0, y: 2.0 }).is_ok());
        assert!(codec.serialize(&Vector { x: f64::NAN, y: 2.0 }).is_err());
    }

    #[test]
    fn json_round_trips_primitives() {
        let ints = JsonSerializer::<i32>::new();
        assert_eq!(ints.deserialize(&ints.serialize(&-7).unwrap()).unwrap(), -7);

        let strings = JsonSerializer::<String>::new();
        let text = "miner's \"lucky\" pick".to_string();
        assert_eq!(
            strings.deserialize(&strings.serialize(&text).unwrap()).unwrap(),
            text
        );

        let flags = JsonSerializer::<bool>::new();
        assert!(flags.deserialize(&flags.serialize(&true).unwrap()).unwrap());
    }

    #[test]
    fn json_round_trips_structs() {
        let codec = FallbackCodec::Json.serializer::<Pouch>();
        let pouch = Pouch {
            coins: 12,
            label: "spare".into(),
        };
        let text = codec.serialize(&pouch).unwrap();
        assert_eq!(codec.deserialize(&text).unwrap(), pouch);
    }

    #[test]
    fn incompatible_payload_is_a_decode_error() {
        let codec = JsonSerializer::<Pouch>::new();
        let err = codec.deserialize("{\"coins\":\"many\"}").unwrap_err();
        assert_eq!(err.direction, "deserialize");
        assert!(err.type_name.ends_with("Pouch"));

        let floats = JsonSerializer::<f64>::new();
        assert!(floats.deserialize("fourteen").is_err());
    }

    #[test]
    fn primitives_opt_into_fallback() {
        assert!(<f64 as FieldValue>::structured(FallbackCodec::Json).is_some());
        assert!(<String as FieldValue>::structured(FallbackCodec::Json).is_some());
    }

    #[test]
    fn types_without_opt_in_have_no_fallback() {
        struct Opaque;
        impl FieldValue for Opaque {}
        assert!(<Opaque as FieldValue>::structured(FallbackCodec::Json).is_none());
    }
}
