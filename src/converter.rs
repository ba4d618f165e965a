//! Bidirectional value converters and the registry they are looked up in.
//!
//! A converter translates a semantic type (`InnerId`) to the type that is actually stored
//! (`i64`) and back. The registry is assembled once, validated for duplicates, and then
//! only read.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::datum::{Datum, TypeInfo};
use crate::error::SqlMapperError;

/// Type-erased converter between a semantic type and its wire type.
pub trait ErasedConverter: Send + Sync {
    /// The semantic type the converter is registered for.
    fn semantic_type(&self) -> TypeInfo;
    /// The type the value is stored as.
    fn wire_type(&self) -> TypeInfo;
    /// Semantic -> wire.
    fn forward(&self, value: Datum) -> Result<Datum, SqlMapperError>;
    /// Wire -> semantic.
    fn backward(&self, value: Datum) -> Result<Datum, SqlMapperError>;
}

type ConvertFn<A, B> = Box<dyn Fn(A) -> B + Send + Sync>;

/// A converter built from a pair of functions.
///
/// ```rust
/// use sql_mapper::prelude::*;
///
/// struct InnerId(i64);
/// let converter = ValueConverter::new(|id: InnerId| id.0, InnerId);
/// # let _ = converter;
/// ```
pub struct ValueConverter<S, W> {
    forward: ConvertFn<S, W>,
    backward: ConvertFn<W, S>,
}

impl<S, W> ValueConverter<S, W>
where
    S: Any + Send,
    W: Any + Send,
{
    pub fn new<F, B>(forward: F, backward: B) -> Self
    where
        F: Fn(S) -> W + Send + Sync + 'static,
        B: Fn(W) -> S + Send + Sync + 'static,
    {
        Self {
            forward: Box::new(forward),
            backward: Box::new(backward),
        }
    }
}

fn mismatch(expected: &'static str, found: &Datum) -> SqlMapperError {
    SqlMapperError::TypeMismatch(format!(
        "converter expected {expected} but received {found:?}"
    ))
}

impl<S, W> ErasedConverter for ValueConverter<S, W>
where
    S: Any + Send,
    W: Any + Send,
{
    fn semantic_type(&self) -> TypeInfo {
        TypeInfo::of::<S>()
    }

    fn wire_type(&self) -> TypeInfo {
        TypeInfo::of::<W>()
    }

    fn forward(&self, value: Datum) -> Result<Datum, SqlMapperError> {
        let source = value
            .into_value::<S>()
            .map_err(|d| mismatch(std::any::type_name::<S>(), &d))?;
        Ok(Datum::from_value((self.forward)(source)))
    }

    fn backward(&self, value: Datum) -> Result<Datum, SqlMapperError> {
        let wire = value
            .into_value::<W>()
            .map_err(|d| mismatch(std::any::type_name::<W>(), &d))?;
        Ok(Datum::from_value((self.backward)(wire)))
    }
}

/// Shared handle to a registered converter. Equality is identity.
#[derive(Clone)]
pub struct ConverterRef(Arc<dyn ErasedConverter>);

impl ConverterRef {
    pub fn new<C: ErasedConverter + 'static>(converter: C) -> Self {
        Self(Arc::new(converter))
    }

    #[must_use]
    pub fn from_arc(converter: Arc<dyn ErasedConverter>) -> Self {
        Self(converter)
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &ConverterRef) -> bool {
        self.identity() == other.identity()
    }
}

impl std::ops::Deref for ConverterRef {
    type Target = dyn ErasedConverter;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for ConverterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConverterRef({:?} <-> {:?})",
            self.0.semantic_type(),
            self.0.wire_type()
        )
    }
}

/// Immutable map from semantic type to converter.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    by_type: Arc<HashMap<TypeId, ConverterRef>>,
}

impl ConverterRegistry {
    #[must_use]
    pub fn builder() -> ConverterRegistryBuilder {
        ConverterRegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, semantic: TypeId) -> Option<&ConverterRef> {
        self.by_type.get(&semantic)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.by_type.values()).finish()
    }
}

/// Collects converters and rejects a second converter for the same semantic type.
#[derive(Default)]
pub struct ConverterRegistryBuilder {
    by_type: HashMap<TypeId, ConverterRef>,
}

impl ConverterRegistryBuilder {
    /// Register a converter.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` if the semantic type already has a converter.
    pub fn register<C: ErasedConverter + 'static>(
        self,
        converter: C,
    ) -> Result<Self, SqlMapperError> {
        self.register_shared(ConverterRef::new(converter))
    }

    /// Register an already shared converter handle.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` if the semantic type already has a converter.
    pub fn register_shared(mut self, converter: ConverterRef) -> Result<Self, SqlMapperError> {
        let semantic = converter.semantic_type();
        if self.by_type.contains_key(&semantic.id()) {
            return Err(SqlMapperError::ConfigError(format!(
                "duplicate converter: a value converter for {semantic:?} is already registered"
            )));
        }
        self.by_type.insert(semantic.id(), converter);
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> ConverterRegistry {
        ConverterRegistry {
            by_type: Arc::new(self.by_type),
        }
    }
}

/// Assigns each distinct converter (by identity) a stable slot while a plan compiles.
#[derive(Default)]
pub(crate) struct ConverterSlots {
    slots: HashMap<usize, usize>,
    converters: Vec<ConverterRef>,
}

impl ConverterSlots {
    pub(crate) fn slot_for(&mut self, converter: &ConverterRef) -> usize {
        let next = self.converters.len();
        let slot = *self.slots.entry(converter.identity()).or_insert(next);
        if slot == next {
            self.converters.push(converter.clone());
        }
        slot
    }

    pub(crate) fn into_converters(self) -> Vec<ConverterRef> {
        self.converters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct InnerId(i64);

    fn inner_id_converter() -> ValueConverter<InnerId, i64> {
        ValueConverter::new(|id: InnerId| id.0, InnerId)
    }

    #[test]
    fn forward_then_backward_is_identity() {
        let c = inner_id_converter();
        let wire = c.forward(Datum::from_value(InnerId(41))).unwrap();
        assert!(matches!(wire, Datum::I64(41)));
        let back = c.backward(wire).unwrap().into_value::<InnerId>().unwrap();
        assert_eq!(back, InnerId(41));
    }

    #[test]
    fn wrong_input_type_is_a_mismatch() {
        let c = inner_id_converter();
        let err = c.backward(Datum::from_value("nope".to_string())).unwrap_err();
        assert!(matches!(err, SqlMapperError::TypeMismatch(_)));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = ConverterRegistry::builder()
            .register(inner_id_converter())
            .unwrap()
            .register(ValueConverter::new(|id: InnerId| id.0.to_string(), |_s: String| InnerId(0)))
            .err()
            .unwrap();
        assert!(err.is_config());
        assert!(err.to_string().contains("duplicate converter"));
    }

    #[test]
    fn registry_lookup_by_semantic_type() {
        let registry = ConverterRegistry::builder()
            .register(inner_id_converter())
            .unwrap()
            .build();
        assert_eq!(registry.len(), 1);
        let found = registry.get(TypeId::of::<InnerId>()).unwrap();
        assert_eq!(found.wire_type(), TypeInfo::of::<i64>());
        assert!(registry.get(TypeId::of::<i64>()).is_none());
    }

    #[test]
    fn slots_deduplicate_by_identity() {
        let a = ConverterRef::new(inner_id_converter());
        let b = ConverterRef::new(inner_id_converter());
        let mut slots = ConverterSlots::default();
        assert_eq!(slots.slot_for(&a), 0);
        assert_eq!(slots.slot_for(&b), 1);
        assert_eq!(slots.slot_for(&a.clone()), 0);
        assert_eq!(slots.into_converters().len(), 2);
    }
}
