//! Shapes behind the `Schema` combinators.
//!
//! Each wrapper holds the schema it was derived from and delegates to it;
//! none of them keeps per-call state. Callbacks sit behind an `Arc` so a
//! wrapper can be rebuilt around a coerced copy of its inner schema.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ErrorKind, SerializeError};
use crate::outcome::{Failure, Outcome};
use crate::schema::{Schema, Shape};

pub(crate) struct Optional<T> {
    inner: Schema<T>,
}

impl<T> Optional<T> {
    pub(crate) fn new(inner: Schema<T>) -> Self {
        Self { inner }
    }
}

impl<T: Send + Sync + 'static> Shape<Option<T>> for Optional<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<Option<T>> {
        match self.inner.parse_input(raw) {
            Ok(value) => Ok(Some(value)),
            Err(failure) if failure.is_missing() => Ok(None),
            Err(failure) => Err(failure),
        }
    }

    fn serialize(&self, value: &Option<T>) -> Result<Value, SerializeError> {
        match value {
            Some(value) => self.inner.serialize(value),
            None => Ok(Value::Null),
        }
    }

    fn serialize_field(&self, value: &Option<T>) -> Result<Option<Value>, SerializeError> {
        match value {
            Some(value) => self.inner.serialize_field(value),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("{}?", self.inner.describe())
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<Option<T>>>> {
        Some(Arc::new(Optional::new(self.inner.coerced())))
    }

    fn check(&self, value: &Option<T>) -> bool {
        value.as_ref().is_none_or(|value| self.inner.validate(value))
    }
}

pub(crate) struct Nullable<T> {
    inner: Schema<T>,
}

impl<T> Nullable<T> {
    pub(crate) fn new(inner: Schema<T>) -> Self {
        Self { inner }
    }
}

impl<T: Send + Sync + 'static> Shape<Option<T>> for Nullable<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<Option<T>> {
        match raw {
            Some(Value::Null) => Ok(None),
            _ => self.inner.parse_input(raw).map(Some),
        }
    }

    fn serialize(&self, value: &Option<T>) -> Result<Value, SerializeError> {
        match value {
            Some(value) => self.inner.serialize(value),
            None => Ok(Value::Null),
        }
    }

    fn describe(&self) -> String {
        format!("{} | null", self.inner.describe())
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<Option<T>>>> {
        Some(Arc::new(Nullable::new(self.inner.coerced())))
    }

    fn check(&self, value: &Option<T>) -> bool {
        value.as_ref().is_none_or(|value| self.inner.validate(value))
    }
}

pub(crate) struct DefaultTo<T> {
    inner: Schema<T>,
    value: T,
}

impl<T> DefaultTo<T> {
    pub(crate) fn new(inner: Schema<T>, value: T) -> Self {
        Self { inner, value }
    }
}

impl<T: Clone + Send + Sync + 'static> Shape<T> for DefaultTo<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<T> {
        self.inner
            .parse_input(raw)
            .or_else(|_| Ok(self.value.clone()))
    }

    fn serialize(&self, value: &T) -> Result<Value, SerializeError> {
        self.inner.serialize(value)
    }

    fn serialize_field(&self, value: &T) -> Result<Option<Value>, SerializeError> {
        self.inner.serialize_field(value)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<T>>> {
        Some(Arc::new(DefaultTo::new(self.inner.coerced(), self.value.clone())))
    }

    fn check(&self, value: &T) -> bool {
        self.inner.validate(value)
    }
}

pub(crate) struct Transform<T, F> {
    inner: Schema<T>,
    f: Arc<F>,
}

impl<T, F> Transform<T, F> {
    pub(crate) fn new(inner: Schema<T>, f: F) -> Self {
        Self {
            inner,
            f: Arc::new(f),
        }
    }
}

impl<T, F> Shape<T> for Transform<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(Outcome<T>, Option<&Value>) -> Outcome<T> + Send + Sync + 'static,
{
    fn parse(&self, raw: Option<&Value>) -> Outcome<T> {
        let outcome = self
            .inner
            .parse_input(raw)
            .map_err(|failure| failure.with_input(raw));
        (self.f)(outcome, raw)
    }

    fn serialize(&self, value: &T) -> Result<Value, SerializeError> {
        self.inner.serialize(value)
    }

    fn serialize_field(&self, value: &T) -> Result<Option<Value>, SerializeError> {
        self.inner.serialize_field(value)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<T>>> {
        Some(Arc::new(Transform {
            inner: self.inner.coerced(),
            f: Arc::clone(&self.f),
        }))
    }

    fn check(&self, value: &T) -> bool {
        self.inner.validate(value)
    }
}

pub(crate) struct Then<T, F> {
    inner: Schema<T>,
    f: Arc<F>,
}

impl<T, F> Then<T, F> {
    pub(crate) fn new(inner: Schema<T>, f: F) -> Self {
        Self {
            inner,
            f: Arc::new(f),
        }
    }
}

impl<T, F> Shape<T> for Then<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(T) -> T + Send + Sync + 'static,
{
    fn parse(&self, raw: Option<&Value>) -> Outcome<T> {
        self.inner.parse_input(raw).map(|value| (self.f)(value))
    }

    fn serialize(&self, value: &T) -> Result<Value, SerializeError> {
        self.inner.serialize(value)
    }

    fn serialize_field(&self, value: &T) -> Result<Option<Value>, SerializeError> {
        self.inner.serialize_field(value)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<T>>> {
        Some(Arc::new(Then {
            inner: self.inner.coerced(),
            f: Arc::clone(&self.f),
        }))
    }

    fn check(&self, value: &T) -> bool {
        self.inner.validate(value)
    }
}

pub(crate) struct Catch<T, F> {
    inner: Schema<T>,
    f: Arc<F>,
}

impl<T, F> Catch<T, F> {
    pub(crate) fn new(inner: Schema<T>, f: F) -> Self {
        Self {
            inner,
            f: Arc::new(f),
        }
    }
}

impl<T, F> Shape<T> for Catch<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(Failure) -> Outcome<T> + Send + Sync + 'static,
{
    fn parse(&self, raw: Option<&Value>) -> Outcome<T> {
        self.inner
            .parse_input(raw)
            .or_else(|failure| (self.f)(failure.with_input(raw)))
    }

    fn serialize(&self, value: &T) -> Result<Value, SerializeError> {
        self.inner.serialize(value)
    }

    fn serialize_field(&self, value: &T) -> Result<Option<Value>, SerializeError> {
        self.inner.serialize_field(value)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<T>>> {
        Some(Arc::new(Catch {
            inner: self.inner.coerced(),
            f: Arc::clone(&self.f),
        }))
    }

    fn check(&self, value: &T) -> bool {
        self.inner.validate(value)
    }
}

pub(crate) struct Refine<T, P> {
    inner: Schema<T>,
    predicate: Arc<P>,
    message: String,
}

impl<T, P> Refine<T, P> {
    pub(crate) fn new(inner: Schema<T>, predicate: P, message: String) -> Self {
        Self {
            inner,
            predicate: Arc::new(predicate),
            message,
        }
    }
}

impl<T, P> Shape<T> for Refine<T, P>
where
    T: Send + Sync + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn parse(&self, raw: Option<&Value>) -> Outcome<T> {
        let value = self.inner.parse_input(raw)?;
        if (self.predicate)(&value) {
            Ok(value)
        } else {
            Err(Failure::new(ErrorKind::Invalid, self.message.clone()))
        }
    }

    fn serialize(&self, value: &T) -> Result<Value, SerializeError> {
        self.inner.serialize(value)
    }

    fn serialize_field(&self, value: &T) -> Result<Option<Value>, SerializeError> {
        self.inner.serialize_field(value)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<T>>> {
        Some(Arc::new(Refine {
            inner: self.inner.coerced(),
            predicate: Arc::clone(&self.predicate),
            message: self.message.clone(),
        }))
    }

    fn check(&self, value: &T) -> bool {
        (self.predicate)(value) && self.inner.validate(value)
    }
}

pub(crate) struct Map<T, F, B> {
    inner: Schema<T>,
    forward: Arc<F>,
    backward: Arc<B>,
}

impl<T, F, B> Map<T, F, B> {
    pub(crate) fn new(inner: Schema<T>, forward: F, backward: B) -> Self {
        Self {
            inner,
            forward: Arc::new(forward),
            backward: Arc::new(backward),
        }
    }
}

impl<T, U, F, B> Shape<U> for Map<T, F, B>
where
    T: Send + Sync + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
    B: Fn(&U) -> Option<T> + Send + Sync + 'static,
{
    fn parse(&self, raw: Option<&Value>) -> Outcome<U> {
        self.inner.parse_input(raw).map(|value| (self.forward)(value))
    }

    fn serialize(&self, value: &U) -> Result<Value, SerializeError> {
        let inner = (self.backward)(value).ok_or_else(|| SerializeError::mismatch(self.inner.describe()))?;
        self.inner.serialize(&inner)
    }

    fn serialize_field(&self, value: &U) -> Result<Option<Value>, SerializeError> {
        let inner = (self.backward)(value).ok_or_else(|| SerializeError::mismatch(self.inner.describe()))?;
        self.inner.serialize_field(&inner)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<U>>> {
        Some(Arc::new(Map {
            inner: self.inner.coerced(),
            forward: Arc::clone(&self.forward),
            backward: Arc::clone(&self.backward),
        }))
    }

    fn check(&self, value: &U) -> bool {
        (self.backward)(value).is_some_and(|inner| self.inner.validate(&inner))
    }
}

pub(crate) struct TryMap<T, F, B> {
    inner: Schema<T>,
    forward: Arc<F>,
    backward: Arc<B>,
}

impl<T, F, B> TryMap<T, F, B> {
    pub(crate) fn new(inner: Schema<T>, forward: F, backward: B) -> Self {
        Self {
            inner,
            forward: Arc::new(forward),
            backward: Arc::new(backward),
        }
    }
}

impl<T, U, F, B> Shape<U> for TryMap<T, F, B>
where
    T: Send + Sync + 'static,
    F: Fn(T) -> Result<U, String> + Send + Sync + 'static,
    B: Fn(&U) -> Option<T> + Send + Sync + 'static,
{
    fn parse(&self, raw: Option<&Value>) -> Outcome<U> {
        let value = self.inner.parse_input(raw)?;
        (self.forward)(value).map_err(|message| Failure::new(ErrorKind::Invalid, message))
    }

    fn serialize(&self, value: &U) -> Result<Value, SerializeError> {
        let inner = (self.backward)(value).ok_or_else(|| SerializeError::mismatch(self.inner.describe()))?;
        self.inner.serialize(&inner)
    }

    fn serialize_field(&self, value: &U) -> Result<Option<Value>, SerializeError> {
        let inner = (self.backward)(value).ok_or_else(|| SerializeError::mismatch(self.inner.describe()))?;
        self.inner.serialize_field(&inner)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<U>>> {
        Some(Arc::new(TryMap {
            inner: self.inner.coerced(),
            forward: Arc::clone(&self.forward),
            backward: Arc::clone(&self.backward),
        }))
    }

    fn check(&self, value: &U) -> bool {
        (self.backward)(value).is_some_and(|inner| {
            self.inner.validate(&inner) && (self.forward)(inner).is_ok()
        })
    }
}
