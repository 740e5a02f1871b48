use std::{
    any::{type_name, Any},
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// Object-safe view of a value that can flow through the checker. The type name is captured
/// at construction so that a failed downcast can report what was actually there.
trait Dynamic: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T> Dynamic for T
where
    T: Any + Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// A dynamically typed state, input, or output.
///
/// Cloning a `Value` is cheap: clones share the same immutable payload.
#[derive(Clone)]
pub struct Value(Arc<dyn Dynamic>);

/// Returned when a [`Value`] does not hold the requested type.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("expected a value of type `{expected}` but found `{actual}`")]
pub struct DowncastError {
    pub expected: &'static str,
    pub actual: &'static str,
}

impl Value {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Debug + Send + Sync,
    {
        Value(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Result<&T, DowncastError> {
        (*self.0).as_any().downcast_ref::<T>().ok_or(DowncastError {
            expected: type_name::<T>(),
            actual: self.type_name(),
        })
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.0).as_any().is::<T>()
    }

    /// Whether both values share the same payload. This is the fallback state equality
    /// when a [`Model`](crate::Model) does not provide one, so it only identifies states that
    /// were passed through unchanged.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn type_name(&self) -> &'static str {
        (*self.0).type_name()
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn can_downcast() {
        let v = Value::new(42u64);
        assert!(v.is::<u64>());
        assert_eq!(v.downcast_ref::<u64>(), Ok(&42));
        assert_eq!(
            v.downcast_ref::<String>(),
            Err(DowncastError {
                expected: type_name::<String>(),
                actual: type_name::<u64>(),
            })
        );
    }

    #[test]
    fn can_debug() {
        assert_eq!(format!("{:?}", Value::new("x")), "\"x\"");
        assert_eq!(format!("{:?}", Value::new(Some(3))), "Some(3)");
    }

    #[test]
    fn clones_share_payload() {
        let v = Value::new(vec![1, 2, 3]);
        let w = v.clone();
        assert!(v.ptr_eq(&w));
        assert!(!v.ptr_eq(&Value::new(vec![1, 2, 3])));
    }
}
