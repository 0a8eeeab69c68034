//! Objects of the embedded foreign runtime: attribute maps plus named
//! callables, shared by reference count.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::adapter::value::ForeignValue;
use crate::error::AdapterError;
use crate::FastIndexMap;

/// A callable attribute: receives the object it is bound to and the
/// call arguments, returns a value or raises.
pub type ForeignCallable =
    Rc<dyn Fn(&ForeignObjectRef, Vec<ForeignValue>) -> Result<ForeignValue, AdapterError>>;

/// One foreign object: a class name, plain attributes and callables.
pub struct ForeignObject {
    class_name: String,
    attributes: FastIndexMap<String, ForeignValue>,
    methods: FastIndexMap<String, ForeignCallable>,
}

impl ForeignObject {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            attributes: FastIndexMap::default(),
            methods: FastIndexMap::default(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn set_attribute(&mut self, name: &str, value: ForeignValue) {
        self.attributes.insert(name.to_string(), value);
    }

    pub fn attribute(&self, name: &str) -> Option<&ForeignValue> {
        self.attributes.get(name)
    }

    pub fn define_method(&mut self, name: &str, callable: ForeignCallable) {
        self.methods.insert(name.to_string(), callable);
    }

    /// Builder-style variant of [`Self::define_method`].
    pub fn with_method(mut self, name: &str, callable: ForeignCallable) -> Self {
        self.define_method(name, callable);
        self
    }

    /// Builder-style variant of [`Self::set_attribute`].
    pub fn with_attribute(mut self, name: &str, value: ForeignValue) -> Self {
        self.set_attribute(name, value);
        self
    }
}

impl fmt::Debug for ForeignObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignObject")
            .field("class_name", &self.class_name)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A counted reference to a foreign object. Cloning increments the
/// object's own reference count; identity is pointer identity.
#[derive(Clone, Debug)]
pub struct ForeignObjectRef(Rc<RefCell<ForeignObject>>);

impl ForeignObjectRef {
    pub fn new(object: ForeignObject) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    pub fn class_name(&self) -> String {
        self.0.borrow().class_name().to_string()
    }

    /// True when the object exposes `name` as a method or an attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        let object = self.0.borrow();
        object.methods.contains_key(name) || object.attributes.contains_key(name)
    }

    pub fn attribute(&self, name: &str) -> Option<ForeignValue> {
        self.0.borrow().attribute(name).cloned()
    }

    pub fn set_attribute(&self, name: &str, value: ForeignValue) {
        self.0.borrow_mut().set_attribute(name, value);
    }

    pub fn method(&self, name: &str) -> Option<ForeignCallable> {
        self.0.borrow().methods.get(name).cloned()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The object's own reference count.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_and_methods() {
        let object = ForeignObjectRef::new(
            ForeignObject::new("Greeter")
                .with_attribute("greeting", ForeignValue::Str("hello".to_string()))
                .with_method("noop", Rc::new(|_, _| Ok(ForeignValue::None))),
        );

        assert_eq!(object.class_name(), "Greeter");
        assert!(object.has_attribute("greeting"));
        assert!(object.has_attribute("noop"));
        assert!(!object.has_attribute("missing"));
        assert_eq!(
            object.attribute("greeting"),
            Some(ForeignValue::Str("hello".to_string()))
        );
        assert!(object.method("noop").is_some());
        assert!(object.method("greeting").is_none());
    }

    #[test]
    fn test_clone_increments_ref_count() {
        let object = ForeignObjectRef::new(ForeignObject::new("Thing"));
        assert_eq!(object.ref_count(), 1);
        let alias = object.clone();
        assert_eq!(object.ref_count(), 2);
        assert!(alias.ptr_eq(&object));
    }

    #[test]
    fn test_bound_method_sees_receiver() {
        let object = ForeignObjectRef::new(
            ForeignObject::new("Cell")
                .with_attribute("value", ForeignValue::Int(1))
                .with_method(
                    "bump",
                    Rc::new(|receiver, _| {
                        let next = match receiver.attribute("value") {
                            Some(ForeignValue::Int(v)) => v + 1,
                            _ => 0,
                        };
                        receiver.set_attribute("value", ForeignValue::Int(next));
                        Ok(ForeignValue::Int(next))
                    }),
                ),
        );

        let bump = object.method("bump").unwrap();
        assert_eq!(bump(&object, Vec::new()).unwrap(), ForeignValue::Int(2));
        assert_eq!(object.attribute("value"), Some(ForeignValue::Int(2)));
    }
}
