//! The foreign runtime: a class table producing foreign objects.

use std::cell::RefCell;
use std::rc::Rc;

use crate::adapter::object::ForeignObjectRef;
use crate::adapter::value::ForeignValue;
use crate::error::AdapterError;
use crate::FastIndexMap;

/// Creates a fresh foreign object; invoked with no arguments on `New`.
pub type ForeignFactory = Rc<dyn Fn() -> Result<ForeignValue, AdapterError>>;

/// Shared handle to a runtime, as captured by shim closures.
pub type ForeignRuntimeRef = Rc<RefCell<ForeignRuntime>>;

/// A separate dynamic object system: class names mapped to factories.
///
/// This stands in for an embedded scripting runtime; the shim in
/// [`crate::adapter::shim`] forwards constructor and command calls into
/// it through the same capability tables native classes use.
#[derive(Default)]
pub struct ForeignRuntime {
    classes: FastIndexMap<String, ForeignFactory>,
}

impl ForeignRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a runtime for sharing with shim closures.
    pub fn shared(self) -> ForeignRuntimeRef {
        Rc::new(RefCell::new(self))
    }

    /// Define (or redefine) a class by its factory callable.
    pub fn define_class(&mut self, name: &str, factory: ForeignFactory) {
        self.classes.insert(name.to_string(), factory);
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Instantiate a class: call its factory with no arguments and
    /// expect a foreign object back.
    pub fn instantiate(&self, name: &str) -> Result<ForeignObjectRef, AdapterError> {
        let factory = self
            .classes
            .get(name)
            .ok_or_else(|| AdapterError::raised(format!("runtime has no class '{}'", name)))?;
        match factory()? {
            ForeignValue::Object(object) => Ok(object),
            other => Err(AdapterError::unmarshalable(format!(
                "factory for class '{}' returned {}, expected an object",
                name,
                other.type_name()
            ))),
        }
    }
}

impl std::fmt::Debug for ForeignRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignRuntime")
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}
