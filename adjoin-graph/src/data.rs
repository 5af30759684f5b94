use std::{
    cell::Ref,
    fmt::{self, Debug},
    rc::Rc,
};

use adjoin_core::{Error, Result, Value};

use crate::utils::{new_shared, Shared};

struct Slot {
    tag: String,
    value: Option<Value>,
    gradient: Option<Value>,
    shape: Option<Vec<usize>>,
}

/// A named container holding a value and its accumulated gradient.
///
/// Cloning a `DataNode` clones the handle, not the data: every clone refers to
/// the same slot. Identity is the address of that slot, tags are only labels
/// and need not be unique.
#[derive(Clone)]
pub struct DataNode(Shared<Slot>);

impl DataNode {
    /// Creates an empty node.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(new_shared(Slot {
            tag: tag.into(),
            value: None,
            gradient: None,
            shape: None,
        }))
    }

    /// Creates a node holding `value`.
    pub fn with_value(tag: impl Into<String>, value: impl Into<Value>) -> Self {
        let node = Self::new(tag);
        node.set_value(value);
        node
    }

    /// Creates an empty node whose value must have `shape` once populated.
    pub fn with_shape(tag: impl Into<String>, shape: &[usize]) -> Self {
        let node = Self::new(tag);
        node.0.borrow_mut().shape = Some(shape.to_vec());
        node
    }

    pub fn tag(&self) -> Ref<str> {
        Ref::map(self.0.borrow(), |slot| slot.tag.as_str())
    }

    /// Address of the shared slot.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn declared_shape(&self) -> Option<Vec<usize>> {
        self.0.borrow().shape.clone()
    }

    /// The current value, if any.
    pub fn value(&self) -> Option<Ref<Value>> {
        Ref::filter_map(self.0.borrow(), |slot| slot.value.as_ref()).ok()
    }

    /// The current value, failing with a configuration error when absent.
    pub fn require_value(&self) -> Result<Ref<Value>> {
        self.value().ok_or_else(|| {
            Error::configuration(format!("data node `{}` holds no value", self.tag()))
        })
    }

    pub fn has_value(&self) -> bool {
        self.0.borrow().value.is_some()
    }

    pub fn set_value(&self, value: impl Into<Value>) {
        self.0.borrow_mut().value = Some(value.into());
    }

    pub fn clear_value(&self) {
        self.0.borrow_mut().value = None;
    }

    /// The accumulated gradient, `None` when neutral.
    pub fn gradient(&self) -> Option<Ref<Value>> {
        Ref::filter_map(self.0.borrow(), |slot| slot.gradient.as_ref()).ok()
    }

    pub fn has_gradient(&self) -> bool {
        self.0.borrow().gradient.is_some()
    }

    /// Adds `gradient` to the accumulated gradient.
    ///
    /// The gradient must have the shape of the current value.
    pub fn add_gradient(&self, gradient: Value) -> Result<()> {
        let mut slot = self.0.borrow_mut();
        if let Some(value) = &slot.value {
            if value.shape() != gradient.shape() {
                return Err(Error::configuration(format!(
                    "gradient of shape {:?} does not match the shape {:?} of `{}`",
                    gradient.shape(),
                    value.shape(),
                    slot.tag
                )));
            }
        }
        match &mut slot.gradient {
            Some(accumulated) => accumulated.accumulate(gradient),
            empty => {
                *empty = Some(gradient);
                Ok(())
            }
        }
    }

    /// Resets the gradient to neutral.
    pub fn reset_gradient(&self) {
        self.0.borrow_mut().gradient = None;
    }
}

impl PartialEq for DataNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DataNode {}

impl Debug for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.0.borrow();
        f.debug_struct("DataNode")
            .field("tag", &slot.tag)
            .field("value", &slot.value.as_ref().map(Value::kind))
            .field("gradient", &slot.gradient.as_ref().map(Value::kind))
            .finish()
    }
}
