use std::{cell::RefCell, rc::Rc};

/// Shorthand for `Rc<RefCell<T>>`.
pub(crate) type Shared<T> = Rc<RefCell<T>>;

pub(crate) fn new_shared<T>(item: T) -> Shared<T> {
    Rc::new(RefCell::new(item))
}
