use crate::element::Element;

/// Types that can be reset to a nil state and handed out again.
pub trait Recycle {
    fn recycle(&mut self);
}

impl Recycle for Vec<Element> {
    fn recycle(&mut self) {
        self.clear();
    }
}

/// Free list of recycled objects of one concrete type.
///
/// Objects returned with [`Pool::give_back`] are reset before they are stored,
/// so [`Pool::borrow`] always hands out something in the nil state. The pool
/// never shrinks.
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
}

impl<T: Recycle + Default> Pool<T> {
    pub fn new() -> Self {
        Self { free: Vec::new() }
    }

    /// A recycled object if one is available, otherwise a fresh one.
    pub fn borrow(&mut self) -> T {
        self.free.pop().unwrap_or_default()
    }

    pub fn give_back(&mut self, mut obj: T) {
        obj.recycle();
        self.free.push(obj);
    }

    /// Number of objects waiting for reuse.
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

impl<T: Recycle + Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
