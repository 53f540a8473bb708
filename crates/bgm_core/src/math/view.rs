//! Lazy index views over computed or borrowed sequences.
//!
//! A view exposes a fixed-length sequence through an accessor closure
//! instead of materialising it. [`View`] is read-only; [`ViewMut`] also
//! carries a setter. Both are generic over their closures, so element access
//! is statically dispatched.

use std::fmt;

/// Capability of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Elements can only be read.
    ReadOnly,
    /// Elements can be read and written.
    ReadWrite,
}

/// Common read interface of [`View`] and [`ViewMut`].
pub trait IndexedView {
    /// Element type produced by the view.
    type Item;

    /// Number of elements.
    fn len(&self) -> usize;

    /// Element at `index`, or `None` past the end.
    fn get(&self, index: usize) -> Option<Self::Item>;

    /// Capability flag of the view.
    fn access(&self) -> Access;

    /// Returns `true` if the view has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialises the view into a vector.
    fn to_vec(&self) -> Vec<Self::Item> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }
}

/// Read-only lazy view.
///
/// # Examples
///
/// ```
/// use bgm_core::math::view::{Access, IndexedView, View};
///
/// let squares = View::new(4, |i| (i * i) as f64);
/// assert_eq!(squares.get(3), Some(9.0));
/// assert_eq!(squares.get(4), None);
/// assert_eq!(squares.access(), Access::ReadOnly);
/// assert_eq!(squares.iter().sum::<f64>(), 14.0);
/// ```
#[derive(Clone, Copy)]
pub struct View<F> {
    len: usize,
    getter: F,
}

impl<T, F> View<F>
where
    F: Fn(usize) -> T,
{
    /// Wraps `getter` as a view of `len` elements.
    pub fn new(len: usize, getter: F) -> Self {
        Self { len, getter }
    }

    /// Iterates over the elements in index order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(&self.getter)
    }
}

impl<T, F> IndexedView for View<F>
where
    F: Fn(usize) -> T,
{
    type Item = T;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Option<T> {
        (index < self.len).then(|| (self.getter)(index))
    }

    fn access(&self) -> Access {
        Access::ReadOnly
    }
}

impl<F> fmt::Debug for View<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View").field("len", &self.len).finish()
    }
}

/// Read-write lazy view.
///
/// # Examples
///
/// ```
/// use bgm_core::math::view::{Access, IndexedView, ViewMut};
///
/// let mut data = vec![1.0, 2.0, 3.0];
/// let cell = std::cell::RefCell::new(&mut data);
/// let mut doubled = ViewMut::new(
///     3,
///     |i| cell.borrow()[i] * 2.0,
///     |i, v: f64| cell.borrow_mut()[i] = v / 2.0,
/// );
/// assert_eq!(doubled.access(), Access::ReadWrite);
/// assert!(doubled.set(1, 10.0));
/// assert_eq!(doubled.get(1), Some(10.0));
/// ```
pub struct ViewMut<G, S> {
    len: usize,
    getter: G,
    setter: S,
}

impl<T, G, S> ViewMut<G, S>
where
    G: Fn(usize) -> T,
    S: FnMut(usize, T),
{
    /// Wraps a getter/setter pair as a view of `len` elements.
    pub fn new(len: usize, getter: G, setter: S) -> Self {
        Self {
            len,
            getter,
            setter,
        }
    }

    /// Writes `value` at `index`; returns `false` past the end.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        if index < self.len {
            (self.setter)(index, value);
            true
        } else {
            false
        }
    }
}

impl<T, G, S> IndexedView for ViewMut<G, S>
where
    G: Fn(usize) -> T,
    S: FnMut(usize, T),
{
    type Item = T;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Option<T> {
        (index < self.len).then(|| (self.getter)(index))
    }

    fn access(&self) -> Access {
        Access::ReadWrite
    }
}

impl<G, S> fmt::Debug for ViewMut<G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewMut").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_view_to_vec() {
        let base = [3.0, 1.0, 4.0];
        let view = View::new(base.len(), |i| base[i] + 1.0);
        assert_eq!(view.to_vec(), vec![4.0, 2.0, 5.0]);
        assert!(!view.is_empty());
    }

    #[test]
    fn test_empty_view() {
        let view = View::new(0, |_| 0.0_f64);
        assert!(view.is_empty());
        assert_eq!(view.get(0), None);
    }

    #[test]
    fn test_view_mut_out_of_range_write() {
        let store = RefCell::new(vec![0.0; 2]);
        let mut view = ViewMut::new(2, |i| store.borrow()[i], |i, v| store.borrow_mut()[i] = v);
        assert!(view.set(0, 7.0));
        assert!(!view.set(2, 1.0));
        assert_eq!(view.to_vec(), vec![7.0, 0.0]);
    }
}
