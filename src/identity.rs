use thiserror::Error;

/// "Same real-world entity" relation, kept apart from `PartialEq`.
///
/// Two values can be identity-equal while differing in other fields (an edited
/// student is still the same student), and structurally equal values are always
/// identity-equal.
pub trait Identity {
    fn same_identity(&self, other: &Self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("no element with a matching identity")]
    NotFound,
    #[error("another element already has this identity")]
    DuplicateIdentity,
}

/// Ordered collection where no two elements share identity.
///
/// There is no `&mut` access to elements: every change goes through `add`,
/// `replace`, `remove`, `retain` or `set_all`, which is what keeps the
/// uniqueness rule intact.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityList<T> {
    items: Vec<T>,
}

impl<T> Default for IdentityList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Identity> IdentityList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn contains_identity(&self, item: &T) -> bool {
        self.position(item).is_some()
    }

    pub fn find(&self, item: &T) -> Option<&T> {
        self.items.iter().find(|x| x.same_identity(item))
    }

    pub fn find_by<P>(&self, mut pred: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter().find(|x| pred(x))
    }

    fn position(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|x| x.same_identity(item))
    }

    /// Appends `item` unless an element with the same identity exists.
    /// Returns whether it was inserted.
    pub fn add(&mut self, item: T) -> bool {
        if self.contains_identity(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Swaps the element identity-equal to `old` for `new`, keeping its position.
    ///
    /// `new` is checked against every *other* element, so an edit that keeps the
    /// old identity but collides with a neighbour is still rejected.
    pub fn replace(&mut self, old: &T, new: T) -> Result<(), IdentityError> {
        let idx = self.position(old).ok_or(IdentityError::NotFound)?;
        let clash = self
            .items
            .iter()
            .enumerate()
            .any(|(i, x)| i != idx && x.same_identity(&new));
        if clash {
            return Err(IdentityError::DuplicateIdentity);
        }
        self.items[idx] = new;
        Ok(())
    }

    /// Removes the first element identity-equal to `item`; `None` if absent.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let idx = self.position(item)?;
        Some(self.items.remove(idx))
    }

    /// Drops every element for which `keep` returns false. Removal can never
    /// introduce a duplicate, so this is infallible.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.items.retain(keep);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replaces the whole contents. Pairwise check, quadratic in `items.len()`.
    pub fn set_all(&mut self, items: Vec<T>) -> Result<(), IdentityError> {
        if has_duplicates(&items) {
            return Err(IdentityError::DuplicateIdentity);
        }
        self.items = items;
        Ok(())
    }
}

impl<'a, T> IntoIterator for &'a IdentityList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

pub fn has_duplicates<T: Identity>(items: &[T]) -> bool {
    for (i, a) in items.iter().enumerate() {
        if items[i + 1..].iter().any(|b| a.same_identity(b)) {
            return true;
        }
    }
    false
}
