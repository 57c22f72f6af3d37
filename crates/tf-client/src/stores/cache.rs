//! List helpers shared by every store cache
//!
//! Lists are ordered most-recent-first. Entities are matched by
//! [`Identified::key`].

use tf_core::Identified;

/// Position of the entity with `key`
#[inline]
#[must_use]
pub fn position<T: Identified>(items: &[T], key: &str) -> Option<usize> {
    items.iter().position(|item| item.key() == key)
}

/// Entity with `key`
#[inline]
#[must_use]
pub fn find<'a, T: Identified>(items: &'a [T], key: &str) -> Option<&'a T> {
    items.iter().find(|item| item.key() == key)
}

/// Replace the entity with the same key in place; `false` if absent
pub fn replace_in_place<T: Identified>(items: &mut [T], item: T) -> bool {
    match position(items, item.key()) {
        Some(idx) => {
            items[idx] = item;
            true
        }
        None => false,
    }
}

/// Replace in place, or prepend when the entity is not cached yet
pub fn replace_or_prepend<T: Identified>(items: &mut Vec<T>, item: T) {
    match position(items, item.key()) {
        Some(idx) => items[idx] = item,
        None => items.insert(0, item),
    }
}

/// Drop the entity with `key`; `true` if something was removed
pub fn remove<T: Identified>(items: &mut Vec<T>, key: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.key() != key);
    items.len() != before
}
