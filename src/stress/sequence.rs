use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{Error, Result};

struct Elements {
    items: Vec<String>,
    //  bumped by every push and clear
    mod_count: u64,
}

/// An ordered list of one-letter strings meant to live in a long-lived object.
///
/// Every single operation takes the inner lock, so the list itself is never
/// torn, but nothing makes a *sequence* of operations atomic: a caller that
/// clears, pushes ten times and then joins can interleave with any other
/// caller doing the same. That interleaving is what the stress endpoints show.
///
/// [`SharedSequence::join`] is fail-fast. It reads one element per lock
/// acquisition and returns [`Error::ConcurrentModification`] if anybody pushed
/// or cleared while it was walking.
pub struct SharedSequence {
    elements: Mutex<Elements>,
}

impl SharedSequence {
    pub fn new() -> Self {
        Self {
            elements: Mutex::new(Elements {
                items: Vec::new(),
                mod_count: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Elements> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, item: &str) {
        let mut elements = self.lock();
        elements.items.push(item.to_owned());
        elements.mod_count += 1;
    }

    pub fn clear(&self) {
        let mut elements = self.lock();
        elements.items.clear();
        elements.mod_count += 1;
    }

    /// Concatenates every element, failing if the sequence changes mid-walk.
    pub fn join(&self) -> Result<String> {
        self.join_observed(|_| {})
    }

    /// `between` runs after each element is read, with no lock held.
    fn join_observed(&self, mut between: impl FnMut(usize)) -> Result<String> {
        let expected = self.lock().mod_count;
        let mut joined = String::new();
        let mut index = 0;
        loop {
            {
                let elements = self.lock();
                if elements.mod_count != expected {
                    return Err(Error::ConcurrentModification {
                        expected,
                        found: elements.mod_count,
                    });
                }
                match elements.items.get(index) {
                    Some(item) => joined.push_str(item),
                    None => break,
                }
            }
            between(index);
            index += 1;
        }
        Ok(joined)
    }
}
