//! Backing lists: the live, correctness-bearing collections record sources
//! bind to.
//!
//! A list raises one [`ListChange`] per mutation covering the whole affected
//! range. `Remove` is raised before the elements go, so handlers can still
//! reach them; every other change is raised after the list is updated.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use grid_model::Badness;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::signal::{Signal, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListChange {
    Insert { index: usize, count: usize },
    /// Raised before the range is removed.
    Remove { index: usize, count: usize },
    /// Elements in the range were replaced in place.
    Replace { index: usize, count: usize },
    /// Elements `[from, from + count)` now sit at `[to, to + count)`.
    Move { from: usize, to: usize, count: usize },
    Clear,
}

/// Name under which a consumer holds a list open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListLocker(String);

impl ListLocker {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListLocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait BadnessList<T> {
    fn count(&self) -> usize;

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    fn get(&self, index: usize) -> Rc<T>;

    fn badness(&self) -> Badness;

    fn subscribe_list_changed(&self, handler: Box<dyn Fn(&ListChange)>) -> SubscriptionId;

    fn unsubscribe_list_changed(&self, id: SubscriptionId);

    fn subscribe_badness_changed(&self, handler: Box<dyn Fn(&Badness)>) -> SubscriptionId;

    fn unsubscribe_badness_changed(&self, id: SubscriptionId);

    /// Register `locker` as holding the list open.
    fn lock(&self, locker: &ListLocker) -> Result<()>;

    fn unlock(&self, locker: &ListLocker);

    fn lockers(&self) -> Vec<ListLocker>;
}

/// In-memory list with change and badness notifications.
///
/// Non-exclusive lists accept any number of lockers; exclusive lists refuse
/// a second one.
pub struct ObservableList<T> {
    items: RefCell<Vec<Rc<T>>>,
    badness: RefCell<Badness>,
    exclusive: bool,
    lockers: RefCell<Vec<ListLocker>>,
    list_changed: Signal<ListChange>,
    badness_changed: Signal<Badness>,
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
            badness: RefCell::new(Badness::Good),
            exclusive: false,
            lockers: RefCell::new(Vec::new()),
            list_changed: Signal::new(),
            badness_changed: Signal::new(),
        }
    }
}

impl<T> ObservableList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclusive() -> Self {
        Self {
            exclusive: true,
            ..Self::default()
        }
    }

    pub fn with_items<I: IntoIterator<Item = Rc<T>>>(items: I) -> Self {
        let list = Self::default();
        list.items.borrow_mut().extend(items);
        list
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn items(&self) -> Vec<Rc<T>> {
        self.items.borrow().clone()
    }

    pub fn push(&self, item: Rc<T>) {
        let index = self.items.borrow().len();
        self.insert(index, vec![item]);
    }

    /// # Panics
    ///
    /// Panics if `index` is past the end.
    pub fn insert(&self, index: usize, items: Vec<Rc<T>>) {
        let count = items.len();
        {
            let mut current = self.items.borrow_mut();
            assert!(index <= current.len(), "insert at {index} past the end");
            current.splice(index..index, items);
        }
        self.list_changed.notify(&ListChange::Insert { index, count });
    }

    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn remove(&self, index: usize, count: usize) -> Vec<Rc<T>> {
        assert!(
            index + count <= self.items.borrow().len(),
            "remove {index}+{count} out of range"
        );
        self.list_changed.notify(&ListChange::Remove { index, count });
        self.items.borrow_mut().drain(index..index + count).collect()
    }

    /// Replace the elements starting at `index` with `items`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn replace(&self, index: usize, items: Vec<Rc<T>>) {
        let count = items.len();
        {
            let mut current = self.items.borrow_mut();
            assert!(
                index + count <= current.len(),
                "replace {index}+{count} out of range"
            );
            current.splice(index..index + count, items);
        }
        self.list_changed.notify(&ListChange::Replace { index, count });
    }

    /// Move `count` elements starting at `from` so they start at `to`.
    ///
    /// # Panics
    ///
    /// Panics if either range is out of bounds.
    pub fn move_range(&self, from: usize, count: usize, to: usize) {
        {
            let mut current = self.items.borrow_mut();
            let len = current.len();
            assert!(
                from + count <= len && to + count <= len,
                "move {from}+{count} -> {to} out of range"
            );
            let moved: Vec<Rc<T>> = current.drain(from..from + count).collect();
            current.splice(to..to, moved);
        }
        self.list_changed
            .notify(&ListChange::Move { from, to, count });
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
        self.list_changed.notify(&ListChange::Clear);
    }

    /// Update the list's data quality. An unchanged state raises nothing.
    pub fn set_badness(&self, badness: Badness) {
        if *self.badness.borrow() == badness {
            return;
        }
        *self.badness.borrow_mut() = badness.clone();
        self.badness_changed.notify(&badness);
    }

    pub fn list_subscriber_count(&self) -> usize {
        self.list_changed.listener_count()
    }

    pub fn badness_subscriber_count(&self) -> usize {
        self.badness_changed.listener_count()
    }
}

impl<T> BadnessList<T> for ObservableList<T> {
    fn count(&self) -> usize {
        self.items.borrow().len()
    }

    fn get(&self, index: usize) -> Rc<T> {
        let items = self.items.borrow();
        let item = items
            .get(index)
            .unwrap_or_else(|| panic!("list index {index} out of range ({})", items.len()));
        Rc::clone(item)
    }

    fn badness(&self) -> Badness {
        self.badness.borrow().clone()
    }

    fn subscribe_list_changed(&self, handler: Box<dyn Fn(&ListChange)>) -> SubscriptionId {
        self.list_changed.subscribe(handler)
    }

    fn unsubscribe_list_changed(&self, id: SubscriptionId) {
        self.list_changed.unsubscribe(id);
    }

    fn subscribe_badness_changed(&self, handler: Box<dyn Fn(&Badness)>) -> SubscriptionId {
        self.badness_changed.subscribe(handler)
    }

    fn unsubscribe_badness_changed(&self, id: SubscriptionId) {
        self.badness_changed.unsubscribe(id);
    }

    fn lock(&self, locker: &ListLocker) -> Result<()> {
        let mut lockers = self.lockers.borrow_mut();
        if self.exclusive
            && let Some(holder) = lockers.first()
        {
            return Err(CoreError::ListLocked {
                holder: holder.to_string(),
                requester: locker.to_string(),
            });
        }
        debug!(locker = %locker, holders = lockers.len(), "list locked");
        lockers.push(locker.clone());
        Ok(())
    }

    fn unlock(&self, locker: &ListLocker) {
        let mut lockers = self.lockers.borrow_mut();
        match lockers.iter().position(|held| held == locker) {
            Some(position) => {
                lockers.remove(position);
                debug!(locker = %locker, holders = lockers.len(), "list unlocked");
            }
            None => warn!(locker = %locker, "unlock of a list not held"),
        }
    }

    fn lockers(&self) -> Vec<ListLocker> {
        self.lockers.borrow().clone()
    }
}

impl<T> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("count", &self.items.borrow().len())
            .field("badness", &*self.badness.borrow())
            .field("lockers", &*self.lockers.borrow())
            .finish()
    }
}

/// Scoped hold on a list: locks on acquire, unlocks on drop.
pub struct ListLock<T: 'static> {
    list: Rc<dyn BadnessList<T>>,
    locker: ListLocker,
}

impl<T: 'static> ListLock<T> {
    pub fn acquire(list: Rc<dyn BadnessList<T>>, locker: ListLocker) -> Result<Self> {
        list.lock(&locker)?;
        Ok(Self { list, locker })
    }

    pub fn list(&self) -> &Rc<dyn BadnessList<T>> {
        &self.list
    }

    pub fn locker(&self) -> &ListLocker {
        &self.locker
    }
}

impl<T: 'static> Drop for ListLock<T> {
    fn drop(&mut self) {
        self.list.unlock(&self.locker);
    }
}

impl<T: 'static> fmt::Debug for ListLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListLock")
            .field("locker", &self.locker)
            .finish_non_exhaustive()
    }
}
