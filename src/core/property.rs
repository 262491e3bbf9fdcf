//! Dynamic property and its listeners.
//!
//! A `DynamicProperty` holds the latest value pushed by a data source,
//! the listeners (usually the rule managers) are notified on every effective change.
use std::sync::{Arc, Mutex, RwLock, Weak};

/// PropertyListener observes the changes of a `DynamicProperty`.
pub trait PropertyListener<T>: Send + Sync {
    /// Called when the value of the property is updated.
    fn config_update(&self, value: &T);
    /// Called with the current value when the listener is registered.
    fn config_load(&self, value: &T);
}

/// A copy-on-write set of listeners.
/// Mutations clone the inner vector, so that notifications iterate over a snapshot
/// without holding the lock, even if listeners are added or removed meanwhile.
pub struct ListenerSet<L: ?Sized> {
    inner: RwLock<Arc<Vec<Arc<L>>>>,
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        ListenerSet {
            inner: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl<L: ?Sized> std::fmt::Debug for ListenerSet<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ListenerSet{{len={}}}", self.len())
    }
}

fn same_listener<L: ?Sized>(a: &Arc<L>, b: &Arc<L>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl<L: ?Sized> ListenerSet<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the listener, returns false if it has been added.
    pub fn add(&self, listener: Arc<L>) -> bool {
        let mut inner = self.inner.write().unwrap();
        if inner.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        let mut listeners = Vec::clone(&inner);
        listeners.push(listener);
        *inner = Arc::new(listeners);
        true
    }

    /// Removes the listener, returns false if it does not exist.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut inner = self.inner.write().unwrap();
        if !inner.iter().any(|l| same_listener(l, listener)) {
            return false;
        }
        let listeners = inner
            .iter()
            .filter(|l| !same_listener(*l, listener))
            .cloned()
            .collect();
        *inner = Arc::new(listeners);
        true
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap() = Arc::new(Vec::new());
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<L>>> {
        Arc::clone(&self.inner.read().unwrap())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// DynamicProperty holds a value that may be replaced at runtime.
pub struct DynamicProperty<T> {
    value: RwLock<T>,
    listeners: ListenerSet<dyn PropertyListener<T>>,
}

impl<T: Default> Default for DynamicProperty<T> {
    fn default() -> Self {
        DynamicProperty {
            value: RwLock::new(T::default()),
            listeners: ListenerSet::new(),
        }
    }
}

impl<T> DynamicProperty<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    pub fn new(value: T) -> Self {
        DynamicProperty {
            value: RwLock::new(value),
            listeners: ListenerSet::new(),
        }
    }

    /// Registers the listener and loads the current value into it.
    pub fn add_listener(&self, listener: Arc<dyn PropertyListener<T>>) {
        if !self.listeners.add(Arc::clone(&listener)) {
            return;
        }
        let value = self.value();
        listener.config_load(&value);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PropertyListener<T>>) -> bool {
        self.listeners.remove(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn value(&self) -> T {
        self.value.read().unwrap().clone()
    }

    /// Replaces the value and notifies the listeners.
    /// Returns false, and notifies nobody, if the new value equals the current one.
    pub fn update_value(&self, new_value: T) -> bool {
        {
            let mut value = self.value.write().unwrap();
            if *value == new_value {
                return false;
            }
            *value = new_value.clone();
        }
        for listener in self.listeners.snapshot().iter() {
            listener.config_update(&new_value);
        }
        true
    }
}

/// The property of a rule list, which is what the data sources push.
pub type RuleProperty<R> = DynamicProperty<Vec<Arc<R>>>;

/// RuleLoader is the sink of a rule property, implemented by the rule managers.
pub trait RuleLoader<R>: Send + Sync {
    /// Replaces the active rules, returns false if nothing changed.
    fn load_rules(&self, rules: Vec<Arc<R>>) -> bool;
}

/// Forwards the rules of a property to its manager.
/// The manager is held weakly, the property never keeps a dropped manager alive.
pub struct RulePropertyListener<M> {
    manager: Weak<M>,
}

impl<M> RulePropertyListener<M> {
    pub fn new(manager: &Arc<M>) -> Self {
        RulePropertyListener {
            manager: Arc::downgrade(manager),
        }
    }

    fn load<R>(&self, rules: &[Arc<R>])
    where
        M: RuleLoader<R>,
    {
        if let Some(manager) = self.manager.upgrade() {
            manager.load_rules(rules.to_vec());
        }
    }
}

impl<R, M> PropertyListener<Vec<Arc<R>>> for RulePropertyListener<M>
where
    M: RuleLoader<R>,
{
    fn config_update(&self, value: &Vec<Arc<R>>) {
        self.load(value)
    }

    fn config_load(&self, value: &Vec<Arc<R>>) {
        self.load(value)
    }
}

type BoundProperty<R> = (
    Arc<RuleProperty<R>>,
    Arc<dyn PropertyListener<Vec<Arc<R>>>>,
);

/// The rule property a manager currently listens to.
/// Binding a new property detaches the manager from the previous one.
pub struct PropertyBinding<R> {
    bound: Mutex<Option<BoundProperty<R>>>,
}

impl<R> Default for PropertyBinding<R> {
    fn default() -> Self {
        PropertyBinding {
            bound: Mutex::new(None),
        }
    }
}

impl<R> std::fmt::Debug for PropertyBinding<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PropertyBinding{{bound={}}}",
            self.bound.lock().unwrap().is_some()
        )
    }
}

impl<R> PropertyBinding<R>
where
    R: PartialEq + Send + Sync + 'static,
{
    pub fn bind<M>(&self, manager: &Arc<M>, property: Arc<RuleProperty<R>>)
    where
        M: RuleLoader<R> + 'static,
    {
        let listener: Arc<dyn PropertyListener<Vec<Arc<R>>>> =
            Arc::new(RulePropertyListener::new(manager));
        let mut bound = self.bound.lock().unwrap();
        if let Some((old_property, old_listener)) = bound.take() {
            old_property.remove_listener(&old_listener);
        }
        property.add_listener(Arc::clone(&listener));
        *bound = Some((property, listener));
    }

    pub fn unbind(&self) {
        if let Some((property, listener)) = self.bound.lock().unwrap().take() {
            property.remove_listener(&listener);
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.lock().unwrap().is_some()
    }
}
