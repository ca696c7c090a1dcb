use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::Resource;

/// World stores the simulation's global resources.
///
/// Every piece of state (the node field, in-flight transmissions, the RNG,
/// the round counter) lives here as a singleton keyed by its type. Systems
/// receive `&mut World` and are the only writers.
#[derive(Default)]
pub struct World {
    resources: HashMap<TypeId, Box<dyn Any + Send + Sync>>, // Global resources
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the world, replacing any previous value of the same type
    pub fn insert_resource<T: Resource>(&mut self, resource: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(resource));
    }

    /// Insert `T::default()` unless the resource is already present
    pub fn init_resource<T: Resource + Default>(&mut self) {
        self.resources
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
    }

    pub fn contains_resource<T: Resource>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<T>())
    }

    /// Get a reference to a resource
    pub fn get_resource<T: Resource>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|res| res.downcast_ref::<T>())
    }

    /// Get a mutable reference to a resource
    pub fn get_resource_mut<T: Resource>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|res| res.downcast_mut::<T>())
    }

    /// Get a resource that systems rely on being present.
    ///
    /// # Panics
    ///
    /// Panics if the resource was never inserted. Systems are wired together
    /// with their resources at construction, so a miss is a wiring bug.
    pub fn resource<T: Resource>(&self) -> &T {
        match self.get_resource::<T>() {
            Some(resource) => resource,
            None => missing_resource::<T>(),
        }
    }

    /// Mutable counterpart of [`World::resource`].
    pub fn resource_mut<T: Resource>(&mut self) -> &mut T {
        match self.get_resource_mut::<T>() {
            Some(resource) => resource,
            None => missing_resource::<T>(),
        }
    }

    /// Remove a resource from the world
    pub fn remove_resource<T: Resource>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|res| res.downcast::<T>().ok())
            .map(|res| *res)
    }

    /// Temporarily take `T` out of the world so it can be mutated alongside
    /// other resources, then put it back.
    pub fn resource_scope<T: Resource, R>(&mut self, f: impl FnOnce(&mut World, &mut T) -> R) -> R {
        let mut resource = match self.remove_resource::<T>() {
            Some(resource) => resource,
            None => missing_resource::<T>(),
        };
        let result = f(self, &mut resource);
        self.insert_resource(resource);
        result
    }
}

#[cold]
fn missing_resource<T>() -> ! {
    panic!("resource `{}` is not present in the world", std::any::type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Resource, Debug, Default, PartialEq)]
    struct Counter(u32);

    #[derive(Resource, Debug, Default, PartialEq)]
    struct Label(String);

    #[test]
    fn insert_get_and_mutate() {
        let mut world = World::new();
        world.insert_resource(Counter(1));
        world.resource_mut::<Counter>().0 += 4;

        assert_eq!(world.resource::<Counter>(), &Counter(5));
        assert!(world.get_resource::<Label>().is_none());
    }

    #[test]
    fn init_resource_keeps_existing_value() {
        let mut world = World::new();
        world.insert_resource(Counter(7));
        world.init_resource::<Counter>();
        world.init_resource::<Label>();

        assert_eq!(world.resource::<Counter>().0, 7);
        assert_eq!(world.resource::<Label>(), &Label::default());
    }

    #[test]
    fn resource_scope_allows_two_mutable_resources() {
        let mut world = World::new();
        world.insert_resource(Counter(2));
        world.insert_resource(Label("x".to_string()));

        world.resource_scope(|world, counter: &mut Counter| {
            let label = world.resource_mut::<Label>();
            label.0.push_str(&counter.0.to_string());
            counter.0 += 1;
        });

        assert_eq!(world.resource::<Counter>().0, 3);
        assert_eq!(world.resource::<Label>().0, "x2");
    }

    #[test]
    fn remove_resource_returns_value() {
        let mut world = World::new();
        world.insert_resource(Counter(9));
        assert_eq!(world.remove_resource::<Counter>(), Some(Counter(9)));
        assert!(!world.contains_resource::<Counter>());
    }

    #[test]
    #[should_panic(expected = "is not present in the world")]
    fn missing_resource_panics() {
        let world = World::new();
        let _ = world.resource::<Counter>();
    }
}
