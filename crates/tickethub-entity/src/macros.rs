//! Boilerplate for wiring a struct with a `meta: EntityMeta` field into
//! the [`Entity`](tickethub_core::traits::Entity) trait.

macro_rules! impl_entity {
    ($ty:ty, $table:expr $(, [$($relation:expr),* $(,)?])?) => {
        impl tickethub_core::traits::Entity for $ty {
            const TABLE: &'static str = $table;
            $(
                const RELATIONS: &'static [tickethub_core::traits::Relation] = &[$($relation),*];
            )?

            fn meta(&self) -> &tickethub_core::traits::EntityMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut tickethub_core::traits::EntityMeta {
                &mut self.meta
            }
        }
    };
}
