//! Dependency list trait and implementations.
//!
//! This module defines the [`Dependencies`] trait that lets [`Task::depends_on`] accept
//! dependencies in various forms (a single task, tuples of tasks, collections of erased tasks).
//! Tuple implementations are macro-generated.
//!
//! This trait is sealed: it is implemented for the forms above and nothing else.

use std::sync::Arc;

use crate::handle::{AnyTask, Task};
use crate::node::Node;

mod sealed {
    pub trait Sealed {}
}

/// Something that names one or more predecessor tasks.
pub trait Dependencies: sealed::Sealed {
    #[doc(hidden)]
    fn into_nodes(self) -> Vec<Arc<dyn Node>>;
}

/// One element of a dependency tuple.
trait IntoNodeRef {
    fn into_node_ref(self) -> Arc<dyn Node>;
}

impl<I, O> IntoNodeRef for &Task<I, O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    fn into_node_ref(self) -> Arc<dyn Node> {
        self.erase().node
    }
}

impl IntoNodeRef for &AnyTask {
    fn into_node_ref(self) -> Arc<dyn Node> {
        Arc::clone(&self.node)
    }
}

// Single dependency (all forms)
impl<T: IntoNodeRef> sealed::Sealed for T {}

impl<T: IntoNodeRef> Dependencies for T {
    fn into_nodes(self) -> Vec<Arc<dyn Node>> {
        vec![self.into_node_ref()]
    }
}

impl sealed::Sealed for Vec<AnyTask> {}

impl Dependencies for Vec<AnyTask> {
    fn into_nodes(self) -> Vec<Arc<dyn Node>> {
        self.into_iter().map(|task| task.node).collect()
    }
}

impl sealed::Sealed for &[AnyTask] {}

impl Dependencies for &[AnyTask] {
    fn into_nodes(self) -> Vec<Arc<dyn Node>> {
        self.iter().map(|task| Arc::clone(&task.node)).collect()
    }
}

/// One `Dependencies` impl per tuple arity; elements may mix typed and erased tasks:
///
/// ```ignore
/// report.depends_on((&fetch, &config))
/// report.depends_on((&fetch, &erased_parse, &config))
/// ```
macro_rules! impl_dependencies_tuple {
    ($($T:ident),+) => {
        impl<$($T: IntoNodeRef),+> sealed::Sealed for ($($T,)+) {}

        impl<$($T: IntoNodeRef),+> Dependencies for ($($T,)+) {
            #[allow(non_snake_case)]
            fn into_nodes(self) -> Vec<Arc<dyn Node>> {
                let ($($T,)+) = self;
                vec![$($T.into_node_ref(),)+]
            }
        }
    };
}

impl_dependencies_tuple!(T1);
impl_dependencies_tuple!(T1, T2);
impl_dependencies_tuple!(T1, T2, T3);
impl_dependencies_tuple!(T1, T2, T3, T4);
impl_dependencies_tuple!(T1, T2, T3, T4, T5);
impl_dependencies_tuple!(T1, T2, T3, T4, T5, T6);
impl_dependencies_tuple!(T1, T2, T3, T4, T5, T6, T7);
impl_dependencies_tuple!(T1, T2, T3, T4, T5, T6, T7, T8);
