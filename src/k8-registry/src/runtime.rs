use std::any::Any;
use std::fmt::Debug;

use k8_types::K8List;
use k8_types::K8Obj;
use k8_types::ObjectMeta;
use k8_types::Spec;

/// object flowing through registry without static type.
/// concrete type is recovered by downcasting
pub trait RuntimeObject: Any + Debug + Send + Sync {
    /// kind tag, used in error messages
    fn kind(&self) -> String;

    /// metadata of single object, none for lists
    fn object_meta(&self) -> Option<&ObjectMeta>;

    fn as_any(&self) -> &dyn Any;
}

impl<S> RuntimeObject for K8Obj<S>
where
    S: Spec,
{
    fn kind(&self) -> String {
        S::kind()
    }

    fn object_meta(&self) -> Option<&ObjectMeta> {
        Some(&self.metadata)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<S> RuntimeObject for K8List<S>
where
    S: Spec,
{
    fn kind(&self) -> String {
        S::list_kind()
    }

    fn object_meta(&self) -> Option<&ObjectMeta> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// typed view of runtime object
pub fn downcast_object<S: Spec>(obj: &dyn RuntimeObject) -> Option<&K8Obj<S>> {
    obj.as_any().downcast_ref::<K8Obj<S>>()
}
