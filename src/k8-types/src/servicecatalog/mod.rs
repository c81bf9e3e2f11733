pub mod cluster_service_broker;

pub use cluster_service_broker::*;

pub const GROUP: &str = "servicecatalog.k8s.io";
pub const V1BETA1: &str = "v1beta1";
