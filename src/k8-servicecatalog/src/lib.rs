//!
//! # Service catalog registry
//!
//! REST storage of service catalog resources on top of the generic registry.
//!
pub mod cluster_service_broker;
