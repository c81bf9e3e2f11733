use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::Crd;
use crate::CrdNames;
use crate::DefaultHeader;
use crate::K8List;
use crate::K8Obj;
use crate::Spec;
use crate::Status;

use super::GROUP;
use super::V1BETA1;

const CLUSTER_SERVICE_BROKER_API: Crd = Crd {
    group: GROUP,
    version: V1BETA1,
    names: CrdNames {
        kind: "ClusterServiceBroker",
        plural: "clusterservicebrokers",
        singular: "clusterservicebroker",
    },
};

pub type ClusterServiceBroker = K8Obj<ClusterServiceBrokerSpec>;
pub type ClusterServiceBrokerList = K8List<ClusterServiceBrokerSpec>;

/// broker registered for the whole cluster
#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterServiceBrokerSpec {
    #[serde(flatten)]
    pub common: CommonServiceBrokerSpec,
    pub auth_info: Option<ClusterServiceBrokerAuthInfo>,
}

impl Spec for ClusterServiceBrokerSpec {
    type Status = ClusterServiceBrokerStatus;
    type Header = DefaultHeader;
    const NAME_SPACED: bool = false;

    fn metadata() -> &'static Crd {
        &CLUSTER_SERVICE_BROKER_API
    }
}

impl ClusterServiceBrokerSpec {
    pub fn with_url<U: Into<String>>(url: U) -> Self {
        Self {
            common: CommonServiceBrokerSpec {
                url: url.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn url(&self) -> &str {
        &self.common.url
    }
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonServiceBrokerSpec {
    #[serde(rename = "url")]
    pub url: String,
    #[serde(rename = "insecureSkipTLSVerify")]
    pub insecure_skip_tls_verify: bool,
    pub ca_bundle: Option<String>,
    pub relist_behavior: ServiceBrokerRelistBehavior,
    pub relist_duration: Option<String>,
    pub relist_requests: i64,
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Clone, Copy)]
pub enum ServiceBrokerRelistBehavior {
    Duration,
    Manual,
}

impl Default for ServiceBrokerRelistBehavior {
    fn default() -> Self {
        Self::Duration
    }
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceBrokerAuthInfo {
    pub basic: Option<ClusterBasicAuthConfig>,
    pub bearer: Option<ClusterBearerTokenAuthConfig>,
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBasicAuthConfig {
    pub secret_ref: Option<ObjectReference>,
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBearerTokenAuthConfig {
    pub secret_ref: Option<ObjectReference>,
}

/// secret living in a namespace, referenced from a cluster scoped object
#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub namespace: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterServiceBrokerStatus {
    #[serde(flatten)]
    pub common: CommonServiceBrokerStatus,
}

impl Status for ClusterServiceBrokerStatus {}

impl ClusterServiceBrokerStatus {
    pub fn conditions(&self) -> &[ServiceBrokerCondition] {
        &self.common.conditions
    }

    pub fn push_condition(&mut self, condition: ServiceBrokerCondition) {
        self.common.conditions.push(condition);
    }
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonServiceBrokerStatus {
    pub conditions: Vec<ServiceBrokerCondition>,
    pub reconciled_generation: i64,
    pub operation_start_time: Option<String>,
    pub last_catalog_retrieval_time: Option<String>,
}

impl CommonServiceBrokerStatus {
    /// conditions are appended, so last entry is the most recent one
    pub fn latest_condition(&self) -> Option<&ServiceBrokerCondition> {
        self.conditions.last()
    }
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBrokerCondition {
    #[serde(rename = "type")]
    pub type_: ServiceBrokerConditionType,
    pub status: ConditionStatus,
    #[serde(default)]
    pub last_transition_time: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl ServiceBrokerCondition {
    pub fn new<R, M>(
        type_: ServiceBrokerConditionType,
        status: ConditionStatus,
        reason: R,
        message: M,
    ) -> Self
    where
        R: Into<String>,
        M: Into<String>,
    {
        Self {
            type_,
            status,
            reason: reason.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_transition_time<T: Into<String>>(mut self, time: T) -> Self {
        self.last_transition_time = time.into();
        self
    }
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Clone)]
pub enum ServiceBrokerConditionType {
    Ready,
    Failed,
}

impl Default for ServiceBrokerConditionType {
    fn default() -> Self {
        Self::Ready
    }
}

impl fmt::Display for ServiceBrokerConditionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Clone, Copy)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Default for ConditionStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
