use serde::Deserialize;
use serde::Serialize;

use k8_types::Crd;
use k8_types::CrdNames;
use k8_types::DefaultHeader;
use k8_types::K8Obj;
use k8_types::Spec;
use k8_types::Status;

use crate::strategy::RestCreateStrategy;
use crate::strategy::RestDeleteStrategy;
use crate::strategy::RestUpdateStrategy;
use crate::FieldError;

const WIDGET_API: Crd = Crd {
    group: "test.infinyon.com",
    version: "v1",
    names: CrdNames {
        kind: "Widget",
        plural: "widgets",
        singular: "widget",
    },
};

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
pub struct WidgetSpec {
    pub size: u16,
}

impl Spec for WidgetSpec {
    type Status = WidgetStatus;
    type Header = DefaultHeader;

    fn metadata() -> &'static Crd {
        &WIDGET_API
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct WidgetStatus {
    pub ready: bool,
}

impl Status for WidgetStatus {}

pub type Widget = K8Obj<WidgetSpec>;

/// size must be positive
#[derive(Debug, Default)]
pub struct WidgetStrategy;

impl RestCreateStrategy<WidgetSpec> for WidgetStrategy {
    fn prepare_for_create(&self, obj: &mut Widget) {
        obj.status = WidgetStatus::default();
    }

    fn validate(&self, obj: &Widget) -> Vec<FieldError> {
        if obj.spec.size == 0 {
            vec![FieldError::invalid("spec.size", "must be positive")]
        } else {
            vec![]
        }
    }
}

impl RestUpdateStrategy<WidgetSpec> for WidgetStrategy {
    fn allow_create_on_update(&self) -> bool {
        true
    }

    fn prepare_for_update(&self, obj: &mut Widget, old: &Widget) {
        obj.status = old.status.clone();
    }

    fn validate_update(&self, obj: &Widget, _old: &Widget) -> Vec<FieldError> {
        RestCreateStrategy::validate(self, obj)
    }
}

impl RestDeleteStrategy<WidgetSpec> for WidgetStrategy {}
