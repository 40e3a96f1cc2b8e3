//! Adapter for null stores: nothing is stored, so nothing is offered.

use crate::panel::adapter::PanelAdapter;
use crate::panel::capabilities::CapabilitySet;
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct DummyAdapter;

impl DummyAdapter {
    pub const NAME: &'static str = "dummy";
}

#[async_trait]
impl PanelAdapter for DummyAdapter {
    fn adapter_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::NONE
    }
}
