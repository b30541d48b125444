#![allow(missing_docs)]
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use crate::{
    error::Error,
    plane::{DisplayPlane, PlaneFactory, PlaneId, PlaneInitError, PlaneType},
    zorder::{PlaneBinding, ZOrderState},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaneEvent {
    Initialized(PlaneId),
    Deinitialized(PlaneId),
    Enabled(PlaneId),
    Disabled(PlaneId),
    ZOrder(PlaneId, Vec<PlaneId>),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<PlaneEvent>>>);

impl EventLog {
    fn push(&self, event: PlaneEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<PlaneEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

#[derive(Debug, thiserror::Error)]
#[error("dummy plane refused to initialize")]
pub struct DummyInitError;

#[derive(Debug)]
pub struct DummyPlane {
    id: PlaneId,
    enabled: bool,
    fail_init: bool,
    log: EventLog,
}

impl DummyPlane {
    pub fn new(id: PlaneId, log: EventLog) -> DummyPlane {
        DummyPlane {
            id,
            enabled: false,
            fail_init: false,
            log,
        }
    }
}

impl DisplayPlane for DummyPlane {
    fn id(&self) -> PlaneId {
        self.id
    }

    fn initialize(&mut self, _buffer_count: usize) -> Result<(), PlaneInitError> {
        if self.fail_init {
            return Err(Box::new(DummyInitError));
        }
        self.log.push(PlaneEvent::Initialized(self.id));
        Ok(())
    }

    fn deinitialize(&mut self) {
        self.enabled = false;
        self.log.push(PlaneEvent::Deinitialized(self.id));
    }

    fn enable(&mut self) {
        self.enabled = true;
        self.log.push(PlaneEvent::Enabled(self.id));
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.log.push(PlaneEvent::Disabled(self.id));
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_zorder_config(&mut self, bindings: &[PlaneBinding], state: &mut ZOrderState) {
        if let Some(binding) = bindings.iter().find(|b| b.plane == self.id) {
            state.set_plane_data(self.id, binding.position as u64);
        }
        self.log.push(PlaneEvent::ZOrder(
            self.id,
            bindings.iter().map(|b| b.plane).collect(),
        ));
    }
}

#[derive(Debug, Default)]
pub struct DummyPlaneFactory {
    pub log: EventLog,
    pub failing: HashSet<PlaneId>,
    pub unsupported: HashSet<PlaneType>,
}

impl DummyPlaneFactory {
    pub fn new() -> DummyPlaneFactory {
        DummyPlaneFactory::default()
    }

    pub fn failing(mut self, id: PlaneId) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn unsupported(mut self, type_: PlaneType) -> Self {
        self.unsupported.insert(type_);
        self
    }
}

impl PlaneFactory for DummyPlaneFactory {
    fn create_plane(&mut self, id: PlaneId) -> Result<Box<dyn DisplayPlane>, Error> {
        if self.unsupported.contains(&id.type_) {
            return Err(Error::UnsupportedPlaneType(id.type_.into()));
        }
        let mut plane = DummyPlane::new(id, self.log.clone());
        plane.fail_init = self.failing.contains(&id);
        Ok(Box::new(plane))
    }
}
