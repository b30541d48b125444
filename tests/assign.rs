use std::sync::{Arc, Mutex};

use hwc_planes::{
    plane::PlaneInitError, DisplayPlane, Error, Pipeline, PlaneBinding, PlaneId, PlaneManager,
    PlaneManagerConfig, PlaneType, ZOrderConfig, ZOrderState,
};

/// Register writes of all planes, in order
type Registers = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
struct RegisterPlane {
    id: PlaneId,
    enabled: bool,
    registers: Registers,
}

impl RegisterPlane {
    fn write(&self, register: &str) {
        self.registers.lock().unwrap().push(format!("{} {}", self.id, register));
    }
}

impl DisplayPlane for RegisterPlane {
    fn id(&self) -> PlaneId {
        self.id
    }

    fn initialize(&mut self, buffer_count: usize) -> Result<(), PlaneInitError> {
        self.write(&format!("init {buffer_count}"));
        Ok(())
    }

    fn deinitialize(&mut self) {
        self.enabled = false;
        self.write("deinit");
    }

    fn enable(&mut self) {
        self.enabled = true;
        self.write("enable");
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.write("disable");
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_zorder_config(&mut self, bindings: &[PlaneBinding], _state: &mut ZOrderState) {
        let position = bindings.iter().position(|b| b.plane == self.id);
        self.write(&format!("zorder {position:?}"));
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn manager(
    registers: &Registers,
) -> PlaneManager<impl FnMut(PlaneId) -> Result<Box<dyn DisplayPlane>, Error>> {
    init_logging();
    let registers = registers.clone();
    let factory = move |id: PlaneId| -> Result<Box<dyn DisplayPlane>, Error> {
        Ok(Box::new(RegisterPlane {
            id,
            enabled: false,
            registers: registers.clone(),
        }))
    };
    PlaneManager::with_exact_config(PlaneManagerConfig::default(), factory)
}

fn take(registers: &Registers) -> Vec<String> {
    std::mem::take(&mut *registers.lock().unwrap())
}

#[test]
fn frames_with_closure_factory() {
    let registers = Registers::default();
    let mut manager = manager(&registers);
    manager.initialize().unwrap();
    assert_eq!(take(&registers).len(), 6);

    let first: ZOrderConfig = [PlaneType::Overlay, PlaneType::Primary].into_iter().collect();
    assert!(manager.is_valid_zorder(Pipeline::Primary, &first));
    assert_eq!(manager.reclaim_planes(Pipeline::Primary), 0);
    let assignment = manager.assign_planes(Pipeline::Primary, &first).unwrap();
    assert_eq!(
        assignment.planes().collect::<Vec<_>>(),
        vec![
            PlaneId::new(PlaneType::Overlay, 0),
            PlaneId::new(PlaneType::Primary, 0)
        ]
    );
    assert_eq!(manager.disable_reclaimed_planes(), 0);
    assert_eq!(
        take(&registers),
        vec![
            "overlay plane 0 enable",
            "primary plane 0 enable",
            "overlay plane 0 zorder Some(0)",
            "primary plane 0 zorder Some(1)",
        ]
    );

    // next frame drops the overlay
    let second: ZOrderConfig = [PlaneType::Primary].into_iter().collect();
    assert!(manager.is_valid_zorder(Pipeline::Primary, &second));
    assert_eq!(manager.reclaim_planes(Pipeline::Primary), 2);
    let assignment = manager.assign_planes(Pipeline::Primary, &second).unwrap();
    assert_eq!(assignment.plane_for(0), Some(PlaneId::new(PlaneType::Primary, 0)));
    assert_eq!(manager.disable_reclaimed_planes(), 1);
    assert_eq!(
        take(&registers),
        vec![
            "primary plane 0 enable",
            "primary plane 0 zorder Some(0)",
            "overlay plane 0 disable",
        ]
    );

    let state = manager.zorder_state(Pipeline::Primary).unwrap();
    assert_eq!(state.committed_order(), &[PlaneId::new(PlaneType::Primary, 0)][..]);
    assert_eq!(state.serial(), Some(assignment.serial()));

    drop(manager);
    assert_eq!(take(&registers).iter().filter(|w| w.ends_with("deinit")).count(), 6);
}

#[test]
fn interleaved_zorder_is_refused() {
    let registers = Registers::default();
    let mut manager = manager(&registers);
    manager.initialize().unwrap();
    take(&registers);

    let config: ZOrderConfig = [PlaneType::Primary, PlaneType::Overlay, PlaneType::Sprite]
        .into_iter()
        .collect();
    assert!(!manager.is_valid_zorder(Pipeline::External, &config));
    assert!(matches!(
        manager.validate_zorder(&config),
        Err(Error::InvalidZOrder { .. })
    ));
    assert!(take(&registers).is_empty());
}
