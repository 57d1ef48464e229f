//! Ownership and lookup of the registered input devices.

use super::{
    device::InputDevice,
    event::ForceFeedback,
    keys::DeviceKind,
};
use crate::config::InputConfig;

use ::indexmap::IndexMap;
use ::tracing::{debug, error};

/// Display name and exposed input names of one type of device.
#[derive(Clone, Debug, PartialEq, Eq)]
struct DeviceNames {
    display_name: String,
    inputs: Vec<String>,
}

/// Sole owner of every registered device.
///
/// Devices are kept in registration order, which is also the order in which
/// they are polled.
#[derive(Default)]
pub struct DeviceManager {
    devices: Vec<Box<dyn InputDevice>>,
    next_unique_id: u8,
    /// Published names keyed by lowercased common name. Cumulative: the first
    /// device of each common name publishes for all later ones.
    names: IndexMap<String, DeviceNames>,
    force_feedback_index: Option<u8>,
}

impl ::std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field(
                "devices",
                &self.devices.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .field("force_feedback_index", &self.force_feedback_index)
            .finish()
    }
}

impl DeviceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize and register a device.
    ///
    /// A device which fails to initialize is dropped and `false` is
    /// returned. Other devices are unaffected.
    pub fn add_device(&mut self, mut device: Box<dyn InputDevice>, config: &InputConfig) -> bool {
        let Some(unique_id) = self.free_unique_id() else {
            error!(device = %device.name(), registered = self.devices.len(), "No unique id left for input device");
            return false;
        };
        if let Err(e) = device.init(config) {
            error!(device = %device.name(), error = %e, "Failed to initialize input device");
            return false;
        }

        self.next_unique_id = unique_id.wrapping_add(1);
        device.base_mut().set_unique_id(unique_id);

        let key = device.common_name().to_ascii_lowercase();
        if !self.names.contains_key(&key) {
            self.names.insert(
                key,
                DeviceNames {
                    display_name: device.common_name().to_owned(),
                    inputs: device.symbols().names().map(str::to_owned).collect(),
                },
            );
        }

        debug!(
            device = %device.name(),
            kind = %device.kind(),
            index = device.index(),
            unique_id,
            symbols = device.symbols().len(),
            "Registered input device"
        );
        self.devices.push(device);
        true
    }

    /// The first id from `next_unique_id` onwards which no registered device
    /// holds.
    fn free_unique_id(&self) -> Option<u8> {
        (0..=u8::MAX)
            .map(|offset| self.next_unique_id.wrapping_add(offset))
            .find(|&id| self.devices.iter().all(|d| d.unique_id() != id))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices in registration order.
    pub fn devices(&self) -> impl Iterator<Item = &dyn InputDevice> + '_ {
        self.devices.iter().map(|d| d.as_ref())
    }

    pub fn devices_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn InputDevice>> + '_ {
        self.devices.iter_mut()
    }

    /// The device of `kind` with the given index.
    pub fn device(&self, index: u8, kind: DeviceKind) -> Option<&dyn InputDevice> {
        self.devices
            .iter()
            .find(|d| d.kind() == kind && d.index() == index)
            .map(|d| d.as_ref())
    }

    pub fn device_mut(&mut self, index: u8, kind: DeviceKind) -> Option<&mut Box<dyn InputDevice>> {
        self.devices
            .iter_mut()
            .find(|d| d.kind() == kind && d.index() == index)
    }

    /// The device at `position` in registration order.
    pub(crate) fn device_at_mut(&mut self, position: usize) -> Option<&mut Box<dyn InputDevice>> {
        self.devices.get_mut(position)
    }

    pub fn device_by_unique_id(&self, unique_id: u8) -> Option<&dyn InputDevice> {
        self.devices
            .iter()
            .find(|d| d.unique_id() == unique_id)
            .map(|d| d.as_ref())
    }

    pub fn device_by_unique_id_mut(&mut self, unique_id: u8) -> Option<&mut Box<dyn InputDevice>> {
        self.devices.iter_mut().find(|d| d.unique_id() == unique_id)
    }

    pub fn has_device_of_kind(&self, kind: DeviceKind) -> bool {
        self.devices.iter().any(|d| d.kind() == kind)
    }

    /// Enable or disable every device of `kind`.
    pub fn enable_device(&mut self, kind: DeviceKind, enable: bool) {
        for device in self.devices.iter_mut().filter(|d| d.kind() == kind) {
            debug!(device = %device.name(), enable, "Enable input device");
            device.enable(enable);
        }
    }

    /// Display names of every type of device registered so far.
    pub fn registered_device_names(&self) -> Vec<&str> {
        self.names
            .values()
            .map(|names| names.display_name.as_str())
            .collect()
    }

    /// Input names published by the first device with common name `name`.
    pub fn input_list_by_device(&self, name: &str) -> Option<&[String]> {
        self.names
            .get(&name.to_ascii_lowercase())
            .map(|names| names.inputs.as_slice())
    }

    /// Index of the device receiving force feedback, or `None` for every
    /// device of the requested kind.
    pub fn force_feedback_device_index(&self) -> Option<u8> {
        self.force_feedback_index
    }

    /// Route a force feedback request to the devices of its kind which match
    /// the active force feedback index. Returns whether any device accepted
    /// it.
    pub fn force_feedback_event(&mut self, params: &ForceFeedback) -> bool {
        let target = self.force_feedback_index;
        self.devices
            .iter_mut()
            .filter(|d| d.kind() == params.device_kind)
            .filter(|d| target.map_or(true, |index| d.index() == index))
            .fold(false, |accepted, d| d.set_force_feedback(params) || accepted)
    }

    /// Change the force feedback target. The previous target is silenced
    /// first.
    pub fn set_force_feedback_device_index(&mut self, index: Option<u8>) {
        if self.force_feedback_index == index {
            return;
        }
        debug!(previous = ?self.force_feedback_index, next = ?index, "Changing force feedback target");
        self.force_feedback_event(&ForceFeedback::stop(DeviceKind::Gamepad));
        self.force_feedback_index = index;
    }

    /// Shut down and drop every device and forget all published names.
    pub fn shutdown(&mut self) {
        for mut device in self.devices.drain(..) {
            debug!(device = %device.name(), "Shutting down input device");
            device.shutdown();
        }
        self.names.clear();
        self.force_feedback_index = None;
    }
}
