//! Aggregation of motion sensor channels for any number of listeners.

use super::sensor::{
    magnetic_north, MotionSensorData, MotionSensorEvent, MotionSensorFilter, MotionSensorFlags,
    MotionSensorListener, MotionSensorProvider,
};

use ::glam::Quat;
use ::std::{cell::RefCell, rc::Rc, time::Duration};
use ::tracing::{debug, trace};

/// Shared handle to a motion sensor listener. Identity is pointer identity.
pub type MotionListenerHandle = Rc<RefCell<dyn MotionSensorListener>>;

fn same_listener(a: &MotionListenerHandle, b: &MotionListenerHandle) -> bool {
    ::std::ptr::eq(Rc::as_ptr(a) as *const u8, Rc::as_ptr(b) as *const u8)
}

/// Tracks which channels listeners need, keeps the provider configured
/// accordingly and fans each tick's readings out to interested listeners.
///
/// The set of active channels is the union of every listener's flags and the
/// manually activated flags, plus the channels derived flags depend on. While
/// paused, no channel is active.
pub struct MotionSensorHub {
    provider: Option<Box<dyn MotionSensorProvider>>,
    filter: Option<Box<dyn MotionSensorFilter>>,
    listeners: Vec<(MotionListenerHandle, MotionSensorFlags)>,
    manual: MotionSensorFlags,
    active: MotionSensorFlags,
    pause_count: usize,
    update_interval: Duration,
    data: MotionSensorData,
    previous_orientation: Option<Quat>,
}

impl ::std::fmt::Debug for MotionSensorHub {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.debug_struct("MotionSensorHub")
            .field("provider", &self.provider.is_some())
            .field("filter", &self.filter.is_some())
            .field("listeners", &self.listeners.len())
            .field("active", &self.active)
            .field("pause_count", &self.pause_count)
            .field("update_interval", &self.update_interval)
            .finish()
    }
}

impl MotionSensorHub {
    pub fn new(update_interval: Duration) -> Self {
        Self {
            provider: None,
            filter: None,
            listeners: Vec::new(),
            manual: MotionSensorFlags::empty(),
            active: MotionSensorFlags::empty(),
            pause_count: 0,
            update_interval,
            data: MotionSensorData::default(),
            previous_orientation: None,
        }
    }

    /// Install (or remove) the platform provider. The provider is configured
    /// with the current interval and active channels.
    pub fn set_provider(&mut self, provider: Option<Box<dyn MotionSensorProvider>>) {
        if let Some(previous) = self.provider.as_mut() {
            previous.set_active(MotionSensorFlags::empty());
        }
        self.provider = provider;
        if let Some(provider) = self.provider.as_mut() {
            provider.set_update_interval(self.update_interval);
            provider.set_active(self.active);
        }
    }

    /// Whether every channel in `flags` can be supplied, counting derived
    /// channels whose inputs are available.
    pub fn is_data_available(&self, flags: MotionSensorFlags) -> bool {
        self.provider
            .as_ref()
            .map_or(false, |p| p.available().with_derived().contains(flags))
    }

    /// Register interest in `flags`. A listener registered again has its
    /// flags extended. Returns whether the channels are available.
    pub fn add_listener(&mut self, listener: MotionListenerHandle, flags: MotionSensorFlags) -> bool {
        match self
            .listeners
            .iter_mut()
            .find(|(existing, _)| same_listener(existing, &listener))
        {
            Some((_, existing)) => *existing |= flags,
            None => self.listeners.push((listener, flags)),
        }
        self.refresh();
        self.is_data_available(flags)
    }

    /// Withdraw interest in `flags`. The listener is dropped once it has no
    /// flags left.
    pub fn remove_listener(&mut self, listener: &MotionListenerHandle, flags: MotionSensorFlags) {
        for (existing, existing_flags) in self.listeners.iter_mut() {
            if same_listener(existing, listener) {
                existing_flags.remove(flags);
            }
        }
        self.listeners.retain(|(_, flags)| !flags.is_empty());
        self.refresh();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Activate channels independently of any listener.
    pub fn activate(&mut self, flags: MotionSensorFlags) {
        self.manual |= flags;
        self.refresh();
    }

    pub fn deactivate(&mut self, flags: MotionSensorFlags) {
        self.manual.remove(flags);
        self.refresh();
    }

    /// Deactivate every channel until the matching [`unpause`].
    ///
    /// [`unpause`]: Self::unpause
    pub fn pause(&mut self) {
        self.pause_count += 1;
        self.refresh();
    }

    pub fn unpause(&mut self) {
        self.pause_count = self.pause_count.saturating_sub(1);
        self.refresh();
    }

    pub fn is_paused(&self) -> bool {
        self.pause_count > 0
    }

    /// Request a refresh interval. Unless `force` is set the interval can
    /// only be shortened.
    pub fn set_update_interval(&mut self, interval: Duration, force: bool) {
        if !force && interval >= self.update_interval {
            return;
        }
        debug!(interval = ?interval, "Motion sensor update interval");
        self.update_interval = interval;
        if let Some(provider) = self.provider.as_mut() {
            provider.set_update_interval(interval);
        }
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn set_filter(&mut self, filter: Option<Box<dyn MotionSensorFilter>>) {
        self.filter = filter;
    }

    /// Channels currently switched on.
    pub fn active_flags(&self) -> MotionSensorFlags {
        self.active
    }

    pub fn most_recent_data(&self) -> &MotionSensorData {
        &self.data
    }

    fn refresh(&mut self) {
        let required = if self.is_paused() {
            MotionSensorFlags::empty()
        } else {
            self.listeners
                .iter()
                .fold(self.manual, |acc, (_, flags)| acc | *flags)
                .with_dependencies()
        };
        if required == self.active {
            return;
        }

        if (required ^ self.active).contains(MotionSensorFlags::ORIENTATION) {
            self.previous_orientation = None;
        }
        debug!(previous = ?self.active, active = ?required, "Reconfiguring motion sensors");
        self.active = required;
        if let Some(provider) = self.provider.as_mut() {
            provider.set_active(required);
        }
    }

    /// Pull this tick's readings, derive dependent channels, filter and
    /// notify listeners interested in what changed.
    pub fn update(&mut self) {
        if self.active.is_empty() {
            return;
        }
        let Some(provider) = self.provider.as_mut() else {
            return;
        };

        let readings = provider.poll();
        let mut changed = readings.apply_to(&mut self.data, self.active);

        if changed.contains(MotionSensorFlags::ACCELERATION_GRAVITY | MotionSensorFlags::MAGNETIC_FIELD_UNBIASED) {
            self.data.magnetic_north = magnetic_north(
                self.data.acceleration_gravity,
                self.data.magnetic_field_unbiased,
            );
            changed |= MotionSensorFlags::MAGNETIC_NORTH;
        }

        if changed.contains(MotionSensorFlags::ORIENTATION) {
            if let Some(previous) = self.previous_orientation {
                self.data.orientation_delta = self.data.orientation * previous.inverse();
                changed |= MotionSensorFlags::ORIENTATION_DELTA;
            }
            self.previous_orientation = Some(self.data.orientation);
        }

        if changed.is_empty() {
            return;
        }
        if let Some(filter) = self.filter.as_mut() {
            filter.filter(&mut self.data, changed);
        }

        trace!(updated = ?changed, "Motion sensor event");
        let event = MotionSensorEvent {
            data: &self.data,
            updated: changed,
        };
        let listeners: Vec<_> = self
            .listeners
            .iter()
            .filter(|(_, flags)| flags.intersects(changed))
            .map(|(listener, _)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener.borrow_mut().on_motion_sensor_event(&event);
        }
    }

    /// Drop every listener, the filter and the provider.
    pub fn shutdown(&mut self) {
        self.listeners.clear();
        self.manual = MotionSensorFlags::empty();
        self.refresh();
        self.set_provider(None);
        self.filter = None;
    }
}
