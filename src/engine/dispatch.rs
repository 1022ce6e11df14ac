//! # Event Dispatch
//!
//! Turns one physical event into zero or more output actions.
//!
//! The dispatcher performs no I/O: given the same state, profile and control
//! snapshot it always produces the same actions, which is what the tests
//! below rely on.
//!
//! ## Routing
//!
//! | Event | Condition | Actions |
//! |-------|-----------|---------|
//! | key, value 2 | autorepeat | none |
//! | key | mapped to a gamepad button | `EmitButton` |
//! | key | mapped to `BTN_DPAD_*` | hat update on `ABS_HAT0X`/`ABS_HAT0Y` |
//! | key | mapped to a mouse action, mouse mode on | mouse action |
//! | key, value 0 | a target is held for the key | release of that target |
//! | hat axis | direction mappings exist | release old / press new |
//! | any axis | bound to an `ABS_*` output | `EmitAxis` on that output |
//! | stick axis | left stick, mouse mode on | `MouseMove` |
//! | stick axis | otherwise | `EmitAxis` (normalized) |
//! | hat axis | no mappings | raw passthrough |
//!
//! A release always goes to the target its press reached, so switching
//! mode or mouse mode while a button is down never leaves it stuck.

use evdev::AbsoluteAxisType;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

use super::axis::{apply_deadzone, apply_sensitivity, mouse_delta, normalize};
use super::control::ControlSnapshot;
use super::layout::AxisLayout;
use crate::device::AxisInfo;
use crate::output::names::resolve;
use crate::output::{DpadDirection, MouseAction, MouseButton, VirtualTarget};
use crate::profile::{AxisDirection, MappingProfile, Mode};

/// Hat axes `ABS_HAT0X` through `ABS_HAT3Y`.
const HAT_AXES: std::ops::RangeInclusive<u16> = 0x10..=0x17;

/// Key value the kernel uses for autorepeat.
const KEY_REPEAT: i32 = 2;

/// An input event the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalEvent {
    /// Button press (1), release (0) or autorepeat (2)
    Key { code: u16, value: i32 },
    /// Raw absolute axis value
    Absolute { code: u16, value: i32 },
}

/// One write to the output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    EmitButton { code: u16, value: i32 },
    EmitAxis { code: u16, value: i32 },
    MouseMove { dx: i32, dy: i32 },
    MouseClick { button: MouseButton, value: i32 },
    Scroll { amount: i32 },
}

/// Last reported direction (-1, 0, +1) of each hat axis.
#[derive(Debug, Default, Clone)]
pub struct HatState {
    values: HashMap<u16, i32>,
}

impl HatState {
    #[must_use]
    pub fn get(&self, code: u16) -> i32 {
        self.values.get(&code).copied().unwrap_or(0)
    }

    /// Stores `value`, returning the previous one.
    pub fn set(&mut self, code: u16, value: i32) -> i32 {
        self.values.insert(code, value).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Held state of the four synthetic D-pad keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DpadKeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DpadKeyState {
    pub fn set(&mut self, direction: DpadDirection, pressed: bool) {
        match direction {
            DpadDirection::Up => self.up = pressed,
            DpadDirection::Down => self.down = pressed,
            DpadDirection::Left => self.left = pressed,
            DpadDirection::Right => self.right = pressed,
        }
    }

    /// Hat values `(x, y)`; opposite keys held together cancel out.
    #[must_use]
    pub fn hat(&self) -> (i32, i32) {
        let x = i32::from(self.right) - i32::from(self.left);
        let y = i32::from(self.down) - i32::from(self.up);
        (x, y)
    }
}

/// A physical input that can hold a virtual target down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum HeldSource {
    Key(u16),
    Hat(u16),
}

/// Stateful event translator for one device session.
#[derive(Debug)]
pub struct Dispatcher {
    layout: &'static AxisLayout,
    axes: BTreeMap<u16, AxisInfo>,
    hats: HatState,
    dpad: DpadKeyState,
    /// Targets pressed by a source, released through the same target
    /// even if the mode or mouse mode changed in between.
    held: HashMap<HeldSource, VirtualTarget>,
}

impl Dispatcher {
    /// # Arguments
    ///
    /// * `layout` - Stick role table for the device
    /// * `axes` - Device axis metadata used for normalization
    #[must_use]
    pub fn new(layout: &'static AxisLayout, axes: BTreeMap<u16, AxisInfo>) -> Self {
        Self {
            layout,
            axes,
            hats: HatState::default(),
            dpad: DpadKeyState::default(),
            held: HashMap::new(),
        }
    }

    #[must_use]
    pub fn hat_state(&self) -> &HatState {
        &self.hats
    }

    /// Forgets held hat directions, D-pad keys and pressed targets.
    pub fn reset(&mut self) {
        self.hats.clear();
        self.dpad = DpadKeyState::default();
        self.held.clear();
    }

    /// Translates one event.
    pub fn dispatch(
        &mut self,
        event: PhysicalEvent,
        profile: &MappingProfile,
        control: &ControlSnapshot,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        match event {
            PhysicalEvent::Key { code, value } => self.on_key(code, value, profile, control, &mut actions),
            PhysicalEvent::Absolute { code, value } => {
                self.on_axis(code, value, profile, control, &mut actions)
            }
        }
        actions
    }

    fn on_key(
        &mut self,
        code: u16,
        value: i32,
        profile: &MappingProfile,
        control: &ControlSnapshot,
        actions: &mut Vec<Action>,
    ) {
        if value == KEY_REPEAT {
            return;
        }
        let source = HeldSource::Key(code);
        if value == 0 {
            match self.held.remove(&source) {
                Some(target) => self.release(target, actions),
                None => trace!("Release of button {} with nothing held", code),
            }
            return;
        }
        match profile.translate_button(control.mode, code) {
            Some(name) => self.press(source, name, control, actions),
            None => trace!("Unmapped button {} in {} mode", code, control.mode),
        }
    }

    fn on_axis(
        &mut self,
        code: u16,
        value: i32,
        profile: &MappingProfile,
        control: &ControlSnapshot,
        actions: &mut Vec<Action>,
    ) {
        if HAT_AXES.contains(&code) && self.on_hat(code, value.signum(), profile, control, actions) {
            return;
        }

        let remapped = profile
            .translate_axis(control.mode, code, None)
            .map_or(false, |name| self.remap_axis(code, value, name, control, actions));
        if remapped {
            return;
        }

        if let Some(role) = self.layout.role_of(code) {
            let shaped = self.shape(code, value, control);

            if control.mouse_mode && role.is_main_stick() {
                let delta = mouse_delta(shaped, control.mouse_sensitivity);
                if delta != 0 {
                    let (dx, dy) = if role == super::layout::AxisRole::LeftX {
                        (delta, 0)
                    } else {
                        (0, delta)
                    };
                    actions.push(Action::MouseMove { dx, dy });
                }
            } else {
                actions.push(Action::EmitAxis {
                    code: role.output_code(),
                    value: shaped,
                });
            }
        } else if code == AbsoluteAxisType::ABS_HAT0X.0 || code == AbsoluteAxisType::ABS_HAT0Y.0 {
            // Only the first hat exists on the virtual gamepad
            actions.push(Action::EmitAxis { code, value: value.signum() });
        } else {
            trace!("Ignoring axis {}", code);
        }
    }

    /// Tracks the hat and, when direction bindings exist, turns it into
    /// momentary presses. Returns false if the event still needs routing.
    fn on_hat(
        &mut self,
        code: u16,
        value: i32,
        profile: &MappingProfile,
        control: &ControlSnapshot,
        actions: &mut Vec<Action>,
    ) -> bool {
        let mode = control.mode;
        let previous = self.hats.set(code, value);
        let source = HeldSource::Hat(code);

        if previous != value {
            if let Some(target) = self.held.remove(&source) {
                self.release(target, actions);
            }
        }
        if !profile.has_axis_direction_mappings(mode, code) {
            return false;
        }

        if previous != value {
            if let Some(name) = Self::hat_mapping(profile, mode, code, value) {
                self.press(source, name, control, actions);
            }
        }
        true
    }

    fn hat_mapping(profile: &MappingProfile, mode: Mode, code: u16, value: i32) -> Option<&str> {
        let direction = AxisDirection::from_value(value)?;
        profile.translate_axis(mode, code, Some(direction))
    }

    /// Normalization, deadzone and stick sensitivity for a physical axis.
    fn shape(&self, code: u16, value: i32, control: &ControlSnapshot) -> i32 {
        let normalized = normalize(value, self.axes.get(&code));
        apply_sensitivity(apply_deadzone(normalized), control.stick_sensitivity)
    }

    /// Routes a physical axis onto the virtual axis it is bound to.
    ///
    /// Returns false if `name` is not an output axis, leaving the event to
    /// the default routing.
    fn remap_axis(
        &self,
        code: u16,
        value: i32,
        name: &str,
        control: &ControlSnapshot,
        actions: &mut Vec<Action>,
    ) -> bool {
        let Some(target @ VirtualTarget::Axis(output)) = resolve(name) else {
            trace!("Axis {} bound to {}, which is not an output axis", code, name);
            return false;
        };

        let value = if !target.is_hat_axis() {
            self.shape(code, value, control)
        } else if HAT_AXES.contains(&code) {
            value.signum()
        } else {
            self.shape(code, value, control).signum()
        };
        actions.push(Action::EmitAxis { code: output, value });
        true
    }

    /// Presses whatever a virtual name resolves to and remembers it for release.
    fn press(
        &mut self,
        source: HeldSource,
        name: &str,
        control: &ControlSnapshot,
        actions: &mut Vec<Action>,
    ) {
        let target = match resolve(name) {
            Some(VirtualTarget::Mouse(_)) if !control.mouse_mode => {
                trace!("{} ignored outside mouse mode", name);
                return;
            }
            Some(VirtualTarget::Axis(_)) | None => {
                trace!("Virtual name {} has no button output", name);
                return;
            }
            Some(target) => target,
        };
        self.emit_target(target, 1, actions);
        self.held.insert(source, target);
    }

    fn release(&mut self, target: VirtualTarget, actions: &mut Vec<Action>) {
        self.emit_target(target, 0, actions);
    }

    fn emit_target(&mut self, target: VirtualTarget, value: i32, actions: &mut Vec<Action>) {
        match target {
            VirtualTarget::Button(code) => actions.push(Action::EmitButton { code, value }),
            VirtualTarget::Dpad(direction) => {
                self.dpad.set(direction, value != 0);
                let (x, y) = self.dpad.hat();
                actions.push(Action::EmitAxis {
                    code: AbsoluteAxisType::ABS_HAT0X.0,
                    value: x,
                });
                actions.push(Action::EmitAxis {
                    code: AbsoluteAxisType::ABS_HAT0Y.0,
                    value: y,
                });
            }
            VirtualTarget::Mouse(action) => Self::mouse_action(action, value, actions),
            VirtualTarget::Axis(_) => {}
        }
    }

    fn mouse_action(action: MouseAction, value: i32, actions: &mut Vec<Action>) {
        let pressed = value != 0;
        match action {
            MouseAction::Click(button) => actions.push(Action::MouseClick { button, value }),
            MouseAction::DoubleClick if pressed => {
                for _ in 0..2 {
                    actions.push(Action::MouseClick { button: MouseButton::Left, value: 1 });
                    actions.push(Action::MouseClick { button: MouseButton::Left, value: 0 });
                }
            }
            MouseAction::ScrollUp if pressed => actions.push(Action::Scroll { amount: 1 }),
            MouseAction::ScrollDown if pressed => actions.push(Action::Scroll { amount: -1 }),
            _ => {}
        }
    }
}
